use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
    pub npcs: Vec<String>,
    pub connected_to: Vec<String>,
}

impl Location {
    pub fn is_adjacent_to(&self, id: &str) -> bool {
        self.connected_to.iter().any(|connected| connected == id)
    }
}
