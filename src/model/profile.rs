use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum House {
    Gryffindor,
    Slytherin,
    Ravenclaw,
    Hufflepuff,
    Unsorted,
}

impl House {
    /// The four houses the ceremony may assign. `Unsorted` is never a verdict.
    pub const SORTABLE: [House; 4] = [
        House::Gryffindor,
        House::Slytherin,
        House::Ravenclaw,
        House::Hufflepuff,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            House::Gryffindor => "Gryffindor",
            House::Slytherin => "Slytherin",
            House::Ravenclaw => "Ravenclaw",
            House::Hufflepuff => "Hufflepuff",
            House::Unsorted => "Unsorted",
        }
    }

    /// Case-insensitive lookup over the sortable houses.
    pub fn from_label(label: &str) -> Option<House> {
        let label = label.trim();
        House::SORTABLE
            .iter()
            .copied()
            .find(|house| house.display_name().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub intelligence: i32,
    pub courage: i32,
    pub ambition: i32,
    pub loyalty: i32,
}

impl Default for StatBlock {
    fn default() -> Self {
        Self {
            intelligence: 5,
            courage: 5,
            ambition: 5,
            loyalty: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub age: u8,
    pub archetype: String,
    pub house: House,
    pub stats: StatBlock,
}

impl PlayerProfile {
    /// New students arrive unsorted with level stats.
    pub fn new(name: &str, age: u8, archetype: &str) -> Self {
        Self {
            name: name.to_string(),
            age,
            archetype: archetype.to_string(),
            house: House::Unsorted,
            stats: StatBlock::default(),
        }
    }

    pub fn assign_house(&mut self, house: House) {
        self.house = house;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_students_are_unsorted() {
        let profile = PlayerProfile::new("Alice", 11, "Witch");
        assert_eq!(profile.house, House::Unsorted);
        assert_eq!(profile.stats, StatBlock::default());
    }

    #[test]
    fn house_labels_resolve_case_insensitively() {
        assert_eq!(House::from_label("ravenclaw"), Some(House::Ravenclaw));
        assert_eq!(House::from_label(" Hufflepuff "), Some(House::Hufflepuff));
        assert_eq!(House::from_label("Unsorted"), None);
        assert_eq!(House::from_label("Durmstrang"), None);
    }
}
