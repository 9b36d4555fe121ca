use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTask {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub location_id: String,
    pub completed: bool,
}

/// The year's class schedule. Completion only ever moves forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    tasks: Vec<ClassTask>,
}

impl Schedule {
    pub fn new(tasks: Vec<ClassTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[ClassTask] {
        &self.tasks
    }

    /// Marks a task complete. Unknown ids and already-complete tasks are
    /// no-ops; returns whether anything changed.
    pub fn complete_task(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) if !task.completed => {
                task.completed = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self, id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == id && task.completed)
    }

    /// The class currently on offer at a location, if any is left to take.
    pub fn incomplete_at(&self, location_id: &str) -> Option<&ClassTask> {
        self.tasks
            .iter()
            .find(|task| task.location_id == location_id && !task.completed)
    }

    pub fn progress_ratio(&self) -> f32 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let done = self.tasks.iter().filter(|task| task.completed).count();
        done as f32 / self.tasks.len() as f32
    }

    /// Carries completion over from a previous schedule, matched by task id.
    /// Tasks absent from `self` are dropped; new tasks start incomplete.
    pub fn carry_completion(&mut self, previous: &Schedule) {
        for task in &mut self.tasks {
            if previous.is_complete(&task.id) {
                task.completed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, location_id: &str) -> ClassTask {
        ClassTask {
            id: id.to_string(),
            subject: format!("Subject {}", id),
            description: String::new(),
            location_id: location_id.to_string(),
            completed: false,
        }
    }

    fn schedule() -> Schedule {
        Schedule::new(vec![
            task("c1", "potions-classroom"),
            task("c2", "greenhouse"),
            task("c3", "greenhouse"),
            task("c4", "courtyard"),
            task("c5", "great-hall"),
        ])
    }

    #[test]
    fn empty_schedule_has_zero_progress() {
        assert_eq!(Schedule::default().progress_ratio(), 0.0);
    }

    #[test]
    fn completing_a_task_moves_the_ratio() {
        let mut sched = schedule();
        assert!(sched.complete_task("c1"));
        assert!((sched.progress_ratio() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn completion_is_idempotent() {
        let mut sched = schedule();
        assert!(sched.complete_task("c2"));
        assert!(!sched.complete_task("c2"));
        assert!((sched.progress_ratio() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut sched = schedule();
        assert!(!sched.complete_task("c99"));
        assert_eq!(sched.progress_ratio(), 0.0);
    }

    #[test]
    fn offers_the_first_incomplete_task_at_a_location() {
        let mut sched = schedule();
        assert_eq!(sched.incomplete_at("greenhouse").map(|t| t.id.as_str()), Some("c2"));
        sched.complete_task("c2");
        assert_eq!(sched.incomplete_at("greenhouse").map(|t| t.id.as_str()), Some("c3"));
        sched.complete_task("c3");
        assert!(sched.incomplete_at("greenhouse").is_none());
    }

    #[test]
    fn carry_over_matches_by_id() {
        let mut old = schedule();
        old.complete_task("c2");
        old.complete_task("c5");

        let mut fresh = Schedule::new(vec![
            task("c2", "greenhouse"),
            task("c5", "great-hall"),
            task("c6", "dungeons"),
        ]);
        fresh.carry_completion(&old);

        assert!(fresh.is_complete("c2"));
        assert!(fresh.is_complete("c5"));
        assert!(!fresh.is_complete("c6"));
    }
}
