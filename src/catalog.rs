//! Fixed world content: the castle map and the year's class schedule.

use crate::model::location::Location;
use crate::model::task::{ClassTask, Schedule};

/// Where every student lands after the sorting ceremony.
pub const START_LOCATION: &str = "great-hall";

pub fn initial_locations() -> Vec<Location> {
    vec![
        location(
            "great-hall",
            "The Great Hall",
            "Four long house tables stretch beneath a ceiling enchanted to mirror the evening sky, and candle flames drift loose in the air.",
            &["Nearly Headless Nick", "Student Prefect", "The Bloody Baron"],
            &["corridor-1f", "courtyard"],
        ),
        location(
            "corridor-1f",
            "First Floor Corridor",
            "A draughty stone corridor lined with portraits that whisper and point as students hurry past.",
            &["Peeves", "Mrs. Norris"],
            &["great-hall", "transfiguration-classroom", "charms-classroom", "grand-staircase"],
        ),
        location(
            "grand-staircase",
            "Grand Staircase",
            "Flights of marble stairs swing between landings on their own whim; the portraits advise patience.",
            &["Lost First Year"],
            &["corridor-1f", "dungeons"],
        ),
        location(
            "dungeons",
            "The Dungeons",
            "Cold torchlit passages beneath the castle, smelling faintly of damp stone and old potion fumes.",
            &["Slytherin Student"],
            &["grand-staircase", "potions-classroom"],
        ),
        location(
            "potions-classroom",
            "Potions Classroom",
            "Shelves of pickled oddities watch over rows of cauldrons; the air still stings from the last lesson's brew.",
            &["Professor Snape (Hologram)"],
            &["dungeons"],
        ),
        location(
            "transfiguration-classroom",
            "Transfiguration Classroom",
            "Neat desks face a lectern stacked with matchboxes, teacups and a birdcage that rattles by itself.",
            &["Professor McGonagall (Hologram)"],
            &["corridor-1f"],
        ),
        location(
            "charms-classroom",
            "Charms Classroom",
            "A tiered classroom strewn with cushions and stray feathers from a thousand levitation drills.",
            &["Professor Flitwick (Hologram)"],
            &["corridor-1f"],
        ),
        location(
            "courtyard",
            "The Courtyard",
            "An open cloister where ivy climbs the weathered arches and owls cut across the square of sky.",
            &["Luna Lovegood (Type)"],
            &["great-hall", "greenhouse"],
        ),
        location(
            "greenhouse",
            "Greenhouse Three",
            "Rows of trembling pots under fogged glass; several of the plants are watching back.",
            &["Professor Sprout (Hologram)"],
            &["courtyard"],
        ),
    ]
}

pub fn initial_schedule() -> Schedule {
    Schedule::new(vec![
        class("c1", "Potions", "Brew a Cure for Boils without melting the cauldron.", "potions-classroom"),
        class("c2", "Transfiguration", "Turn a match into a needle, point first.", "transfiguration-classroom"),
        class("c3", "Charms", "Master the Levitation Charm. Swish, then flick.", "charms-classroom"),
        class("c4", "Herbology", "Repot a Mandrake seedling with your earmuffs on.", "greenhouse"),
        class("c5", "Defence Against the Dark Arts", "Face down a boggart before the whole school at the evening assembly.", "great-hall"),
    ])
}

fn location(id: &str, name: &str, description: &str, npcs: &[&str], connected_to: &[&str]) -> Location {
    Location {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        npcs: npcs.iter().map(|npc| npc.to_string()).collect(),
        connected_to: connected_to.iter().map(|id| id.to_string()).collect(),
    }
}

fn class(id: &str, subject: &str, description: &str, location_id: &str) -> ClassTask {
    ClassTask {
        id: id.to_string(),
        subject: subject.to_string(),
        description: description.to_string(),
        location_id: location_id.to_string(),
        completed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ids_are_unique() {
        let locations = initial_locations();
        for (i, a) in locations.iter().enumerate() {
            for b in &locations[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn adjacency_is_symmetric_and_resolvable() {
        let locations = initial_locations();
        for location in &locations {
            for target in &location.connected_to {
                let other = locations
                    .iter()
                    .find(|l| &l.id == target)
                    .unwrap_or_else(|| panic!("{} links to unknown {}", location.id, target));
                assert!(
                    other.is_adjacent_to(&location.id),
                    "{} -> {} is one-way",
                    location.id,
                    target
                );
            }
        }
    }

    #[test]
    fn start_location_exists() {
        assert!(initial_locations().iter().any(|l| l.id == START_LOCATION));
    }

    #[test]
    fn every_class_is_held_somewhere_real() {
        let locations = initial_locations();
        let schedule = initial_schedule();
        assert_eq!(schedule.tasks().len(), 5);
        for task in schedule.tasks() {
            assert!(!task.completed);
            assert!(
                locations.iter().any(|l| l.id == task.location_id),
                "{} held at unknown {}",
                task.id,
                task.location_id
            );
        }
    }
}
