pub mod language;
pub mod location;
pub mod message;
pub mod profile;
pub mod task;
