pub mod classroom;
pub mod conversation;
pub mod decode;
pub mod gemini;
pub mod generator;
pub mod prompt_builder;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod sorting;
