pub mod approval;
pub mod generator;
pub mod handlers;
pub mod prompts;
