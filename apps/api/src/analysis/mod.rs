pub mod client;
pub mod handlers;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod record;
pub mod state;
