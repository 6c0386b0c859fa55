pub mod llm;
pub mod reveal;
pub mod script;
pub mod setup;
pub mod tts;
pub mod workflow;
