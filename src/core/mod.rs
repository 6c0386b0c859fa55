pub mod config;
pub mod error;
pub mod history;
pub mod io;
pub mod progress;
pub mod settings;
pub mod state;
