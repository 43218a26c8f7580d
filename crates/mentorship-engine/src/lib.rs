pub mod config;
pub mod error;
pub mod matching;
pub mod roster;
pub mod telemetry;
