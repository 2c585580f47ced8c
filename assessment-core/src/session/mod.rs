pub mod orchestrator;
pub mod round;
