pub mod capture;
pub mod config;
pub mod error;
pub mod prompt;
pub mod result;
pub mod round;
pub mod session;
pub mod state;
