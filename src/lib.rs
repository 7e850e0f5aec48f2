// Public API for integration tests and embedding the clock and selector

pub mod api;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod protocol;
pub mod rotation;
pub mod session;
pub mod state;
pub mod store;
pub mod time;
pub mod types;
pub mod ws;
