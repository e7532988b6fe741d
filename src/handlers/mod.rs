// Handlers module

pub mod consumer;
pub mod ping;

pub use consumer::{start_handler, status_handler, stop_handler};
pub use ping::ping_handler;
