// Server module entry point
// Listener setup, accept loop, per-connection serving and signals

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::start_server_loop;
pub use signal::{start_signal_handler, SignalHandler};
