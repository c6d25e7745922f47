mod change_listener;
mod event_processor;

pub use change_listener::*;
pub(crate) use event_processor::*;
