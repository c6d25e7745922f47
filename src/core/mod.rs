mod change_set;
mod commit_handler;
mod delta;
mod engine;
mod listener;

pub use change_set::*;
pub use commit_handler::*;
pub use delta::*;
pub use engine::*;
pub use listener::*;
