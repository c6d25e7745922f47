mod change_stream;
mod mem_change_stream;

pub use change_stream::*;
pub use mem_change_stream::*;
