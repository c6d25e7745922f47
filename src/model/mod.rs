mod aggregate;
mod event;
mod location;

pub use aggregate::*;
pub use event::*;
pub use location::*;
