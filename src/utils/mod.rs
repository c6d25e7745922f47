pub(crate) mod async_task;

mod key_codec;
pub use key_codec::*;
