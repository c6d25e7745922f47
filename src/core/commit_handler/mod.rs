mod batch_committer;

pub use batch_committer::*;

#[cfg(test)]
mod batch_committer_test;
