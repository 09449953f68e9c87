//! Random-access byte sources shared by the archive readers.
//!
//! Every archive handle in the crate sits on a [`ByteSource`]. Reads are
//! positional, so any number of [`ByteSourceCursor`]s over the same source
//! can be driven from different threads without coordinating.

mod adapter;
mod byte_source;

pub use adapter::ByteSourceCursor;
pub use byte_source::{ByteSource, FileSource, MemorySource};
