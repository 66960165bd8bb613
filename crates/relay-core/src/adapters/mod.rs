//! # Adapters
//!
//! In-process implementations of outbound ports.
//!
//! - [`MemoryDirectory`]: member profiles held in memory
//! - [`PlainFormatter`]: relays content unchanged

mod formatter;
mod memory_directory;

pub use formatter::PlainFormatter;
pub use memory_directory::MemoryDirectory;
