//! Processing nodes
//!
//! Sources that feed captures into the runtime and the protocol decoders
//! that consume them.

pub mod decoders;
mod sr_file;

pub use sr_file::{SrFileSource, SrHeader};
