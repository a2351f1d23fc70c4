//! Annotation emitter
//!
//! Translation boundary between a decoder's span bookkeeping and the output
//! channel. Nothing is validated here beyond span ordering.

use super::types::Annotation;
use crate::runtime::WorkResult;
use crate::runtime::sender::Sender;

/// Writes timed annotations to a decoder's output channel
pub struct AnnotationWriter {
    sender: Sender<Annotation>,
}

impl AnnotationWriter {
    pub fn new(sender: Sender<Annotation>) -> Self {
        Self { sender }
    }

    /// Emit one annotation spanning `[start, end)` with the given class index
    /// and text.
    pub fn put(&self, start: u64, end: u64, class: usize, text: String) -> WorkResult<()> {
        debug_assert!(start <= end, "annotation span reversed: {} > {}", start, end);
        self.sender.send(Annotation {
            start_sample: start,
            end_sample: end,
            class,
            text,
        })?;
        Ok(())
    }
}
