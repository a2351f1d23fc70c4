//! Shared decoder metadata and output types

use std::fmt;

/// A mandatory or optional channel declaration
#[derive(Debug, Clone)]
pub struct ChannelDef {
    /// Short identifier (e.g., "rw")
    pub id: String,
    /// Display name (e.g., "R/W")
    pub name: String,
    /// Description
    pub desc: String,
}

impl ChannelDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

/// An annotation class declaration; the position in the decoder's table is
/// the class index carried by [`Annotation`]
#[derive(Debug, Clone, Copy)]
pub struct AnnotationDef {
    pub id: &'static str,
    pub label: &'static str,
}

/// Groups annotation classes into display rows for host-side layout
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRow {
    pub id: &'static str,
    pub label: &'static str,
    pub classes: &'static [usize],
}

/// A timed, labeled output record: one decoded bus event
///
/// `class` indexes the emitting decoder's annotation table; `end_sample` is
/// exclusive and always the sample at which the span was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub start_sample: u64,
    pub end_sample: u64,
    pub class: usize,
    pub text: String,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}..{}] class {}: {}",
            self.start_sample, self.end_sample, self.class, self.text
        )
    }
}
