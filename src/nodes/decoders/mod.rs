//! Protocol decoders and their shared support layers
//!
//! Decoders are ordinary process nodes that consume a [`SampleVector`]
//! stream and produce [`Annotation`]s. The support modules split along the
//! decode path: `acquire` turns capture samples into remapped, edge-aware
//! pin views, `bus` collapses pin groups into bus values, `emit` writes the
//! resulting spans.
//!
//! [`SampleVector`]: crate::runtime::SampleVector

pub mod acquire;
pub mod bus;
pub mod emit;
pub mod mc6809;
pub mod mc6809_ops;
pub mod tms7000;
pub mod types;

pub use acquire::{Edge, EdgeMatches, EdgeSpec, PinMap, SampleStream};
pub use bus::{BusValue, reduce_bus};
pub use emit::AnnotationWriter;
pub use mc6809::Mc6809Decoder;
pub use tms7000::Tms7000Decoder;
pub use types::{Annotation, AnnotationDef, AnnotationRow, ChannelDef};
