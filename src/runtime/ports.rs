//! Port-based API for ergonomic node connections
//!
//! InputPort and OutputPort are type-erased wrappers for channel endpoints,
//! created by the Pipeline when it wires nodes together. Each InputPort owns
//! the end-of-stream flag for its channel so the state survives across the
//! transient `Receiver`s handed out per work() call.

use std::any::TypeId;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::AtomicBool;

use crossbeam_channel::Receiver as CrossbeamReceiver;

use super::receiver::Receiver;
use super::sender::{ChannelMessage, Sender};

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Schema describing a port's metadata
#[derive(Debug, Clone)]
pub struct PortSchema {
    pub name: String,
    pub type_id: TypeId,
    pub index: usize,
    pub direction: PortDirection,
}

impl PortSchema {
    /// Create a new port schema with type information
    pub fn new<T: 'static>(
        name: impl Into<String>,
        index: usize,
        direction: PortDirection,
    ) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            index,
            direction,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Type-erased port wrappers
// ────────────────────────────────────────────────────────────────────────────

/// Type-erased input port wrapping a crossbeam receiver
pub struct InputPort {
    channel: Box<dyn std::any::Any + Send>,
    eos: AtomicBool,
}

impl InputPort {
    /// Create a typed input port directly (for tests and manual wiring)
    pub fn new<T: Send + 'static>(receiver: CrossbeamReceiver<ChannelMessage<T>>) -> Self {
        Self {
            channel: Box::new(receiver),
            eos: AtomicBool::new(false),
        }
    }

    /// Create from a type-erased box (for internal use by Pipeline)
    pub(crate) fn from_type_erased(channel: Box<dyn std::any::Any + Send>) -> Self {
        Self {
            channel,
            eos: AtomicBool::new(false),
        }
    }

    /// Get a [`Receiver`] over this port, using `buffer` as the putback
    /// store. The buffer is caller-owned so it persists across work() calls.
    ///
    /// Returns None if the port doesn't carry items of type `T`.
    pub fn get<'a, T: Send + 'static>(
        &'a self,
        buffer: &'a mut VecDeque<T>,
    ) -> Option<Receiver<'a, T>> {
        let receiver = self
            .channel
            .downcast_ref::<CrossbeamReceiver<ChannelMessage<T>>>()?;
        Some(Receiver::new(receiver, buffer, &self.eos))
    }
}

/// Type-erased output port wrapping a broadcast Sender
pub struct OutputPort {
    channel: Box<dyn std::any::Any + Send>,
}

impl OutputPort {
    /// Create a typed output port directly (for tests and manual wiring)
    pub fn new<T: Send + Clone + 'static>(sender: Sender<T>) -> Self {
        Self {
            channel: Box::new(sender),
        }
    }

    /// Create from a type-erased box (for internal use by Pipeline)
    pub(crate) fn from_type_erased(channel: Box<dyn std::any::Any + Send>) -> Self {
        Self { channel }
    }

    /// Get a Sender for this port (cheaply cloned from internal storage).
    ///
    /// Returns None if the port doesn't carry items of type `T`.
    pub fn get<T: Send + Clone + 'static>(&self) -> Option<Sender<T>> {
        self.channel.downcast_ref::<Sender<T>>().cloned()
    }
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OutputPort")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_input_port_type_check() {
        let (_tx, rx) = bounded::<ChannelMessage<u32>>(4);
        let port = InputPort::new(rx);

        let mut buf_u32 = VecDeque::<u32>::new();
        assert!(port.get::<u32>(&mut buf_u32).is_some());

        let mut buf_u64 = VecDeque::<u64>::new();
        assert!(port.get::<u64>(&mut buf_u64).is_none());
    }

    #[test]
    fn test_output_port_type_check() {
        let (tx, _rx) = bounded::<ChannelMessage<u32>>(4);
        let port = OutputPort::new(Sender::new(vec![tx]));

        assert!(port.get::<u32>().is_some());
        assert!(port.get::<u64>().is_none());
    }

    #[test]
    fn test_eos_survives_receiver_rebuild() {
        let (tx, rx) = bounded::<ChannelMessage<u32>>(4);
        let port = InputPort::new(rx);
        tx.send(ChannelMessage::EndOfStream).unwrap();

        let mut buf = VecDeque::new();
        {
            let mut r = port.get::<u32>(&mut buf).unwrap();
            assert!(r.recv().is_err());
        }
        {
            let mut r = port.get::<u32>(&mut buf).unwrap();
            assert!(r.recv().is_err());
        }
    }
}
