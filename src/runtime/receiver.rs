//! Channel receiver with a putback buffer and cached end-of-stream state
//!
//! [`Receiver`] wraps a single `crossbeam_channel::Receiver<ChannelMessage<T>>`
//! with a putback buffer, providing `recv`, `peek` and `put_back`.
//! It transparently unwraps `ChannelMessage` and caches end-of-stream state
//! so subsequent calls return `Shutdown` immediately.

use crossbeam_channel::Receiver as CrossbeamReceiver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use super::errors::{WorkError, WorkResult};
use super::sender::ChannelMessage;

/// A single crossbeam receiver with a putback buffer.
///
/// The buffer and the end-of-stream flag are externally owned (the buffer by
/// the consuming node, the flag by the [`InputPort`](super::InputPort)) so
/// both persist across `work()` calls while the `Receiver` itself is rebuilt
/// transiently each call.
pub struct Receiver<'a, T> {
    receiver: &'a CrossbeamReceiver<ChannelMessage<T>>,
    buffer: &'a mut VecDeque<T>,
    eos: &'a AtomicBool,
}

impl<'a, T> Receiver<'a, T> {
    /// Create a new receiver over an external buffer and end-of-stream flag.
    pub fn new(
        receiver: &'a CrossbeamReceiver<ChannelMessage<T>>,
        buffer: &'a mut VecDeque<T>,
        eos: &'a AtomicBool,
    ) -> Self {
        Self {
            receiver,
            buffer,
            eos,
        }
    }

    /// Blocking receive. Returns from the putback buffer first, then falls
    /// through to the underlying channel.
    ///
    /// Returns `Err(WorkError::Shutdown)` if end-of-stream has been received
    /// (either now or in a previous call) or the channel disconnected.
    pub fn recv(&mut self) -> WorkResult<T> {
        if self.eos.load(Ordering::Relaxed) {
            return Err(WorkError::Shutdown);
        }

        if let Some(item) = self.buffer.pop_front() {
            return Ok(item);
        }

        match self.receiver.recv() {
            Ok(ChannelMessage::Item(item)) => Ok(item),
            Ok(ChannelMessage::EndOfStream) => {
                self.eos.store(true, Ordering::Relaxed);
                tracing::debug!("Receiver::recv() - EndOfStream received");
                Err(WorkError::Shutdown)
            }
            Err(_) => {
                tracing::debug!("Receiver::recv() - channel disconnected, returning Shutdown");
                Err(WorkError::Shutdown)
            }
        }
    }

    /// Peek at the front item. If the buffer is empty, blocks on the channel
    /// to populate it.
    ///
    /// Returns `Err(WorkError::Shutdown)` if end-of-stream has been received.
    pub fn peek(&mut self) -> WorkResult<&T> {
        if self.eos.load(Ordering::Relaxed) {
            return Err(WorkError::Shutdown);
        }

        if self.buffer.is_empty() {
            match self.receiver.recv() {
                Ok(ChannelMessage::Item(item)) => {
                    self.buffer.push_back(item);
                }
                Ok(ChannelMessage::EndOfStream) => {
                    self.eos.store(true, Ordering::Relaxed);
                    tracing::debug!("Receiver::peek() - EndOfStream received");
                    return Err(WorkError::Shutdown);
                }
                Err(_) => {
                    tracing::debug!("Receiver::peek() - channel disconnected, returning Shutdown");
                    return Err(WorkError::Shutdown);
                }
            }
        }
        Ok(self.buffer.front().unwrap())
    }

    /// Push an item back to the front of the buffer so the next `recv()`
    /// returns it.
    pub fn put_back(&mut self, item: T) {
        self.buffer.push_front(item);
    }

    /// Check if there are any buffered items.
    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_recv_from_buffer_then_channel() {
        let (tx, rx) = bounded::<ChannelMessage<i32>>(10);
        let mut buf = VecDeque::new();
        buf.push_back(42);

        let eos = AtomicBool::new(false);
        let mut pr = Receiver::new(&rx, &mut buf, &eos);

        // First recv comes from buffer
        assert_eq!(pr.recv().unwrap(), 42);

        // Second recv comes from channel
        tx.send(ChannelMessage::Item(99)).unwrap();
        assert_eq!(pr.recv().unwrap(), 99);

        drop(tx);
    }

    #[test]
    fn test_put_back_and_peek() {
        let (tx, rx) = bounded::<ChannelMessage<i32>>(10);
        let mut buf = VecDeque::new();

        let eos = AtomicBool::new(false);
        let mut pr = Receiver::new(&rx, &mut buf, &eos);

        assert!(!pr.has_buffered());

        pr.put_back(77);
        assert_eq!(pr.peek().unwrap(), &77);
        assert!(pr.has_buffered());

        assert_eq!(pr.recv().unwrap(), 77);
        assert!(!pr.has_buffered());

        drop(tx);
    }

    #[test]
    fn test_eos_returns_shutdown() {
        let (tx, rx) = bounded::<ChannelMessage<i32>>(10);
        let mut buf = VecDeque::new();

        let eos = AtomicBool::new(false);
        let mut pr = Receiver::new(&rx, &mut buf, &eos);

        // Send a value then EOS
        tx.send(ChannelMessage::Item(42)).unwrap();
        tx.send(ChannelMessage::EndOfStream).unwrap();

        assert_eq!(pr.recv().unwrap(), 42);

        // Second recv gets Shutdown from EOS
        assert!(matches!(pr.recv(), Err(WorkError::Shutdown)));

        // Subsequent recv also returns Shutdown (cached)
        assert!(matches!(pr.recv(), Err(WorkError::Shutdown)));

        // peek also returns Shutdown
        assert!(matches!(pr.peek(), Err(WorkError::Shutdown)));

        drop(tx);
    }

    #[test]
    fn test_eos_persists_across_receivers() {
        let (tx, rx) = bounded::<ChannelMessage<i32>>(10);
        let mut buf = VecDeque::new();
        let eos = AtomicBool::new(false);

        tx.send(ChannelMessage::EndOfStream).unwrap();

        // First Receiver sees EOS
        {
            let mut pr = Receiver::new(&rx, &mut buf, &eos);
            assert!(matches!(pr.recv(), Err(WorkError::Shutdown)));
        }

        // Second Receiver (simulating the next work() call) also sees EOS
        // immediately, without touching the channel
        {
            let mut pr = Receiver::new(&rx, &mut buf, &eos);
            assert!(matches!(pr.recv(), Err(WorkError::Shutdown)));
        }

        drop(tx);
    }

    #[test]
    fn test_disconnect_returns_shutdown() {
        let (tx, rx) = bounded::<ChannelMessage<i32>>(10);
        let mut buf = VecDeque::new();
        let eos = AtomicBool::new(false);

        drop(tx);
        let mut pr = Receiver::new(&rx, &mut buf, &eos);
        assert!(matches!(pr.recv(), Err(WorkError::Shutdown)));
    }
}
