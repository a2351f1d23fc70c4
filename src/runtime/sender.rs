//! Broadcast sender with explicit end-of-stream framing

use crossbeam_channel::{SendError, Sender as CrossbeamSender};

/// Channel message wrapper for end-of-stream signaling
///
/// Wraps data flowing through channels so sources can explicitly signal
/// when no more data will be sent. Dropping a sender handle is not enough:
/// a broadcast output holds one handle per destination and clones may
/// outlive the producing node.
///
/// Nodes never see this enum directly: `Sender::send()` wraps values in
/// `Item(T)` and `Receiver::recv()` unwraps them transparently.
#[derive(Clone, Debug)]
pub enum ChannelMessage<T> {
    /// A data item
    Item(T),
    /// End-of-stream marker, no more data will be sent
    EndOfStream,
}

/// Broadcast sender that sends to one or more consumers
///
/// Direct broadcast from the caller thread to all destinations. An
/// unconnected output (zero destinations) accepts and discards everything,
/// so nodes can always send without checking wiring.
pub struct Sender<T> {
    destinations: Vec<CrossbeamSender<ChannelMessage<T>>>,
}

impl<T: Clone> Sender<T> {
    /// Create a new Sender from a vector of crossbeam senders
    pub fn new(destinations: Vec<CrossbeamSender<ChannelMessage<T>>>) -> Self {
        Self { destinations }
    }

    /// Get the number of broadcast destinations
    pub fn num_destinations(&self) -> usize {
        self.destinations.len()
    }

    /// Send a value to all destinations
    ///
    /// Wraps the value in `ChannelMessage::Item` and sends to all
    /// destinations sequentially. Fails only if no destination accepted
    /// the value.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        if self.destinations.is_empty() {
            return Ok(());
        }

        let mut any_success = false;
        let mut last_error = None;

        for dest in &self.destinations {
            match dest.send(ChannelMessage::Item(value.clone())) {
                Ok(()) => any_success = true,
                Err(SendError(msg)) => {
                    if let ChannelMessage::Item(v) = msg {
                        last_error = Some(SendError(v));
                    }
                }
            }
        }

        if !any_success && let Some(e) = last_error {
            return Err(e);
        }

        Ok(())
    }

    /// Signal end-of-stream to all destinations
    ///
    /// Sends `ChannelMessage::EndOfStream` to each destination, signaling
    /// that no more data will follow. Downstream `Receiver`s will return
    /// `WorkError::Shutdown` on subsequent `recv()`/`peek()` calls.
    pub fn close(&self) {
        for dest in &self.destinations {
            let _ = dest.send(ChannelMessage::EndOfStream);
        }
    }

    /// Check if this sender has any connected receivers
    pub fn is_connected(&self) -> bool {
        !self.destinations.is_empty()
    }
}

impl<T: Clone> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            destinations: self.destinations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_broadcast_to_all_destinations() {
        let (tx1, rx1) = bounded::<ChannelMessage<u8>>(4);
        let (tx2, rx2) = bounded::<ChannelMessage<u8>>(4);
        let sender = Sender::new(vec![tx1, tx2]);

        sender.send(42).unwrap();

        assert!(matches!(rx1.recv().unwrap(), ChannelMessage::Item(42)));
        assert!(matches!(rx2.recv().unwrap(), ChannelMessage::Item(42)));
    }

    #[test]
    fn test_unconnected_send_is_noop() {
        let sender = Sender::<u8>::new(vec![]);
        assert!(!sender.is_connected());
        assert!(sender.send(1).is_ok());
    }

    #[test]
    fn test_close_sends_end_of_stream() {
        let (tx, rx) = bounded::<ChannelMessage<u8>>(4);
        let sender = Sender::new(vec![tx]);

        sender.send(1).unwrap();
        sender.close();

        assert!(matches!(rx.recv().unwrap(), ChannelMessage::Item(1)));
        assert!(matches!(rx.recv().unwrap(), ChannelMessage::EndOfStream));
    }
}
