//! Sample acquirer
//!
//! [`SampleStream`] is the decoder-facing view of the sample input: it remaps
//! capture probes into the decoder's fixed pin space and answers "next
//! sample" or "next sample where one of these edges occurs". Edge detection
//! needs a predecessor, so the previous remapped sample lives outside the
//! stream (owned by the node) and survives across work() calls.

use crate::runtime::WorkResult;
use crate::runtime::receiver::Receiver;
use crate::runtime::sample::{PinLevel, SampleVector};

/// Edge polarity for a wait predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// One edge predicate: watch decoder pin `pin` for `edge`
#[derive(Debug, Clone, Copy)]
pub struct EdgeSpec {
    pub pin: usize,
    pub edge: Edge,
}

impl EdgeSpec {
    pub fn rising(pin: usize) -> Self {
        Self {
            pin,
            edge: Edge::Rising,
        }
    }

    pub fn falling(pin: usize) -> Self {
        Self {
            pin,
            edge: Edge::Falling,
        }
    }
}

/// Which of the supplied edge predicates matched on the returned sample,
/// parallel to the predicate slice
#[derive(Debug, Clone, Copy)]
pub struct EdgeMatches(u32);

impl EdgeMatches {
    pub fn matched(&self, predicate: usize) -> bool {
        self.0 & (1 << predicate) != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }
}

/// Maps decoder pin indices to capture probe indices
///
/// A `None` entry marks a decoder pin with no probe behind it; it reads as
/// [`PinLevel::Unassigned`] in every remapped sample.
#[derive(Debug, Clone)]
pub struct PinMap(Vec<Option<usize>>);

impl PinMap {
    pub fn new(mapping: Vec<Option<usize>>) -> Self {
        Self(mapping)
    }

    /// Identity mapping for `n` pins (probe i drives pin i)
    pub fn identity(n: usize) -> Self {
        Self((0..n).map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Translate a capture-space sample into decoder pin space
    pub fn remap(&self, capture: &SampleVector) -> SampleVector {
        let mut levels: u32 = 0;
        let mut wired: u32 = 0;
        for (pin, probe) in self.0.iter().enumerate() {
            if let Some(probe) = probe {
                match capture.pin(*probe) {
                    PinLevel::High => {
                        levels |= 1 << pin;
                        wired |= 1 << pin;
                    }
                    PinLevel::Low => {
                        wired |= 1 << pin;
                    }
                    PinLevel::Unassigned => {}
                }
            }
        }
        SampleVector::new(capture.index, levels, wired)
    }
}

/// Decoder-side sample input: remapped, edge-aware, pull-based
pub struct SampleStream<'a> {
    rx: Receiver<'a, SampleVector>,
    map: &'a PinMap,
    last: &'a mut Option<SampleVector>,
}

impl<'a> SampleStream<'a> {
    pub fn new(
        rx: Receiver<'a, SampleVector>,
        map: &'a PinMap,
        last: &'a mut Option<SampleVector>,
    ) -> Self {
        Self { rx, map, last }
    }

    /// Next remapped sample. `WorkError::Shutdown` at end-of-stream.
    pub fn wait(&mut self) -> WorkResult<SampleVector> {
        let sample = self.map.remap(&self.rx.recv()?);
        *self.last = Some(sample);
        Ok(sample)
    }

    /// Block until a sample where at least one edge predicate matches against
    /// the previous sample. Several predicates may match at once. The first
    /// sample of a run never matches (no predecessor).
    pub fn wait_any(&mut self, specs: &[EdgeSpec]) -> WorkResult<(SampleVector, EdgeMatches)> {
        loop {
            let prev = *self.last;
            let sample = self.wait()?;

            let Some(prev) = prev else {
                continue;
            };

            let mut mask: u32 = 0;
            for (i, spec) in specs.iter().enumerate() {
                let matched = match spec.edge {
                    Edge::Rising => {
                        prev.pin(spec.pin) == PinLevel::Low
                            && sample.pin(spec.pin) == PinLevel::High
                    }
                    Edge::Falling => {
                        prev.pin(spec.pin) == PinLevel::High
                            && sample.pin(spec.pin) == PinLevel::Low
                    }
                };
                if matched {
                    mask |= 1 << i;
                }
            }

            if mask != 0 {
                return Ok((sample, EdgeMatches(mask)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::WorkError;
    use crate::runtime::sender::ChannelMessage;
    use crossbeam_channel::{Sender as CrossbeamSender, unbounded};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;

    fn feed(tx: &CrossbeamSender<ChannelMessage<SampleVector>>, samples: &[(u64, u32, u32)]) {
        for (index, levels, wired) in samples {
            tx.send(ChannelMessage::Item(SampleVector::new(*index, *levels, *wired)))
                .unwrap();
        }
        tx.send(ChannelMessage::EndOfStream).unwrap();
    }

    #[test]
    fn test_remap_identity() {
        let map = PinMap::identity(4);
        let sv = map.remap(&SampleVector::new(3, 0b1010, 0b1111));
        assert_eq!(sv.index, 3);
        assert_eq!(sv.levels, 0b1010);
        assert_eq!(sv.wired, 0b1111);
    }

    #[test]
    fn test_remap_reorders_and_unassigns() {
        // Decoder pin 0 <- probe 2, pin 1 unmapped, pin 2 <- probe 0
        let map = PinMap::new(vec![Some(2), None, Some(0)]);
        let sv = map.remap(&SampleVector::new(0, 0b100, 0b111));
        assert_eq!(sv.pin(0), PinLevel::High);
        assert_eq!(sv.pin(1), PinLevel::Unassigned);
        assert_eq!(sv.pin(2), PinLevel::Low);
    }

    #[test]
    fn test_wait_returns_samples_then_shutdown() {
        let (tx, rx) = unbounded();
        feed(&tx, &[(0, 1, 1), (1, 0, 1)]);

        let map = PinMap::identity(1);
        let mut buffer = VecDeque::new();
        let eos = AtomicBool::new(false);
        let mut last = None;
        let receiver = Receiver::new(&rx, &mut buffer, &eos);
        let mut stream = SampleStream::new(receiver, &map, &mut last);

        assert_eq!(stream.wait().unwrap().index, 0);
        assert_eq!(stream.wait().unwrap().index, 1);
        assert!(matches!(stream.wait(), Err(WorkError::Shutdown)));
    }

    #[test]
    fn test_wait_any_rising_and_falling() {
        let (tx, rx) = unbounded();
        // pin 0: 0,0,1,1,0 - rising at index 2, falling at index 4
        feed(
            &tx,
            &[(0, 0, 1), (1, 0, 1), (2, 1, 1), (3, 1, 1), (4, 0, 1)],
        );

        let map = PinMap::identity(1);
        let mut buffer = VecDeque::new();
        let eos = AtomicBool::new(false);
        let mut last = None;
        let receiver = Receiver::new(&rx, &mut buffer, &eos);
        let mut stream = SampleStream::new(receiver, &map, &mut last);

        let specs = [EdgeSpec::rising(0), EdgeSpec::falling(0)];

        let (sample, matches) = stream.wait_any(&specs).unwrap();
        assert_eq!(sample.index, 2);
        assert!(matches.matched(0));
        assert!(!matches.matched(1));

        let (sample, matches) = stream.wait_any(&specs).unwrap();
        assert_eq!(sample.index, 4);
        assert!(!matches.matched(0));
        assert!(matches.matched(1));
    }

    #[test]
    fn test_wait_any_both_match_same_sample() {
        let (tx, rx) = unbounded();
        // pin 0 falls and pin 1 rises together at index 1
        feed(&tx, &[(0, 0b01, 0b11), (1, 0b10, 0b11)]);

        let map = PinMap::identity(2);
        let mut buffer = VecDeque::new();
        let eos = AtomicBool::new(false);
        let mut last = None;
        let receiver = Receiver::new(&rx, &mut buffer, &eos);
        let mut stream = SampleStream::new(receiver, &map, &mut last);

        let specs = [EdgeSpec::falling(0), EdgeSpec::rising(1)];
        let (sample, matches) = stream.wait_any(&specs).unwrap();
        assert_eq!(sample.index, 1);
        assert!(matches.matched(0));
        assert!(matches.matched(1));
    }

    #[test]
    fn test_wait_any_unassigned_pin_never_edges() {
        let (tx, rx) = unbounded();
        feed(&tx, &[(0, 0, 1), (1, 1, 1), (2, 0, 1)]);

        // Watch an unmapped pin - no edges can come from it
        let map = PinMap::new(vec![None]);
        let mut buffer = VecDeque::new();
        let eos = AtomicBool::new(false);
        let mut last = None;
        let receiver = Receiver::new(&rx, &mut buffer, &eos);
        let mut stream = SampleStream::new(receiver, &map, &mut last);

        let specs = [EdgeSpec::rising(0)];
        assert!(matches!(stream.wait_any(&specs), Err(WorkError::Shutdown)));
    }

    #[test]
    fn test_last_sample_persists_across_streams() {
        let (tx, rx) = unbounded();
        // Rising edge only visible if the predecessor from the previous
        // stream instance is remembered
        feed(&tx, &[(0, 0, 1), (1, 1, 1)]);

        let map = PinMap::identity(1);
        let mut buffer = VecDeque::new();
        let eos = AtomicBool::new(false);
        let mut last = None;

        {
            let receiver = Receiver::new(&rx, &mut buffer, &eos);
            let mut stream = SampleStream::new(receiver, &map, &mut last);
            stream.wait().unwrap();
        }
        {
            let receiver = Receiver::new(&rx, &mut buffer, &eos);
            let mut stream = SampleStream::new(receiver, &map, &mut last);
            let (sample, matches) = stream.wait_any(&[EdgeSpec::rising(0)]).unwrap();
            assert_eq!(sample.index, 1);
            assert!(matches.matched(0));
        }
    }
}
