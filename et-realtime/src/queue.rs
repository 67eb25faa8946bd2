//! Outbound frame buffer.
//!
//! Frames submitted while the transport is not open wait here and are
//! written in submission order once it opens. A frame leaves the queue only
//! when it is handed to the transport, or when a configured limit forces the
//! oldest entry out.

use std::collections::VecDeque;

use tracing::warn;

use crate::frame::Frame;

/// FIFO of frames not yet written to the transport.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<Frame>,
    /// Maximum queued frames (0 = unbounded).
    limit: usize,
    /// Frames discarded because of `limit`.
    dropped: u64,
}

impl OutboundQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            limit,
            dropped: 0,
        }
    }

    /// Append a frame. With a limit set and reached, the oldest frame is dropped.
    pub fn push(&mut self, frame: Frame) {
        if self.limit > 0 {
            while self.frames.len() >= self.limit {
                if let Some(oldest) = self.frames.pop_front() {
                    self.dropped += 1;
                    warn!(
                        "outbound queue full ({} frames), dropping oldest '{}' frame",
                        self.limit, oldest.event_type
                    );
                }
            }
        }
        self.frames.push_back(frame);
    }

    /// Put back a frame whose write failed so it goes out first next time.
    pub fn push_front(&mut self, frame: Frame) {
        self.frames.push_front(frame);
    }

    pub fn pop_front(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames evicted by the limit since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use serde_json::json;

    fn numbered(n: u32) -> Frame {
        Frame::new(EventType::MessageReceived, json!({ "n": n }))
    }

    fn drain(queue: &mut OutboundQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop_front())
            .map(|f| f.data["n"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OutboundQueue::new(0);
        for n in 0..5 {
            queue.push(numbered(n));
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(drain(&mut queue), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_unbounded_never_drops() {
        let mut queue = OutboundQueue::new(0);
        for n in 0..10_000 {
            queue.push(numbered(n));
        }
        assert_eq!(queue.len(), 10_000);
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut queue = OutboundQueue::new(3);
        for n in 0..5 {
            queue.push(numbered(n));
        }
        assert_eq!(queue.dropped(), 2);
        assert_eq!(drain(&mut queue), vec![2, 3, 4]);
    }

    #[test]
    fn test_push_front_requeues_first() {
        let mut queue = OutboundQueue::new(0);
        queue.push(numbered(1));
        queue.push(numbered(2));
        let first = queue.pop_front().unwrap();
        queue.push_front(first);
        assert_eq!(drain(&mut queue), vec![1, 2]);
    }
}
