use std::collections::VecDeque;

use bytes::Bytes;

use crate::traits::BinaryReply;

/// A message waiting for its channel's handler to be registered.
pub(crate) type Pending = (Bytes, BinaryReply);

/// Per-channel queue for messages that arrive before a handler exists.
///
/// Capacity zero means "do not buffer": the message is answered with an
/// empty reply straight away.
#[derive(Debug)]
pub(crate) struct ChannelBuffer {
    capacity: usize,
    allow_overflow: bool,
    pending: VecDeque<Pending>,
}

impl ChannelBuffer {
    pub(crate) fn new(capacity: usize, allow_overflow: bool) -> Self {
        Self {
            capacity,
            allow_overflow,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a message. Returns whatever had to be rejected: the oldest
    /// entry when overflow is allowed, otherwise the new one.
    pub(crate) fn push(&mut self, message: Bytes, reply: BinaryReply) -> Option<Pending> {
        if self.capacity == 0 {
            return Some((message, reply));
        }
        if self.pending.len() < self.capacity {
            self.pending.push_back((message, reply));
            return None;
        }
        if self.allow_overflow {
            let dropped = self.pending.pop_front();
            self.pending.push_back((message, reply));
            dropped
        } else {
            Some((message, reply))
        }
    }

    /// Change capacity; returns the oldest entries that no longer fit.
    pub(crate) fn resize(&mut self, capacity: usize) -> Vec<Pending> {
        self.capacity = capacity;
        let excess = self.pending.len().saturating_sub(capacity);
        self.pending.drain(..excess).collect()
    }

    pub(crate) fn set_allow_overflow(&mut self, allowed: bool) {
        self.allow_overflow = allowed;
    }

    /// Take every queued message, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<Pending> {
        self.pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(tag: &'static [u8]) -> (Bytes, BinaryReply) {
        (Bytes::from_static(tag), BinaryReply::detached("test"))
    }

    #[test]
    fn zero_capacity_rejects_immediately() {
        let mut buffer = ChannelBuffer::new(0, true);
        let (m, r) = msg(b"a");
        let rejected = buffer.push(m, r).expect("message should bounce");
        assert_eq!(rejected.0.as_ref(), b"a");
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buffer = ChannelBuffer::new(2, true);
        for tag in [&b"a"[..], b"b"] {
            let (m, r) = (Bytes::from_static(tag), BinaryReply::detached("test"));
            assert!(buffer.push(m, r).is_none());
        }
        let (m, r) = msg(b"c");
        let dropped = buffer.push(m, r).expect("oldest should be dropped");
        assert_eq!(dropped.0.as_ref(), b"a");
        let remaining: Vec<Bytes> = buffer.drain().into_iter().map(|(m, _)| m).collect();
        assert_eq!(remaining, vec![Bytes::from_static(b"b"), Bytes::from_static(b"c")]);
    }

    #[test]
    fn overflow_disallowed_rejects_newest() {
        let mut buffer = ChannelBuffer::new(1, false);
        let (m, r) = msg(b"a");
        assert!(buffer.push(m, r).is_none());
        let (m, r) = msg(b"b");
        let rejected = buffer.push(m, r).expect("new message should bounce");
        assert_eq!(rejected.0.as_ref(), b"b");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn shrinking_returns_oldest_excess() {
        let mut buffer = ChannelBuffer::new(3, true);
        for tag in [&b"a"[..], b"b", b"c"] {
            buffer.push(Bytes::from_static(tag), BinaryReply::detached("test"));
        }
        let evicted: Vec<Bytes> = buffer.resize(1).into_iter().map(|(m, _)| m).collect();
        assert_eq!(evicted, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.len(), 1);
    }
}
