//! Fixed-capacity single-producer/single-consumer queue.
//!
//! The producer is an interrupt handler and the consumer is foreground code,
//! so neither side takes a lock: `head` is only written by `push` and `tail`
//! only by `pop`. One slot always stays free so that `head == tail` means
//! empty; a buffer of `N` slots holds at most `N - 1` items.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<T: Copy, const N: usize> {
    slots: UnsafeCell<[T; N]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// `push` and `pop` touch disjoint slots, ordered by the head/tail handoff.
unsafe impl<T: Copy + Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    pub const fn new(fill: T) -> Self {
        assert!(N >= 2);
        Self {
            slots: UnsafeCell::new([fill; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Append `value`. A full buffer keeps its contents and drops `value`.
    pub fn push(&self, value: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        unsafe { (*self.slots.get())[head] = value };
        self.head.store(next, Ordering::Release);
        true
    }

    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let value = unsafe { (*self.slots.get())[tail] };
        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(value)
    }

    /// Discard everything queued so far. Consumer side only.
    pub fn clear(&self) {
        self.tail
            .store(self.head.load(Ordering::Acquire), Ordering::Release);
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let buffer: RingBuffer<char, 8> = RingBuffer::new('\0');
        assert!(buffer.is_empty());
        for c in "abc".chars() {
            assert!(buffer.push(c));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.pop(), Some('a'));
        assert_eq!(buffer.pop(), Some('b'));
        assert_eq!(buffer.pop(), Some('c'));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_full_buffer_drops_newest() {
        let buffer: RingBuffer<u8, 4> = RingBuffer::new(0);
        assert_eq!(buffer.capacity(), 3);
        assert!(buffer.push(1));
        assert!(buffer.push(2));
        assert!(buffer.push(3));
        assert!(buffer.is_full());
        assert!(!buffer.push(4));

        assert_eq!(buffer.pop(), Some(1));
        assert!(buffer.push(5));
        let drained: Vec<u8> = core::iter::from_fn(|| buffer.pop()).collect();
        assert_eq!(drained, vec![2, 3, 5]);
    }

    #[test]
    fn test_retrievable_never_exceeds_capacity() {
        let buffer: RingBuffer<u16, 256> = RingBuffer::new(0);
        for round in 0..5u16 {
            for value in 0..1000u16 {
                buffer.push(value.wrapping_mul(round + 1));
                assert!(buffer.len() <= buffer.capacity());
            }
            let mut popped = 0;
            while buffer.pop().is_some() {
                popped += 1;
            }
            assert_eq!(popped, 255);
        }
    }

    #[test]
    fn test_wraps_around() {
        let buffer: RingBuffer<u32, 3> = RingBuffer::new(0);
        for value in 0..10 {
            assert!(buffer.push(value));
            assert_eq!(buffer.pop(), Some(value));
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let buffer: RingBuffer<char, 16> = RingBuffer::new('\0');
        buffer.push('x');
        buffer.push('y');
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pop(), None);
        buffer.push('z');
        assert_eq!(buffer.pop(), Some('z'));
    }
}
