//! Fixed-capacity ring that overwrites its oldest entry when full.
//!
//! # Invariants
//! - Storage has `capacity + 1` slots so `read == write` always means empty.
//! - `read` never passes `write`; a push onto a full ring advances `read` by
//!   one and increments the loss counter.
//! - Logical index `i` (0 = oldest) lives at `(read + i) % slots`.
//!
//! # Threading
//! This type is not synchronized. The listener wraps it in a mutex; the
//! partitioner owns its rings outright.

/// Fixed-capacity FIFO ring with overwrite-on-full semantics.
///
/// Used for the listener's capture buffer (slots of `Event`), the
/// partitioner's window store, and the three-deep VSync pair window.
#[derive(Debug, Clone)]
pub struct OverwriteRing<T> {
    slots: Box<[T]>,
    write: usize,
    read: usize,
    lost: u64,
}

impl<T: Copy + Default> OverwriteRing<T> {
    /// Create a ring holding up to `capacity` unread entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "OverwriteRing capacity must be > 0");
        Self {
            slots: vec![T::default(); capacity + 1].into_boxed_slice(),
            write: 0,
            read: 0,
            lost: 0,
        }
    }

    /// Maximum number of unread entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        (self.write + self.slots.len() - self.read) % self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.next(self.write) == self.read
    }

    #[inline]
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    /// Append `value`, sacrificing the oldest unread entry if the ring is full.
    ///
    /// Returns `true` when an entry was overwritten.
    #[inline]
    pub fn push(&mut self, value: T) -> bool {
        self.slots[self.write] = value;
        let next = self.next(self.write);
        let overwrote = next == self.read;
        if overwrote {
            self.read = self.next(self.read);
            self.lost += 1;
        }
        self.write = next;
        overwrote
    }

    /// Remove and return the oldest entry.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.read];
        self.read = self.next(self.read);
        Some(value)
    }

    /// Move up to `out.len()` of the oldest entries into `out`, in FIFO order.
    ///
    /// Returns the number of entries written.
    pub fn drain_into(&mut self, out: &mut [T]) -> usize {
        let mut count = 0;
        while count < out.len() && !self.is_empty() {
            out[count] = self.slots[self.read];
            self.read = self.next(self.read);
            count += 1;
        }
        count
    }

    /// Entry at logical index `i` (0 = oldest).
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len() {
            return None;
        }
        Some(&self.slots[(self.read + i) % self.slots.len()])
    }

    /// Most recently pushed entry.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate unread entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).map(move |i| &self.slots[(self.read + i) % self.slots.len()])
    }

    /// Number of entries overwritten since the last `take_lost`.
    #[inline]
    #[must_use]
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Return and reset the loss counter.
    #[inline]
    pub fn take_lost(&mut self) -> u64 {
        std::mem::take(&mut self.lost)
    }

    /// Drop all unread entries. The loss counter is untouched.
    pub fn clear(&mut self) {
        self.read = self.write;
    }
}
