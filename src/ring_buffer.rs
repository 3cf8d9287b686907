//! Fixed-capacity circular store backing replay and behavior semantics.
//!
//! The buffer is owned by a single control loop, so it performs no internal
//! synchronization: mutation and iteration never overlap.

/// Cursor value that starts a new iteration at the oldest live entry, and
/// that [`RingBuffer::next`] returns once iteration is exhausted.
pub const CURSOR_START: isize = -1;

/// A circular buffer that keeps the last `capacity` values it was given.
///
/// Once `len` reaches `capacity`, every [`add`](RingBuffer::add) evicts the
/// oldest entry.
///
/// ```rust
/// use rxloop::ring_buffer::RingBuffer;
///
/// let mut buffer = RingBuffer::new(4);
/// for v in 1..=6 {
///   buffer.add(v);
/// }
/// assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
  slots: Vec<Option<T>>,
  start: usize,
  end: usize,
  len: usize,
}

impl<T> RingBuffer<T> {
  pub fn new(capacity: usize) -> Self {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || None);
    Self { slots, start: 0, end: 0, len: 0 }
  }

  #[inline]
  pub fn capacity(&self) -> usize { self.slots.len() }

  #[inline]
  pub fn len(&self) -> usize { self.len }

  #[inline]
  pub fn is_empty(&self) -> bool { self.len == 0 }

  /// Appends `value`, evicting the oldest entry when the buffer is full.
  /// A zero-capacity buffer drops every value.
  pub fn add(&mut self, value: T) {
    let capacity = self.capacity();
    if capacity == 0 {
      return;
    }
    if self.len == 0 {
      self.start = 0;
      self.end = 0;
    } else {
      self.end = (self.end + 1) % capacity;
      if self.end == self.start {
        self.start = (self.start + 1) % capacity;
      }
    }
    self.slots[self.end] = Some(value);
    if self.len < capacity {
      self.len += 1;
    }
  }

  /// Stateless cursor step.
  ///
  /// Pass [`CURSOR_START`] to begin at the oldest entry, then feed back the
  /// returned cursor. Returns `(CURSOR_START, None)` once every live entry has
  /// been visited.
  pub fn next(&self, cursor: isize) -> (isize, Option<&T>) {
    let offset = if cursor < 0 { 0 } else { cursor as usize };
    if offset >= self.len {
      return (CURSOR_START, None);
    }
    let index = (self.start + offset) % self.capacity();
    (offset as isize + 1, self.slots[index].as_ref())
  }

  /// Iterates from the oldest to the newest live entry.
  pub fn iter(&self) -> Iter<'_, T> { Iter { buffer: self, cursor: CURSOR_START } }
}

pub struct Iter<'a, T> {
  buffer: &'a RingBuffer<T>,
  cursor: isize,
}

impl<'a, T> Iterator for Iter<'a, T> {
  type Item = &'a T;

  fn next(&mut self) -> Option<Self::Item> {
    let (cursor, value) = self.buffer.next(self.cursor);
    self.cursor = cursor;
    value
  }
}
