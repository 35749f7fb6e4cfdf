//! Growable byte buffer for frame assembly
//!
//! Append at the tail, consume from the head. Consuming only moves a read
//! offset (O(1)); the dead prefix is compacted away once it outgrows the
//! live data, so steady-state traffic does not shift bytes on every frame.

/// Initial capacity: one read chunk plus a pose frame
const INITIAL_CAPACITY: usize = 8 * 1024;

/// Dead prefix must exceed this before compaction is considered
const COMPACT_THRESHOLD: usize = 4 * 1024;

/// Per-connection byte buffer
///
/// Bytes are never reordered; [`StreamBuffer::advance`] only ever drops a
/// strict prefix.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    data: Vec<u8>,
    head: usize, // Read position (first live byte)
}

impl StreamBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(INITIAL_CAPACITY),
            head: 0,
        }
    }

    /// Append bytes at the tail
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compact();
        self.data.extend_from_slice(bytes);
    }

    /// Drop `n` bytes from the head
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len());
        self.head += n;
        if self.head == self.data.len() {
            self.data.clear();
            self.head = 0;
        }
    }

    /// Number of live bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte at logical index
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_slice().get(index).copied()
    }

    /// Live bytes as one contiguous slice
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..]
    }

    /// Offset of the first occurrence of `byte`
    pub fn find(&self, byte: u8) -> Option<usize> {
        self.as_slice().iter().position(|&b| b == byte)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    fn compact(&mut self) {
        if self.head > COMPACT_THRESHOLD && self.head >= self.len() {
            self.data.drain(..self.head);
            self.head = 0;
        }
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
