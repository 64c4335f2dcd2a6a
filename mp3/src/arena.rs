//! Linear scratch memory shared by the sessions and the codec engine.
//!
//! Every buffer handed to the engine is addressed by a [`Ptr`], an offset
//! into one linear memory region. Offsets stay valid for the lifetime of the
//! allocation even when the region grows, so sessions can hold them across
//! calls without pinning anything.

use std::collections::BTreeMap;

/// Offset of an allocation inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ptr(usize);

impl Ptr {
    /// Wraps a raw offset.
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    /// Returns the raw offset.
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// Allocator capability over a linear memory region.
///
/// Sessions only request and release regions through this trait; how the
/// memory is managed is up to the implementation.
pub trait Arena {
    /// Allocates `size` bytes, 16-byte aligned. Returns `None` when the arena
    /// cannot satisfy the request.
    fn malloc(&mut self, size: usize) -> Option<Ptr>;

    /// Releases an allocation returned by [`Arena::malloc`].
    fn free(&mut self, ptr: Ptr);

    /// Returns `len` bytes starting at `ptr`.
    ///
    /// # Panics
    ///
    /// Panics if the range lies outside the arena.
    fn bytes(&self, ptr: Ptr, len: usize) -> &[u8];

    /// Returns `len` writable bytes starting at `ptr`.
    ///
    /// # Panics
    ///
    /// Panics if the range lies outside the arena.
    fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> &mut [u8];
}

impl<A: Arena + ?Sized> Arena for &mut A {
    fn malloc(&mut self, size: usize) -> Option<Ptr> {
        (**self).malloc(size)
    }

    fn free(&mut self, ptr: Ptr) {
        (**self).free(ptr)
    }

    fn bytes(&self, ptr: Ptr, len: usize) -> &[u8] {
        (**self).bytes(ptr, len)
    }

    fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> &mut [u8] {
        (**self).bytes_mut(ptr, len)
    }
}

/// Alignment of every allocation.
pub const ALIGN: usize = 16;

/// Default upper bound of a [`LinearMemory`] (256 MiB).
pub const DEFAULT_LIMIT: usize = 256 * 1024 * 1024;

const WORD: usize = std::mem::size_of::<u64>();

/// Growable linear heap with first-fit reuse of freed blocks.
///
/// Backed by `u64` words so the base address is suitably aligned for the
/// `f32`/`i16` views the codec reads and writes. Offset 0 is never handed
/// out.
#[derive(Debug)]
pub struct LinearMemory {
    words: Vec<u64>,
    top: usize,
    limit: usize,
    live: BTreeMap<usize, usize>,
    free: BTreeMap<usize, usize>,
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMemory {
    /// Creates an empty heap bounded by [`DEFAULT_LIMIT`].
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }

    /// Creates an empty heap that never grows past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            words: Vec::new(),
            top: ALIGN,
            limit,
            live: BTreeMap::new(),
            free: BTreeMap::new(),
        }
    }

    /// Number of allocations not yet freed.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// Total bytes held by live allocations (after alignment padding).
    pub fn allocated_bytes(&self) -> usize {
        self.live.values().sum()
    }

    /// Current size of the backing memory in bytes.
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD
    }

    /// Reports whether `ptr..ptr + len` lies inside a live allocation.
    pub fn contains(&self, ptr: Ptr, len: usize) -> bool {
        match self.live.range(..=ptr.0).next_back() {
            Some((&start, &size)) => ptr
                .0
                .checked_add(len)
                .is_some_and(|end| end <= start + size),
            None => false,
        }
    }

    /// Base address of the backing memory.
    ///
    /// Only valid until the next allocation, which may grow the heap.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast::<u8>()
    }

    fn heap(&self) -> &[u8] {
        // SAFETY: u64 has no padding and u8 has alignment 1, so the word
        // storage is a valid byte slice of len * 8 bytes.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.capacity()) }
    }

    fn heap_mut(&mut self) -> &mut [u8] {
        let len = self.capacity();
        // SAFETY: see `heap`; the mutable borrow of `self` is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), len) }
    }

    fn grow_to(&mut self, end: usize) {
        let needed = end.div_ceil(WORD);
        if needed > self.words.len() {
            let target = needed.max(self.words.len() * 2).min(self.limit.div_ceil(WORD));
            self.words.resize(target, 0);
        }
    }

    fn take_free_block(&mut self, size: usize) -> Option<usize> {
        let (offset, len) = self
            .free
            .iter()
            .find(|&(_, &len)| len >= size)
            .map(|(&offset, &len)| (offset, len))?;
        self.free.remove(&offset);
        if len > size {
            self.free.insert(offset + size, len - size);
        }
        Some(offset)
    }
}

impl Arena for LinearMemory {
    fn malloc(&mut self, size: usize) -> Option<Ptr> {
        let size = size.max(1).checked_next_multiple_of(ALIGN)?;

        let offset = match self.take_free_block(size) {
            Some(offset) => offset,
            None => {
                let offset = self.top;
                let end = offset.checked_add(size)?;
                if end > self.limit {
                    tracing::warn!("mp3: arena exhausted: requested {} bytes, limit {}", size, self.limit);
                    return None;
                }
                self.grow_to(end);
                self.top = end;
                offset
            }
        };

        self.live.insert(offset, size);
        Some(Ptr(offset))
    }

    fn free(&mut self, ptr: Ptr) {
        let Some(size) = self.live.remove(&ptr.0) else {
            tracing::warn!("mp3: arena: free of unknown pointer {:#x}", ptr.0);
            return;
        };

        // Coalesce with the neighbouring free blocks.
        let mut start = ptr.0;
        let mut len = size;
        if let Some((&prev, &prev_len)) = self.free.range(..start).next_back() {
            if prev + prev_len == start {
                self.free.remove(&prev);
                start = prev;
                len += prev_len;
            }
        }
        if let Some(next_len) = self.free.remove(&(start + len)) {
            len += next_len;
        }

        if start + len == self.top {
            self.top = start;
        } else {
            self.free.insert(start, len);
        }
    }

    fn bytes(&self, ptr: Ptr, len: usize) -> &[u8] {
        &self.heap()[ptr.0..ptr.0 + len]
    }

    fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> &mut [u8] {
        &mut self.heap_mut()[ptr.0..ptr.0 + len]
    }
}
