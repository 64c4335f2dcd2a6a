//! Fixed-capacity scratch regions carved from an [`Arena`].
//!
//! A [`Scratch<T>`] is a typed view (bytes, `f32` or `i16`) over one arena
//! allocation. Its capacity is fixed when it is allocated; storing or loading
//! past it is a bug in the caller's windowing and panics.

use std::marker::PhantomData;

use crate::arena::{Arena, Ptr};
use crate::error::{Error, Result};

/// Element type of a scratch region, stored in native byte order.
pub trait Sample: Copy + 'static {
    /// Size of one element in bytes.
    const SIZE: usize;

    /// Decodes one element from exactly `SIZE` bytes.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Encodes one element into exactly `SIZE` bytes.
    fn write_ne(self, out: &mut [u8]);
}

macro_rules! impl_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn read_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn write_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_sample!(u8, i16, f32);

/// Typed, fixed-capacity view over one arena allocation.
#[derive(Debug)]
pub struct Scratch<T: Sample> {
    ptr: Ptr,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Sample> Scratch<T> {
    /// Allocates a region holding `len` elements.
    pub fn alloc<A: Arena + ?Sized>(arena: &mut A, len: usize) -> Result<Self> {
        let requested = len * T::SIZE;
        let ptr = arena
            .malloc(requested)
            .ok_or(Error::OutOfMemory { requested })?;
        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    /// Arena offset of the first element.
    pub fn ptr(&self) -> Ptr {
        self.ptr
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Capacity in bytes.
    pub fn byte_capacity(&self) -> usize {
        self.len * T::SIZE
    }

    /// Copies `samples` to the start of the region.
    ///
    /// # Panics
    ///
    /// Panics if `samples` does not fit.
    pub fn store<A: Arena + ?Sized>(&self, arena: &mut A, samples: &[T]) {
        assert!(
            samples.len() <= self.len,
            "scratch: capacity violation: storing {} elements into {}",
            samples.len(),
            self.len
        );
        self.store_iter(arena, samples.iter().copied());
    }

    /// Writes the elements of `iter` to the start of the region and returns
    /// how many were written.
    ///
    /// # Panics
    ///
    /// Panics if the iterator yields more elements than the region holds.
    pub fn store_iter<A, I>(&self, arena: &mut A, iter: I) -> usize
    where
        A: Arena + ?Sized,
        I: IntoIterator<Item = T>,
    {
        let dst = arena.bytes_mut(self.ptr, self.byte_capacity());
        let mut written = 0;
        for sample in iter {
            assert!(
                written < self.len,
                "scratch: capacity violation: region holds {} elements",
                self.len
            );
            sample.write_ne(&mut dst[written * T::SIZE..(written + 1) * T::SIZE]);
            written += 1;
        }
        written
    }

    /// Copies the first `count` elements out of the region.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the capacity.
    pub fn load<A: Arena + ?Sized>(&self, arena: &A, count: usize) -> Vec<T> {
        assert!(
            count <= self.len,
            "scratch: capacity violation: loading {} elements from {}",
            count,
            self.len
        );
        arena
            .bytes(self.ptr, count * T::SIZE)
            .chunks_exact(T::SIZE)
            .map(T::read_ne)
            .collect()
    }

    /// Returns the region to the arena. Must be called exactly once.
    pub fn release<A: Arena + ?Sized>(&self, arena: &mut A) {
        arena.free(self.ptr);
    }
}

/// The three regions every session owns: one compressed-stream buffer and one
/// PCM buffer per channel.
#[derive(Debug)]
pub struct SessionScratch<P: Sample> {
    pub stream: Scratch<u8>,
    pub left: Scratch<P>,
    pub right: Scratch<P>,
}

impl<P: Sample> SessionScratch<P> {
    /// Allocates all three regions. On failure the regions already allocated
    /// are released before the error is returned.
    pub fn alloc<A: Arena + ?Sized>(arena: &mut A, stream_len: usize, pcm_len: usize) -> Result<Self> {
        let stream = Scratch::<u8>::alloc(arena, stream_len)?;
        let left = match Scratch::<P>::alloc(arena, pcm_len) {
            Ok(left) => left,
            Err(e) => {
                stream.release(arena);
                return Err(e);
            }
        };
        let right = match Scratch::<P>::alloc(arena, pcm_len) {
            Ok(right) => right,
            Err(e) => {
                left.release(arena);
                stream.release(arena);
                return Err(e);
            }
        };

        Ok(Self { stream, left, right })
    }

    /// Releases all three regions. Must be called exactly once.
    pub fn release<A: Arena + ?Sized>(&self, arena: &mut A) {
        self.stream.release(arena);
        self.left.release(arena);
        self.right.release(arena);
    }
}
