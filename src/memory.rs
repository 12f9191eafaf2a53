//! Memory management through an injected allocator.
//!
//! Every buffer owned by an instance (value arrays, the variable directory and solver workspaces)
//! is obtained from the [`Allocator`] handed over in [`crate::instance::CallbackFunctions`] and
//! released through the same allocator when the owning [`Buffer`] is dropped.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    ops::{Deref, DerefMut},
    ptr::NonNull,
    sync::Arc,
};

use crate::Error;

/// Alignment of every [`Buffer`] in bytes.
pub const ALIGNMENT: usize = 64;

/// Host supplied memory management functions.
pub trait Allocator: Send + Sync {
    /// Allocate zero-initialized memory for `count` objects of `size` bytes each.
    ///
    /// Returns `None` when the request cannot be satisfied.
    fn allocate(&self, count: usize, size: usize) -> Option<NonNull<u8>>;

    /// Release memory obtained from [`Allocator::allocate`].
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator and not been freed yet.
    unsafe fn free(&self, ptr: NonNull<u8>);
}

pub type SharedAllocator = Arc<dyn Allocator>;

/// Allocator backed by `calloc`/`free` of the C runtime.
#[cfg(feature = "libc")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcAllocator;

#[cfg(feature = "libc")]
impl Allocator for LibcAllocator {
    fn allocate(&self, count: usize, size: usize) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { libc::calloc(count, size) } as *mut u8)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        libc::free(ptr.as_ptr() as *mut libc::c_void)
    }
}

/// Allocator backed by the Rust [`System`] allocator.
///
/// The size of each block is kept in a header in front of the returned pointer, since `free` only
/// receives the pointer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

const HEADER: usize = 16;

impl Allocator for HeapAllocator {
    fn allocate(&self, count: usize, size: usize) -> Option<NonNull<u8>> {
        let bytes = count.checked_mul(size)?.checked_add(HEADER)?;
        let layout = Layout::from_size_align(bytes, HEADER).ok()?;
        let base = NonNull::new(unsafe { System.alloc_zeroed(layout) })?;
        unsafe {
            (base.as_ptr() as *mut usize).write(bytes);
            NonNull::new(base.as_ptr().add(HEADER))
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        let base = ptr.as_ptr().sub(HEADER);
        let bytes = (base as *const usize).read();
        System.dealloc(base, Layout::from_size_align_unchecked(bytes, HEADER));
    }
}

/// The allocator used when the host does not supply one.
pub fn default_allocator() -> SharedAllocator {
    #[cfg(feature = "libc")]
    {
        Arc::new(LibcAllocator)
    }
    #[cfg(not(feature = "libc"))]
    {
        Arc::new(HeapAllocator)
    }
}

/// A fixed-length, [`ALIGNMENT`]-aligned array owned through an [`Allocator`].
///
/// The memory is returned to the allocator on drop, on every path.
pub struct Buffer<T: Copy> {
    ptr: NonNull<T>,
    len: usize,
    /// Unaligned block as returned by the allocator, `None` for empty buffers.
    base: Option<NonNull<u8>>,
    allocator: SharedAllocator,
}

// The buffer exclusively owns its elements and the allocator is `Send + Sync`.
unsafe impl<T: Copy + Send> Send for Buffer<T> {}
unsafe impl<T: Copy + Sync> Sync for Buffer<T> {}

impl<T: Copy> Buffer<T> {
    /// An empty buffer. Does not allocate.
    pub fn empty(allocator: &SharedAllocator) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            base: None,
            allocator: allocator.clone(),
        }
    }

    /// Allocate `len` elements, each initialized to `value`.
    pub fn filled(allocator: &SharedAllocator, len: usize, value: T) -> Result<Self, Error> {
        if len == 0 {
            return Ok(Self::empty(allocator));
        }

        let align = ALIGNMENT.max(std::mem::align_of::<T>());
        let oom = || Error::OutOfMemory {
            count: len,
            size: std::mem::size_of::<T>(),
        };
        let bytes = std::mem::size_of::<T>()
            .checked_mul(len)
            .and_then(|bytes| bytes.checked_add(align - 1))
            .ok_or_else(oom)?;

        let base = allocator.allocate(1, bytes).ok_or_else(oom)?;
        let addr = base.as_ptr() as usize;
        let offset = ((addr + align - 1) & !(align - 1)) - addr;

        let ptr = unsafe { base.as_ptr().add(offset) } as *mut T;
        for i in 0..len {
            unsafe { ptr.add(i).write(value) };
        }

        log::trace!(
            "Allocated {len} x {} bytes at {ptr:p}",
            std::mem::size_of::<T>()
        );

        Ok(Self {
            // `ptr` is derived from a non-null allocation
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            len,
            base: Some(base),
            allocator: allocator.clone(),
        })
    }

    /// Allocate a copy of `values`.
    pub fn from_slice(allocator: &SharedAllocator, values: &[T]) -> Result<Self, Error>
    where
        T: Default,
    {
        let mut buffer = Self::filled(allocator, values.len(), T::default())?;
        buffer.copy_from_slice(values);
        Ok(buffer)
    }
}

impl<T: Copy> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Copy> Drop for Buffer<T> {
    fn drop(&mut self) {
        if let Some(base) = self.base.take() {
            unsafe { self.allocator.free(base) };
        }
    }
}
