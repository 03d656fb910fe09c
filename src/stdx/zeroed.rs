//! Fallible zero-initialized slice allocation.
//!
//! `vec![0; n]` aborts the process when the allocator refuses. Large
//! run-scoped buffers go through [`try_zeroed_slice`] instead so the caller
//! can turn a refusal into an error value.

use std::alloc::{alloc_zeroed, Layout};
use std::mem::size_of;
use std::ptr::{self, NonNull};

/// Allocates `len` zeroed `T`s through the global allocator.
///
/// Returns `None` if the total size overflows `isize::MAX` or the allocator
/// returns null. The memory comes from `alloc_zeroed`, so large requests are
/// typically served by fresh pages that the OS commits on first write.
///
/// # Safety
///
/// The all-zero byte pattern must be a valid `T`.
///
/// # Panics
///
/// Panics if `T` is zero-sized.
pub unsafe fn try_zeroed_slice<T>(len: usize) -> Option<Box<[T]>> {
    assert!(size_of::<T>() > 0, "try_zeroed_slice does not support ZSTs");
    if len == 0 {
        return Some(Box::default());
    }

    let layout = Layout::array::<T>(len).ok()?;
    // SAFETY: `layout` has non-zero size (len > 0, T not a ZST).
    let raw = unsafe { alloc_zeroed(layout) }.cast::<T>();
    let ptr = NonNull::new(raw)?;

    // SAFETY: `ptr` was allocated by the global allocator with the layout of
    // `[T; len]`, which is the layout `Box<[T]>` frees with. Every element is
    // zeroed, which the caller guarantees is a valid `T`.
    Some(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len)) })
}
