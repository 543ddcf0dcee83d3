//! The fixed-size buffer inside every `Any`
//!
//! The buffer is three machine words, aligned to 8. Its last byte holds the
//! [`AnyFlags`]. A value is stored inline when it fits in the bytes before the
//! flag byte and its alignment does not exceed the buffer's; otherwise the
//! buffer holds a pointer and an optional deleter.

use crate::flags::AnyFlags;
use std::mem::{self, MaybeUninit};
use std::ptr;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Total buffer size in bytes, flag byte included
pub(crate) const BUFFER_SIZE: usize = 3 * max(mem::size_of::<usize>(), mem::size_of::<u64>());

/// Bytes available to an inline value
pub(crate) const INLINE_CAPACITY: usize = BUFFER_SIZE - 1;

/// Alignment of the buffer
pub(crate) const BUFFER_ALIGN: usize = max(mem::align_of::<usize>(), mem::align_of::<u64>());

/// Check if a value with this layout can be stored inline
pub(crate) const fn fits_layout(size: usize, align: usize) -> bool {
    size <= INLINE_CAPACITY && align <= BUFFER_ALIGN
}

/// Check if `T` can be stored inline
pub(crate) const fn fits<T>() -> bool {
    fits_layout(mem::size_of::<T>(), mem::align_of::<T>())
}

/// Out-of-line storage: the object address and how to release it
#[derive(Clone, Copy)]
pub(crate) struct Remote {
    pub ptr: *mut u8,
    pub deleter: Option<unsafe fn(*mut u8)>,
}

#[repr(C)]
pub(crate) struct Storage {
    _align: [u64; 0],
    bytes: [MaybeUninit<u8>; INLINE_CAPACITY],
    flags: AnyFlags,
}

const _: () = assert!(mem::size_of::<Storage>() == BUFFER_SIZE);
const _: () = assert!(mem::align_of::<Storage>() == BUFFER_ALIGN);
const _: () = assert!(mem::size_of::<Remote>() <= INLINE_CAPACITY);

impl Storage {
    pub(crate) const fn empty() -> Self {
        Self {
            _align: [],
            bytes: [MaybeUninit::uninit(); INLINE_CAPACITY],
            flags: AnyFlags::NONE,
        }
    }

    /// Move `value` into the buffer
    ///
    /// `T` must satisfy [`fits`].
    pub(crate) fn inline<T>(value: T) -> Self {
        debug_assert!(fits::<T>());
        let mut storage = Self::empty();
        unsafe { ptr::write(storage.bytes.as_mut_ptr().cast::<T>(), value) };
        storage.flags = AnyFlags::VALUE | AnyFlags::OWNED;
        storage
    }

    /// Uninitialised inline space for a value written afterwards
    pub(crate) fn inline_uninit() -> Self {
        let mut storage = Self::empty();
        storage.flags = AnyFlags::VALUE | AnyFlags::OWNED;
        storage
    }

    pub(crate) fn remote(ptr: *mut u8, deleter: Option<unsafe fn(*mut u8)>, flags: AnyFlags) -> Self {
        let mut storage = Self::empty();
        unsafe {
            ptr::write(
                storage.bytes.as_mut_ptr().cast::<Remote>(),
                Remote { ptr, deleter },
            )
        };
        storage.flags = flags.difference(AnyFlags::VALUE);
        storage
    }

    pub(crate) fn flags(&self) -> AnyFlags {
        self.flags
    }

    pub(crate) fn is_inline(&self) -> bool {
        self.flags.contains(AnyFlags::VALUE)
    }

    /// The remote record; only meaningful when not inline
    pub(crate) fn remote_parts(&self) -> Remote {
        debug_assert!(!self.is_inline());
        unsafe { ptr::read(self.bytes.as_ptr().cast::<Remote>()) }
    }

    /// Address of the managed object
    pub(crate) fn ptr(&self) -> *const u8 {
        if self.is_inline() {
            self.bytes.as_ptr().cast::<u8>()
        } else {
            self.remote_parts().ptr
        }
    }

    /// Mutable address of the managed object
    pub(crate) fn ptr_mut(&mut self) -> *mut u8 {
        if self.is_inline() {
            self.bytes.as_mut_ptr().cast::<u8>()
        } else {
            self.remote_parts().ptr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(BUFFER_SIZE, 24);
        assert_eq!(INLINE_CAPACITY, 23);
        assert!(fits::<u64>());
        assert!(fits::<[u8; 23]>());
        assert!(!fits::<[u8; 24]>());
        assert!(!fits::<[u64; 3]>());
        assert!(fits_layout(0, 1));
        assert!(!fits_layout(8, 16));
    }

    #[test]
    fn test_inline_roundtrip() {
        let mut storage = Storage::inline(0xdead_beef_u64);
        assert!(storage.is_inline());
        assert_eq!(unsafe { *storage.ptr().cast::<u64>() }, 0xdead_beef);
        unsafe { *storage.ptr_mut().cast::<u64>() = 7 };
        assert_eq!(unsafe { *storage.ptr().cast::<u64>() }, 7);
        assert_eq!(storage.flags(), AnyFlags::VALUE | AnyFlags::OWNED);
    }

    #[test]
    fn test_remote_record() {
        let mut value = 5u32;
        let ptr = (&mut value as *mut u32).cast::<u8>();
        let storage = Storage::remote(ptr, None, AnyFlags::CONST | AnyFlags::VALUE);
        assert!(!storage.is_inline());
        assert_eq!(storage.flags(), AnyFlags::CONST);
        assert_eq!(storage.ptr(), ptr as *const u8);
        assert!(storage.remote_parts().deleter.is_none());
    }
}
