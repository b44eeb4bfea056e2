use std::{ptr::NonNull, sync::OnceLock};

/// Virtual memory page size of the computer. This is usually 4096.
/// We can't know it at compile time, so it is queried once and cached.
static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Zero-sized handle to the operating system's memory primitives. The pool
/// only ever talks to the OS twice per lifecycle: once to obtain its buffer
/// and once to give it back.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The allocator, our top level view of this, has nothing
/// to do with the concrete implementations / APIs offered by each kernel.
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a Pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub(crate) fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| unsafe { Kernel::page_size() })
}

/// Wrapper to use [`Kernel::request_memory`]
///
/// **SAFETY**: `len` must be a non-zero multiple of [`page_size`].
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
    unsafe { Kernel::request_memory(len) }
}

/// Wrapper to use [`Kernel::return_memory`]
///
/// **SAFETY**: `addr` and `len` must describe a mapping previously obtained
/// from [`request_memory`] that nobody is going to touch again.
#[inline]
pub(crate) unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
    unsafe { Kernel::return_memory(addr, len) }
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
            let result = unsafe { munmap(addr.as_ptr().cast::<c_void>(), len as size_t) };

            if result != 0 {
                log::error!("munmap of {len} bytes at {addr:p} failed");
            }
        }

        unsafe fn page_size() -> usize {
            match unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) } {
                size if size > 0 => size as usize,
                _ => 4096,
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use crate::kernel::{Kernel, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) {
            let result = unsafe {
                Memory::VirtualFree(addr.as_ptr().cast::<c_void>(), 0, Memory::MEM_RELEASE)
            };

            if let Err(err) = result {
                log::error!("VirtualFree at {addr:p} failed: {err}");
            }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
