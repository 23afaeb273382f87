//! [`Kernel`] implementation linking against the C CMSIS-RTOS2 API.
//!
//! Enabled with the `cmsis-rtos2` feature. The RTOS (e.g. RTX5 or
//! FreeRTOS' CMSIS layer) and the device's `SystemCoreClock` have to be
//! provided by the final link.

use core::ffi::{c_char, c_void};
use core::ptr::{self, NonNull};

use crate::kernel::{Kernel, KernelState, RawStatus, Version};

#[allow(non_snake_case, non_upper_case_globals)]
extern "C" {
    fn osKernelInitialize() -> RawStatus;
    fn osKernelStart() -> RawStatus;
    fn osKernelGetState() -> i32;
    fn osKernelGetInfo(version: *mut Version, id_buf: *mut c_char, id_size: u32) -> RawStatus;
    fn osKernelGetTickFreq() -> u32;
    fn osKernelGetTickCount() -> u32;
    fn osKernelLock() -> i32;
    fn osKernelRestoreLock(lock: i32) -> i32;
    fn osThreadGetId() -> *mut c_void;
    fn osThreadFlagsSet(thread_id: *mut c_void, flags: u32) -> u32;
    fn osThreadFlagsClear(flags: u32) -> u32;
    fn osThreadFlagsGet() -> u32;
    fn osThreadFlagsWait(flags: u32, options: u32, timeout: u32) -> u32;

    static SystemCoreClock: u32;
}

/// `osThreadId_t`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ThreadId(NonNull<c_void>);

// SAFETY: the handle is only passed back to the kernel, which synchronizes.
unsafe impl Send for ThreadId {}
unsafe impl Sync for ThreadId {}

/// The CMSIS-RTOS2 kernel.
#[derive(Copy, Clone, Default, Debug)]
pub struct CmsisKernel;

impl Kernel for CmsisKernel {
    type ThreadId = ThreadId;

    fn initialize(&self) -> RawStatus {
        unsafe { osKernelInitialize() }
    }

    fn start(&self) -> RawStatus {
        unsafe { osKernelStart() }
    }

    fn state(&self) -> KernelState {
        KernelState::from_raw(unsafe { osKernelGetState() })
    }

    fn info(&self, version: &mut Version, id: &mut [u8]) -> RawStatus {
        let len = u32::try_from(id.len()).unwrap_or(u32::MAX);
        unsafe { osKernelGetInfo(version, id.as_mut_ptr().cast(), len) }
    }

    fn tick_frequency(&self) -> u32 {
        unsafe { osKernelGetTickFreq() }
    }

    fn tick_count(&self) -> u32 {
        unsafe { osKernelGetTickCount() }
    }

    fn system_core_clock(&self) -> u32 {
        // updated by SystemCoreClockUpdate(), so read it fresh
        unsafe { ptr::read_volatile(ptr::addr_of!(SystemCoreClock)) }
    }

    fn lock(&self) -> i32 {
        unsafe { osKernelLock() }
    }

    fn restore_lock(&self, lock: i32) -> i32 {
        unsafe { osKernelRestoreLock(lock) }
    }

    fn current_thread(&self) -> Option<ThreadId> {
        NonNull::new(unsafe { osThreadGetId() }).map(ThreadId)
    }

    fn thread_flags_set(&self, thread: ThreadId, flags: u32) -> u32 {
        unsafe { osThreadFlagsSet(thread.0.as_ptr(), flags) }
    }

    fn thread_flags_clear(&self, flags: u32) -> u32 {
        unsafe { osThreadFlagsClear(flags) }
    }

    fn thread_flags_get(&self) -> u32 {
        unsafe { osThreadFlagsGet() }
    }

    fn thread_flags_wait(&self, flags: u32, options: u32, timeout: u32) -> u32 {
        unsafe { osThreadFlagsWait(flags, options, timeout) }
    }
}
