//! Capability interface of the underlying RTOS kernel.
//!
//! [`Kernel`] mirrors the CMSIS-RTOS2 calls this crate needs, with their raw
//! C-level return values. Everything above it ([`crate::Os`],
//! [`crate::ThreadFlagSet`], [`crate::Dispatch`]) only talks to the kernel
//! through this trait, so tests can substitute a fake.

use core::fmt::Debug;

/// raw `osStatus_t`
pub type RawStatus = i32;

pub const OK: RawStatus = 0;
pub const ERROR: RawStatus = -1;
pub const ERROR_TIMEOUT: RawStatus = -2;
pub const ERROR_RESOURCE: RawStatus = -3;
pub const ERROR_PARAMETER: RawStatus = -4;
pub const ERROR_NO_MEMORY: RawStatus = -5;
pub const ERROR_ISR: RawStatus = -6;

/// Thread flag calls return the flags, or one of these if the MSB is set.
pub const FLAGS_ERROR: u32 = 0x8000_0000;
pub const FLAGS_ERROR_UNKNOWN: u32 = ERROR as u32;
pub const FLAGS_ERROR_TIMEOUT: u32 = ERROR_TIMEOUT as u32;
pub const FLAGS_ERROR_RESOURCE: u32 = ERROR_RESOURCE as u32;
pub const FLAGS_ERROR_PARAMETER: u32 = ERROR_PARAMETER as u32;
pub const FLAGS_ERROR_ISR: u32 = ERROR_ISR as u32;

/// wait options
pub const WAIT_ANY: u32 = 0;
pub const WAIT_ALL: u32 = 1;
pub const NO_CLEAR: u32 = 2;

/// timeout value meaning "block until satisfied"
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Kernel run state, as reported by `osKernelGetState`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum KernelState {
    Inactive,
    Ready,
    Running,
    Locked,
    Suspended,
    Error,
}

impl KernelState {
    /// Maps a raw `osKernelState_t`; unknown values are reported as `Error`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => KernelState::Inactive,
            1 => KernelState::Ready,
            2 => KernelState::Running,
            3 => KernelState::Locked,
            4 => KernelState::Suspended,
            _ => KernelState::Error,
        }
    }
}

/// API and kernel version numbers, as filled in by `osKernelGetInfo`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[repr(C)]
pub struct Version {
    pub api: u32,
    pub kernel: u32,
}

#[cfg_attr(test, mockall::automock(type ThreadId = u32;))]
pub trait Kernel {
    /// kernel thread handle, used as target of [`Kernel::thread_flags_set`]
    type ThreadId: Copy + Debug;

    fn initialize(&self) -> RawStatus;
    /// Does not return on success when backed by a real kernel.
    fn start(&self) -> RawStatus;
    fn state(&self) -> KernelState;
    /// Fills `version` and writes the NUL-terminated kernel id into `id`.
    fn info(&self, version: &mut Version, id: &mut [u8]) -> RawStatus;

    /// ticks per second, 0 if the platform is misconfigured
    fn tick_frequency(&self) -> u32;
    fn tick_count(&self) -> u32;
    /// core clock in Hz, 0 if the platform is misconfigured
    fn system_core_clock(&self) -> u32;

    /// Returns the previous lock state, or a negative status.
    fn lock(&self) -> i32;
    /// Returns the new lock state, or a negative status.
    fn restore_lock(&self, lock: i32) -> i32;

    /// `None` outside of thread context
    fn current_thread(&self) -> Option<Self::ThreadId>;
    fn thread_flags_set(&self, thread: Self::ThreadId, flags: u32) -> u32;
    fn thread_flags_clear(&self, flags: u32) -> u32;
    fn thread_flags_get(&self) -> u32;
    fn thread_flags_wait(&self, flags: u32, options: u32, timeout: u32) -> u32;
}
