//! Thread flags and dispatch locking on top of a CMSIS-RTOS2 style kernel.
//!
//! The kernel is reached through the [`Kernel`] trait. [`Os`] wraps one
//! kernel handle and hands out the primitives:
//!
//! - [`ThreadFlagSet`]: per-thread signaling with any/all waits and
//!   timeouts given as [`Span`]s, [`core::time::Duration`]s or deadlines,
//! - [`Dispatch`]: a guard suspending preemptive scheduling,
//!
//! and kernel status codes come back as [`Error`]s naming the failing call.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod arch;
mod ensure_once;

#[cfg(feature = "cmsis-rtos2")]
pub mod cmsis;
pub mod error;
pub mod kernel;
pub mod lock;
pub mod thread_flags;
pub mod ticks;

use ensure_once::EnsureOnce;

pub use error::{Error, ErrorKind, Result};
pub use kernel::{Kernel, KernelState, Version};
pub use lock::Dispatch;
pub use thread_flags::*;
pub use ticks::{Deadline, Span, TickInstant};

/// Kernel version information.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct KernelInfo<'a> {
    pub version: Version,
    /// kernel identification string
    pub id: &'a str,
}

/// Handle to the kernel; usually a single `static` per program.
pub struct Os<K: Kernel> {
    kernel: K,
    tick_frequency: EnsureOnce<u32>,
}

impl<K: Kernel> Os<K> {
    pub const fn new(kernel: K) -> Self {
        Self {
            kernel,
            tick_frequency: EnsureOnce::new(),
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Initializes the kernel, unless that already happened.
    pub fn initialize(&self) -> Result<()> {
        if self.kernel.state() == KernelState::Inactive {
            log::debug!("initializing kernel");
            error::check_status(self.kernel.initialize(), "osKernelInitialize")?;
        }
        Ok(())
    }

    /// Starts the scheduler. On a real kernel this only returns on error.
    pub fn start(&self) -> Result<()> {
        if self.kernel.state() == KernelState::Inactive {
            return Err(Error::new(ErrorKind::NotInitialized, "osKernelStart"));
        }
        log::debug!("starting kernel");
        error::check_status(self.kernel.start(), "osKernelStart")
    }

    pub fn state(&self) -> KernelState {
        self.kernel.state()
    }

    /// Version numbers and id string; the id is written into `buf`.
    pub fn info<'b>(&self, buf: &'b mut [u8]) -> Result<KernelInfo<'b>> {
        let mut version = Version::default();
        error::check_status(self.kernel.info(&mut version, buf), "osKernelGetInfo")?;
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let id = core::str::from_utf8(&buf[..len])
            .map_err(|_| Error::new(ErrorKind::Error, "osKernelGetInfo"))?;
        Ok(KernelInfo { version, id })
    }

    /// kernel id string, see [`Os::info`]
    pub fn version<'b>(&self, buf: &'b mut [u8]) -> Result<&'b str> {
        Ok(self.info(buf)?.id)
    }

    /// Kernel ticks per second. Queried once, then cached.
    pub fn tick_frequency(&self) -> Result<u32> {
        self.tick_frequency.get_or_try_init(|| {
            match self.kernel.tick_frequency() {
                0 => Err(ticks::no_tick_frequency()),
                frequency => Ok(frequency),
            }
        })
    }

    /// core clock in Hz
    pub fn core_clock_frequency(&self) -> Result<u32> {
        match self.kernel.system_core_clock() {
            0 => Err(Error::new(ErrorKind::Error, "SystemCoreClock")),
            frequency => Ok(frequency),
        }
    }

    /// current point on the kernel tick counter
    pub fn now(&self) -> TickInstant {
        TickInstant::from_ticks(self.kernel.tick_count())
    }

    pub fn this_thread_flags(&self) -> ThreadFlagSet<'_, K> {
        ThreadFlagSet::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MockKernel;

    #[test]
    fn initialize_only_when_inactive() {
        let mut kernel = MockKernel::new();
        let mut first = true;
        kernel.expect_state().returning(move || {
            if core::mem::take(&mut first) {
                KernelState::Inactive
            } else {
                KernelState::Ready
            }
        });
        kernel.expect_initialize().times(1).return_const(kernel::OK);
        let os = Os::new(kernel);
        os.initialize().unwrap();
        // second call sees Ready and does not initialize again
        os.initialize().unwrap();
    }

    #[test]
    fn initialize_failure_is_reported() {
        let mut kernel = MockKernel::new();
        kernel.expect_state().return_const(KernelState::Inactive);
        kernel.expect_initialize().return_const(kernel::ERROR_ISR);
        let err = Os::new(kernel).initialize().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Isr);
        assert_eq!(err.operation(), "osKernelInitialize");
    }

    #[test]
    fn start_requires_initialize() {
        let mut kernel = MockKernel::new();
        kernel.expect_state().return_const(KernelState::Inactive);
        let err = Os::new(kernel).start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }

    #[test]
    fn start_maps_status() {
        let mut kernel = MockKernel::new();
        kernel.expect_state().return_const(KernelState::Ready);
        kernel.expect_start().return_const(kernel::ERROR);
        let err = Os::new(kernel).start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Error);
        assert_eq!(err.operation(), "osKernelStart");
    }

    #[test]
    fn tick_frequency_is_cached() {
        let mut kernel = MockKernel::new();
        kernel.expect_tick_frequency().times(1).return_const(1000u32);
        let os = Os::new(kernel);
        assert_eq!(os.tick_frequency(), Ok(1000));
        assert_eq!(os.tick_frequency(), Ok(1000));
    }

    #[test]
    fn zero_tick_frequency_is_not_cached() {
        let mut kernel = MockKernel::new();
        kernel.expect_tick_frequency().times(2).return_const(0u32);
        let os = Os::new(kernel);
        assert!(os.tick_frequency().is_err());
        assert!(os.tick_frequency().is_err());
    }

    #[test]
    fn core_clock() {
        let mut kernel = MockKernel::new();
        kernel.expect_system_core_clock().return_const(0u32);
        let err = Os::new(kernel).core_clock_frequency().unwrap_err();
        assert_eq!(err.operation(), "SystemCoreClock");

        let mut kernel = MockKernel::new();
        kernel.expect_system_core_clock().return_const(64_000_000u32);
        assert_eq!(Os::new(kernel).core_clock_frequency(), Ok(64_000_000));
    }

    #[test]
    fn info_reads_id_up_to_nul() {
        let mut kernel = MockKernel::new();
        kernel.expect_info().returning(|version, id| {
            *version = Version {
                api: 20_010_003,
                kernel: 50_050_004,
            };
            id[..8].copy_from_slice(b"RTX V5\0\0");
            kernel::OK
        });
        let os = Os::new(kernel);
        let mut buf = [0xffu8; 32];
        let info = os.info(&mut buf).unwrap();
        assert_eq!(info.id, "RTX V5");
        assert_eq!(info.version.kernel, 50_050_004);
    }

    #[test]
    fn version_failure_is_reported() {
        let mut kernel = MockKernel::new();
        kernel.expect_info().return_const(kernel::ERROR_PARAMETER);
        let mut buf = [0u8; 4];
        let err = Os::new(kernel).version(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
        assert_eq!(err.operation(), "osKernelGetInfo");
    }
}
