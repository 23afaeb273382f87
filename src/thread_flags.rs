use crate::arch;
use crate::error::{check_flags, Error, ErrorKind, Result};
use crate::kernel::{self, Kernel};
use crate::ticks::{self, Deadline, Span};
use crate::Os;

/// type of thread flags
pub type ThreadFlags = u32;

/// Bits usable as flags. The MSB is reserved for kernel error codes.
pub const FLAGS_MASK: ThreadFlags = 0x7FFF_FFFF;

/// Sentinel for [`ThreadFlagSet::clear`]: every currently set flag.
pub const ALL_FLAGS: ThreadFlags = ThreadFlags::MAX;

/// Possible waiting modes for thread flags
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WaitMode {
    /// at least one of the requested flags
    Any,
    /// every requested flag
    All,
}

/// Wait mode plus whether the matched flags get cleared on success.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct WaitFlag {
    pub mode: WaitMode,
    pub clear: bool,
}

impl WaitFlag {
    pub const ANY: WaitFlag = WaitFlag {
        mode: WaitMode::Any,
        clear: false,
    };
    pub const ALL: WaitFlag = WaitFlag {
        mode: WaitMode::All,
        clear: false,
    };

    /// same mode, clearing the awaited flags when the wait succeeds
    pub const fn clear(self) -> Self {
        Self {
            mode: self.mode,
            clear: true,
        }
    }

    /// kernel wait options
    pub const fn options(self) -> u32 {
        let mode = match self.mode {
            WaitMode::Any => kernel::WAIT_ANY,
            WaitMode::All => kernel::WAIT_ALL,
        };
        if self.clear {
            mode
        } else {
            mode | kernel::NO_CLEAR
        }
    }

    /// Whether `flags` satisfy a wait on `mask` in this mode.
    pub const fn matches(self, flags: ThreadFlags, mask: ThreadFlags) -> bool {
        match self.mode {
            WaitMode::Any => flags & mask != 0,
            WaitMode::All => flags & mask == mask,
        }
    }
}

impl Default for WaitFlag {
    fn default() -> Self {
        WaitFlag::ANY
    }
}

/// Outcome of a bounded wait.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WaitStatus {
    /// matched; the flags as they were when the wait was satisfied
    NoTimeout(ThreadFlags),
    /// expired without a match, no flag was cleared
    Timeout,
}

/// Thread flags of the calling thread, plus signaling of other threads.
///
/// Each call is atomic in the kernel, sequences of calls are not: use a
/// clearing wait instead of `get()` followed by `clear()`.
pub struct ThreadFlagSet<'a, K: Kernel> {
    os: &'a Os<K>,
}

fn check_mask(mask: ThreadFlags, operation: &'static str) -> Result<ThreadFlags> {
    if mask & !FLAGS_MASK != 0 {
        Err(Error::new(ErrorKind::Parameter, operation))
    } else {
        Ok(mask)
    }
}

impl<'a, K: Kernel> ThreadFlagSet<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Sets `mask` on the calling thread, returns the resulting flags.
    pub fn set(&self, mask: ThreadFlags) -> Result<ThreadFlags> {
        let thread = self
            .os
            .kernel()
            .current_thread()
            .ok_or(Error::new(ErrorKind::Resource, "osThreadGetId"))?;
        self.set_on(thread, mask)
    }

    /// Sets `mask` on `thread`, waking it if that satisfies its wait.
    /// Returns the resulting flags of `thread`.
    pub fn set_on(&self, thread: K::ThreadId, mask: ThreadFlags) -> Result<ThreadFlags> {
        let mask = check_mask(mask, "osThreadFlagsSet")?;
        check_flags(
            self.os.kernel().thread_flags_set(thread, mask),
            "osThreadFlagsSet",
        )
    }

    /// current flags of the calling thread; never clears anything
    pub fn get(&self) -> ThreadFlags {
        self.os.kernel().thread_flags_get()
    }

    /// Clears `mask` ([`ALL_FLAGS`] for everything), returns the flags as
    /// they were before.
    pub fn clear(&self, mask: ThreadFlags) -> Result<ThreadFlags> {
        let mask = if mask == ALL_FLAGS {
            FLAGS_MASK
        } else {
            check_mask(mask, "osThreadFlagsClear")?
        };
        check_flags(
            self.os.kernel().thread_flags_clear(mask),
            "osThreadFlagsClear",
        )
    }

    pub fn clear_all(&self) -> Result<ThreadFlags> {
        self.clear(ALL_FLAGS)
    }

    /// Blocks until `mask` is satisfied according to `flag`.
    /// Returns the flags as they were at the match.
    pub fn wait(&self, mask: ThreadFlags, flag: WaitFlag) -> Result<ThreadFlags> {
        let mask = check_wait_mask(mask)?;
        check_flags(
            self.os
                .kernel()
                .thread_flags_wait(mask, flag.options(), kernel::WAIT_FOREVER),
            "osThreadFlagsWait",
        )
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`. A zero timeout
    /// only checks the current flags.
    pub fn wait_for(
        &self,
        mask: ThreadFlags,
        flag: WaitFlag,
        timeout: impl Into<Span>,
    ) -> Result<WaitStatus> {
        let timeout = timeout.into();
        let mask = check_wait_mask(mask)?;
        if timeout.is_negative() {
            return Err(ticks::negative_timeout());
        }
        let ticks = ticks::from_span(timeout, self.os.tick_frequency()?)?;
        self.wait_ticks(mask, flag, ticks)
    }

    /// [`wait_for`](Self::wait_for) any of `mask`, without clearing.
    pub fn wait_for_any(&self, mask: ThreadFlags, timeout: impl Into<Span>) -> Result<WaitStatus> {
        self.wait_for(mask, WaitFlag::ANY, timeout)
    }

    /// Like [`wait_for`](Self::wait_for), bounded by an absolute deadline.
    /// A deadline already passed turns into a poll.
    pub fn wait_until<D: Deadline>(
        &self,
        mask: ThreadFlags,
        flag: WaitFlag,
        deadline: &D,
    ) -> Result<WaitStatus> {
        let mask = check_wait_mask(mask)?;
        let ticks = deadline.ticks_remaining(self.os.kernel(), self.os.tick_frequency()?)?;
        self.wait_ticks(mask, flag, ticks)
    }

    pub fn wait_until_any<D: Deadline>(&self, mask: ThreadFlags, deadline: &D) -> Result<WaitStatus> {
        self.wait_until(mask, WaitFlag::ANY, deadline)
    }

    fn wait_ticks(&self, mask: ThreadFlags, flag: WaitFlag, ticks: u32) -> Result<WaitStatus> {
        let raw = self.os.kernel().thread_flags_wait(mask, flag.options(), ticks);
        match check_flags(raw, "osThreadFlagsWait") {
            Ok(flags) => Ok(WaitStatus::NoTimeout(flags)),
            Err(err) if err.kind() == ErrorKind::Timeout => Ok(WaitStatus::Timeout),
            // a poll that finds nothing is reported as "resource"
            Err(err) if ticks == 0 && err.kind() == ErrorKind::Resource => Ok(WaitStatus::Timeout),
            Err(err) => Err(err),
        }
    }
}

fn check_wait_mask(mask: ThreadFlags) -> Result<ThreadFlags> {
    if arch::in_isr() {
        return Err(Error::new(ErrorKind::Isr, "osThreadFlagsWait"));
    }
    if mask == 0 {
        return Err(Error::new(ErrorKind::Parameter, "osThreadFlagsWait"));
    }
    check_mask(mask, "osThreadFlagsWait")
}
