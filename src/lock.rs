use crate::error::{check_depth, Error, ErrorKind, Result};
use crate::kernel::{Kernel, KernelState};
use crate::Os;

/// How many times one [`Dispatch`] can be locked without unlocking.
pub const DISPATCH_NESTING_MAX: usize = 8;

/// Suspends preemptive scheduling kernel-wide while locked.
///
/// Every `lock()` records the lock state the kernel reports from before the
/// call, and the matching `unlock()` restores exactly that state, so nested
/// use (on this instance or across instances) round-trips. Dropping a still
/// locked instance restores the state from before its first `lock()`.
pub struct Dispatch<'a, K: Kernel> {
    os: &'a Os<K>,
    state: LockState,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum LockState {
    Unarmed,
    Unlocked,
    Locked {
        previous: [i32; DISPATCH_NESTING_MAX],
        nesting: usize,
    },
}

impl<'a, K: Kernel> Dispatch<'a, K> {
    pub const fn new(os: &'a Os<K>) -> Self {
        Self {
            os,
            state: LockState::Unarmed,
        }
    }

    pub fn lock(&mut self) -> Result<()> {
        let kernel = self.os.kernel();
        let previous = check_depth(kernel.lock(), "osKernelLock")?;
        if let LockState::Locked {
            previous: stack,
            nesting,
        } = &mut self.state
        {
            if *nesting == DISPATCH_NESTING_MAX {
                check_depth(kernel.restore_lock(previous), "osKernelRestoreLock")?;
                return Err(Error::new(ErrorKind::Resource, "Dispatch::lock nesting"));
            }
            stack[*nesting] = previous;
            *nesting += 1;
            return Ok(());
        }

        let mut stack = [0; DISPATCH_NESTING_MAX];
        stack[0] = previous;
        self.state = LockState::Locked {
            previous: stack,
            nesting: 1,
        };
        Ok(())
    }

    /// Restores the lock state recorded by the latest unmatched `lock()`.
    pub fn unlock(&mut self) -> Result<()> {
        let LockState::Locked { previous, nesting } = &mut self.state else {
            return Err(Error::new(ErrorKind::NotLocked, "Dispatch::unlock"));
        };
        let restore = previous[*nesting - 1];
        check_depth(
            self.os.kernel().restore_lock(restore),
            "osKernelRestoreLock",
        )?;
        *nesting -= 1;
        let remaining = *nesting;
        if remaining == 0 {
            self.state = LockState::Unlocked;
        }
        Ok(())
    }

    /// whether this instance holds an unmatched `lock()`
    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    /// Whether scheduling is currently locked, by any instance or caller.
    pub fn locked(os: &Os<K>) -> bool {
        os.state() == KernelState::Locked
    }

    /// Runs `f` with scheduling locked.
    pub fn with<R, F>(os: &'a Os<K>, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let mut dispatch = Dispatch::new(os);
        dispatch.lock()?;
        let result = f();
        dispatch.unlock()?;
        Ok(result)
    }
}

impl<K: Kernel> Drop for Dispatch<'_, K> {
    fn drop(&mut self) {
        if let LockState::Locked { previous, .. } = self.state {
            let restored = self.os.kernel().restore_lock(previous[0]);
            if let Err(err) = check_depth(restored, "osKernelRestoreLock") {
                log::error!("dispatch lock not restored on drop: {}", err);
            }
        }
    }
}
