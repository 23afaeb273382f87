#![allow(dead_code)]

//! A simulated kernel on top of std threads, for host testing.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use cmsis_threads::kernel::{self, Kernel, KernelState, RawStatus, Version};
use cmsis_threads::Os;

pub const TICK_FREQUENCY: u32 = 1000;
pub const CORE_CLOCK: u32 = 64_000_000;

pub struct SimKernel {
    sim: Mutex<Sim>,
    wakeup: Condvar,
    epoch: Instant,
}

#[derive(Default)]
struct Sim {
    state: Option<KernelState>,
    lock_depth: i32,
    flags: HashMap<ThreadId, u32>,
    blocked_waits: usize,
}

impl SimKernel {
    pub fn new() -> Self {
        Self {
            sim: Mutex::new(Sim {
                state: Some(KernelState::Inactive),
                ..Sim::default()
            }),
            wakeup: Condvar::new(),
            epoch: Instant::now(),
        }
    }

    /// already initialized and started
    pub fn running() -> Self {
        let kernel = Self::new();
        kernel.sim().state = Some(KernelState::Running);
        kernel
    }

    /// How many times a wait had to block.
    pub fn blocked_waits(&self) -> usize {
        self.sim().blocked_waits
    }

    pub fn lock_depth(&self) -> i32 {
        self.sim().lock_depth
    }

    fn sim(&self) -> MutexGuard<'_, Sim> {
        self.sim.lock().unwrap()
    }
}

pub fn running_os() -> Os<SimKernel> {
    Os::new(SimKernel::running())
}

impl Kernel for SimKernel {
    type ThreadId = ThreadId;

    fn initialize(&self) -> RawStatus {
        let mut sim = self.sim();
        if sim.state != Some(KernelState::Inactive) {
            return kernel::ERROR;
        }
        sim.state = Some(KernelState::Ready);
        kernel::OK
    }

    fn start(&self) -> RawStatus {
        let mut sim = self.sim();
        if sim.state != Some(KernelState::Ready) {
            return kernel::ERROR;
        }
        sim.state = Some(KernelState::Running);
        kernel::OK
    }

    fn state(&self) -> KernelState {
        let sim = self.sim();
        match sim.state {
            Some(KernelState::Running) if sim.lock_depth > 0 => KernelState::Locked,
            Some(state) => state,
            None => KernelState::Error,
        }
    }

    fn info(&self, version: &mut Version, id: &mut [u8]) -> RawStatus {
        const ID: &[u8] = b"SimKernel V1\0";
        if id.len() < ID.len() {
            return kernel::ERROR_PARAMETER;
        }
        *version = Version {
            api: 20_010_003,
            kernel: 10_000_000,
        };
        id[..ID.len()].copy_from_slice(ID);
        kernel::OK
    }

    fn tick_frequency(&self) -> u32 {
        TICK_FREQUENCY
    }

    fn tick_count(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    fn system_core_clock(&self) -> u32 {
        CORE_CLOCK
    }

    fn lock(&self) -> i32 {
        let mut sim = self.sim();
        if sim.state != Some(KernelState::Running) {
            return kernel::ERROR;
        }
        let previous = sim.lock_depth;
        sim.lock_depth += 1;
        previous
    }

    fn restore_lock(&self, lock: i32) -> i32 {
        let mut sim = self.sim();
        if lock < 0 {
            return kernel::ERROR_PARAMETER;
        }
        if sim.state != Some(KernelState::Running) {
            return kernel::ERROR;
        }
        sim.lock_depth = lock;
        lock
    }

    fn current_thread(&self) -> Option<ThreadId> {
        Some(thread::current().id())
    }

    fn thread_flags_set(&self, thread: ThreadId, flags: u32) -> u32 {
        if flags & kernel::FLAGS_ERROR != 0 {
            return kernel::FLAGS_ERROR_PARAMETER;
        }
        let mut sim = self.sim();
        let current = sim.flags.entry(thread).or_default();
        *current |= flags;
        let result = *current;
        self.wakeup.notify_all();
        result
    }

    fn thread_flags_clear(&self, flags: u32) -> u32 {
        if flags & kernel::FLAGS_ERROR != 0 {
            return kernel::FLAGS_ERROR_PARAMETER;
        }
        let mut sim = self.sim();
        let current = sim.flags.entry(thread::current().id()).or_default();
        let previous = *current;
        *current &= !flags;
        previous
    }

    fn thread_flags_get(&self) -> u32 {
        let sim = self.sim();
        sim.flags.get(&thread::current().id()).copied().unwrap_or(0)
    }

    fn thread_flags_wait(&self, flags: u32, options: u32, timeout: u32) -> u32 {
        if flags == 0 || flags & kernel::FLAGS_ERROR != 0 {
            return kernel::FLAGS_ERROR_PARAMETER;
        }
        let me = thread::current().id();
        let deadline = (timeout != kernel::WAIT_FOREVER).then(|| {
            Instant::now() + Duration::from_millis(timeout as u64 * 1000 / TICK_FREQUENCY as u64)
        });

        let mut sim = self.sim();
        loop {
            let current = sim.flags.get(&me).copied().unwrap_or(0);
            let satisfied = if options & kernel::WAIT_ALL != 0 {
                current & flags == flags
            } else {
                current & flags != 0
            };
            if satisfied {
                if options & kernel::NO_CLEAR == 0 {
                    *sim.flags.entry(me).or_default() &= !flags;
                }
                return current;
            }
            if timeout == 0 {
                return kernel::FLAGS_ERROR_RESOURCE;
            }

            sim.blocked_waits += 1;
            sim = match deadline {
                None => self.wakeup.wait(sim).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return kernel::FLAGS_ERROR_TIMEOUT;
                    }
                    self.wakeup.wait_timeout(sim, deadline - now).unwrap().0
                }
            };
        }
    }
}
