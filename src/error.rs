//! Mapping of kernel status codes to [`Error`].

use crate::kernel::{self, RawStatus};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("unspecified kernel error")]
    Error,
    #[error("operation not completed within the timeout period")]
    Timeout,
    #[error("resource not available")]
    Resource,
    #[error("parameter error")]
    Parameter,
    #[error("system is out of memory")]
    NoMemory,
    #[error("not allowed in interrupt context")]
    Isr,
    #[error("kernel is not initialized")]
    NotInitialized,
    #[error("dispatch was not locked by this instance")]
    NotLocked,
    #[error("unknown kernel status {0}")]
    Unknown(i32),
}

impl ErrorKind {
    /// Kind for a failing (non-`OK`) raw status.
    pub fn from_status(status: RawStatus) -> Self {
        match status {
            kernel::ERROR => ErrorKind::Error,
            kernel::ERROR_TIMEOUT => ErrorKind::Timeout,
            kernel::ERROR_RESOURCE => ErrorKind::Resource,
            kernel::ERROR_PARAMETER => ErrorKind::Parameter,
            kernel::ERROR_NO_MEMORY => ErrorKind::NoMemory,
            kernel::ERROR_ISR => ErrorKind::Isr,
            other => ErrorKind::Unknown(other),
        }
    }
}

/// A failed kernel operation: what went wrong, and which call reported it.
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("{operation}: {kind}")]
pub struct Error {
    kind: ErrorKind,
    operation: &'static str,
}

impl Error {
    pub const fn new(kind: ErrorKind, operation: &'static str) -> Self {
        Self { kind, operation }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// `OK` passes, anything else fails.
pub fn check_status(status: RawStatus, operation: &'static str) -> Result<()> {
    if status == kernel::OK {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::from_status(status), operation))
    }
}

/// For calls returning a lock state: non-negative values pass through.
pub fn check_depth(depth: i32, operation: &'static str) -> Result<i32> {
    if depth < 0 {
        Err(Error::new(ErrorKind::from_status(depth), operation))
    } else {
        Ok(depth)
    }
}

/// For thread flag calls: the MSB marks an error code.
pub fn check_flags(flags: u32, operation: &'static str) -> Result<u32> {
    if flags & kernel::FLAGS_ERROR != 0 {
        Err(Error::new(ErrorKind::from_status(flags as i32), operation))
    } else {
        Ok(flags)
    }
}
