use core::cell::Cell;

use critical_section::Mutex;

/// A value that is computed on first successful use and then kept.
///
/// Shared through a critical section, so it can sit in a `static`.
pub(crate) struct EnsureOnce<T> {
    inner: Mutex<Cell<Option<T>>>,
}

impl<T: Copy> EnsureOnce<T> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(None)),
        }
    }

    pub fn get(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Returns the stored value, or runs `init` and stores its result.
    ///
    /// `init` runs outside the critical section; failures are not stored, so
    /// the next call tries again.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let value = init()?;
        critical_section::with(|cs| self.inner.borrow(cs).set(Some(value)));
        Ok(value)
    }
}
