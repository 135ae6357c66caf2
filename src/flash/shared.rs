//! Shared flash handle
//!
//! The engine assumes exclusive access to its adapter for the duration of
//! each call. When more than one owner needs the same device (a second
//! store instance on another partition, a diagnostics task), the lock goes
//! here rather than into the engine.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{Flash, FlashResult};

/// Cloneable, mutex-guarded adapter
pub struct SharedFlash<F> {
    inner: Arc<Mutex<F>>,
}

impl<F> SharedFlash<F> {
    pub fn new(flash: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(flash)),
        }
    }

    /// Lock the underlying device directly
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.inner.lock()
    }
}

impl<F> Clone for SharedFlash<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Flash> Flash for SharedFlash<F> {
    fn init(&mut self) -> FlashResult<()> {
        self.inner.lock().init()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> FlashResult<()> {
        self.inner.lock().read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> FlashResult<()> {
        self.inner.lock().write(address, data)
    }

    fn erase(&mut self, address: u32, len: u32) -> FlashResult<()> {
        self.inner.lock().erase(address, len)
    }
}
