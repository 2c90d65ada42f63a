//! Scoped ownership of the native engine handle.

use std::ops::Deref;
use std::sync::{RwLock, RwLockReadGuard};

use tracing::debug;

use super::NativeEngine;
use crate::error::EngineError;

/// Owns a native engine and closes it exactly once.
///
/// The engine is closed on the first call to [`release`](Self::release) or
/// when the handle is dropped, whichever comes first. Every borrow holds a
/// read lock and closing takes the write lock, so the engine is never closed
/// while a call is in flight.
pub struct EngineHandle<E: NativeEngine> {
    engine: E,
    released: RwLock<bool>,
}

/// A borrow of an open engine. The engine stays open until it is dropped.
pub struct EngineGuard<'a, E: NativeEngine> {
    engine: &'a E,
    _open: RwLockReadGuard<'a, bool>,
}

impl<E: NativeEngine> Deref for EngineGuard<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E: NativeEngine> EngineHandle<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            released: RwLock::new(false),
        }
    }

    /// Borrows the engine while the handle is still open.
    pub fn get(&self) -> Result<EngineGuard<'_, E>, EngineError> {
        let open = self.released.read().unwrap_or_else(|p| p.into_inner());
        if *open {
            return Err(EngineError::HandleClosed);
        }
        Ok(EngineGuard {
            engine: &self.engine,
            _open: open,
        })
    }

    /// Closes the engine once outstanding borrows end. Returns `false` if it
    /// was already closed.
    pub fn release(&self) -> bool {
        let mut released = self.released.write().unwrap_or_else(|p| p.into_inner());
        if *released {
            return false;
        }
        *released = true;
        debug!("Releasing native engine handle");
        self.engine.close();
        true
    }

    pub fn is_released(&self) -> bool {
        *self.released.read().unwrap_or_else(|p| p.into_inner())
    }
}

impl<E: NativeEngine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        self.release();
    }
}
