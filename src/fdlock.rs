//! Lock on a descriptor owned by someone else.
//!
//! Used for long-lived files a component already keeps open (a store-wide
//! GC lock, a temp-roots file): the guard only takes the lock, it never
//! opens, closes or unlocks the file. The lock lasts until the owner
//! unlocks or closes the descriptor.

use std::fs::File;

use log::info;

use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::lock::{lock_file, AdvisoryLock, LockType};
use crate::metrics;

/// Outcome of locking a borrowed descriptor.
#[derive(Debug)]
pub struct FdLock<'a, L: AdvisoryLock + ?Sized = File> {
    fd: &'a L,
    lock_type: LockType,
    acquired: bool,
}

impl<'a, L: AdvisoryLock + ?Sized> FdLock<'a, L> {
    /// Lock `fd` as `lock_type`.
    ///
    /// With `wait`, a busy descriptor logs `wait_msg` (if any) and blocks;
    /// without it a single non-blocking attempt decides [`acquired`](Self::acquired).
    pub fn new(fd: &'a L, lock_type: LockType, wait: bool, wait_msg: &str) -> Result<Self> {
        Self::with_interrupt(fd, lock_type, wait, wait_msg, &Interrupt::new())
    }

    pub fn with_interrupt(
        fd: &'a L,
        lock_type: LockType,
        wait: bool,
        wait_msg: &str,
        interrupt: &Interrupt,
    ) -> Result<Self> {
        let mut acquired = lock_file(fd, lock_type, false, interrupt)?;
        if !acquired {
            metrics::record_contended();
            if wait {
                if !wait_msg.is_empty() {
                    info!("{}", wait_msg);
                }
                metrics::record_wait();
                acquired = lock_file(fd, lock_type, true, interrupt)?;
            }
        }
        if acquired {
            metrics::record_acquired();
        }

        Ok(Self {
            fd,
            lock_type,
            acquired,
        })
    }

    pub fn acquired(&self) -> bool {
        self.acquired
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    /// The borrowed descriptor.
    pub fn fd(&self) -> &'a L {
        self.fd
    }
}
