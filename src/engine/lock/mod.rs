//! Source-file locking capability.
//!
//! The copy engine only sees [`SourceLocker`]; the implementation is picked per target by
//! [`default_locker`]. Every implementation is non-blocking: a contended lock is an error, never a wait.

use log::debug;
use std::fs::File;
use std::io;

// Platform-specific modules
#[cfg(unix)]
mod unix;

mod portable;

pub use portable::PortableLocker;
#[cfg(unix)]
pub use unix::FcntlLocker;

/// Shared (read) lock on an open source file. Detects concurrent exclusive holders; readers never block each other.
pub trait SourceLocker: Send + Sync {
    /// Try to take a shared lock on the whole file without waiting.
    fn try_lock_shared(&self, file: &File) -> io::Result<()>;

    /// Release a lock taken by [`try_lock_shared`](Self::try_lock_shared).
    fn unlock(&self, file: &File) -> io::Result<()>;

    fn name(&self) -> &'static str;
}

/// Locker for the current target: `fcntl` record locks on Unix, std file locks elsewhere.
pub fn default_locker() -> &'static dyn SourceLocker {
    #[cfg(unix)]
    {
        static LOCKER: FcntlLocker = FcntlLocker;
        &LOCKER
    }

    #[cfg(not(unix))]
    {
        static LOCKER: PortableLocker = PortableLocker;
        &LOCKER
    }
}

/// An open source file holding a shared lock. The lock is released on drop, before the handle closes.
pub struct LockedSource<'a> {
    file: File,
    locker: &'a dyn SourceLocker,
}

impl<'a> LockedSource<'a> {
    /// Lock `file` with `locker`. On failure the file is closed and the lock error returned.
    pub fn acquire(file: File, locker: &'a dyn SourceLocker) -> io::Result<Self> {
        locker.try_lock_shared(&file)?;
        Ok(Self { file, locker })
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for LockedSource<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.locker.unlock(&self.file) {
            debug!("{} unlock failed: {}", self.locker.name(), e);
        }
    }
}
