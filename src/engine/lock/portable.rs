//! Portable locking via the std file-lock API (`flock` on Unix, `LockFileEx` on Windows).

use super::SourceLocker;
use std::fs::File;
use std::io;

#[derive(Clone, Copy, Debug, Default)]
pub struct PortableLocker;

impl SourceLocker for PortableLocker {
    fn try_lock_shared(&self, file: &File) -> io::Result<()> {
        file.try_lock_shared().map_err(io::Error::from)
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        file.unlock()
    }

    fn name(&self) -> &'static str {
        "std"
    }
}
