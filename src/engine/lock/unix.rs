//! Unix locking via non-blocking `fcntl(F_SETLK)` whole-file record locks.

use super::SourceLocker;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// `F_RDLCK` via `F_SETLK`: fails with EACCES/EAGAIN instead of waiting when another process holds a write lock.
#[derive(Clone, Copy, Debug, Default)]
pub struct FcntlLocker;

fn set_lock(file: &File, lock_type: libc::c_short) -> io::Result<()> {
    // l_start = 0 and l_len = 0 cover the whole file
    let mut fl: libc::flock = unsafe { std::mem::zeroed() };
    fl.l_type = lock_type;
    fl.l_whence = libc::SEEK_SET as libc::c_short;
    if unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLK, &fl) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl SourceLocker for FcntlLocker {
    fn try_lock_shared(&self, file: &File) -> io::Result<()> {
        set_lock(file, libc::F_RDLCK as libc::c_short)
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        set_lock(file, libc::F_UNLCK as libc::c_short)
    }

    fn name(&self) -> &'static str {
        "fcntl"
    }
}
