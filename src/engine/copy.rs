//! File copy engine: one locked, exclusive-create, chunked copy per call.

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::engine::lock::{LockedSource, SourceLocker, default_locker};
use crate::{CopyTask, WorkerStats};

/// Why a single file was not copied. Every variant is per-file and non-fatal to the run.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("cannot open source: {0}")]
    SourceOpen(#[source] io::Error),
    #[error("cannot lock source: {0}")]
    LockFailed(#[source] io::Error),
    #[error("cannot stat source: {0}")]
    SourceStatFailed(#[source] io::Error),
    #[error("destination already exists")]
    DestinationExists,
    #[error("cannot create destination: {0}")]
    DestinationOpen(#[source] io::Error),
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("cannot allocate {0} byte chunk buffer")]
    OutOfMemory(usize),
}

impl CopyError {
    /// OS error code behind this failure, when there is one.
    pub fn code(&self) -> Option<i32> {
        match self {
            CopyError::SourceOpen(e)
            | CopyError::LockFailed(e)
            | CopyError::SourceStatFailed(e)
            | CopyError::DestinationOpen(e)
            | CopyError::ReadFailed(e)
            | CopyError::WriteFailed(e) => e.raw_os_error(),
            CopyError::DestinationExists => Some(libc::EEXIST),
            CopyError::OutOfMemory(_) => Some(libc::ENOMEM),
        }
    }
}

/// Copies files with a fixed source locker. Cheap to share; holds no per-file state.
#[derive(Clone, Copy)]
pub struct CopyEngine<'a> {
    locker: &'a dyn SourceLocker,
}

impl Default for CopyEngine<'static> {
    fn default() -> Self {
        Self::new(default_locker())
    }
}

impl<'a> CopyEngine<'a> {
    pub fn new(locker: &'a dyn SourceLocker) -> Self {
        Self { locker }
    }

    /// Copy `task` and record it in `stats` on success.
    pub fn copy_task(&self, task: &CopyTask, stats: &mut WorkerStats) -> Result<u64, CopyError> {
        self.copy(&task.source, &task.dest, task.buffer_size, stats)
    }

    /// Copy `src` to a new file at `dest` in `chunk_size` pieces. Returns bytes written.
    ///
    /// The source is held under a shared lock for the whole copy. `dest` must not exist; an
    /// existing file there is left untouched and the call fails with [`CopyError::DestinationExists`].
    /// `stats` only changes when the copy completes. A destination created by this call is removed
    /// again if the copy fails part way.
    pub fn copy(
        &self,
        src: &Path,
        dest: &Path,
        chunk_size: usize,
        stats: &mut WorkerStats,
    ) -> Result<u64, CopyError> {
        let chunk_size = chunk_size.max(1);
        let file = File::open(src).map_err(CopyError::SourceOpen)?;
        let source = LockedSource::acquire(file, self.locker).map_err(CopyError::LockFailed)?;
        let meta = source
            .file()
            .metadata()
            .map_err(CopyError::SourceStatFailed)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(chunk_size)
            .map_err(|_| CopyError::OutOfMemory(chunk_size))?;
        buffer.resize(chunk_size, 0);

        let mut out = open_destination(dest, &meta)?;
        match stream(source.file(), &mut out, &mut buffer) {
            Ok(total) => {
                stats.record(total);
                Ok(total)
            }
            Err(e) => {
                drop(out);
                if let Err(rm) = std::fs::remove_file(dest) {
                    debug!("cannot remove partial {}: {}", dest.display(), rm);
                }
                Err(e)
            }
        }
    }
}

/// Copy with the platform's default locker.
pub fn copy_file(task: &CopyTask, stats: &mut WorkerStats) -> Result<u64, CopyError> {
    CopyEngine::default().copy_task(task, stats)
}

/// Create `dest` exclusively. On Unix it gets the source's permission bits.
fn open_destination(dest: &Path, source_meta: &std::fs::Metadata) -> Result<File, CopyError> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        opts.mode(source_meta.permissions().mode());
    }
    #[cfg(not(unix))]
    let _ = source_meta;
    opts.open(dest).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => CopyError::DestinationExists,
        _ => CopyError::DestinationOpen(e),
    })
}

/// Read `src` to end in `buffer`-sized chunks, writing each chunk fully before the next read.
fn stream(mut src: &File, out: &mut File, buffer: &mut [u8]) -> Result<u64, CopyError> {
    let mut total = 0_u64;
    loop {
        let n = match src.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::ReadFailed(e)),
        };
        // write_all loops short writes and turns a zero-length write into WriteZero
        out.write_all(&buffer[..n])
            .map_err(CopyError::WriteFailed)?;
        total += n as u64;
    }
    Ok(total)
}
