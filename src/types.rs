//! Public and internal types for the mirrorcp API and pipeline.

use serde::Serialize;
use std::path::PathBuf;

use crate::engine::copy::CopyError;

/// One file-copy unit of work. Built by the walker, moved through the queue, consumed once by a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// Chunk size picked at discovery time; never recomputed by workers.
    pub buffer_size: usize,
}

impl CopyTask {
    pub fn new(source: PathBuf, dest: PathBuf, buffer_size: usize) -> Self {
        Self {
            source,
            dest,
            buffer_size,
        }
    }
}

/// Per-worker counters. Owned by one worker while it runs; read after join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Files copied successfully.
    pub total_files: u64,
    /// Bytes written for successful copies.
    pub total_bytes: u64,
}

impl WorkerStats {
    /// Count one successful copy of `bytes`.
    pub fn record(&mut self, bytes: u64) {
        self.total_files += 1;
        self.total_bytes += bytes;
    }

    pub fn merge(&mut self, other: &WorkerStats) {
        self.total_files += other.total_files;
        self.total_bytes += other.total_bytes;
    }
}

/// A task that failed in the copy engine.
#[derive(Debug)]
pub struct CopyFailure {
    pub worker_id: usize,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub error: CopyError,
}

/// Aggregate result of one run. The gap between `files_checked` and `files_copied` is the failure signal.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Files copied (sum of all [`WorkerStats::total_files`]).
    pub files_copied: u64,
    /// Bytes copied (sum of all [`WorkerStats::total_bytes`]).
    pub bytes_copied: u64,
    /// Regular files seen by the walk, matched or not.
    pub files_checked: usize,
    /// Files that matched the filter and were queued.
    pub tasks_queued: usize,
    /// Mirrored directories created under the destination.
    pub dirs_created: usize,
    /// Number of tasks that failed in the copy engine.
    pub files_failed: usize,
    pub workers: usize,
    pub producers: usize,
    /// First directory-level walk error, if discovery stopped early.
    pub walk_error: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub failures: Vec<CopyFailure>,
}

impl RunReport {
    /// True when every queued file was copied and the walk finished.
    pub fn is_clean(&self) -> bool {
        self.walk_error.is_none() && self.failures.is_empty()
    }
}

/// Lib-only options for [`copy_tree`](crate::copy_tree). Every `None` falls back to the host-derived default.
#[derive(Clone, Debug, Default)]
pub struct CopyOpts {
    /// Worker thread count. When None, one per available processing unit.
    pub workers: Option<usize>,
    /// Producer (walker) thread count. When None, one.
    pub producers: Option<usize>,
    /// Tasks a producer buffers before one enqueue.
    pub batch_size: Option<usize>,
    /// Most tasks a worker takes per dequeue.
    pub worker_batch_size: Option<usize>,
    /// Queue capacity. When None, `batch_size * workers`.
    pub queue_capacity: Option<usize>,
}

impl From<&CopyOpts> for Opts {
    fn from(o: &CopyOpts) -> Self {
        Opts {
            workers: o.workers,
            producers: o.producers,
            batch_size: o.batch_size,
            worker_batch_size: o.worker_batch_size,
            queue_capacity: o.queue_capacity,
            verbose: false,
            strict: false,
            json: false,
        }
    }
}

/// Full options (CLI). Use [`CopyOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    pub workers: Option<usize>,
    pub producers: Option<usize>,
    pub batch_size: Option<usize>,
    pub worker_batch_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    /// Debug logging and per-failure listing in the summary.
    pub verbose: bool,
    /// Exit non-zero when any file failed or the walk stopped early.
    pub strict: bool,
    /// Print the summary as JSON.
    pub json: bool,
}
