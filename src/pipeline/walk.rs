//! Producer: depth-first discovery of the source tree feeding batches into the task queue.
//!
//! Discovery ([`discover`]) is a lazy walkdir sequence of [`WalkOutcome`]s. [`run_walk_loop`]
//! consumes it: mirrors directories, counts and filters files, and hands tasks to a [`TaskBatcher`].

use log::{debug, error, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use walkdir::WalkDir;

use super::context::{PipelineContext, ProducerGroup, ProducerGuard};
use super::queue::{QueueError, TaskQueue};
use crate::CopyTask;
use crate::engine::sizing::size_for;
use crate::engine::tools::mirror_path;

/// One item from the directory walk.
#[derive(Debug)]
pub enum WalkOutcome {
    Dir(PathBuf),
    File { path: PathBuf, size: u64 },
    /// Entry that is neither copied nor counted.
    Skip { path: PathBuf, reason: SkipReason },
    /// A directory could not be listed. Ends discovery.
    Err { msg: String, path: Option<PathBuf> },
}

#[derive(Debug)]
pub enum SkipReason {
    /// Symlink, socket, FIFO or device.
    NotRegular,
    /// Metadata could not be read.
    Unreadable(String),
}

/// Directory-level failures. Any of these stops the producer.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("cannot list directory: {msg}")]
    ReadDir { msg: String, path: Option<PathBuf> },
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is outside the source root", .0.display())]
    OutsideRoot(PathBuf),
    #[error("cannot enqueue tasks: {0}")]
    Queue(#[from] QueueError),
}

/// What one producer did.
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Regular files seen by this producer, matched or not.
    pub files_seen: usize,
    pub tasks_queued: usize,
    pub dirs_created: usize,
    pub error: Option<WalkError>,
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                WalkOutcome::Dir(entry.into_path())
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(meta) => WalkOutcome::File {
                        path: entry.into_path(),
                        size: meta.len(),
                    },
                    Err(err) => WalkOutcome::Skip {
                        path: entry.into_path(),
                        reason: SkipReason::Unreadable(format!("{}", err)),
                    },
                }
            } else {
                WalkOutcome::Skip {
                    path: entry.into_path(),
                    reason: SkipReason::NotRegular,
                }
            }
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Lazy depth-first walk below `ctx.src_root` (root itself excluded), restricted to `ctx.shard`.
/// Directories come before their contents. Symlinks are not followed.
pub fn discover(ctx: &PipelineContext) -> impl Iterator<Item = WalkOutcome> {
    let shard = ctx.shard;
    WalkDir::new(&ctx.src_root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |e| e.depth() != 1 || shard.owns(e.file_name()))
        .map(to_outcome_walkdir)
}

/// Buffers tasks and moves them into the queue one full batch at a time.
pub struct TaskBatcher<'q> {
    queue: &'q TaskQueue,
    batch: Vec<CopyTask>,
    batch_size: usize,
    queued: usize,
}

impl<'q> TaskBatcher<'q> {
    pub fn new(queue: &'q TaskQueue, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            queue,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            queued: 0,
        }
    }

    /// Buffer `task`; enqueue the batch when it is full.
    pub fn push(&mut self, task: CopyTask) -> Result<(), QueueError> {
        self.batch.push(task);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Enqueue whatever is buffered. No-op when empty.
    pub fn flush(&mut self) -> Result<(), QueueError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        let n = batch.len();
        self.queue.enqueue_batch(batch)?;
        self.queued += n;
        Ok(())
    }

    /// Tasks successfully handed to the queue so far.
    pub fn queued(&self) -> usize {
        self.queued
    }
}

/// Create the mirrored directory. Returns true when it was created, false when a directory was
/// already there. Anything else at `dest` (a file, a dangling link) is a creation error.
fn mirror_dir(dest: &Path) -> Result<bool, WalkError> {
    match std::fs::create_dir(dest) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dest.is_dir() => Ok(false),
        Err(source) => Err(WalkError::CreateDir {
            path: dest.to_path_buf(),
            source,
        }),
    }
}

/// Run the walk loop: consume `iter`, mirror directories, count every regular file in
/// `files_counter`, queue the ones matching `ctx.filter`. The first directory-level error stops
/// discovery; the buffered partial batch is still flushed.
pub fn run_walk_loop<I>(
    ctx: &PipelineContext,
    files_counter: &AtomicUsize,
    queue: &TaskQueue,
    iter: I,
) -> WalkSummary
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut summary = WalkSummary::default();
    let mut batcher = TaskBatcher::new(queue, ctx.batch_size);

    let result = (|| -> Result<(), WalkError> {
        for outcome in iter {
            match outcome {
                WalkOutcome::Dir(path) => {
                    let dest = mirror_path(&path, &ctx.src_root, &ctx.dest_root)
                        .ok_or_else(|| WalkError::OutsideRoot(path.clone()))?;
                    if mirror_dir(&dest)? {
                        summary.dirs_created += 1;
                    }
                }
                WalkOutcome::File { path, size } => {
                    files_counter.fetch_add(1, Ordering::Relaxed);
                    summary.files_seen += 1;
                    if !ctx.filter.matches(&path) {
                        continue;
                    }
                    let dest = mirror_path(&path, &ctx.src_root, &ctx.dest_root)
                        .ok_or_else(|| WalkError::OutsideRoot(path.clone()))?;
                    batcher.push(CopyTask::new(path, dest, size_for(size)))?;
                }
                WalkOutcome::Skip { path, reason } => match reason {
                    SkipReason::NotRegular => {
                        debug!("skipping non-regular entry {}", path.display())
                    }
                    SkipReason::Unreadable(msg) => {
                        warn!("cannot get information for {}: {}", path.display(), msg)
                    }
                },
                WalkOutcome::Err { msg, path } => return Err(WalkError::ReadDir { msg, path }),
            }
        }
        Ok(())
    })();

    // best-effort on the error path: discovered work is still handed over
    let flushed = batcher.flush();
    summary.tasks_queued = batcher.queued();
    summary.error = match (result, flushed) {
        (Err(e), _) => Some(e),
        (Ok(()), Err(e)) => Some(e.into()),
        (Ok(()), Ok(())) => None,
    };
    summary
}

/// Walk the tree described by `ctx` into `queue`. Does not close the queue.
pub fn walk(ctx: &PipelineContext, files_counter: &AtomicUsize, queue: &TaskQueue) -> WalkSummary {
    run_walk_loop(ctx, files_counter, queue, discover(ctx))
}

/// Spawn one producer thread. When it finishes (or panics) it reports to `group`, and the last
/// producer closes the queue.
pub fn spawn_walk_thread(
    ctx: PipelineContext,
    files_counter: Arc<AtomicUsize>,
    queue: Arc<TaskQueue>,
    group: Arc<ProducerGroup>,
) -> io::Result<JoinHandle<WalkSummary>> {
    thread::Builder::new()
        .name(format!("producer-{}", ctx.id))
        .spawn(move || {
            let _guard = ProducerGuard(group);
            let summary = walk(&ctx, &files_counter, &queue);
            match &summary.error {
                None => debug!(
                    "producer #{}: walk finished, {} files seen, {} queued",
                    ctx.id, summary.files_seen, summary.tasks_queued
                ),
                Some(e) => error!("producer #{}: walk stopped: {}", ctx.id, e),
            }
            summary
        })
}
