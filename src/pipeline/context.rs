//! Pipeline context and tuning: immutable config handed to each producer and worker at spawn time.

use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::ffi::OsStr;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::queue::TaskQueue;
use crate::Opts;
use crate::engine::tools::ExtensionFilter;
use crate::utils::config::{BatchConsts, WorkerThreadLimits, queue_capacity_for};
use crate::utils::fd_limit::determine_threads_given_fd_limit;

/// Pool sizing and batch sizes for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTuning {
    pub workers: usize,
    pub producers: usize,
    /// Tasks a producer buffers before one enqueue. Always `<= queue_capacity`.
    pub batch_size: usize,
    /// Most tasks a worker takes per dequeue.
    pub worker_batch_size: usize,
    pub queue_capacity: usize,
}

impl PipelineTuning {
    /// Resolve `opts` against host limits: workers default to one per processing unit (FD-capped),
    /// one producer, queue capacity one producer batch per worker.
    pub fn resolve(opts: &Opts, limits: &WorkerThreadLimits) -> Result<Self> {
        let producers = opts.producers.unwrap_or(limits.default_producers).max(1);
        let workers = determine_threads_given_fd_limit(
            opts.workers
                .unwrap_or(limits.all_threads)
                .max(limits.floor),
            producers,
        );
        let batch_size = opts
            .batch_size
            .unwrap_or(BatchConsts::PRODUCER_BATCH_SIZE)
            .max(1);
        let worker_batch_size = opts
            .worker_batch_size
            .unwrap_or(BatchConsts::WORKER_BATCH_SIZE)
            .max(1);
        let queue_capacity = opts
            .queue_capacity
            .unwrap_or_else(|| queue_capacity_for(workers, batch_size));
        if queue_capacity == 0 {
            anyhow::bail!("queue capacity must be at least 1");
        }
        if batch_size > queue_capacity {
            anyhow::bail!(
                "batch size {} exceeds queue capacity {}; a full batch could never be enqueued",
                batch_size,
                queue_capacity
            );
        }
        Ok(Self {
            workers,
            producers,
            batch_size,
            worker_batch_size,
            queue_capacity,
        })
    }
}

/// Which top-level entries of the source root one producer owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub count: usize,
}

impl Shard {
    /// The whole tree, for a single producer.
    pub const WHOLE: Shard = Shard { index: 0, count: 1 };

    /// True when this shard owns the top-level entry `name`. Shards of one `count` partition all names.
    pub fn owns(&self, name: &OsStr) -> bool {
        if self.count <= 1 {
            return true;
        }
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        (hasher.finish() % self.count as u64) as usize == self.index
    }
}

/// Shared context for one producer. Built in `run_pipeline` and moved into the walk thread.
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub id: usize,
    pub src_root: PathBuf,
    pub dest_root: PathBuf,
    pub filter: ExtensionFilter,
    pub batch_size: usize,
    pub shard: Shard,
}

/// Countdown over live producers. The last one to finish closes the queue, exactly once.
pub struct ProducerGroup {
    remaining: AtomicUsize,
    queue: Arc<TaskQueue>,
}

impl ProducerGroup {
    pub fn new(producers: usize, queue: Arc<TaskQueue>) -> Self {
        Self {
            remaining: AtomicUsize::new(producers),
            queue,
        }
    }

    /// Mark one producer done. Returns true for the call that signalled shutdown.
    pub fn finish(&self) -> bool {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.queue.signal_shutdown();
            return true;
        }
        false
    }
}

/// Calls [`ProducerGroup::finish`] on drop, so a panicking walk still closes the queue.
pub struct ProducerGuard(pub Arc<ProducerGroup>);

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}
