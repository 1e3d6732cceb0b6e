//! Copy workers: pop task batches from the queue and run each through the copy engine.

use crossbeam_channel::Sender;
use log::debug;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::error_handler::report_copy_failure;
use super::queue::TaskQueue;
use crate::engine::copy::CopyEngine;
use crate::{CopyFailure, WorkerStats};

/// Single worker: drain batches until the queue reports closed. A failed task is reported on
/// `failure_tx` and the worker moves on to the next one. Returns this worker's totals.
pub fn worker_loop(
    id: usize,
    queue: &TaskQueue,
    engine: CopyEngine<'_>,
    worker_batch_size: usize,
    failure_tx: &Sender<CopyFailure>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(batch) = queue.dequeue_batch(worker_batch_size) {
        for task in batch {
            if let Err(error) = engine.copy_task(&task, &mut stats) {
                let failure = CopyFailure {
                    worker_id: id,
                    source: task.source,
                    dest: task.dest,
                    error,
                };
                report_copy_failure(&failure);
                let _ = failure_tx.send(failure);
            }
        }
    }
    debug!(
        "worker #{} finished: {} files, {} bytes",
        id, stats.total_files, stats.total_bytes
    );
    stats
}

/// Spawn `num_workers` copy workers on `queue` into `handles`. Each returns its [`WorkerStats`]
/// on join. On a spawn error the workers started so far stay in `handles` for the caller to join.
/// Caller must drop its `failure_tx` after this so the failure channel closes when workers exit.
pub fn spawn_copy_workers(
    queue: &Arc<TaskQueue>,
    failure_tx: &Sender<CopyFailure>,
    num_workers: usize,
    worker_batch_size: usize,
    handles: &mut Vec<JoinHandle<WorkerStats>>,
) -> io::Result<()> {
    handles.reserve(num_workers);
    for id in 0..num_workers {
        let queue = Arc::clone(queue);
        let failure_tx = failure_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || {
                worker_loop(
                    id,
                    &queue,
                    CopyEngine::default(),
                    worker_batch_size,
                    &failure_tx,
                )
            })?;
        handles.push(handle);
    }
    Ok(())
}
