use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::engine::tools::{ExtensionFilter, check_source_and_canonicalize, prepare_dest_root};
use crate::pipeline::{
    PipelineContext, PipelineTuning, ProducerGroup, Shard, TaskQueue, WalkSummary,
    spawn_copy_workers, spawn_walk_thread,
};
use crate::utils::config::WorkerThreadLimits;
use crate::{CopyFailure, Opts, RunReport, WorkerStats};

/// Handles returned by [`run_pipeline`]: join with [`shutdown_pipeline_handles`] to get the report.
pub struct PipelineHandles {
    pub queue: Arc<TaskQueue>,
    pub producer_handles: Vec<JoinHandle<WalkSummary>>,
    pub worker_handles: Vec<JoinHandle<WorkerStats>>,
    pub failure_rx: Receiver<CopyFailure>,
    pub files_counter: Arc<AtomicUsize>,
    pub tuning: PipelineTuning,
    pub started: Instant,
}

/// Canonicalize the source, create the destination root. Both must be settled before any thread starts.
pub fn setup_pipeline_roots(source: &Path, dest: &Path) -> Result<(PathBuf, PathBuf)> {
    let src_root = check_source_and_canonicalize(source)?;
    let dest_root = prepare_dest_root(dest, &src_root)?;
    Ok((src_root, dest_root))
}

/// Start producers and workers over one shared queue. On a spawn failure the threads already
/// started are shut down and joined before the setup error is returned.
pub fn run_pipeline(
    src_root: &Path,
    dest_root: &Path,
    filter: &ExtensionFilter,
    tuning: &PipelineTuning,
) -> Result<PipelineHandles> {
    info!("Using {} worker threads", tuning.workers);
    debug!(
        "Creating a task queue with {} capacity ({} producers, batch {}, worker batch {})",
        tuning.queue_capacity, tuning.producers, tuning.batch_size, tuning.worker_batch_size
    );
    let queue = Arc::new(TaskQueue::new(tuning.queue_capacity).context("create task queue")?);
    let files_counter = Arc::new(AtomicUsize::new(0));
    let (failure_tx, failure_rx) = unbounded::<CopyFailure>();
    let group = Arc::new(ProducerGroup::new(tuning.producers, Arc::clone(&queue)));

    let started = Instant::now();
    let mut producer_handles = Vec::with_capacity(tuning.producers);
    for id in 0..tuning.producers {
        let ctx = PipelineContext {
            id,
            src_root: src_root.to_path_buf(),
            dest_root: dest_root.to_path_buf(),
            filter: filter.clone(),
            batch_size: tuning.batch_size,
            shard: Shard {
                index: id,
                count: tuning.producers,
            },
        };
        match spawn_walk_thread(
            ctx,
            Arc::clone(&files_counter),
            Arc::clone(&queue),
            Arc::clone(&group),
        ) {
            Ok(h) => producer_handles.push(h),
            Err(e) => {
                abort_pipeline(&queue, producer_handles, Vec::new());
                return Err(e).with_context(|| format!("cannot create producer #{id}"));
            }
        }
    }

    let mut worker_handles = Vec::new();
    if let Err(e) = spawn_copy_workers(
        &queue,
        &failure_tx,
        tuning.workers,
        tuning.worker_batch_size,
        &mut worker_handles,
    ) {
        abort_pipeline(&queue, producer_handles, worker_handles);
        return Err(e).context("cannot create copy workers");
    }

    // Dropping the last sender here lets the failure channel close once workers exit.
    drop(failure_tx);

    Ok(PipelineHandles {
        queue,
        producer_handles,
        worker_handles,
        failure_rx,
        files_counter,
        tuning: tuning.clone(),
        started,
    })
}

/// Close the queue and join every thread already started. Used when setup fails part way;
/// a blocked producer is released by the shutdown and workers drain what was queued.
pub fn abort_pipeline(
    queue: &TaskQueue,
    producer_handles: Vec<JoinHandle<WalkSummary>>,
    worker_handles: Vec<JoinHandle<WorkerStats>>,
) {
    queue.signal_shutdown();
    for h in worker_handles {
        if h.join().is_err() {
            warn!("worker thread panicked during pipeline abort");
        }
    }
    for h in producer_handles {
        if h.join().is_err() {
            warn!("producer thread panicked during pipeline abort");
        }
    }
}

/// Join workers, then producers, and fold their results into a [`RunReport`].
pub fn shutdown_pipeline_handles(handles: PipelineHandles) -> Result<RunReport> {
    let PipelineHandles {
        queue,
        producer_handles,
        worker_handles,
        failure_rx,
        files_counter,
        tuning,
        started,
    } = handles;

    let mut totals = WorkerStats::default();
    for h in worker_handles {
        let stats = h
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
        totals.merge(&stats);
    }

    let mut report = RunReport {
        workers: tuning.workers,
        producers: tuning.producers,
        ..RunReport::default()
    };
    for h in producer_handles {
        let summary = h
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
        report.tasks_queued += summary.tasks_queued;
        report.dirs_created += summary.dirs_created;
        if let Some(e) = summary.error
            && report.walk_error.is_none()
        {
            report.walk_error = Some(e.to_string());
        }
    }
    debug!("main: all threads joined, queue drained: {}", queue.is_empty());

    report.failures = failure_rx.iter().collect();
    report.files_failed = report.failures.len();
    report.files_copied = totals.total_files;
    report.bytes_copied = totals.total_bytes;
    report.files_checked = files_counter.load(Ordering::Relaxed);
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    Ok(report)
}

/// Main orchestrator: mirror `source` into `dest`, copying files matching `filter`.
/// Setup problems are errors; per-file failures and walk errors land in the report.
pub fn run_copy(
    source: &Path,
    dest: &Path,
    filter: &ExtensionFilter,
    opts: &Opts,
) -> Result<RunReport> {
    let (src_root, dest_root) = setup_pipeline_roots(source, dest)?;
    let tuning = PipelineTuning::resolve(opts, &WorkerThreadLimits::current())?;
    let handles = run_pipeline(&src_root, &dest_root, filter, &tuning)?;
    let report = shutdown_pipeline_handles(handles)?;
    debug!(
        "copy of {} finished: {} copied, {} checked, {} failed",
        src_root.display(),
        report.files_copied,
        report.files_checked,
        report.files_failed
    );
    Ok(report)
}
