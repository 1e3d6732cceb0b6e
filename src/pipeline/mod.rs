//! Pipeline components: task queue, producer walk, copy workers, orchestration.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod queue;
pub mod walk;
pub mod workers;

pub use context::{PipelineContext, PipelineTuning, ProducerGroup, ProducerGuard, Shard};
pub use error_handler::{check_for_walk_error_or_failures, report_copy_failure};
pub use orchestrator::{
    PipelineHandles, abort_pipeline, run_copy, run_pipeline, setup_pipeline_roots,
    shutdown_pipeline_handles,
};
pub use queue::{BoundedQueue, QueueError, TaskQueue};
pub use walk::{
    SkipReason, TaskBatcher, WalkError, WalkOutcome, WalkSummary, discover, run_walk_loop,
    spawn_walk_thread, to_outcome_walkdir, walk,
};
pub use workers::{spawn_copy_workers, worker_loop};
