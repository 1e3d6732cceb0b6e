//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker threads ----

/// Thread limits for pool sizing.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available processing units (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Producers used when nothing overrides it.
    pub default_producers: usize,
    /// Lowest worker count the pool is ever sized to.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            default_producers: Self::DEFAULT_PRODUCERS,
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const DEFAULT_PRODUCERS: usize = 1;
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    /// Call this at runtime when you need the effective available thread count.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads().max(Self::FLOOR_THREADS),
            ..Self::default()
        }
    }
}

// ---- Chunk sizing ----

/// I/O chunk bounds used by [`size_for`](crate::engine::sizing::size_for).
pub struct ChunkConsts;

impl ChunkConsts {
    pub const KIB: u64 = 1 << 10;
    pub const MIB: u64 = 1 << 20;
    /// Files below this size get a buffer just large enough to read them in one shot. 4 KiB.
    pub const MIN_CHUNK: u64 = 4 * Self::KIB;
    /// Geometric growth stops here. 8 MiB.
    pub const MAX_CHUNK: u64 = 8 * Self::MIB;
    /// Every chunk size is a multiple of this.
    pub const CHUNK_ALIGN: u64 = 64;
}

// ---- Batching ----

/// Batch sizes moved through the task queue in one locked operation.
pub struct BatchConsts;

impl BatchConsts {
    /// Tasks buffered by a producer before one `enqueue_batch`.
    pub const PRODUCER_BATCH_SIZE: usize = 32;
    /// Most tasks a worker takes per `dequeue_batch`.
    pub const WORKER_BATCH_SIZE: usize = 16;
}

/// Queue capacity for a pool of `workers`: one producer batch per worker.
pub fn queue_capacity_for(workers: usize, batch_size: usize) -> usize {
    batch_size.max(1) * workers.max(1)
}
