use clap::Parser;
use std::path::PathBuf;

/// Parallel, filtered, recursive directory copier.
#[derive(Clone, Parser)]
#[command(name = "mirrorcp")]
#[command(about = "Mirror SOURCE into DEST, copying only files whose extension matches FILTER (\"all\" for every file).")]
pub struct Cli {
    /// Source directory to mirror.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination directory. Created if missing; existing files in it are never overwritten.
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// Extension to copy, without the dot (case-insensitive). "all" copies every file.
    #[arg(value_name = "FILTER")]
    pub filter: String,

    /// Worker thread count. Default: one per available processing unit.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Producer (directory walker) thread count. Default: 1.
    #[arg(long, short = 'p', value_parser = clap::value_parser!(usize))]
    pub producers: Option<usize>,

    /// Tasks a producer buffers before handing a batch to the queue.
    #[arg(long, short = 'b', value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Most tasks a worker takes from the queue at once.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub worker_batch_size: Option<usize>,

    /// Queue capacity in tasks. Must be at least the batch size.
    #[arg(long, short = 'q', value_parser = clap::value_parser!(usize))]
    pub queue_capacity: Option<usize>,

    /// Config file. Default: `.mirrorcp.toml` in the current directory.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Strict mode: exit non-zero if any file failed to copy or the walk stopped early.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Print the final summary as JSON.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,
}
