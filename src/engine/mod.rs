//! Engine module for single-file operations: sizing, filtering, locking, copying, CLI.

pub mod arg_parser;
pub mod cli;
pub mod copy;
pub mod lock;
pub mod sizing;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use copy::{CopyEngine, CopyError, copy_file};
pub use lock::{LockedSource, PortableLocker, SourceLocker, default_locker};
pub use sizing::size_for;
pub use tools::{
    ExtensionFilter, WILDCARD_FILTER, check_extension, file_extension, is_blank, mirror_path,
    path_relative_to, resolve_planned_path,
};
