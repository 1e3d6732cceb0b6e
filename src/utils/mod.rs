pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod mirrorcp_toml;

pub use config::*;
pub use fd_limit::{
    FDS_PER_PRODUCER, FDS_PER_WORKER, determine_threads_given_fd_limit, max_open_fds,
    max_workers_by_fd_limit,
};
pub use logger::{Colors, setup_logging};
pub use mirrorcp_toml::{
    MirrorcpToml, apply_file_to_opts, default_config_path, parse_mirrorcp_toml, read_mirrorcp_toml,
};
