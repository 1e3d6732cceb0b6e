use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Install the colored stderr logger. Our crate logs at Info (Debug when `verbose`), dependencies at Warn.
/// Lines from pipeline threads carry the thread name (`producer-0`, `worker-3`).
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // try_init: lib callers and tests may already have a logger installed
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            let thread = std::thread::current();
            let origin = match thread.name() {
                Some(t) if t != "main" => format!(" {}", t.white()),
                _ => String::new(),
            };
            let level_str = match record.level() {
                Level::Error => Some("ERROR".red()),
                Level::Warn => Some("WARN".yellow()),
                _ => None,
            };
            match level_str {
                Some(lvl) => writeln!(buf, "[{} {}{}] {}", name, lvl, origin, record.args()),
                None => writeln!(buf, "[{}{}] {}", name, origin, record.args()),
            }
        })
        .try_init();
}

/// Summary line colors.
pub struct Colors;

impl Colors {
    pub const COPIED: &'static str = "green";
    pub const CHECKED: &'static str = "blue";
    pub const BYTES: &'static str = "cyan";
    pub const ELAPSED: &'static str = "magenta";
    pub const FAILED: &'static str = "red";

    pub fn colorize(color: &str, text: &str) -> ColoredString {
        text.color(color)
    }
}
