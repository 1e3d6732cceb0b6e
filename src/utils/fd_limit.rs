//! Caps the copy pool so open sources, destinations and walker handles stay under the FD limit (Unix).

use log::debug;

/// Descriptors one copy worker holds mid-copy: the locked source and the destination.
pub const FDS_PER_WORKER: usize = 2;

/// Directory handles one walker keeps open (walkdir's default `max_open`).
pub const FDS_PER_PRODUCER: usize = 10;

/// Share of the soft limit the pipeline may use; the rest is left to std handles and the caller.
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Soft `RLIMIT_NOFILE`, or `None` when unlimited or unknown.
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let soft = unsafe { rlim.assume_init() }.rlim_cur;
    if soft == libc::RLIM_INFINITY || soft > i64::MAX as u64 {
        return None;
    }
    Some(soft)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Most copy workers that fit next to `producers` walkers. `None` when there is no limit to respect.
pub fn max_workers_by_fd_limit(producers: usize) -> Option<usize> {
    let budget = (max_open_fds()? as f64 * FD_LIMIT_FRACTION) as usize;
    let for_workers = budget.saturating_sub(producers * FDS_PER_PRODUCER);
    Some((for_workers / FDS_PER_WORKER).max(1))
}

/// Lower `requested` workers to what the FD limit allows. Never raises it, never returns 0.
pub fn determine_threads_given_fd_limit(requested: usize, producers: usize) -> usize {
    let requested = requested.max(1);
    match max_workers_by_fd_limit(producers) {
        Some(cap) if cap < requested => {
            debug!("Capping workers {requested} -> {cap} (FD limit ~80%)");
            cap
        }
        _ => requested,
    }
}
