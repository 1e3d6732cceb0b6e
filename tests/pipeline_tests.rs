use anyhow::Result;
use crossbeam_channel::unbounded;
use mirrorcp::engine::{CopyEngine, ExtensionFilter, resolve_planned_path, size_for};
use mirrorcp::pipeline::{
    PipelineContext, ProducerGroup, Shard, TaskQueue, WalkError, WalkOutcome, abort_pipeline,
    run_copy, run_walk_loop, spawn_walk_thread, worker_loop,
};
use mirrorcp::{CopyFailure, CopyOpts, CopyTask, Opts, copy_tree};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// src/{a.txt, b.log, sub/c.txt}
fn small_tree(root: &Path) -> Result<PathBuf> {
    let src = root.join("src");
    fs::create_dir_all(src.join("sub"))?;
    fs::write(src.join("a.txt"), b"alpha")?;
    fs::write(src.join("b.log"), b"bravo")?;
    fs::write(src.join("sub").join("c.txt"), b"charlie")?;
    Ok(src)
}

/// Several top-level directories so multiple producers each get a share.
fn wide_tree(root: &Path) -> Result<PathBuf> {
    let src = root.join("wide");
    for d in 0..6 {
        let dir = src.join(format!("dir{d}")).join("nested");
        fs::create_dir_all(&dir)?;
        for f in 0..5 {
            fs::write(dir.join(format!("f{f}.dat")), vec![d as u8; 100 * f + 1])?;
            fs::write(dir.join(format!("f{f}.skip")), b"no")?;
        }
    }
    fs::write(src.join("top.dat"), b"top level")?;
    Ok(src)
}

fn opts(workers: usize) -> CopyOpts {
    CopyOpts {
        workers: Some(workers),
        ..CopyOpts::default()
    }
}

#[test]
fn test_copy_tree_filters_by_extension() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");

    let report = copy_tree(&src, &dest, "txt", &opts(2))?;

    assert_eq!(report.files_copied, 2);
    assert_eq!(report.files_checked, 3);
    assert_eq!(report.tasks_queued, 2);
    assert_eq!(report.bytes_copied, 5 + 7);
    assert!(report.is_clean());
    assert_eq!(fs::read(dest.join("a.txt"))?, b"alpha");
    assert_eq!(fs::read(dest.join("sub").join("c.txt"))?, b"charlie");
    assert!(!dest.join("b.log").exists());
    Ok(())
}

#[test]
fn test_copy_tree_all_copies_everything() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");

    let report = copy_tree(&src, &dest, "all", &opts(1))?;

    assert_eq!(report.files_copied, 3);
    assert_eq!(report.files_checked, 3);
    assert_eq!(report.dirs_created, 1);
    assert_eq!(fs::read(dest.join("b.log"))?, b"bravo");
    Ok(())
}

#[test]
fn test_no_match_still_mirrors_directories() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");

    let report = copy_tree(&src, &dest, "rs", &opts(2))?;

    assert_eq!(report.files_copied, 0);
    assert_eq!(report.files_checked, 3);
    assert!(dest.join("sub").is_dir());
    Ok(())
}

#[test]
fn test_empty_source_tree() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("empty");
    fs::create_dir(&src)?;
    let dest = dir.path().join("dest");

    let report = copy_tree(&src, &dest, "all", &opts(4))?;

    assert_eq!(report.files_copied, 0);
    assert_eq!(report.files_checked, 0);
    assert!(dest.is_dir());
    Ok(())
}

#[test]
fn test_worker_count_does_not_change_result() -> Result<()> {
    let dir = TempDir::new()?;
    let src = wide_tree(dir.path())?;

    let mut seen = Vec::new();
    for workers in [1, 2, 8] {
        let dest = dir.path().join(format!("dest{workers}"));
        let report = copy_tree(&src, &dest, "dat", &opts(workers))?;
        assert_eq!(report.workers, workers);
        assert!(report.is_clean());
        assert_eq!(
            fs::read(dest.join("dir3").join("nested").join("f4.dat"))?,
            vec![3_u8; 401]
        );
        seen.push((report.files_copied, report.files_checked, report.bytes_copied));
    }
    assert_eq!(seen[0], (31, 61, 6 * (1 + 101 + 201 + 301 + 401) + 9));
    assert!(seen.iter().all(|s| *s == seen[0]));
    Ok(())
}

#[test]
fn test_small_batches_and_tiny_queue() -> Result<()> {
    let dir = TempDir::new()?;
    let src = wide_tree(dir.path())?;
    let dest = dir.path().join("dest");

    let report = copy_tree(
        &src,
        &dest,
        "all",
        &CopyOpts {
            workers: Some(3),
            batch_size: Some(2),
            worker_batch_size: Some(1),
            queue_capacity: Some(2),
            ..CopyOpts::default()
        },
    )?;

    assert_eq!(report.files_copied, 61);
    assert_eq!(report.files_checked, 61);
    Ok(())
}

#[test]
fn test_multiple_producers_cover_the_tree_once() -> Result<()> {
    let dir = TempDir::new()?;
    let src = wide_tree(dir.path())?;
    let dest = dir.path().join("dest");

    let report = copy_tree(
        &src,
        &dest,
        "dat",
        &CopyOpts {
            workers: Some(4),
            producers: Some(3),
            ..CopyOpts::default()
        },
    )?;

    assert_eq!(report.producers, 3);
    assert_eq!(report.files_copied, 31);
    assert_eq!(report.files_checked, 61);
    assert_eq!(report.dirs_created, 12);
    assert!(report.is_clean());
    Ok(())
}

#[test]
fn test_existing_destination_file_is_a_per_file_failure() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;
    fs::write(dest.join("a.txt"), b"old")?;

    let report = copy_tree(&src, &dest, "txt", &opts(2))?;

    assert_eq!(report.files_checked, 3);
    assert_eq!(report.files_copied, 1);
    assert_eq!(report.files_failed, 1);
    assert!(report.walk_error.is_none());
    assert!(!report.is_clean());
    assert!(report.failures[0].source.ends_with("a.txt"));
    assert_eq!(fs::read(dest.join("a.txt"))?, b"old");
    assert_eq!(fs::read(dest.join("sub").join("c.txt"))?, b"charlie");
    Ok(())
}

#[test]
fn test_rerun_into_same_destination_fails_every_file() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");

    copy_tree(&src, &dest, "all", &opts(2))?;
    let again = copy_tree(&src, &dest, "all", &opts(2))?;

    assert_eq!(again.files_copied, 0);
    assert_eq!(again.files_failed, 3);
    assert_eq!(again.dirs_created, 0);
    Ok(())
}

#[test]
fn test_destination_inside_source_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;

    assert!(copy_tree(&src, &src.join("backup"), "all", &opts(1)).is_err());
    assert!(!src.join("backup").exists());
    assert!(copy_tree(&src, &src.join("deep").join("backup"), "all", &opts(1)).is_err());
    assert!(!src.join("deep").exists());
    assert!(copy_tree(&src, &src.join("sub").join(".."), "all", &opts(1)).is_err());
    assert!(copy_tree(&src, &src, "all", &opts(1)).is_err());
    Ok(())
}

#[test]
fn test_resolve_planned_path() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().canonicalize()?;
    fs::create_dir(root.join("present"))?;

    assert_eq!(resolve_planned_path(&root.join("present"))?, root.join("present"));
    assert_eq!(
        resolve_planned_path(&root.join("present").join("a").join("b"))?,
        root.join("present").join("a").join("b")
    );
    assert!(!root.join("present").join("a").exists());
    Ok(())
}

#[test]
fn test_setup_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");

    assert!(copy_tree(&src, &dest, "", &opts(1)).is_err());
    assert!(copy_tree(&dir.path().join("missing"), &dest, "all", &opts(1)).is_err());
    assert!(copy_tree(&src.join("a.txt"), &dest, "all", &opts(1)).is_err());

    let file_dest = dir.path().join("occupied");
    fs::write(&file_dest, b"x")?;
    assert!(copy_tree(&src, &file_dest, "all", &opts(1)).is_err());
    Ok(())
}

#[test]
fn test_missing_destination_parents_are_created() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("deep").join("er").join("dest");

    let report = copy_tree(&src, &dest, "txt", &opts(2))?;

    assert_eq!(report.files_copied, 2);
    assert!(dest.join("sub").join("c.txt").is_file());
    Ok(())
}

#[test]
fn test_run_copy_strict_opts_do_not_change_report() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");
    let opts = Opts {
        workers: Some(2),
        strict: true,
        ..Opts::default()
    };

    let report = run_copy(&src, &dest, &ExtensionFilter::parse("log")?, &opts)?;

    assert_eq!(report.files_copied, 1);
    assert!(dest.join("b.log").is_file());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_neither_followed_nor_counted() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    std::os::unix::fs::symlink(src.join("a.txt"), src.join("link.txt"))?;
    std::os::unix::fs::symlink(src.join("sub"), src.join("linkdir"))?;
    let dest = dir.path().join("dest");

    let report = copy_tree(&src, &dest, "txt", &opts(2))?;

    assert_eq!(report.files_checked, 3);
    assert_eq!(report.files_copied, 2);
    assert!(!dest.join("link.txt").exists());
    assert!(!dest.join("linkdir").exists());
    Ok(())
}

// --- walk loop and workers in isolation ---

fn context(src: &Path, dest: &Path, filter: &str, batch_size: usize) -> Result<PipelineContext> {
    Ok(PipelineContext {
        id: 0,
        src_root: src.to_path_buf(),
        dest_root: dest.to_path_buf(),
        filter: ExtensionFilter::parse(filter)?,
        batch_size,
        shard: Shard::WHOLE,
    })
}

#[test]
fn test_walk_error_stops_discovery_but_flushes_partial_batch() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;
    let ctx = context(&src, &dest, "txt", 8)?;

    let outcomes = vec![
        WalkOutcome::Dir(src.join("sub")),
        WalkOutcome::File {
            path: src.join("sub").join("one.txt"),
            size: 10,
        },
        WalkOutcome::File {
            path: src.join("two.bin"),
            size: 10,
        },
        WalkOutcome::Err {
            msg: "permission denied".to_string(),
            path: Some(src.join("locked")),
        },
        WalkOutcome::File {
            path: src.join("never.txt"),
            size: 10,
        },
    ];
    let queue = TaskQueue::new(16)?;
    let counter = AtomicUsize::new(0);

    let summary = run_walk_loop(&ctx, &counter, &queue, outcomes.into_iter());

    assert!(matches!(summary.error, Some(WalkError::ReadDir { .. })));
    assert_eq!(counter.load(Ordering::Relaxed), 2);
    assert_eq!(summary.files_seen, 2);
    assert_eq!(summary.tasks_queued, 1);
    assert_eq!(summary.dirs_created, 1);
    assert!(dest.join("sub").is_dir());

    queue.signal_shutdown();
    let tasks = queue.dequeue_batch(16).unwrap_or_default();
    assert_eq!(
        tasks,
        vec![CopyTask::new(
            src.join("sub").join("one.txt"),
            dest.join("sub").join("one.txt"),
            size_for(10),
        )]
    );
    Ok(())
}

#[test]
fn test_file_in_place_of_mirrored_directory_stops_the_walk() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;
    fs::write(dest.join("sub"), b"not a directory")?;
    let ctx = context(&src, &dest, "txt", 8)?;

    let outcomes = vec![
        WalkOutcome::File {
            path: src.join("first.txt"),
            size: 3,
        },
        WalkOutcome::Dir(src.join("sub")),
        WalkOutcome::File {
            path: src.join("sub").join("inner.txt"),
            size: 3,
        },
    ];
    let queue = TaskQueue::new(16)?;
    let counter = AtomicUsize::new(0);

    let summary = run_walk_loop(&ctx, &counter, &queue, outcomes.into_iter());

    match &summary.error {
        Some(WalkError::CreateDir { path, .. }) => assert_eq!(path, &dest.join("sub")),
        other => panic!("expected CreateDir, got {other:?}"),
    }
    assert_eq!(summary.tasks_queued, 1);
    assert_eq!(summary.dirs_created, 0);
    assert_eq!(counter.load(Ordering::Relaxed), 1);
    assert_eq!(fs::read(dest.join("sub"))?, b"not a directory");

    queue.signal_shutdown();
    let tasks = queue.dequeue_batch(16).unwrap_or_default();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].source, src.join("first.txt"));
    Ok(())
}

#[test]
fn test_file_in_place_of_mirrored_directory_via_copy_tree() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;
    fs::write(dest.join("sub"), b"x")?;

    let report = copy_tree(&src, &dest, "txt", &opts(2))?;

    assert!(report.walk_error.is_some());
    assert!(!report.is_clean());
    assert_eq!(fs::read(dest.join("sub"))?, b"x");
    Ok(())
}

#[test]
fn test_walk_loop_enqueues_in_batches() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("src");
    let dest = dir.path().join("dest");
    let ctx = context(&src, &dest, "all", 3)?;

    let outcomes = (0..7).map(|i| WalkOutcome::File {
        path: src.join(format!("f{i}")),
        size: i,
    });
    let queue = TaskQueue::new(16)?;
    let counter = AtomicUsize::new(0);

    let summary = run_walk_loop(&ctx, &counter, &queue, outcomes);

    assert!(summary.error.is_none());
    assert_eq!(summary.tasks_queued, 7);
    assert_eq!(queue.len(), 7);
    queue.signal_shutdown();
    let first = queue.dequeue_batch(1).unwrap_or_default();
    assert_eq!(first[0].source, src.join("f0"));
    assert_eq!(first[0].dest, dest.join("f0"));
    Ok(())
}

#[test]
fn test_walk_loop_reports_closed_queue() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("src");
    let ctx = context(&src, dir.path(), "all", 1)?;
    let queue = TaskQueue::new(4)?;
    queue.signal_shutdown();
    let counter = AtomicUsize::new(0);

    let outcomes = vec![WalkOutcome::File {
        path: src.join("x"),
        size: 1,
    }];
    let summary = run_walk_loop(&ctx, &counter, &queue, outcomes.into_iter());

    assert!(matches!(summary.error, Some(WalkError::Queue(_))));
    assert_eq!(summary.tasks_queued, 0);
    Ok(())
}

#[test]
fn test_worker_drains_queue_and_reports_failures() -> Result<()> {
    let dir = TempDir::new()?;
    let src = small_tree(dir.path())?;
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;

    let queue = TaskQueue::new(4)?;
    queue.enqueue_batch(vec![
        CopyTask::new(src.join("a.txt"), dest.join("a.txt"), 64),
        CopyTask::new(src.join("gone.txt"), dest.join("gone.txt"), 64),
        CopyTask::new(src.join("b.log"), dest.join("b.log"), 64),
    ])?;
    queue.signal_shutdown();
    let (tx, rx) = unbounded::<CopyFailure>();

    let stats = worker_loop(7, &queue, CopyEngine::default(), 2, &tx);
    drop(tx);

    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_bytes, 10);
    let failures: Vec<CopyFailure> = rx.iter().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].worker_id, 7);
    assert!(failures[0].source.ends_with("gone.txt"));
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn test_last_producer_closes_queue() -> Result<()> {
    let queue = Arc::new(TaskQueue::new(1)?);
    let group = ProducerGroup::new(3, Arc::clone(&queue));

    assert!(!group.finish());
    assert!(!queue.is_shut_down());
    assert!(!group.finish());
    assert!(group.finish());
    assert!(queue.is_shut_down());
    Ok(())
}

#[test]
fn test_abort_releases_producer_blocked_on_full_queue() -> Result<()> {
    let dir = TempDir::new()?;
    let src = wide_tree(dir.path())?;
    let dest = dir.path().join("dest");
    fs::create_dir(&dest)?;
    let ctx = context(&src, &dest, "all", 1)?;

    let queue = Arc::new(TaskQueue::new(1)?);
    let group = Arc::new(ProducerGroup::new(1, Arc::clone(&queue)));
    let counter = Arc::new(AtomicUsize::new(0));
    let producer = spawn_walk_thread(ctx, Arc::clone(&counter), Arc::clone(&queue), group)?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while queue.len() < 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(queue.len(), 1);

    abort_pipeline(&queue, vec![producer], Vec::new());

    assert!(queue.is_shut_down());
    assert_eq!(queue.len(), 1);
    assert!(counter.load(Ordering::Relaxed) < 61);
    Ok(())
}
