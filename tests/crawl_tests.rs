//! End-to-end crawl tests over scratch directory trees.

use hashcrawl::engine::{Algorithm, PoolConfig, hash_bytes, to_hex};
use hashcrawl::pipeline::{WalkOutcome, check_for_failed_files, run_walk_loop};
use hashcrawl::{CrawlError, CrawlOpts, CrawlReport, CrawlState, Crawler, ResultMap, crawl_dir};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Build a small tree and return the expected path → bytes map.
fn build_tree(root: &Path, files: usize) -> HashMap<PathBuf, Vec<u8>> {
    let mut expected = HashMap::new();
    for i in 0..files {
        let dir = root.join(format!("d{}", i % 4)).join(format!("sub{}", i % 3));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("file{i}.txt"));
        let data = format!("file number {i}\n").repeat(i + 1).into_bytes();
        std::fs::write(&path, &data).unwrap();
        expected.insert(path, data);
    }
    expected
}

fn small_pool(core: usize, max: usize, queue: usize) -> PoolConfig {
    PoolConfig {
        core_workers: core,
        max_workers: max,
        max_idle: Duration::from_secs(1),
        task_queue_capacity: queue,
    }
}

fn run(root: &Path, opts: CrawlOpts) -> (HashMap<String, String>, CrawlReport) {
    crawl_dir(root, &opts).unwrap()
}

// --- completeness and digests ---

#[test]
fn test_crawl_hashes_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let expected = build_tree(dir.path(), 40);

    let (map, report) = run(dir.path(), CrawlOpts::default());
    assert_eq!(map.len(), 40);
    assert_eq!(report.submitted, 40);
    assert_eq!(report.collected, 40);
    assert!(report.failures.is_empty());
    assert!(report.is_complete());

    for (path, data) in &expected {
        let key = path.to_string_lossy().into_owned();
        assert_eq!(
            map.get(&key),
            Some(&to_hex(&hash_bytes(data, Algorithm::Md5))),
            "{key}"
        );
    }
}

#[test]
fn test_crawl_empty_file_md5() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty");
    std::fs::write(&path, b"").unwrap();
    let (map, _) = run(dir.path(), CrawlOpts::default());
    assert_eq!(
        map.get(&*path.to_string_lossy()).map(String::as_str),
        Some("d41d8cd98f00b204e9800998ecf8427e")
    );
}

#[test]
fn test_crawl_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    let (map, report) = run(dir.path(), CrawlOpts::default());
    assert!(map.is_empty());
    assert_eq!(report.submitted, 0);
}

#[test]
fn test_crawl_includes_hidden_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git/config"), b"y").unwrap();
    for parallel_walk in [false, true] {
        let opts = CrawlOpts {
            parallel_walk,
            ..CrawlOpts::default()
        };
        let (map, _) = run(dir.path(), opts);
        assert_eq!(map.len(), 2, "parallel_walk={parallel_walk}");
    }
}

#[test]
fn test_crawl_other_algorithm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abc");
    std::fs::write(&path, b"abc").unwrap();
    let opts = CrawlOpts {
        algorithm: Algorithm::Sha1,
        buffer_size: 1,
        ..CrawlOpts::default()
    };
    let (map, _) = run(dir.path(), opts);
    assert_eq!(
        map.get(&*path.to_string_lossy()).map(String::as_str),
        Some("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
}

// --- order independence and backpressure ---

#[test]
fn test_crawl_same_result_for_any_pool_size() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 60);

    let baseline = run(dir.path(), CrawlOpts::default()).0;
    for (core, max, queue) in [(1, 1, 1), (2, 3, 1), (4, 16, 8)] {
        let opts = CrawlOpts {
            pool: small_pool(core, max, queue),
            ..CrawlOpts::default()
        };
        assert_eq!(run(dir.path(), opts).0, baseline, "pool {core}/{max}/{queue}");
    }
    let parallel = CrawlOpts {
        parallel_walk: true,
        ..CrawlOpts::default()
    };
    assert_eq!(run(dir.path(), parallel).0, baseline);
}

#[test]
fn test_crawl_saturated_pool_loses_nothing() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 200);
    let opts = CrawlOpts {
        pool: small_pool(1, 2, 1),
        ..CrawlOpts::default()
    };
    let mut crawler = Crawler::new(dir.path(), opts).unwrap();
    let out = ResultMap::new();
    let report = crawler.execute(&out).unwrap();
    crawler.quit();

    assert_eq!(out.len(), 200);
    assert_eq!(report.collected, 200);
    let stats = crawler.pool_stats();
    assert_eq!(stats.submitted, 200);
    assert_eq!(stats.completed, 200);
    assert!(stats.peak_workers <= 2);
    assert_eq!(crawler.timing().tasks_executed(), 200);
}

// --- crawler lifecycle ---

#[test]
fn test_crawler_states_and_reuse() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 12);
    let mut crawler = Crawler::new(dir.path(), CrawlOpts::default()).unwrap();
    assert_eq!(crawler.root(), dir.path());
    assert_eq!(crawler.opts().algorithm, Algorithm::Md5);
    assert_eq!(crawler.state(), CrawlState::Idle);
    assert!(!crawler.state().is_terminal());

    let first = ResultMap::new();
    crawler.execute(&first).unwrap();
    assert_eq!(crawler.state(), CrawlState::Done);
    assert!(crawler.state().is_terminal());
    assert_eq!(crawler.submitted(), 12);

    // Same pool, fresh counter.
    let second = ResultMap::new();
    crawler.execute(&second).unwrap();
    assert_eq!(crawler.submitted(), 12);
    assert_eq!(first.snapshot(), second.snapshot());
    crawler.quit();
}

#[test]
fn test_quit_twice_then_execute_fails() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 3);
    let mut crawler = Crawler::new(dir.path(), CrawlOpts::default()).unwrap();
    crawler.execute(&ResultMap::new()).unwrap();
    crawler.quit();
    crawler.quit();
    assert!(matches!(
        crawler.execute(&ResultMap::new()),
        Err(CrawlError::PoolShutdown)
    ));
    assert!(crawler.timing().total_elapsed().is_some());
}

#[test]
fn test_crawler_rejects_bad_config() {
    let opts = CrawlOpts {
        pool: small_pool(4, 2, 1),
        ..CrawlOpts::default()
    };
    assert!(matches!(
        Crawler::new("/tmp", opts),
        Err(CrawlError::InvalidConfig(_))
    ));
    let opts = CrawlOpts {
        buffer_size: 0,
        ..CrawlOpts::default()
    };
    assert!(Crawler::new("/tmp", opts).is_err());
}

// --- traversal failure ---

#[test]
fn test_missing_root_is_traversal_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let mut crawler = Crawler::new(&missing, CrawlOpts::default()).unwrap();
    let out = ResultMap::new();
    match crawler.execute(&out) {
        Err(CrawlError::Incomplete {
            submitted,
            collected,
            source,
        }) => {
            assert_eq!((submitted, collected), (0, 0));
            assert!(matches!(*source, CrawlError::Traversal { .. }));
        }
        other => panic!("expected incomplete crawl, got {other:?}"),
    }
    assert_eq!(crawler.state(), CrawlState::Failed);
    assert!(crawler.is_cancelled());
    assert!(out.is_empty());
    crawler.quit();
}

#[cfg(unix)]
#[test]
fn test_walk_error_drains_already_submitted_files() {
    let dir = tempfile::tempdir().unwrap();
    // Entries are visited in name order: every file comes before the broken link.
    std::os::unix::fs::symlink(dir.path().join("missing-target"), dir.path().join("zz_dangling"))
        .unwrap();
    for i in 0..50 {
        std::fs::write(dir.path().join(format!("a_{i:02}.txt")), format!("{i}")).unwrap();
    }
    let opts = CrawlOpts {
        follow_links: true,
        pool: small_pool(1, 2, 1),
        ..CrawlOpts::default()
    };
    let mut crawler = Crawler::new(dir.path(), opts).unwrap();
    let out = ResultMap::new();
    match crawler.execute(&out) {
        Err(CrawlError::Incomplete {
            submitted,
            collected,
            source,
        }) => {
            assert_eq!(submitted, 50);
            assert_eq!(collected, submitted);
            assert_eq!(out.len(), collected);
            match *source {
                CrawlError::Traversal { path, .. } => {
                    assert_eq!(path, Some(dir.path().join("zz_dangling")));
                }
                other => panic!("expected traversal error, got {other:?}"),
            }
        }
        other => panic!("expected incomplete crawl, got {other:?}"),
    }
    assert_eq!(
        out.get(&dir.path().join("a_07.txt").to_string_lossy()).as_deref(),
        Some(to_hex(&hash_bytes(b"7", Algorithm::Md5)).as_str())
    );
    assert_eq!(crawler.submitted(), 50);
    assert_eq!(crawler.state(), CrawlState::Failed);
    assert!(crawler.is_cancelled());
    crawler.quit();
    assert_eq!(crawler.pool_stats().completed, 50);
}

#[test]
fn test_walk_loop_stops_at_first_error() {
    let files = [PathBuf::from("a"), PathBuf::from("b")];
    let outcomes = files
        .iter()
        .cloned()
        .map(|path| WalkOutcome::Ok {
            path,
            file_type: std::fs::metadata(".").unwrap().file_type(),
        })
        .chain(std::iter::once(WalkOutcome::Err {
            msg: "permission denied".into(),
            path: Some(PathBuf::from("locked")),
        }));
    let cancel = AtomicBool::new(false);
    let mut seen = 0;
    // Directory entries are descended, not handed to the callback.
    let result = run_walk_loop(outcomes, &cancel, |_| {
        seen += 1;
        Ok(())
    });
    assert_eq!(seen, 0);
    match result {
        Err(CrawlError::Traversal { path, message }) => {
            assert_eq!(path, Some(PathBuf::from("locked")));
            assert_eq!(message, "permission denied");
        }
        other => panic!("expected traversal error, got {other:?}"),
    }
}

#[test]
fn test_walk_loop_counts_regular_files_and_honours_cancel() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), 5);
    let iter = walkdir::WalkDir::new(dir.path())
        .into_iter()
        .map(hashcrawl::pipeline::to_outcome_walkdir);
    let cancel = AtomicBool::new(false);
    let mut paths = Vec::new();
    let count = run_walk_loop(iter, &cancel, |p| {
        paths.push(p);
        Ok(())
    })
    .unwrap();
    assert_eq!(count, 5);
    assert_eq!(paths.len(), 5);

    let cancelled = AtomicBool::new(true);
    let iter = walkdir::WalkDir::new(dir.path())
        .into_iter()
        .map(hashcrawl::pipeline::to_outcome_walkdir);
    assert!(matches!(
        run_walk_loop(iter, &cancelled, |_| Ok(())),
        Err(CrawlError::Cancelled)
    ));
}

// --- failure reporting ---

#[test]
fn test_strict_mode_turns_failures_into_error() {
    let report = CrawlReport {
        submitted: 3,
        collected: 3,
        failures: vec![("gone".into(), "No such file".into())],
        elapsed: Duration::ZERO,
    };
    let first = || CrawlError::Hash {
        path: PathBuf::from("gone"),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    };

    let lenient = CrawlOpts::default();
    assert!(check_for_failed_files(&lenient, &report, Some(first())).is_ok());

    let strict = CrawlOpts {
        strict: true,
        ..CrawlOpts::default()
    };
    match check_for_failed_files(&strict, &report, Some(first())) {
        Err(CrawlError::FilesFailed { failed, first }) => {
            assert_eq!(failed, 1);
            assert!(matches!(*first, CrawlError::Hash { .. }));
        }
        other => panic!("expected FilesFailed, got {other:?}"),
    }
    assert_eq!(report.succeeded(), 2);
}
