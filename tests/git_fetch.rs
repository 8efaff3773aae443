//! End-to-end fetch against a local fixture repository
//!
//! Exercises the real git binary over the file:// transport: builds a small
//! candle data repository, fetches a selection from it, and checks that
//! exactly the matching feather files materialize.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use market_data_fetcher::{DataFetcher, DataSummary, FetchConfig, FetchError, SystemGit};
use walkdir::WalkDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, contents).expect("write fixture file");
}

/// Build a miniature candle data repository and return its file:// URL.
fn build_fixture_repo(root: &Path) -> String {
    std::fs::create_dir_all(root).expect("create fixture dir");
    run_git(root, &["init", "-q"]);
    run_git(root, &["config", "user.email", "fixture@example.com"]);
    run_git(root, &["config", "user.name", "Fixture"]);
    run_git(root, &["config", "commit.gpgsign", "false"]);

    write_file(root, "README.md", b"candle data fixture\n");
    write_file(root, "binance/BTC_USDT-5m.feather", b"binance spot 5m");
    write_file(root, "binance/BTC_USDT-15m.feather", b"binance spot 15m");
    write_file(root, "binance/BTC_USDT-1h.feather", b"binance spot 1h");
    write_file(
        root,
        "binance/futures/BTC_USDT_USDT-5m-futures.feather",
        b"binance futures 5m",
    );
    write_file(
        root,
        "binance/futures/BTC_USDT_USDT-1h-futures.feather",
        b"binance futures 1h",
    );
    write_file(
        root,
        "binance/futures/BTC_USDT_USDT-8h-funding_rate.feather",
        b"binance funding 8h",
    );
    write_file(root, "kraken/BTC_USDT-5m.feather", b"kraken spot 5m");

    run_git(root, &["add", "."]);
    run_git(root, &["commit", "-q", "-m", "seed candle data"]);

    // Allow blobless partial clones over the file:// transport.
    run_git(root, &["config", "uploadpack.allowFilter", "true"]);
    run_git(root, &["config", "uploadpack.allowAnySHA1InWant", "true"]);

    let absolute = root.canonicalize().expect("canonicalize fixture path");
    format!("file://{}", absolute.display())
}

/// Relative paths of all feather files under `dir`, sorted.
fn feather_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("feather"))
        .map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .expect("path is under the data dir")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_fetch_materializes_exactly_the_selected_files() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let temp = tempfile::tempdir().expect("temp dir");
    let url = build_fixture_repo(&temp.path().join("remote"));
    let data_dir = temp.path().join("user_data").join("data");

    // A stale tree from an earlier run must not survive the fetch.
    write_file(&data_dir, "binance/STALE_PAIR-5m.feather", b"stale");

    let config = FetchConfig::from_lists("binance", "spot futures", "5m", "1h", url, data_dir.clone())
        .expect("valid config");
    let outcome = DataFetcher::new(&config, SystemGit::new())
        .fetch()
        .await
        .expect("fetch against the fixture repository succeeds");

    assert_eq!(outcome.primary_patterns, 2);
    assert_eq!(outcome.helper_patterns, 2);
    assert_eq!(
        feather_files(&data_dir),
        vec![
            "binance/BTC_USDT-1h.feather".to_string(),
            "binance/BTC_USDT-5m.feather".to_string(),
            "binance/futures/BTC_USDT_USDT-1h-futures.feather".to_string(),
            "binance/futures/BTC_USDT_USDT-5m-futures.feather".to_string(),
        ]
    );

    let summary = DataSummary::scan(&data_dir).expect("scan succeeds");
    assert_eq!(summary.total_files, 4);
    let markets: Vec<&str> = summary.markets.iter().map(|m| m.market.as_str()).collect();
    assert_eq!(markets, vec!["binance", "binance/futures"]);
}

#[tokio::test]
async fn test_refetching_reaches_the_same_state() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let temp = tempfile::tempdir().expect("temp dir");
    let url = build_fixture_repo(&temp.path().join("remote"));
    let data_dir = temp.path().join("data");
    let config = FetchConfig::from_lists("binance", "futures", "5m", "", url, data_dir.clone())
        .expect("valid config");

    let fetcher = DataFetcher::new(&config, SystemGit::new());
    fetcher.fetch().await.expect("first fetch succeeds");
    let first = feather_files(&data_dir);
    fetcher.fetch().await.expect("second fetch succeeds");

    assert_eq!(feather_files(&data_dir), first);
    assert_eq!(
        first,
        vec!["binance/futures/BTC_USDT_USDT-5m-futures.feather".to_string()]
    );
}

#[tokio::test]
async fn test_missing_remote_fails_with_a_clone_error() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let temp = tempfile::tempdir().expect("temp dir");
    let url = format!(
        "file://{}/does-not-exist",
        temp.path()
            .canonicalize()
            .expect("canonicalize temp path")
            .display()
    );
    let config = FetchConfig::from_lists("binance", "spot", "5m", "", url, temp.path().join("data"))
        .expect("valid config");

    let err = DataFetcher::new(&config, SystemGit::new())
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::CloneFailed(_)));
    assert_ne!(err.exit_code(), 0);
}
