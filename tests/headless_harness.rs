//! Headless subcommand integration harness.
//!
//! # What this covers
//!
//! - **Library level**: every [`Headless`] command against the fake
//!   `mlv.cgi` server, writing into a buffer. Output must match what the
//!   TUI's log pane would show, and failures must carry the status text.
//! - **Process level**: the compiled `mlv` binary via
//!   [`std::process::Command`], for exit codes and stdout.
//!
//! # What this does NOT cover
//!
//! - TUI rendering (that requires a real terminal)
//!
//! # Running
//!
//! ```sh
//! cargo test --test headless_harness
//! ```

mod common;
use common::*;

use mlv::{Headless, SearchOptions};
use mlv_core::config::Config;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::process::Command;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn api_with(logs: Vec<LogBuilder>) -> FakeLogApi {
    let api = FakeLogApi::start().await.unwrap();
    for log in logs {
        api.add_log(log).await;
    }
    api
}

async fn server() -> FakeLogApi {
    let api = api_with(server_catalog()).await;
    api.set_lines("apache_access", APACHE_ACCESS).await;
    api.set_lines("apache_error", APACHE_ERROR).await;
    api.set_lines("exim_main", EXIM_MAIN).await;
    api
}

fn headless(api: &FakeLogApi) -> Headless {
    Headless::new(api.client(), Config::defaults())
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

fn search(query: &str) -> SearchOptions {
    SearchOptions {
        search: Some(query.to_string()),
        ..SearchOptions::default()
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_groups_by_category() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api).list(&mut out).await.unwrap();
    let out = text(out);

    let headers: Vec<&str> = out
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with(' '))
        .collect();
    assert_eq!(
        headers,
        vec![
            "Web Server (2)",
            "Mail (2)",
            "Security (1)",
            "System (1)",
            "Backups (1)",
            "Found 6 of 7 logs available",
        ]
    );

    let line = |id: &str| {
        out.lines()
            .find(|l| l.trim_start().starts_with(id))
            .unwrap_or_else(|| panic!("no line for {id} in:\n{out}"))
            .to_string()
    };
    assert!(line("apache_access").contains("Apache access  2.0 KB • "));
    assert!(line("exim_old").ends_with("Exim main (rotated) [Compressed]"));
    assert!(line("secure").ends_with("Secure ✗ Not found"));
}

#[tokio::test]
async fn list_without_missing_logs_has_no_summary() {
    let api = api_with(vec![LogBuilder::new("messages"), LogBuilder::new("secure")]).await;
    let mut out = Vec::new();
    headless(&api).list(&mut out).await.unwrap();
    let out = text(out);
    assert!(!out.contains("logs available"), "unexpected summary in:\n{out}");
}

#[tokio::test]
async fn list_of_empty_catalog_fails() {
    let api = api_with(vec![]).await;
    let err = headless(&api).list(&mut Vec::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "No configured logs found. Check log_sources.json");
}

#[tokio::test]
async fn list_failure_carries_server_text() {
    let api = api_with(vec![]).await;
    api.fail_next(502, "text/html", "<h1>Bad gateway</h1>").await;
    let err = headless(&api).list(&mut Vec::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "Error loading logs: <h1>Bad gateway</h1>");
}

// ---------------------------------------------------------------------------
// tail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tail_prints_lines() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api)
        .tail("apache_access", &SearchOptions::default(), &mut out)
        .await
        .unwrap();
    assert_eq!(text(out), format!("{}\n", APACHE_ACCESS.join("\n")));

    // Only the requested log is fetched.
    let tails = api.requests_for("tail").await;
    assert_eq!(tails.len(), 1);
    assert_eq!(tails[0]["id"], "apache_access");
}

#[tokio::test]
async fn tail_with_search_and_clamped_limit() {
    let api = server().await;
    let opts = SearchOptions {
        lines: Some("5".into()),
        ..search("/login")
    };
    let mut out = Vec::new();
    headless(&api).tail("apache_access", &opts, &mut out).await.unwrap();

    assert_eq!(text(out).lines().count(), 2);
    let sent = &api.requests_for("tail").await[0];
    assert_eq!(sent["lines"], "10");
    assert_eq!(sent["search"], "/login");
}

#[tokio::test]
async fn tail_without_matches_says_so() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api)
        .tail("apache_access", &search("segfault"), &mut out)
        .await
        .unwrap();
    assert_eq!(text(out), "(No matches found in the file)\n");
}

#[tokio::test]
async fn tail_of_unknown_log_fails() {
    let api = server().await;
    let err = headless(&api)
        .tail("nope", &SearchOptions::default(), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Log \"nope\" is no longer in the list.");
    assert!(api.requests_for("tail").await.is_empty());
}

#[tokio::test]
async fn tail_of_compressed_log_points_to_download() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api)
        .tail("exim_old", &SearchOptions::default(), &mut out)
        .await
        .unwrap();
    let out = text(out);

    assert!(out.starts_with("Compressed log\n"));
    assert!(out.contains("(/var/log/exim_mainlog-20240101.gz)"));
    assert!(api.requests_for("tail").await.is_empty());
}

// ---------------------------------------------------------------------------
// search-all
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_all_prints_one_section_per_log() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api)
        .search_all("authentication failure", &SearchOptions::default(), &mut out)
        .await
        .unwrap();

    let expected = [
        "== Apache errors (/var/log/apache2/error_log) ==",
        APACHE_ERROR[0],
        "",
        "== Exim main (/var/log/exim_mainlog) ==",
        EXIM_MAIN[2],
    ];
    assert_eq!(text(out), format!("{}\n", expected.join("\n")));
}

#[tokio::test]
async fn search_all_case_sensitive_narrows_results() {
    let api = server().await;
    let opts = SearchOptions {
        case_sensitive: true,
        ..SearchOptions::default()
    };
    let mut out = Vec::new();
    headless(&api)
        .search_all("Authentication FAILURE", &opts, &mut out)
        .await
        .unwrap();
    assert!(text(out).starts_with("== Exim main"));
    assert_eq!(api.requests_for("search_all").await[0]["case"], "1");
}

#[tokio::test]
async fn search_all_without_hits() {
    let api = server().await;
    let mut out = Vec::new();
    headless(&api)
        .search_all("kernel panic", &SearchOptions::default(), &mut out)
        .await
        .unwrap();
    assert_eq!(text(out), "(No matches in the configured logs)\n");
}

#[tokio::test]
async fn search_all_rejects_blank_query() {
    let api = server().await;
    let err = headless(&api)
        .search_all("   ", &SearchOptions::default(), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Enter text to search all logs");
    assert!(api.requests().await.is_empty());
}

// ---------------------------------------------------------------------------
// download
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_saves_into_dest() {
    let api = server().await;
    api.set_download("exim_old", "exim_mainlog-20240101.gz", b"gzip bytes")
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut out = Vec::new();
    headless(&api)
        .download("exim_old", dir.path(), &mut out)
        .await
        .unwrap();

    let saved = dir.path().join("exim_mainlog-20240101.gz");
    assert_eq!(std::fs::read(&saved).unwrap(), b"gzip bytes");
    assert_eq!(text(out), format!("Saved to {}\n", saved.display()));
}

#[tokio::test]
async fn download_refuses_readable_log() {
    let api = server().await;
    let dir = tempfile::tempdir().unwrap();
    let err = headless(&api)
        .download("apache_access", dir.path(), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Download is only offered for compressed logs.");
    assert!(api.requests_for("tail").await.is_empty());
}

#[tokio::test]
async fn download_failure_is_reported() {
    let api = server().await;
    let dir = tempfile::tempdir().unwrap();
    // Catalogued as compressed, but the server has no attachment for it.
    let err = headless(&api)
        .download("exim_old", dir.path(), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Download failed: Log not available");
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn check_update_prints_versions_and_changelog() {
    let api = api_with(vec![]).await;
    api.set_update_check(json!({
        "status": "ok",
        "current_version": "1.2.0",
        "remote_version": "1.3.0",
        "has_update": true,
        "changelog": "- faster search\n",
    }))
    .await;

    let mut out = Vec::new();
    headless(&api).check_update(&mut out).await.unwrap();
    assert_eq!(
        text(out),
        "Current version: 1.2.0 | Available version: 1.3.0\n\
         ✨ New version available: v1.3.0\n\
         \n\
         - faster search\n"
    );
}

#[tokio::test]
async fn check_update_when_current() {
    let api = api_with(vec![]).await;
    let mut out = Vec::new();
    headless(&api).check_update(&mut out).await.unwrap();
    assert_eq!(text(out), "Current version: 1.0.0 | Available version: 1.0.0\n");
}

#[tokio::test]
async fn check_update_failure() {
    let api = api_with(vec![]).await;
    api.set_update_check(json!({ "status": "error" })).await;
    let err = headless(&api).check_update(&mut Vec::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "Could not verify the version");
}

#[tokio::test]
async fn apply_update_reports_success() {
    let api = api_with(vec![]).await;
    let mut out = Vec::new();
    headless(&api).apply_update(&mut out).await.unwrap();
    assert_eq!(
        text(out),
        "Downloading update...\n✓ Update completed. Restart mlv to reload the plugin assets.\n"
    );
}

#[tokio::test]
async fn apply_update_failure_lists_details() {
    let api = api_with(vec![]).await;
    api.set_update_apply(json!({
        "status": "error",
        "message": "Installer failed",
        "detail": "checksum mismatch",
        "exit_code": 2,
    }))
    .await;

    let mut out = Vec::new();
    let err = headless(&api).apply_update(&mut out).await.unwrap_err();
    assert_eq!(err.to_string(), "✗ Error: Installer failed");
    assert_eq!(
        text(out),
        "Downloading update...\n\
         ✗ Error: Installer failed\n\
         Details:\nchecksum mismatch\n\
         Exit code: 2\n"
    );
}

// ---------------------------------------------------------------------------
// Process level
// ---------------------------------------------------------------------------

fn mlv_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mlv"))
}

/// Run the binary off the runtime thread so the fake server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || mlv_binary().args(args).output().unwrap())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_tail_exits_zero() {
    let api = server().await;
    let output = run(vec![
        "--base-url".into(),
        api.base_url(),
        "tail".into(),
        "apache_access".into(),
        "-s".into(),
        "/login".into(),
    ])
    .await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_unknown_log_exits_non_zero() {
    let api = server().await;
    let output = run(vec![
        "--base-url".into(),
        api.base_url(),
        "tail".into(),
        "nope".into(),
    ])
    .await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no longer in the list"));
}

#[test]
fn binary_rejects_unknown_flag() {
    let output = mlv_binary().arg("--no-such-flag").output().unwrap();
    assert!(!output.status.success());
}
