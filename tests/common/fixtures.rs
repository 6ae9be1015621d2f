//! Static catalogs and log corpora used across harnesses.

use super::builders::LogBuilder;

/// A small hosting-server catalog covering every category shape: fixed
/// categories, a custom one, a missing log and a compressed one.
pub fn server_catalog() -> Vec<LogBuilder> {
    vec![
        LogBuilder::new("apache_access")
            .name("Apache access")
            .path("/var/log/apache2/access_log")
            .category("Web Server")
            .size(2_048)
            .mtime(1_700_000_000),
        LogBuilder::new("apache_error")
            .name("Apache errors")
            .path("/var/log/apache2/error_log")
            .category("Web Server"),
        LogBuilder::new("exim_main")
            .name("Exim main")
            .path("/var/log/exim_mainlog")
            .category("Mail"),
        LogBuilder::new("exim_old")
            .name("Exim main (rotated)")
            .path("/var/log/exim_mainlog-20240101.gz")
            .category("Mail")
            .compressed(),
        LogBuilder::new("secure")
            .name("Secure")
            .path("/var/log/secure")
            .category("Security")
            .missing(),
        LogBuilder::new("messages")
            .name("System messages")
            .path("/var/log/messages")
            .category("System"),
        LogBuilder::new("backup")
            .name("Backup runs")
            .path("/var/log/backup.log")
            .category("Backups"),
    ]
}

/// Apache access lines with a few errors mixed in.
pub const APACHE_ACCESS: &[&str] = &[
    "10.0.0.1 - - [15/Jan/2024:10:00:00 +0000] \"GET / HTTP/1.1\" 200 512",
    "10.0.0.2 - - [15/Jan/2024:10:00:01 +0000] \"GET /login HTTP/1.1\" 200 1024",
    "10.0.0.3 - - [15/Jan/2024:10:00:02 +0000] \"POST /login HTTP/1.1\" 401 64",
    "10.0.0.1 - - [15/Jan/2024:10:00:03 +0000] \"GET /admin HTTP/1.1\" 403 128",
    "10.0.0.4 - - [15/Jan/2024:10:00:04 +0000] \"GET /favicon.ico HTTP/1.1\" 404 0",
    "10.0.0.2 - - [15/Jan/2024:10:00:05 +0000] \"GET /dashboard HTTP/1.1\" 200 4096",
];

/// Apache error lines.
pub const APACHE_ERROR: &[&str] = &[
    "[Mon Jan 15 10:00:02 2024] [error] [client 10.0.0.3] user admin: authentication failure",
    "[Mon Jan 15 10:00:03 2024] [error] [client 10.0.0.1] client denied by server configuration",
];

/// Exim main log lines.
pub const EXIM_MAIN: &[&str] = &[
    "2024-01-15 10:00:00 1rP0aB-0001 <= alice@example.com H=mail.example.com",
    "2024-01-15 10:00:01 1rP0aB-0001 => bob@example.org R=dnslookup T=remote_smtp",
    "2024-01-15 10:00:02 1rP0aC-0002 ** carol@example.net: Authentication FAILURE",
];

/// `n` numbered syslog lines.
pub fn numbered_lines(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| format!("Jan 15 10:{:02}:{:02} host systemd[1]: line {i}", i / 60 % 60, i % 60))
        .collect()
}
