//! Domain-specific assertion macros for mlv harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear which session property was violated.

/// Assert the controller shows exactly these lines.
///
/// ```rust
/// assert_lines!(ctl, ["boot", "ready"]);
/// ```
#[macro_export]
macro_rules! assert_lines {
    ($ctl:expr, [$($line:expr),* $(,)?]) => {{
        let expected: Vec<&str> = vec![$($line),*];
        let actual: Vec<&str> = $ctl.content().lines().iter().map(String::as_str).collect();
        pretty_assertions::assert_eq!(
            actual, expected,
            "assert_lines! failed: content is {:?}", $ctl.content()
        );
    }};
}

/// Assert the controller is in `mode`, printing the status on failure.
#[macro_export]
macro_rules! assert_mode {
    ($ctl:expr, $mode:expr) => {{
        let expected: mlv_core::SessionMode = $mode;
        let actual = $ctl.mode();
        if actual != expected {
            panic!(
                "assert_mode! failed:\n  expected: {:?}\n  actual:   {:?}\n  status:   {:?}",
                expected,
                actual,
                $ctl.status()
            );
        }
    }};
}

/// Assert the controller's status renders to `text` with the English table.
#[macro_export]
macro_rules! assert_status_text {
    ($ctl:expr, $text:expr) => {{
        let messages = mlv_core::Messages::english();
        pretty_assertions::assert_eq!($ctl.status().text(&messages), $text);
    }};
}

/// Assert at most one tail fetch is outstanding, by draining effects.
#[macro_export]
macro_rules! assert_single_outstanding {
    ($effects:expr) => {{
        let n = $effects
            .iter()
            .filter(|e| matches!(e, mlv_core::Effect::FetchTail { .. }))
            .count();
        if n > 1 {
            panic!("assert_single_outstanding! failed: {n} fetches issued at once");
        }
    }};
}
