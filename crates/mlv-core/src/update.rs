//! Presentation of the self-update endpoints.
//!
//! The update subsystem itself lives on the server; the client only checks,
//! triggers, and reports.

use crate::error::ApiError;
use crate::payload::{is_ok_status, UpdateApplyPayload, UpdateCheckPayload};
use crate::status::Messages;

/// `Current version: 1.2.0 | Available version: 1.3.0`
pub fn check_summary(result: &Result<UpdateCheckPayload, ApiError>, messages: &Messages) -> String {
    match result {
        Ok(payload) if is_ok_status(&payload.status) => {
            let current = payload
                .current_version
                .as_deref()
                .unwrap_or_else(|| messages.get("update.unknown"));
            let mut line = messages.render("update.current", &[("current", current)]);
            if let Some(remote) = payload.remote_version.as_deref() {
                line.push_str(&messages.render("update.available", &[("remote", remote)]));
            }
            line
        }
        _ => messages.get("update.failed").to_string(),
    }
}

/// The header hint shown when a newer version exists.
pub fn available_notice(payload: &UpdateCheckPayload, messages: &Messages) -> Option<String> {
    if !(is_ok_status(&payload.status) && payload.has_update) {
        return None;
    }
    let version = payload.remote_version.as_deref().unwrap_or("?");
    Some(messages.render("update.notification", &[("version", version)]))
}

/// Lines describing an update attempt. A failure lists the message, then
/// details, debug output and exit code when the server sent them.
pub fn apply_report(result: &Result<UpdateApplyPayload, ApiError>, messages: &Messages) -> Vec<String> {
    let prefix = messages.get("update.error_prefix");
    match result {
        Ok(payload) if is_ok_status(&payload.status) => vec![messages.get("update.done").to_string()],
        Ok(payload) => {
            let message = payload
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| messages.get("update.error_unknown"));
            let mut lines = vec![format!("{prefix} {message}")];
            if let Some(detail) = payload.detail.as_deref().filter(|d| !d.is_empty()) {
                lines.push(format!("{}\n{detail}", messages.get("update.error_details")));
            }
            if let Some(debug) = payload.debug.as_deref().filter(|d| !d.is_empty()) {
                lines.push(format!("{}\n{debug}", messages.get("update.error_debug")));
            }
            if let Some(code) = &payload.exit_code {
                let code = match code {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(messages.render("update.error_exit_code", &[("code", code.as_str())]));
            }
            lines
        }
        Err(err) => vec![format!("{prefix} {err}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_with_and_without_remote() {
        let m = Messages::english();
        let payload = UpdateCheckPayload {
            status: "ok".into(),
            current_version: Some("1.2.0".into()),
            remote_version: Some("1.3.0".into()),
            has_update: true,
            ..Default::default()
        };
        assert_eq!(
            check_summary(&Ok(payload.clone()), &m),
            "Current version: 1.2.0 | Available version: 1.3.0"
        );
        assert_eq!(
            available_notice(&payload, &m).as_deref(),
            Some("✨ New version available: v1.3.0")
        );

        let bare = UpdateCheckPayload {
            status: "ok".into(),
            ..Default::default()
        };
        assert_eq!(check_summary(&Ok(bare.clone()), &m), "Current version: Unknown");
        assert!(available_notice(&bare, &m).is_none());
        assert_eq!(
            check_summary(&Err(ApiError::Malformed), &m),
            "Could not verify the version"
        );
    }

    #[test]
    fn failure_report_lists_every_detail() {
        let m = Messages::english();
        let payload = UpdateApplyPayload {
            status: "error".into(),
            message: Some("Installer failed".into()),
            detail: Some("tar: broken".into()),
            debug: None,
            exit_code: Some(serde_json::json!(2)),
            output: None,
        };
        assert_eq!(
            apply_report(&Ok(payload), &m),
            vec![
                "✗ Error: Installer failed".to_string(),
                "Details:\ntar: broken".to_string(),
                "Exit code: 2".to_string(),
            ]
        );
    }

    #[test]
    fn success_and_transport_failure() {
        let m = Messages::english();
        let ok = UpdateApplyPayload {
            status: "ok".into(),
            ..Default::default()
        };
        assert_eq!(apply_report(&Ok(ok), &m).len(), 1);
        assert_eq!(
            apply_report(&Err(ApiError::Transport("HTTP 500".into())), &m),
            vec!["✗ Error: HTTP 500".to_string()]
        );
    }
}
