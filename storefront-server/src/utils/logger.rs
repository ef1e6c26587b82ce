//! Logging Infrastructure
//!
//! Structured logging for development and production
//! - Daily rotating application logs (deleted after 14 days)
//! - Permanent audit logs (order and payment state changes)
//! - Permanent security logs (auth failures, payment mismatches)

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, layer::SubscriberExt, prelude::*};

/// Days an application log file is kept
const APP_LOG_RETENTION_DAYS: i64 = 14;

/// Delete `app/app.YYYY-MM-DD` files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = (chrono::Local::now() - chrono::Duration::days(APP_LOG_RETENTION_DAYS)).date_naive();

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date) = log_file_date(name)
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Rolling appenders name files `<prefix>.<YYYY-MM-DD>`
fn log_file_date(name: &str) -> Option<chrono::NaiveDate> {
    let date_part = name.strip_prefix("app.")?;
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Initialize the logging system
///
/// Console output is always enabled; `json_format` switches it to JSON.
/// With `log_dir` set, `app/`, `audit/` and `security/` daily files are
/// written as well, split by event target.
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// storefront_server::init_logger_with_file("info", false, Some("./work_dir/logs"))?;
/// # Ok(())
/// # }
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let Some(dir) = log_dir else {
        registry.try_init()?;
        return Ok(());
    };

    let log_dir = Path::new(dir);
    let app_log_dir = log_dir.join("app");
    let audit_log_dir = log_dir.join("audit");
    let security_log_dir = log_dir.join("security");
    fs::create_dir_all(&app_log_dir)?;
    fs::create_dir_all(&audit_log_dir)?;
    fs::create_dir_all(&security_log_dir)?;

    let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
    let app_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::sync::Mutex::new(app_log))
        .with_filter(filter_fn(|meta| {
            meta.target() != "audit" && meta.target() != "security"
        }));

    let audit_log = RollingFileAppender::new(Rotation::DAILY, audit_log_dir, "audit");
    let audit_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::sync::Mutex::new(audit_log))
        .with_filter(filter_fn(|meta| meta.target() == "audit"));

    let security_log = RollingFileAppender::new(Rotation::DAILY, security_log_dir, "security");
    let security_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::sync::Mutex::new(security_log))
        .with_filter(filter_fn(|meta| meta.target() == "security"));

    registry
        .with(app_layer)
        .with(audit_layer)
        .with(security_layer)
        .try_init()?;

    if tokio::runtime::Handle::try_current().is_ok() {
        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    Ok(())
}

/// Console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Hourly application log cleanup
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Audit log helper - records order and payment state changes
///
/// ```ignore
/// audit_log!(user.id.as_str(), "create", format!("order:{}", order.id));
/// audit_log!("system", "payment_verified", format!("order:{}", id), tx_ref.as_str());
/// ```
#[macro_export]
macro_rules! audit_log {
    ($user_id:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            user_id = %$user_id,
            action = $action,
            resource = %$resource,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($user_id:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            user_id = %$user_id,
            action = $action,
            resource = %$resource,
            details = %$details,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}

/// Security log helper - records security-relevant events
///
/// ```ignore
/// security_log!(WARN, "auth_failed", uri = %uri, error = %e);
/// security_log!(ERROR, "payment_amount_mismatch", tx_ref = %tx_ref);
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_date_parsing() {
        assert_eq!(
            log_file_date("app.2026-01-05"),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 5)
        );
        assert_eq!(log_file_date("audit.2026-01-05"), None);
        assert_eq!(log_file_date("app.latest"), None);
    }

    #[test]
    fn test_cleanup_removes_only_expired_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("app");
        fs::create_dir_all(&app_dir).unwrap();

        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(30);
        let old_file = app_dir.join(format!("app.{}", old.format("%Y-%m-%d")));
        let fresh_file = app_dir.join(format!("app.{}", today.format("%Y-%m-%d")));
        fs::write(&old_file, "old").unwrap();
        fs::write(&fresh_file, "fresh").unwrap();

        let removed = cleanup_old_logs(dir.path()).unwrap();
        assert_eq!(removed, 1);
        assert!(!old_file.exists());
        assert!(fresh_file.exists());
    }

    #[test]
    fn test_cleanup_without_app_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
    }
}
