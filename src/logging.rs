//! Logger setup.
//!
//! Logging is off by default because log lines on stderr would tear the
//! in-place plot. `PIPEPLOT_LOG` (or `RUST_LOG`) enables it; `--log-file`
//! sends it to a file and defaults the level to `info`.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PIPEPLOT_LOG";

/// Pick the filter string: `PIPEPLOT_LOG`, then `RUST_LOG`, then a default
/// that depends on whether a log file was requested.
pub fn filter_spec(pipeplot_log: Option<String>, rust_log: Option<String>, to_file: bool) -> String {
    pipeplot_log
        .filter(|s| !s.trim().is_empty())
        .or_else(|| rust_log.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| if to_file { "info" } else { "off" }.to_string())
}

/// Initialise `env_logger` from the environment.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let filter = filter_spec(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        log_file.is_some(),
    );

    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&filter);
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }
    // A second init (tests) keeps the first logger
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        assert_eq!(filter_spec(None, None, false), "off");
        assert_eq!(filter_spec(None, None, true), "info");
    }

    #[test]
    fn test_filter_precedence() {
        assert_eq!(
            filter_spec(Some("debug".into()), Some("warn".into()), false),
            "debug"
        );
        assert_eq!(filter_spec(None, Some("warn".into()), true), "warn");
        assert_eq!(filter_spec(Some(" ".into()), None, false), "off");
    }

    #[test]
    fn test_init_with_log_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeplot.log");
        init(Some(&path)).unwrap();
        assert!(path.exists());
    }
}
