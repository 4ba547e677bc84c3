//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a count that must be at least 1.
fn parse_count(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}

/// Parse a duration in seconds that must be positive.
fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("must be greater than 0, got {}", s));
    }
    if std::time::Duration::try_from_secs_f64(secs).is_err() {
        return Err(format!("{} seconds is too long", s));
    }
    Ok(secs)
}

/// Live terminal plot of numbers found in piped output
#[derive(Parser, Debug)]
#[command(name = "pipeplot")]
#[command(version, about = "Live terminal plot of numbers found in piped output", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Plot whatever numbers ping reports
    ping example.com | pipeplot

    # Steer rule synthesis
    free -m -s 1 | pipeplot -p \"used memory only\"

    # Screen-refreshing tools such as top
    top -b -d 1 | pipeplot -f

    # Skip synthesis with a hand-written specification
    vmstat 1 | pipeplot --spec vmstat.toml

KEYS:
    space   pause / resume
    h / l   step back / forward one second while paused
    enter   resume
    q, esc, ctrl-c   quit")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Samples collected before synthesizing extraction rules [default: 5]
    #[arg(short = 's', long, value_parser = parse_count)]
    pub sample_size: Option<usize>,

    /// Entries plotted at once [default: 200]
    #[arg(short, long, value_parser = parse_count)]
    pub window: Option<usize>,

    /// Extra instruction for rule synthesis
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Plot height in terminal rows [default: 30]
    #[arg(long, value_parser = parse_count)]
    pub height: Option<usize>,

    /// Model used for rule synthesis [default: gpt-5]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Seconds to wait for the warm-up samples [default: 10]
    #[arg(long, value_parser = parse_seconds)]
    pub learn_timeout: Option<f64>,

    /// Minimum seconds between redraws while live [default: 0.5]
    #[arg(short, long, value_parser = parse_seconds)]
    pub refresh: Option<f64>,

    /// Treat screen-clear sequences as sample boundaries
    #[arg(short, long)]
    pub frame_stream: bool,

    /// Load the plot specification from a JSON or TOML file instead of synthesizing it
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Write log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Create the default config file
    Init,
    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["pipeplot"]);
        assert!(args.sample_size.is_none());
        assert!(args.window.is_none());
        assert!(args.prompt.is_none());
        assert!(args.height.is_none());
        assert!(args.model.is_none());
        assert!(args.learn_timeout.is_none());
        assert!(args.refresh.is_none());
        assert!(!args.frame_stream);
        assert!(args.spec.is_none());
        assert!(args.config.is_none());
        assert!(args.log_file.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_short_flags() {
        let args = Args::parse_from([
            "pipeplot", "-s", "3", "-w", "50", "-p", "cpu", "-m", "gpt-4o", "-r", "0.2", "-f",
        ]);
        assert_eq!(args.sample_size, Some(3));
        assert_eq!(args.window, Some(50));
        assert_eq!(args.prompt.as_deref(), Some("cpu"));
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
        assert_eq!(args.refresh, Some(0.2));
        assert!(args.frame_stream);
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::parse_from([
            "pipeplot",
            "--height",
            "12",
            "--learn-timeout",
            "2.5",
            "--spec",
            "/tmp/spec.toml",
            "--log-file",
            "/tmp/pipeplot.log",
        ]);
        assert_eq!(args.height, Some(12));
        assert_eq!(args.learn_timeout, Some(2.5));
        assert_eq!(args.spec, Some(PathBuf::from("/tmp/spec.toml")));
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/pipeplot.log")));
    }

    #[test]
    fn test_args_reject_zero_counts() {
        assert!(Args::try_parse_from(["pipeplot", "--window", "0"]).is_err());
        assert!(Args::try_parse_from(["pipeplot", "-s", "0"]).is_err());
        assert!(Args::try_parse_from(["pipeplot", "--height", "abc"]).is_err());
    }

    #[test]
    fn test_args_reject_non_positive_seconds() {
        assert!(Args::try_parse_from(["pipeplot", "--refresh", "0"]).is_err());
        assert!(Args::try_parse_from(["pipeplot", "--learn-timeout", "-1"]).is_err());
        assert!(Args::try_parse_from(["pipeplot", "--learn-timeout", "inf"]).is_err());
    }

    #[test]
    fn test_args_reject_unrepresentable_seconds() {
        assert!(Args::try_parse_from(["pipeplot", "--learn-timeout", "1e30"]).is_err());
        assert!(Args::try_parse_from(["pipeplot", "-r", "1e30"]).is_err());
        let args = Args::try_parse_from(["pipeplot", "--learn-timeout", "86400"]).unwrap();
        assert_eq!(args.learn_timeout, Some(86400.0));
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["pipeplot", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["pipeplot", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_config_subcommands() {
        for (name, expected) in [
            ("show", ConfigAction::Show),
            ("init", ConfigAction::Init),
            ("path", ConfigAction::Path),
        ] {
            let args = Args::parse_from(["pipeplot", "config", name]);
            match args.command {
                Some(Command::Config { action }) => assert_eq!(action, expected),
                _ => panic!("Expected Config subcommand"),
            }
        }
    }
}
