//! Effective session settings: command line over config file over defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::collect::SegmentMode;
use crate::config::{Config, ConfigError};
use crate::controller::ViewSettings;
use crate::synth::DEFAULT_MODEL;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sample_size: usize,
    pub window: usize,
    pub prompt: String,
    pub height: usize,
    pub model: String,
    pub learn_timeout: f64,
    pub refresh: f64,
    pub frame_stream: bool,
    pub spec: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_size: 5,
            window: 200,
            prompt: String::new(),
            height: 30,
            model: DEFAULT_MODEL.to_string(),
            learn_timeout: 10.0,
            refresh: 0.5,
            frame_stream: false,
            spec: None,
        }
    }
}

impl Settings {
    /// Merge `args` over `config` over defaults and validate the result.
    pub fn resolve(args: &Args, config: &Config) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let settings = Settings {
            sample_size: args
                .sample_size
                .or(config.collect.sample_size)
                .unwrap_or(defaults.sample_size),
            window: args.window.or(config.view.window).unwrap_or(defaults.window),
            prompt: args
                .prompt
                .clone()
                .or_else(|| config.synth.prompt.clone())
                .unwrap_or(defaults.prompt),
            height: args.height.or(config.view.height).unwrap_or(defaults.height),
            model: args
                .model
                .clone()
                .or_else(|| config.synth.model.clone())
                .unwrap_or(defaults.model),
            learn_timeout: args
                .learn_timeout
                .or(config.collect.learn_timeout)
                .unwrap_or(defaults.learn_timeout),
            refresh: args.refresh.or(config.view.refresh).unwrap_or(defaults.refresh),
            frame_stream: args.frame_stream || config.collect.frame_stream.unwrap_or(false),
            spec: args.spec.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sample_size", self.sample_size),
            ("window", self.window),
            ("height", self.height),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        for (field, value) in [
            ("learn_timeout", self.learn_timeout),
            ("refresh", self.refresh),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be greater than 0, got {}", value),
                });
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} seconds is too long", value),
                });
            }
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn segment_mode(&self) -> SegmentMode {
        if self.frame_stream {
            SegmentMode::Frames
        } else {
            SegmentMode::Lines
        }
    }

    pub fn learn_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.learn_timeout)
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            window_size: self.window,
            height: self.height,
            refresh: self.refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["pipeplot"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::resolve(&args(&[]), &Config::default()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.segment_mode(), SegmentMode::Lines);
        assert_eq!(settings.learn_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_overrides_defaults() {
        let config: Config = toml::from_str(
            "[view]\nwindow = 40\n[collect]\nframe_stream = true\n[synth]\nmodel = \"gpt-4o\"\n",
        )
        .unwrap();
        let settings = Settings::resolve(&args(&[]), &config).unwrap();
        assert_eq!(settings.window, 40);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.segment_mode(), SegmentMode::Frames);
        assert_eq!(settings.height, 30);
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: Config = toml::from_str("[view]\nwindow = 40\nrefresh = 1.0\n").unwrap();
        let settings = Settings::resolve(&args(&["-w", "10", "-m", "local"]), &config).unwrap();
        assert_eq!(settings.window, 10);
        assert_eq!(settings.model, "local");
        assert_eq!(settings.refresh, 1.0);
    }

    #[test]
    fn test_invalid_config_values_rejected() {
        let config: Config = toml::from_str("[view]\nwindow = 0\n").unwrap();
        assert!(matches!(
            Settings::resolve(&args(&[]), &config),
            Err(ConfigError::Invalid { field: "window", .. })
        ));

        let config: Config = toml::from_str("[view]\nrefresh = -0.5\n").unwrap();
        assert!(matches!(
            Settings::resolve(&args(&[]), &config),
            Err(ConfigError::Invalid { field: "refresh", .. })
        ));

        let config: Config = toml::from_str("[view]\nrefresh = 1e30\n").unwrap();
        assert!(matches!(
            Settings::resolve(&args(&[]), &config),
            Err(ConfigError::Invalid { field: "refresh", .. })
        ));

        let config: Config = toml::from_str("[collect]\nlearn_timeout = 1e30\n").unwrap();
        assert!(matches!(
            Settings::resolve(&args(&[]), &config),
            Err(ConfigError::Invalid { field: "learn_timeout", .. })
        ));
    }

    #[test]
    fn test_view_settings() {
        let settings = Settings::resolve(&args(&["--height", "8", "-r", "0.25"]), &Config::default())
            .unwrap();
        let view = settings.view_settings();
        assert_eq!(view.height, 8);
        assert_eq!(view.window_size, 200);
        assert_eq!(view.refresh, 0.25);
    }
}
