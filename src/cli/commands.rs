//! Handlers for the `config` subcommand.

use std::path::PathBuf;

use super::args::{Args, ConfigAction};
use crate::config::{default_path, Config, ConfigError};
use crate::settings::Settings;

fn config_path(args: &Args) -> PathBuf {
    args.config.clone().unwrap_or_else(default_path)
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: &ConfigAction, args: &Args) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(args.config.as_deref())?;
            let settings = Settings::resolve(args, &config)?;
            print!("{}", render_settings(&settings));
            println!();

            let path = config_path(args);
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
        }
        ConfigAction::Init => {
            let path = config_path(args);
            Config::init(&path)?;
            println!("Created config file: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", config_path(args).display());
        }
    }
    Ok(())
}

/// Effective settings in the same layout as the config file.
pub fn render_settings(settings: &Settings) -> String {
    let prompt = if settings.prompt.is_empty() {
        "(none)"
    } else {
        settings.prompt.as_str()
    };
    format!(
        "Current configuration:\n\
         \x20 Sample size: {}\n\
         \x20 Learn timeout: {}s\n\
         \x20 Frame stream: {}\n\
         \x20 Window: {}\n\
         \x20 Height: {}\n\
         \x20 Refresh: {}s\n\
         \x20 Model: {}\n\
         \x20 Prompt: {}\n",
        settings.sample_size,
        settings.learn_timeout,
        if settings.frame_stream { "yes" } else { "no" },
        settings.window,
        settings.height,
        settings.refresh,
        settings.model,
        prompt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_render_settings_defaults() {
        let text = render_settings(&Settings::default());
        assert!(text.contains("  Sample size: 5\n"));
        assert!(text.contains("  Window: 200\n"));
        assert!(text.contains("  Refresh: 0.5s\n"));
        assert!(text.contains("  Model: gpt-5\n"));
        assert!(text.contains("  Prompt: (none)\n"));
    }

    #[test]
    fn test_init_creates_file_at_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeplot.toml");
        let args = Args::parse_from(["pipeplot", "-c", path.to_str().unwrap(), "config", "init"]);

        handle_config_action(&ConfigAction::Init, &args).unwrap();
        assert!(path.exists());

        assert!(matches!(
            handle_config_action(&ConfigAction::Init, &args),
            Err(ConfigError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_show_with_missing_explicit_config_fails() {
        let args = Args::parse_from(["pipeplot", "-c", "/nonexistent/pipeplot.toml", "config", "show"]);
        assert!(matches!(
            handle_config_action(&ConfigAction::Show, &args),
            Err(ConfigError::NotFound { .. })
        ));
    }
}
