// Configuration management module
// Handles the TOML settings file and the interactive setup wizard

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{API_KEY_ENV, ChatConfig, Config, ConfigError, GeminiConfig};
