// Configuration management
// TOML settings stored in the application base directory

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, IndexingConfig, LlmConfig, OllamaConfig, PubmedConfig, RetrievalConfig,
};
