/// Bot settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, DialogConfig, SuggestionConfig, load_config, load_default_config};
