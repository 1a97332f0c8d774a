pub mod settings;

pub use settings::{CONFIG_JSON_VAR, CONFIG_PATH_VAR, SettingsSource, WordCounterSettings};
