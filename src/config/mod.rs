pub mod plugin;

pub use plugin::{ConfigSource, PluginConfig};
