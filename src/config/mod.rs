//! Engine configuration: types, defaults, validation, loading

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{ConfigSource, create_default_config, load_config, load_config_with_fallback};
pub use types::{
    MonitorConfig, TierConfig, TierConfigBuilder, duration_serde, option_duration_serde,
};
pub use validation::validate_config;
