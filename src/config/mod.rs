//! Configuration module
//!
//! Loads the YAML configuration file, resolves it into an immutable
//! [`PolicyConfig`] and reports every value that had to be replaced by a
//! default.

pub mod loader;
pub mod policy;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use policy::{
    BarColor, BarStyle, CommandPolicy, IndicatorSettings, LogoutPolicy, Messages, PolicyConfig,
    Punishment,
};
pub use schema::RawConfig;
pub use validation::{ValidationResult, Validator};
