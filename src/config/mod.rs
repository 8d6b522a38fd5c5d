//! Configuration
//!
//! Figment-merged configuration (defaults → global → project → env) with
//! range validation after loading.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{CaseNaming, Config, InputConfig, LlmConfig, PublishConfig, RetryConfig};
