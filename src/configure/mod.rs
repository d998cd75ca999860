//! Auto-configuration: detection results to a seed configuration.
//!
//! Configuration is built from override layers, later layers winning field
//! by field:
//!
//! ```text
//! architecture defaults → domain defaults → templates (lowest priority first)
//!                                         → volume tuning (optimized mode)
//!                                         → caller overrides
//! ```
//!
//! Generation never fails. A template that produces out-of-range values,
//! or a final configuration that does not validate, yields the fixed
//! fallback configuration at confidence 0.3.

mod configurator;
mod defaults;
mod error;
mod templates;
mod types;

pub use configurator::{completeness, write_configuration, AutoConfigOptions, AutoConfigurator};
pub use defaults::{architecture_defaults, domain_defaults, optimized_volumes, safe_defaults};
pub use error::{ConfigurationError, ConfigurationResult};
pub use templates::{builtin_templates, ApplyFn, ConfigurationTemplate, GenerateFn, TemplateContext};
pub use types::{
    AutoConfigMetrics, AutoConfigurationResult, ConfigOverrides, GenerationMode, SeedConfiguration,
    ESSENTIAL_FIELDS, MAX_USER_COUNT,
};
