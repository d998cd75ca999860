//! Seeding strategy registry and selection.
//!
//! Each [`SeedingStrategy`] classifies the schema from its own point of view;
//! [`StrategyRegistry::select_strategy`] picks one by manual override, by
//! confidence, or by falling back to the generic strategy.
//!
//! # Example
//!
//! ```ignore
//! use seedscope::strategy::StrategyRegistry;
//!
//! let registry = StrategyRegistry::with_defaults();
//! let selection = registry.select_strategy(&context, None).await;
//! println!("{} ({})", selection.strategy_name, selection.reason);
//! ```

mod generic;
mod makerkit;
mod profile;
mod registry;
mod seeding;

pub use generic::GenericStrategy;
pub use makerkit::MakerKitStrategy;
pub use profile::{FrameworkProfile, ProfileError};
pub use registry::{SelectionReason, StrategyRegistry, StrategySelection, StrategyValidation};
pub use seeding::SeedingStrategy;
