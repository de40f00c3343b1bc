//! # Riskcalc Traits
//!
//! Trait definitions for the collaborators of the Riskcalc batch engine.
//!
//! This crate contains ONLY trait definitions with no runtime dependencies.
//! Implementations live in extension crates such as `riskcalc-ext-file`.
//!
//! ## Module Structure
//!
//! - [`rates`]: Exchange-rate lookups used by currency conversion
//! - [`storage`]: Source file download and result document storage
//!
//! ## Dependency Injection
//!
//! The engine receives its collaborators explicitly:
//!
//! ```ignore
//! RiskCalculationEngine::new(config, Arc::new(rates), Arc::new(storage))?
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod rates;
pub mod storage;

// Re-export commonly used types
pub use error::TraitError;
pub use rates::ExchangeRateProvider;
pub use storage::FileStorage;
