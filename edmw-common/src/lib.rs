//! # EDM Wizard Common Library
//!
//! Shared code for the EDM wizard crates including:
//! - Error and result types
//! - TOML configuration model and config file resolution
//! - Logging initialisation
//! - Event types (WizardEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
