//! Domain layer containing core business logic.
//!
//! This module contains:
//! - The filter pipeline engine (definitions, registry, injector, actions)
//! - Error types
//! - Logger with rotation

mod error;
pub mod filter;
pub mod logger;

pub use filter::{FilterDefinition, OnError, Registry};
