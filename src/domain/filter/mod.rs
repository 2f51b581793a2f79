//! Filter pipeline engine.
//!
//! Definitions are loaded and validated once, indexed by a [`Registry`], and
//! then used per invocation to rewrite arguments and transform output.

mod action;
mod definition;
mod injector;
pub mod loader;
mod params;
pub mod pipeline;
mod registry;
mod template;

pub use definition::{FilterDefinition, OnError};
pub use injector::final_args;
pub use loader::{LoadedFilters, Source};
pub use registry::Registry;
