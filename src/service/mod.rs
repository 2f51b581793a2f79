//! Service layer containing business logic orchestration.

mod executor;
mod run_service;
mod savings;

pub use run_service::RunService;
