//! Use cases (interactors) for FileVault
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`InitializeSyncUseCase`] - Create or look up a user's sync configuration

pub mod initialize_sync;

pub use initialize_sync::InitializeSyncUseCase;
