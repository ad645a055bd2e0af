//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ILocalFileSystem`] - Local sync root access
//! - [`IMetadataStore`] - Remote item hierarchy
//! - [`IObjectStore`] - File payloads
//! - [`IConfigurationStore`] - Persisted sync configurations
//! - [`IDecisionPrompt`] - Human choice of sync direction

pub mod configuration_store;
pub mod decision;
pub mod local_filesystem;
pub mod metadata_store;
pub mod object_store;

pub use configuration_store::IConfigurationStore;
pub use decision::{Decision, IDecisionPrompt};
pub use local_filesystem::{FileSystemState, ILocalFileSystem};
pub use metadata_store::IMetadataStore;
pub use object_store::IObjectStore;
