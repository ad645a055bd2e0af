//! FileVault Core - Domain types and ports for the sync engine
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `LocalItem`, `RemoteItem`, `SyncConfiguration` and validated newtypes
//! - **Use cases** - `initialize_sync`
//! - **Port definitions** - Traits for adapters: `LocalFileSystem`, `MetadataStore`,
//!   `ObjectStore`, `ConfigurationStore`, `DecisionPrompt`
//! - **Configuration** - YAML-backed settings shared by the engine and the CLI
//!
//! # Architecture
//!
//! The domain module holds plain data and validation with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The sync engine in `filevault-sync` drives those ports; the reference
//! adapters live in `filevault-store` and `filevault-sync::filesystem`.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
