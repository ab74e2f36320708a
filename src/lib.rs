//! # Orgpulse
//!
//! A survey backend for organizations: administrators open survey
//! iterations, build a unit hierarchy per iteration, assign people to roles,
//! collect self-assessments, and roll the results up the management chain.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use orgpulse::server::{AppState, create_router};
//! use orgpulse::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/orgpulse.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), PathBuf::from("./question_sets")));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `orgpulse` binary. Disable with `default-features = false`.

pub mod analysis;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod tree;
pub mod types;
