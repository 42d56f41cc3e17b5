//! # Prethesis
//!
//! A thesis supervision register for university departments, usable both as
//! a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! prethesis = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prethesis::config::ServerConfig;
//! use prethesis::server::{AppState, create_router};
//! use prethesis::store::SqliteStore;
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     config,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the command-line entry point. Disable with
//!   `default-features = false`.

pub mod allocation;
pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;
