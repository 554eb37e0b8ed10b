//! # grantsync-core
//!
//! Converges a declared access grant (user, host, database, privileges,
//! grant option) onto a server that only understands imperative
//! `GRANT` / `REVOKE` statements and a per-principal `SHOW GRANTS` listing.
//!
//! ```rust,no_run
//! use grantsync_core::{Connection, GrantReconciler, GrantSpec, GrantState};
//!
//! fn converge(conn: &dyn Connection) -> Result<(), grantsync_core::GrantError> {
//!     let spec = GrantSpec::new("app", "appdb", ["SELECT", "INSERT"])?;
//!     let mut state = GrantState::new(spec);
//!     let reconciler = GrantReconciler::default();
//!     reconciler.apply(conn, &mut state)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod spec;
pub mod state;
pub mod statement;

pub use config::{ReconcilerConfig, ReconcilerConfigBuilder};
pub use connection::{Connection, Rows};
pub use error::{ConnectionError, GrantError, Result, RevokeStage};
pub use plan::{Plan, PlanStep};
pub use reconciler::{GrantReconciler, Verification};
pub use spec::{GrantFields, GrantIdentity, GrantSpec, ALL_DATABASES, DEFAULT_HOST};
pub use state::{GrantState, ResourceState};
