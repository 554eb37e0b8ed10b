//! # grantsync-client
//!
//! Async client for servers speaking the length-prefixed JSON request
//! protocol. Used by the `grantsync` CLI to run grant statements.
//!
//! ```rust,no_run
//! use grantsync_client::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), grantsync_client::Error> {
//!     let client = Client::connect("localhost:8765", Config::default()).await?;
//!
//!     let result = client.query("SHOW GRANTS FOR 'app'@'localhost'").await?;
//!     for row in result.rows {
//!         println!("{:?}", row);
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod result;

pub use client::Client;
pub use config::{Config, ConfigBuilder};
pub use error::Error;
pub use result::QueryResult;
