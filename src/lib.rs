//! # Web of Science Client
//!
//! A Rust client library for the Web of Science web services (WWS), the
//! SOAP API behind the Web of Science Core Collection.
//!
//! ## Features
//!
//! - **Session management**: authenticate, reuse and close WWS sessions
//! - **Premium and Lite**: one client for both endpoints, with premium-only
//!   operations rejected up front on Lite
//! - **Paged queries**: transparently split requests above the
//!   100-records-per-call limit and stitch the XML back together
//! - **Extraction**: pull text out of records with ElementTree-style paths
//! - **Throttling**: stay inside the calls-per-second budget of a session
//!
//! ## Quick Start
//!
//! ```no_run
//! use wos_client::{ClientConfig, WosClient, paging};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new().with_credentials("user", "secret");
//!     let mut client = WosClient::with_config(config)?;
//!
//!     client.connect().await?;
//!
//!     let uid = paging::doi_to_wos(&client, "10.1145/2180861.2180863").await?;
//!     println!("WOS id: {:?}", uid);
//!
//!     let document = paging::query(&client, "TS=(cadmium OR lead)", None, 150, 1, 100).await?;
//!     if let Some(xml) = document.as_document() {
//!         println!("{xml}");
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod paging;
pub mod rate_limit;
pub mod wos;

// Re-export main types for convenience
pub use config::{ClientConfig, Credentials, Throttle};
pub use error::{Result, WosError};
pub use paging::{PagePlan, QueryResult, XmlPath, doi_to_wos, query, single};
pub use wos::{ResponseShape, SearchOptions, SearchResponse, WosClient};
