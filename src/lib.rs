//! A small Rust client for the Simons CMAP ocean data service.
//!
//! Requests are plain authenticated GETs against the service's query and
//! stored-procedure endpoints; every response is a CSV table decoded into a
//! [`Table`].
//!
//! ## Quick start
//! - Configure authentication via the `CMAP_API_KEY` environment variable, or persist a
//!   key once with [`set_api_key`] into `~/.cmapapirc`.
//! - Build a [`Client`] and call one of its operations.
//!
//! ```no_run
//! use cmapapi::{BoundingBox, Client};
//!
//! fn main() -> cmapapi::Result<()> {
//!     let client = Client::from_env()?;
//!     let bbox = BoundingBox::new("2016-04-30", "2016-04-30")
//!         .lat(10.0, 70.0)
//!         .lon(-180.0, -80.0)
//!         .depth(0.0, 0.0);
//!     let sst = client.space_time("tblsst_AVHRR_OI_NRT", "sst", &bbox)?;
//!     println!("{} rows", sst.len());
//!     Ok(())
//! }
//! ```
//!
//! Colocation of one dataset with several others:
//!
//! ```no_run
//! use cmapapi::{BoundingBox, Client, TargetLists, Tolerance};
//!
//! # fn main() -> cmapapi::Result<()> {
//! let client = Client::from_env()?;
//! let bbox = BoundingBox::new("2016-04-20", "2016-05-03")
//!     .lat(21.0, 45.0)
//!     .lon(-161.0, -155.0)
//!     .depth(0.0, 100.0);
//! let targets = TargetLists::new().target(
//!     "tblSST_AVHRR_OI_NRT",
//!     "sst",
//!     Tolerance { temporal: 1.0, lat: 0.25, lon: 0.25, depth: 5.0 },
//! );
//! let matched = client.r#match("tblSeaFlow", "prochloro_abundance", &bbox, &targets)?;
//! # let _ = matched;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod catalog;
mod client;
mod colocation;
mod config;
mod cruise;
mod error;
mod procedure;
mod query;
mod store;
mod subset;
mod table;
mod transport;
mod util;

pub use catalog::{DEFAULT_HEAD_ROWS, MAX_DATASET_ROWS, is_climatology_name};
pub use client::{Client, QUERY_ROUTE, STORED_PROC_ROUTE};
pub use colocation::{
    CRUISE_TRAJECTORY_TABLE, MATCH_PROCEDURE, MatchRequest, Target, TargetLists, Tolerance,
};
pub use config::{API_KEY_ENV, API_URL_ENV, ClientConfig, Credential, DEFAULT_URL, load_config};
pub use error::{Error, ErrorKind, Result};
pub use procedure::{BoundingBox, Interval, StoredProcCall, SubsetProcedure, interval_to_usp_name};
pub use query::{QueryParams, Scalar};
pub use store::{FileKeyStore, KeyStore, MemoryKeyStore, RC_ENV, set_api_key};
pub use table::{Cell, Column, ColumnData, Table};
pub use transport::{HttpResponse, HttpTransport, RetryingTransport, Transport};
