//! # twitcast-rec
//!
//! Watches a TwitCasting broadcaster and records each live broadcast's raw
//! fMP4 frames to disk, then goes back to watching.
//!
//! ## Usage
//!
//! The `orchestrator` module ties the pieces together. The components can
//! also be used on their own, e.g. to check whether someone is live:
//!
//! ```no_run
//! use std::time::Duration;
//! use twitcast_rec::{session::RecordingTarget, status::StatusResolver, util};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = util::HttpClient::new(Duration::from_secs(10)).unwrap();
//!     let resolver = StatusResolver::new(&client, "https://twitcasting.tv");
//!     let target = RecordingTarget::new("someone").unwrap();
//!
//!     match resolver.resolve(&target).await {
//!         Ok(availability) if availability.is_live() => println!("Live"),
//!         Ok(_) => println!("Not live"),
//!         Err(e) => println!("Could not query status: {}", e),
//!     }
//! }
//! ```
//!
//! Recordings land in `record_video/<target>/<target>_<timestamp>_<id>.ts`.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod config;
pub mod orchestrator;
pub mod probe;
pub mod recorder;
pub mod session;
pub mod stats;
pub mod status;
pub mod util;
