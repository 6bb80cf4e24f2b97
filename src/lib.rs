//! Rust library for discovering Roku devices and querying their status
//!
//! This library finds Roku devices on the local network via SSDP discovery,
//! then queries each one over its External Control Protocol (ECP) HTTP API.
//! It supports:
//!
//! - SSDP M-SEARCH discovery, Roku-only or all UPnP root devices
//! - Concurrent fetching of the four ECP query categories
//!   (device-info, apps, active-app, media-player)
//! - Typed decoding of device attributes, installed apps and player state
//! - JSON and XML output with per-category exclusion
//!
//! # Quick Start
//!
//! ```no_run
//! use roku_scanner::{scan, EcpClient, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Discover devices, collecting responses for 2 seconds
//!     let scanner = Scanner::new();
//!     let discovered = scanner.discover().await?;
//!
//!     // Query every Roku that answered
//!     let client = EcpClient::new()?;
//!     for roku in scan(&client, discovered).await? {
//!         println!("{} at {}", roku.device_name(), roku.location());
//!         if let Some(apps) = roku.apps() {
//!             println!("  {} app(s) installed", apps.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Formatting
//!
//! ```no_run
//! use std::collections::HashSet;
//! use roku_scanner::{format, scan, Category, EcpClient, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovered = Scanner::new().discover().await?;
//!     let client = EcpClient::new()?;
//!
//!     let mut exclude = HashSet::new();
//!     exclude.insert(Category::Apps);
//!
//!     for roku in scan(&client, discovered).await? {
//!         println!("{}", format::to_json(&roku, &exclude, true)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Discovery**: SSDP M-SEARCH over UDP multicast, bounded by a receive
//!   window (`Scanner`, `DiscoveryRecord`)
//! - **ECP client**: four concurrent HTTP GETs per device, each returning a
//!   parsed XML tree or an embedded error (`EcpClient`, `DeviceDataSet`)
//! - **Aggregation**: vendor filtering and typed decoding of the fetched
//!   categories (`scan`, `Roku`)
//! - **Formatting**: JSON/XML rendering with category exclusion (`format`)

mod device;
mod discovery;
mod ecp;
mod error;
pub mod format;
mod headers;

// Public exports
pub use device::{scan, AttrValue, Player, PlayerFormat, Roku, RokuApp};
pub use discovery::{Scanner, SearchTarget};
pub use ecp::{Category, DeviceDataSet, EcpClient, EcpDocument};
pub use error::{Result, ScanError};
pub use headers::{header_line, parse_headers, DiscoveryRecord};
