//! Version discovery and comparison layer
//!
//! Decides, per driver, whether the installed version is behind the latest
//! published one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Remote    │────▶│   Planner   │◀────│    Local    │
//! │ (doc page)  │     │  (decide)   │     │   (probe)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲
//!                            │
//!                     ┌─────────────┐
//!                     │ Eligibility │
//!                     │ (host rule) │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`version_string`]: Dotted numeric versions with zero-padded ordering
//! - [`eligibility`]: Host class rules per driver
//! - [`remote`]: Latest version scraped from a reference page
//! - [`local`]: Installed version reported by a shell probe
//! - [`planner`]: Update decision and comparison table rows
//! - [`error`]: Error types for parsing and discovery

pub mod eligibility;
pub mod error;
pub mod local;
pub mod planner;
pub mod remote;
pub mod version_string;

pub use version_string::VersionString;
