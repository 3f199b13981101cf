//! Driver table: what can be updated and where it applies

pub mod catalog;
pub mod types;

pub use catalog::default_drivers;
pub use types::{DriverSpec, EligibilityRule, HostClass, HostRules};
