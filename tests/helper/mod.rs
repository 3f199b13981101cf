//! Shared fakes and fixtures for orchestrator tests

#![allow(dead_code)]

mod fakes;
mod fixtures;

pub use fakes::*;
pub use fixtures::*;
