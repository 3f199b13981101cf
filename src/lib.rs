pub mod archive;
pub mod config;
pub mod driver;
pub mod fetch;
pub mod host;
pub mod shell;
pub mod update;
pub mod version;
