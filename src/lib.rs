//! pxfbuild library exports.
//!
//! The binary is a thin clap front end over [`commands`]; everything else is
//! exposed so integration tests can drive the pipeline with a mock
//! [`module::ModuleRunner`].

pub mod clean;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod facts;
pub mod fsutil;
pub mod gate;
pub mod layout;
pub mod manifest;
pub mod module;
pub mod naming;
pub mod package;
pub mod preflight;
pub mod process;
pub mod report;
pub mod stage;
pub mod timing;

pub use error::{Error, Result};
