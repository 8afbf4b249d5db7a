#![forbid(unsafe_code)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod host;
pub mod install;
pub mod metrics;
pub mod paths;
pub mod reconcile;
pub mod register;
pub mod runner;
pub mod state;
pub mod status;
pub mod template;
