//! NodeLaunch Tools Library
//!
//! Project configuration, task orchestration and the deploy-and-assert
//! harness for the NodeLaunch contract project.

pub mod compiler;
pub mod config;
pub mod harness;
pub mod network;
pub mod paths;
pub mod preprocess;
pub mod tasks;
pub mod watcher;

pub use config::{Config, ConfigError, Environment};
pub use network::{AccountSource, CeloNetwork, NetworkProfile, NetworkRegistry};
pub use tasks::{Task, TaskError, TaskOutcome, TaskRunner};
