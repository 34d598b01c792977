#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Metro-PIDS display control server.
//!
//! This crate hosts the data models, configuration handling,
//! the run-state control machine, the display registry, and the
//! synchronization gateway used by the HTTP frontend and tests.

pub mod command;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod state;

pub use command::Command;
pub use config::AppConfig;
pub use error::CoreError;
pub use models::{Direction, DockSide, Phase, RunState, Snapshot, Station, Timetable};
pub use registry::{BroadcastReport, DisplayFeed, DisplayInfo, DisplayUpdate, OpenOptions};
pub use state::{Mutation, PidsState, RtUpdate};
