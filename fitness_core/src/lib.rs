#![forbid(unsafe_code)]

//! Core session logic for the FitnessX workout tracker.
//!
//! This crate provides:
//! - Domain types (coordinates, samples, moments, sessions)
//! - The workout session lifecycle controller
//! - The simulated position stream and cancellable session timer
//! - The guided exercise player
//! - Template catalog, configuration and logging setup

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod geo;
pub mod timer;
pub mod stream;
pub mod events;
pub mod media;
pub mod report;
pub mod summary;
pub mod controller;
pub mod player;
pub mod catalog;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use stream::{PathEnd, PositionStream};
pub use timer::SessionTimer;
pub use events::SessionEvent;
pub use media::{InMemoryMediaStore, MediaStore};
pub use report::{JsonLinesReporter, MemoryReporter, SessionReporter};
pub use summary::{Pace, SessionSummary};
pub use controller::SessionController;
pub use player::{ExercisePlayer, ExerciseStep, PlayerPhase, PlayerState, StepTarget};
pub use catalog::{build_default_catalog, get_default_catalog, park_loop, Catalog, WorkoutTemplate};
