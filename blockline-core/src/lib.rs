//! # Blockline Core
//!
//! Runs a fixed list of status commands ("blocks") on intervals, signals and
//! clicks, joins their output into one line and publishes it only when it
//! changed.

pub mod composer;
pub mod config;
pub mod engine;
pub mod publisher;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod signals;
pub mod slot;

// Re-export the main struct so users can just use `blockline_core::StatusEngine`
pub use engine::{RunRequest, StatusEngine, TriggerError, TriggerHandle};

pub use composer::StatusComposer;
pub use config::EngineConfig;
pub use publisher::{PublishError, Publisher, RootNamePublisher, StdoutPublisher, WriterPublisher};
pub use registry::{BlockSpec, Interval, MAX_SIGNAL, Registry, RegistryError, default_blocks};
pub use slot::{Slot, SlotTable};
