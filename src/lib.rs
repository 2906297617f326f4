//! Cross-Section Reweighting Engine
//!
//! Per-event weights that move simulated neutrino interactions from the
//! generator's model to a tuned one, plus systematic knobs that vary it:
//! - Registry of calculator instances, one per (type, arguments)
//! - Generator support checks on every calculation
//! - Stored-table sigma interpolation
//! - Tunes composing generators and knobs

pub mod error;
pub mod utils;

pub mod event;
pub mod generator;

pub mod registry;
pub mod rwgt;
pub mod tables;

pub mod calcs;
pub mod tune;

pub mod adapters;
pub mod config;
pub mod telemetry;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{RwgtError, RwgtResult};
pub use event::{EventRecord, ReweightKnob, ReweightList, ReweightVals};
pub use generator::{Generator, GeneratorSupport, GeneratorVersion, StoredSupport};
pub use registry::Registry;
pub use rwgt::{ClampRange, SigmaPolicy, SystKnob, SystKnobSet, WeightGenerator};
pub use tune::{Tune, TuneDefinition};
pub use utils::InputVals;
