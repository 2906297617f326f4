//! Typed errors for weight calculation.
//!
//! Callers are expected to match on the variant: an unsupported generator is
//! a data problem they may want to skip per event, while an unknown knob name
//! is a programming error.

use thiserror::Error;

use crate::generator::{Generator, GeneratorVersion};
use crate::rwgt::interpolation::InterpolationError;

pub type RwgtResult<T> = std::result::Result<T, RwgtError>;

#[derive(Debug, Error)]
pub enum RwgtError {
    #[error("'{calculator}' does not support generator '{generator}' with version '{version}' and configuration string '{config}'")]
    UnsupportedGenerator {
        calculator: String,
        generator: Generator,
        version: GeneratorVersion,
        config: String,
    },

    #[error("tune '{tune}' has no systematic knob named '{knob}'")]
    UnknownKnob { tune: String, knob: String },

    #[error("systematic knob '{0}' was never registered")]
    KnobNotRegistered(String),

    #[error("stored weights for knob '{knob}' are not available and no on-the-fly calculator is configured")]
    NoStoredWeights { knob: String },

    #[error("interpolation failed for knob '{knob}': {source}")]
    Interpolation {
        knob: String,
        #[source]
        source: InterpolationError,
    },

    #[error("invalid clamp range [{lo}, {hi}]")]
    InvalidClampRange { lo: f64, hi: f64 },

    #[error("registry identity {identity} already holds an instance built from different arguments")]
    RegistryCollision { identity: String },

    #[error("calculator {identity} depends on itself during construction")]
    CyclicConstruction { identity: String },

    #[error("requested key not in input values map: '{0}'")]
    UnknownParameter(String),

    #[error("could not load object '{object}' from file '{file}': {reason}")]
    TableLoad {
        file: String,
        object: String,
        reason: String,
    },

    #[error("invalid tune: {0}")]
    InvalidTune(String),

    #[error("event conversion failed: {0}")]
    Conversion(String),
}
