//! Leaf Calculators
//!
//! Concrete central-value generators and systematic knobs. Each one is
//! obtained through the [`Registry`](crate::registry::Registry) so that a tune
//! and any knob depending on it share a single instance.

pub mod dis;
pub mod nue_numu;
pub mod qe;
pub mod rpa;

pub use dis::{Nonres1PiArgs, Nonres1PiWeight};
pub use nue_numu::{RadiativeCorrSyst, SecondClassCurrentSyst};
pub use qe::{MaqeReducedSyst2017, MaqeReducedSyst2018, MaqeWeight2018};
pub use rpa::{RpaFilter, RpaQ0Q3Args, RpaQ0Q3Weight, RpaQ2Weight};
