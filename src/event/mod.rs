//! Event Record
//!
//! The internal, generator-neutral view of one simulated interaction. It is
//! read-only input to every weight calculator.

pub mod knobs;
pub mod reweight;

pub use knobs::ReweightKnob;
pub use reweight::{ReweightList, ReweightVals};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RwgtError;
use crate::generator::{Generator, GeneratorVersion};

/// Charged- or neutral-current selection used by calculator filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentType {
    #[default]
    Unspecified,
    Cc,
    Nc,
}

impl CurrentType {
    /// Whether an event with the given CC flag passes this filter.
    pub fn matches(self, is_cc: bool) -> bool {
        match self {
            CurrentType::Unspecified => true,
            CurrentType::Cc => is_cc,
            CurrentType::Nc => !is_cc,
        }
    }
}

/// Scattering type, numbered like the upstream generator's enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    #[default]
    Null,
    QuasiElastic,
    SingleKaon,
    DeepInelastic,
    Resonant,
    Coherent,
    Diffractive,
    NuElectronElastic,
    InverseMuDecay,
    AmNuGamma,
    Mec,
    CoherentElastic,
    InverseBetaDecay,
    GlashowResonance,
    ImdAnnihilation,
    DarkMatterElastic,
    DarkMatterDeepInelastic,
}

impl ReactionType {
    pub fn code(self) -> u32 {
        match self {
            ReactionType::Null => 0,
            ReactionType::QuasiElastic => 1,
            ReactionType::SingleKaon => 2,
            ReactionType::DeepInelastic => 3,
            ReactionType::Resonant => 4,
            ReactionType::Coherent => 5,
            ReactionType::Diffractive => 6,
            ReactionType::NuElectronElastic => 7,
            ReactionType::InverseMuDecay => 8,
            ReactionType::AmNuGamma => 9,
            ReactionType::Mec => 10,
            ReactionType::CoherentElastic => 11,
            ReactionType::InverseBetaDecay => 12,
            ReactionType::GlashowResonance => 13,
            ReactionType::ImdAnnihilation => 14,
            ReactionType::DarkMatterElastic => 101,
            ReactionType::DarkMatterDeepInelastic => 102,
        }
    }
}

impl TryFrom<u32> for ReactionType {
    type Error = RwgtError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => ReactionType::Null,
            1 => ReactionType::QuasiElastic,
            2 => ReactionType::SingleKaon,
            3 => ReactionType::DeepInelastic,
            4 => ReactionType::Resonant,
            5 => ReactionType::Coherent,
            6 => ReactionType::Diffractive,
            7 => ReactionType::NuElectronElastic,
            8 => ReactionType::InverseMuDecay,
            9 => ReactionType::AmNuGamma,
            10 => ReactionType::Mec,
            11 => ReactionType::CoherentElastic,
            12 => ReactionType::InverseBetaDecay,
            13 => ReactionType::GlashowResonance,
            14 => ReactionType::ImdAnnihilation,
            101 => ReactionType::DarkMatterElastic,
            102 => ReactionType::DarkMatterDeepInelastic,
            other => {
                return Err(RwgtError::Conversion(format!("unknown reaction code {}", other)))
            }
        })
    }
}

/// Four-momentum in GeV, metric (+,-,-,-).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FourMomentum {
    pub e: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl FourMomentum {
    pub const UNSET: FourMomentum = FourMomentum {
        e: f64::NAN,
        px: f64::NAN,
        py: f64::NAN,
        pz: f64::NAN,
    };

    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Invariant `E^2 - |p|^2`.
    pub fn mag2(&self) -> f64 {
        self.e * self.e - self.vect_mag2()
    }

    pub fn vect_mag2(&self) -> f64 {
        self.px * self.px + self.py * self.py + self.pz * self.pz
    }

    /// Length of the three-vector part.
    pub fn vect_mag(&self) -> f64 {
        self.vect_mag2().sqrt()
    }

    fn same_as(&self, other: &Self) -> bool {
        same_f64(self.e, other.e)
            && same_f64(self.px, other.px)
            && same_f64(self.py, other.py)
            && same_f64(self.pz, other.pz)
    }
}

impl Default for FourMomentum {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Simulated interaction as seen by weight calculators.
///
/// Kinematic fields default to NaN ("not filled"); counts default to -1.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub generator: Generator,
    pub generator_version: GeneratorVersion,
    /// Generator configuration label (e.g. a comprehensive model tune name).
    pub generator_config: String,

    pub nu_pdg: i32,
    pub is_cc: bool,
    pub reaction: ReactionType,
    pub struck_nucleon: i32,

    /// Neutrino energy, GeV.
    pub enu: f64,
    /// Four-momentum transfer.
    pub q: FourMomentum,
    /// Inelasticity.
    pub y: f64,
    /// Hadronic invariant mass.
    pub w: f64,
    /// Mass number of the struck nucleus.
    pub a: u32,

    pub npi_plus: i32,
    pub npi_zero: i32,
    pub npi_minus: i32,

    pub genie_weights: ReweightList,
    /// No stored weights are expected for this event; every calculator
    /// returns exactly 1.0 without checking anything.
    pub expect_no_weights: bool,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            generator: Generator::Unknown,
            generator_version: GeneratorVersion::default(),
            generator_config: String::new(),
            nu_pdg: 0,
            is_cc: false,
            reaction: ReactionType::Null,
            struck_nucleon: -1,
            enu: f64::NAN,
            q: FourMomentum::UNSET,
            y: f64::NAN,
            w: f64::NAN,
            a: 0,
            npi_plus: -1,
            npi_zero: -1,
            npi_minus: -1,
            genie_weights: ReweightList::new(),
            expect_no_weights: false,
        }
    }
}

impl EventRecord {
    /// `Q^2 = -q.q`.
    pub fn q2(&self) -> f64 {
        -self.q.mag2()
    }

    pub fn is_antineutrino(&self) -> bool {
        self.nu_pdg < 0
    }

    /// Total pion multiplicity before final-state interactions.
    pub fn pre_fsi_pions(&self) -> i32 {
        self.npi_plus + self.npi_zero + self.npi_minus
    }
}

fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

// Unfilled (NaN) kinematics compare equal so that a record survives a
// conversion round trip.
impl PartialEq for EventRecord {
    fn eq(&self, other: &Self) -> bool {
        self.generator == other.generator
            && self.generator_version == other.generator_version
            && self.generator_config == other.generator_config
            && self.nu_pdg == other.nu_pdg
            && self.is_cc == other.is_cc
            && self.reaction == other.reaction
            && self.struck_nucleon == other.struck_nucleon
            && same_f64(self.enu, other.enu)
            && self.q.same_as(&other.q)
            && same_f64(self.y, other.y)
            && same_f64(self.w, other.w)
            && self.a == other.a
            && self.npi_plus == other.npi_plus
            && self.npi_zero == other.npi_zero
            && self.npi_minus == other.npi_minus
            && self.genie_weights == other.genie_weights
            && self.expect_no_weights == other.expect_no_weights
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EventRecord:")?;
        writeln!(f, "  generator = {} {} '{}'", self.generator, self.generator_version, self.generator_config)?;
        writeln!(f, "  is CC = {}", self.is_cc)?;
        writeln!(f, "  reaction = {:?} ({})", self.reaction, self.reaction.code())?;
        writeln!(f, "  struck nucleon pdg = {}", self.struck_nucleon)?;
        writeln!(f, "  nu pdg = {}", self.nu_pdg)?;
        writeln!(f, "  nu energy = {}", self.enu)?;
        writeln!(f, "  q = ({}, {}, {}, {})", self.q.e, self.q.px, self.q.py, self.q.pz)?;
        writeln!(f, "  y = {}", self.y)?;
        writeln!(f, "  W = {}", self.w)?;
        writeln!(f, "  A = {}", self.a)?;
        writeln!(
            f,
            "  pre-FSI pions (+, 0, -) = ({}, {}, {})",
            self.npi_plus, self.npi_zero, self.npi_minus
        )?;
        write!(f, "  stored weights for {} knobs", self.genie_weights.len())
    }
}
