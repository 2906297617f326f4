//! Stored-table knob indices.
//!
//! Positions are fixed: they index the [`ReweightList`](super::ReweightList)
//! carried on each event, so variants are only ever appended.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RwgtError;

macro_rules! reweight_knobs {
    ($($variant:ident),+ $(,)?) => {
        /// Index of a precomputed stored-weight table.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        #[repr(u16)]
        pub enum ReweightKnob {
            $($variant),+
        }

        impl ReweightKnob {
            /// Every knob, in index order.
            pub const ALL: &'static [ReweightKnob] = &[$(ReweightKnob::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(ReweightKnob::$variant => stringify!($variant)),+
                }
            }
        }

        impl FromStr for ReweightKnob {
            type Err = RwgtError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ReweightKnob::$variant),)+
                    other => Err(RwgtError::Conversion(format!("unknown reweight knob '{}'", other))),
                }
            }
        }
    };
}

reweight_knobs! {
    Null,

    MaNCEL,
    EtaNCEL,

    NormCCQE,
    NormCCQEenu,
    MaCCQEshape,
    MaCCQE,
    VecFFCCQEshape,

    NormCCRES,
    MaCCRESshape,
    MvCCRESshape,
    MaCCRES,
    MvCCRES,

    NormNCRES,
    MaNCRESshape,
    MvNCRESshape,
    MaNCRES,
    MvNCRES,

    MaCOHpi,
    R0COHpi,

    RvpCC1pi,
    RvpCC2pi,
    RvpNC1pi,
    RvpNC2pi,
    RvnCC1pi,
    RvnCC2pi,
    RvnNC1pi,
    RvnNC2pi,
    RvbarpCC1pi,
    RvbarpCC2pi,
    RvbarpNC1pi,
    RvbarpNC2pi,
    RvbarnCC1pi,
    RvbarnCC2pi,
    RvbarnNC1pi,
    RvbarnNC2pi,

    AhtBY,
    BhtBY,
    CV1uBY,
    CV2uBY,
    AhtBYshape,
    BhtBYshape,
    CV1uBYshape,
    CV2uBYshape,
    NormDISCC,
    RnubarnuCC,
    DISNuclMod,

    NC,

    AGKY_xF1pi,
    AGKY_pT1pi,

    FormZone,

    MFP_pi,
    MFP_N,
    FrCEx_pi,
    // No longer present in GENIE 3; kept so later indices do not shift.
    FrElas_pi,
    FrInel_pi,
    FrAbs_pi,
    FrPiProd_pi,
    FrCEx_N,
    FrElas_N,
    FrInel_N,
    FrAbs_N,
    FrPiProd_N,

    CCQEPauliSupViaKF,
    CCQEMomDistroFGtoSF,

    BR1gamma,
    BR1eta,
    Theta_Delta2Npi,

    ZNormCCQE,
    ZExpA1CCQE,
    ZExpA2CCQE,
    ZExpA3CCQE,
    ZExpA4CCQE,
    AxFFCCQEshape,
}

impl ReweightKnob {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Number of defined knob slots, `Null` included.
    pub fn count() -> usize {
        Self::ALL.len()
    }
}

impl fmt::Display for ReweightKnob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ReweightKnob {
    type Error = RwgtError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ReweightKnob> for String {
    fn from(k: ReweightKnob) -> Self {
        k.as_str().to_string()
    }
}
