//! RPA suppression of low-Q^2 CC scattering, read from correction tables.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RwgtResult;
use crate::event::{CurrentType, EventRecord, ReactionType};
use crate::generator::{GeneratorSupport, StoredSupport};
use crate::registry::{CalculatorHandle, Registered, Registry};
use crate::rwgt::{GeneratorInfo, WeightGenerator};
use crate::tables::{BinRange, Hist1D, Hist2D, LazyTable};
use crate::utils::InputVals;

const TABLE_FILE_212: &str = "RPA2017.GENIE2-12.json";
const TABLE_FILE_210: &str = "RPA2017.GENIE2-10.json";

/// Range the (q0, q3) lookup is pinned into.
const Q0Q3_WEIGHT_RANGE: (f64, f64) = (0.0, 2.0);

/// Which events an RPA calculator touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RpaFilter {
    pub current: CurrentType,
    /// `Null` accepts every reaction.
    pub reaction: ReactionType,
    /// Free-proton targets are skipped unless set.
    pub apply_to_hydrogen: bool,
}

impl RpaFilter {
    pub fn accepts(&self, ev: &EventRecord) -> bool {
        if !matches!(ev.nu_pdg.abs(), 12 | 14) {
            return false;
        }
        if ev.a == 1 && !self.apply_to_hydrogen {
            return false;
        }
        if !self.current.matches(ev.is_cc) {
            return false;
        }
        self.reaction == ReactionType::Null || self.reaction == ev.reaction
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RpaQ0Q3Args {
    /// Table variant, e.g. `CV`, `Pplus`, `Pmin`.
    pub variant: String,
    pub reaction: ReactionType,
    pub apply_to_hydrogen: bool,
    /// Use the neutrino table for antineutrinos too.
    pub force_nu: bool,
    /// Read the tables derived for GENIE 2.10 instead of 2.12.
    pub genie_210: bool,
}

impl Default for RpaQ0Q3Args {
    fn default() -> Self {
        Self {
            variant: "CV".to_string(),
            reaction: ReactionType::QuasiElastic,
            apply_to_hydrogen: false,
            force_nu: false,
            genie_210: false,
        }
    }
}

/// One neutrino-or-antineutrino table and the first populated q0 bin.
struct Q0Q3Table {
    hist: LazyTable<Hist2D>,
    min_q0_bin: OnceCell<usize>,
}

impl Q0Q3Table {
    fn weight(&self, qmag: f64, q0: f64) -> RwgtResult<f64> {
        let hist = self.hist.get()?;
        // Low-q0 rows of the tables are empty; lookups below are moved up.
        let min_bin = *self.min_q0_bin.get_or_init(|| hist.first_y_bin_above(0.0).unwrap_or(1));
        let weight = hist.value_in_range(
            qmag,
            q0,
            BinRange::FULL,
            BinRange {
                first: min_bin,
                last: None,
            },
            Q0Q3_WEIGHT_RANGE,
        );
        Ok(if weight == 0.0 { 1.0 } else { weight })
    }
}

/// RPA central value (or variant) as a function of (|q|, q0).
pub struct RpaQ0Q3Weight {
    info: GeneratorInfo,
    filter: RpaFilter,
    force_nu: bool,
    nu: Q0Q3Table,
    nubar: Q0Q3Table,
}

impl RpaQ0Q3Weight {
    fn with_args(args: &RpaQ0Q3Args, registry: &Registry) -> Self {
        let file = if args.genie_210 { TABLE_FILE_210 } else { TABLE_FILE_212 };
        let table = |suffix: &str| Q0Q3Table {
            hist: LazyTable::new(registry.tables(), file, format!("RPA_{}_{}", args.variant, suffix)),
            min_q0_bin: OnceCell::new(),
        };
        Self {
            info: GeneratorInfo::new(
                format!("RPA_CCQE_{}2017", args.variant),
                GeneratorSupport::single(StoredSupport::GenieProd3Only),
            ),
            filter: RpaFilter {
                current: CurrentType::Cc,
                reaction: args.reaction,
                apply_to_hydrogen: args.apply_to_hydrogen,
            },
            force_nu: args.force_nu,
            nu: table("nu"),
            nubar: table("nubar"),
        }
    }
}

impl WeightGenerator for RpaQ0Q3Weight {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn calc_weight(&self, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        if !self.filter.accepts(ev) {
            return Ok(1.0);
        }
        let table = if ev.is_antineutrino() && !self.force_nu { &self.nubar } else { &self.nu };
        table.weight(ev.q.vect_mag(), ev.q.e)
    }
}

impl Registered for RpaQ0Q3Weight {
    type Args = RpaQ0Q3Args;

    fn construct(args: &RpaQ0Q3Args, registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::with_args(args, registry))
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Generator(this)
    }
}

/// RPA correction as a function of Q^2 only, for channels without a
/// (q0, q3) table.
pub struct RpaQ2Weight {
    info: GeneratorInfo,
    filter: RpaFilter,
    nu: LazyTable<Hist1D>,
    nubar: LazyTable<Hist1D>,
}

impl WeightGenerator for RpaQ2Weight {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn calc_weight(&self, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        if !self.filter.accepts(ev) {
            return Ok(1.0);
        }
        let table = if ev.is_antineutrino() { &self.nubar } else { &self.nu };
        Ok(table.get()?.value(ev.q2()))
    }
}

impl Registered for RpaQ2Weight {
    type Args = RpaFilter;

    fn construct(args: &RpaFilter, registry: &Registry) -> RwgtResult<Self> {
        Ok(Self {
            info: GeneratorInfo::new("RPA_Q2_CV2017", GeneratorSupport::single(StoredSupport::GenieProd3Only)),
            filter: *args,
            nu: LazyTable::new(registry.tables(), TABLE_FILE_212, "RPA_Q2_CV_nu"),
            nubar: LazyTable::new(registry.tables(), TABLE_FILE_212, "RPA_Q2_CV_nubar"),
        })
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Generator(this)
    }
}
