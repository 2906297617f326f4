//! Flat, serializable event representation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use super::EventSource;
use crate::error::{RwgtError, RwgtResult};
use crate::event::{EventRecord, FourMomentum, ReactionType, ReweightKnob, ReweightVals};
use crate::generator::{Generator, GeneratorVersion};

/// One stored weight. NaN is written as `null`, infinities as `"inf"` and
/// `"-inf"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Number(f32),
    Infinite(Infinity),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Infinity {
    #[serde(rename = "inf")]
    Positive,
    #[serde(rename = "-inf")]
    Negative,
}

impl From<f32> for StoredValue {
    fn from(v: f32) -> Self {
        if v.is_nan() {
            StoredValue::Missing
        } else if v == f32::INFINITY {
            StoredValue::Infinite(Infinity::Positive)
        } else if v == f32::NEG_INFINITY {
            StoredValue::Infinite(Infinity::Negative)
        } else {
            StoredValue::Number(v)
        }
    }
}

impl From<StoredValue> for f32 {
    fn from(v: StoredValue) -> Self {
        match v {
            StoredValue::Number(x) => x,
            StoredValue::Infinite(Infinity::Positive) => f32::INFINITY,
            StoredValue::Infinite(Infinity::Negative) => f32::NEG_INFINITY,
            StoredValue::Missing => f32::NAN,
        }
    }
}

/// Stored weights for one set knob slot, written even when every value is
/// missing so the slot stays set after a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWeights {
    pub knob: ReweightKnob,
    pub values: [StoredValue; 4],
}

/// One event as written by external producers. Unfilled kinematics are
/// `null` rather than NaN, and the reaction is the generator's numeric code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub generator: Generator,
    pub generator_version: GeneratorVersion,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generator_config: String,

    pub nu_pdg: i32,
    pub is_cc: bool,
    pub reaction: u32,
    #[serde(default = "unknown_count")]
    pub struck_nucleon: i32,

    #[serde(default)]
    pub enu: Option<f64>,
    /// `[E, px, py, pz]`.
    #[serde(default)]
    pub q: [Option<f64>; 4],
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub a: u32,

    /// Pre-FSI pion counts `[pi+, pi0, pi-]`; -1 if not recorded.
    #[serde(default = "unknown_pions")]
    pub npi: [i32; 3],

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<StoredWeights>,
    #[serde(default)]
    pub expect_no_weights: bool,
}

fn unknown_count() -> i32 {
    -1
}

fn unknown_pions() -> [i32; 3] {
    [-1; 3]
}

fn opt<T: Into<f64> + Copy>(x: T) -> Option<T> {
    if x.into().is_nan() {
        None
    } else {
        Some(x)
    }
}

impl From<&EventRecord> for FlatRecord {
    fn from(ev: &EventRecord) -> Self {
        let weights = ev
            .genie_weights
            .iter_set()
            .filter_map(|(idx, vals)| {
                let knob = ReweightKnob::from_index(idx)?;
                Some(StoredWeights {
                    knob,
                    values: vals.as_array().map(StoredValue::from),
                })
            })
            .collect();

        Self {
            generator: ev.generator,
            generator_version: ev.generator_version.clone(),
            generator_config: ev.generator_config.clone(),
            nu_pdg: ev.nu_pdg,
            is_cc: ev.is_cc,
            reaction: ev.reaction.code(),
            struck_nucleon: ev.struck_nucleon,
            enu: opt(ev.enu),
            q: [ev.q.e, ev.q.px, ev.q.py, ev.q.pz].map(opt),
            y: opt(ev.y),
            w: opt(ev.w),
            a: ev.a,
            npi: [ev.npi_plus, ev.npi_zero, ev.npi_minus],
            weights,
            expect_no_weights: ev.expect_no_weights,
        }
    }
}

impl TryFrom<&FlatRecord> for EventRecord {
    type Error = RwgtError;

    fn try_from(flat: &FlatRecord) -> Result<Self, Self::Error> {
        let nan = |x: Option<f64>| x.unwrap_or(f64::NAN);
        let [e, px, py, pz] = flat.q.map(nan);

        let mut ev = EventRecord {
            generator: flat.generator,
            generator_version: flat.generator_version.clone(),
            generator_config: flat.generator_config.clone(),
            nu_pdg: flat.nu_pdg,
            is_cc: flat.is_cc,
            reaction: ReactionType::try_from(flat.reaction)?,
            struck_nucleon: flat.struck_nucleon,
            enu: nan(flat.enu),
            q: FourMomentum::new(e, px, py, pz),
            y: nan(flat.y),
            w: nan(flat.w),
            a: flat.a,
            npi_plus: flat.npi[0],
            npi_zero: flat.npi[1],
            npi_minus: flat.npi[2],
            expect_no_weights: flat.expect_no_weights,
            ..Default::default()
        };

        for stored in &flat.weights {
            let [m2, m1, p1, p2] = stored.values.map(f32::from);
            ev.genie_weights.set_knob(stored.knob, ReweightVals::new(m2, m1, p1, p2));
        }
        Ok(ev)
    }
}

impl EventSource for FlatRecord {
    fn to_event_record(&self) -> RwgtResult<EventRecord> {
        EventRecord::try_from(self)
    }
}

/// Write one JSON object per line.
pub fn write_records(path: impl AsRef<Path>, events: &[EventRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for ev in events {
        serde_json::to_writer(&mut out, &FlatRecord::from(ev))?;
        out.write_all(b"\n")?;
    }
    out.flush().with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), events = events.len(), "Wrote event records");
    Ok(())
}

/// Read records written by [`write_records`]. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<EventRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let mut events = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let flat: FlatRecord =
            serde_json::from_str(&line).with_context(|| format!("{}:{}: bad record", path.display(), i + 1))?;
        let ev = EventRecord::try_from(&flat).with_context(|| format!("{}:{}", path.display(), i + 1))?;
        events.push(ev);
    }
    debug!(path = %path.display(), events = events.len(), "Read event records");
    Ok(events)
}
