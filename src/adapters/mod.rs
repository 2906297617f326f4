//! Conversion Adapters
//!
//! Producers of simulated events translate their own objects into an
//! [`EventRecord`]; the engine never sees the producer's types. [`FlatRecord`]
//! is the serializable representation used for record files and tests.

pub mod flat;

pub use flat::{read_records, write_records, FlatRecord, Infinity, StoredValue, StoredWeights};

use crate::error::RwgtResult;
use crate::event::EventRecord;

/// Anything that can be turned into an [`EventRecord`].
pub trait EventSource {
    fn to_event_record(&self) -> RwgtResult<EventRecord>;
}

impl EventSource for EventRecord {
    fn to_event_record(&self) -> RwgtResult<EventRecord> {
        Ok(self.clone())
    }
}

/// Convert a batch, stopping at the first failure.
pub fn convert_all<S: EventSource>(sources: &[S]) -> RwgtResult<Vec<EventRecord>> {
    sources.iter().map(EventSource::to_event_record).collect()
}
