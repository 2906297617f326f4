//! Utils Module
pub mod hash;
pub mod input_vals;

pub use hash::{combine, hash_seq, stable_hash};
pub use input_vals::InputVals;
