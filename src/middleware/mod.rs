//! The instrumentation hook: decides what to measure, times it, scrubs
//! failure context, and feeds the registry.

pub mod exclusion;
pub mod instrument;
pub mod masking;

pub use exclusion::PathFilter;
pub use instrument::{instrument, Fault, Instrumentation, FAULT_STATUS, UNMATCHED_ENDPOINT};
pub use masking::{Masker, MASK};
