pub mod accumulator;
pub mod buckets;
pub mod error_record;
pub mod percentiles;
pub mod registry;
pub mod snapshot;
pub mod stream;

pub use accumulator::{Accumulator, Limits};
pub use error_record::ErrorRecord;
pub use percentiles::PercentileSet;
pub use registry::StatsRegistry;
pub use snapshot::{EndpointSnapshot, StatsSnapshot};

/// Identity of one accumulator: the path and method exactly as captured.
/// Comparison is case-sensitive on both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub path: String,
    pub method: String,
}

impl EndpointKey {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }
}
