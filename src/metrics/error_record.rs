use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context of one failed request, captured at the moment of failure.
///
/// Query string and header values arrive already masked; the aggregator
/// stores the record as-is and never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub message: String,
    pub stack_trace: String,
    pub masked_query_string: String,
    pub masked_headers: BTreeMap<String, String>,
}

impl ErrorRecord {
    /// Start a record stamped with the current time. Remaining fields are
    /// filled in with the `with_*` builders.
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            method: method.into(),
            message: message.into(),
            stack_trace: String::new(),
            masked_query_string: String::new(),
            masked_headers: BTreeMap::new(),
        }
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = trace.into();
        self
    }

    pub fn with_query_string(mut self, masked: impl Into<String>) -> Self {
        self.masked_query_string = masked.into();
        self
    }

    pub fn with_headers(mut self, masked: BTreeMap<String, String>) -> Self {
        self.masked_headers = masked;
        self
    }
}
