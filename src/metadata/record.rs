//! Sample Metadata Record - one per experimental condition

use super::FirstLast;
use serde::{Deserialize, Serialize};

/// Canonical metadata for one condition.
///
/// `delta_t` is the elapsed time since `prev_condition`'s sample and is only
/// meaningful while a predecessor is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    condition_name: String,
    prev_condition: Option<String>,
    delta_t: Option<f64>,
    is_time_series: bool,
    is_first_last: Option<FirstLast>,
}

impl SampleRecord {
    /// Create a steady-state record with no predecessor.
    #[must_use]
    pub fn new(condition_name: impl Into<String>) -> Self {
        Self {
            condition_name: condition_name.into(),
            prev_condition: None,
            delta_t: None,
            is_time_series: false,
            is_first_last: None,
        }
    }

    /// Create a builder for a record with optional fields.
    #[must_use]
    pub fn builder(condition_name: impl Into<String>) -> SampleRecordBuilder {
        SampleRecordBuilder::new(condition_name)
    }

    /// Condition key.
    #[must_use]
    pub fn condition_name(&self) -> &str {
        &self.condition_name
    }

    /// Preceding condition, if linked.
    #[must_use]
    pub fn prev_condition(&self) -> Option<&str> {
        self.prev_condition.as_deref()
    }

    /// Time since the preceding condition.
    #[must_use]
    pub const fn delta_t(&self) -> Option<f64> {
        self.delta_t
    }

    /// Declared time-series membership.
    #[must_use]
    pub const fn is_time_series(&self) -> bool {
        self.is_time_series
    }

    /// Declared position in the series.
    #[must_use]
    pub const fn is_first_last(&self) -> Option<FirstLast> {
        self.is_first_last
    }

    /// Drop the predecessor link and its time delta.
    pub fn clear_predecessor(&mut self) {
        self.prev_condition = None;
        self.delta_t = None;
    }
}

/// Builder for `SampleRecord`.
#[derive(Debug)]
pub struct SampleRecordBuilder {
    record: SampleRecord,
}

impl SampleRecordBuilder {
    /// Create a new builder with the required condition name.
    #[must_use]
    pub fn new(condition_name: impl Into<String>) -> Self {
        Self {
            record: SampleRecord::new(condition_name),
        }
    }

    /// Link to a preceding condition `delta_t` time units earlier.
    #[must_use]
    pub fn predecessor(mut self, prev_condition: impl Into<String>, delta_t: f64) -> Self {
        self.record.prev_condition = Some(prev_condition.into());
        self.record.delta_t = Some(delta_t);
        self
    }

    /// Set the predecessor without a time delta.
    #[must_use]
    pub fn prev_condition(mut self, prev_condition: impl Into<String>) -> Self {
        self.record.prev_condition = Some(prev_condition.into());
        self
    }

    /// Set the time delta without a predecessor.
    #[must_use]
    pub const fn delta_t(mut self, delta_t: f64) -> Self {
        self.record.delta_t = Some(delta_t);
        self
    }

    /// Set declared time-series membership.
    #[must_use]
    pub const fn time_series(mut self, is_time_series: bool) -> Self {
        self.record.is_time_series = is_time_series;
        self
    }

    /// Set declared series position.
    #[must_use]
    pub const fn first_last(mut self, position: FirstLast) -> Self {
        self.record.is_first_last = Some(position);
        self
    }

    /// Build the `SampleRecord`.
    #[must_use]
    pub fn build(self) -> SampleRecord {
        self.record
    }
}
