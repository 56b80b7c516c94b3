// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::reading::{Reading, Status};
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::fmt;
use std::sync::atomic::AtomicU64;

/// Result of one collection cycle, as far as metrics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok,
    FetchError,
    ParseError,
    StorageError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::FetchError => "fetch_error",
            Self::ParseError => "parse_error",
            Self::StorageError => "storage_error",
        }
    }
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => Self::Ok,
            Status::FetchError => Self::FetchError,
            Status::ParseError => Self::ParseError,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EncodeLabelValue for Outcome {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        EncodeLabelValue::encode(&self.as_str(), encoder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: Outcome,
}

/// Holder for metrics describing the collector.
///
/// All metrics are created and registered upon call to `CollectorMetrics::new()` and
/// share the prefix "barometer_". Clones share the same underlying values.
#[derive(Debug, Clone)]
pub struct CollectorMetrics {
    pressure: Gauge<f64, AtomicU64>,
    last_reading: Gauge,
    collections: Family<OutcomeLabels, Counter>,
}

impl CollectorMetrics {
    /// Create a new `CollectorMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let pressure = Gauge::<f64, AtomicU64>::default();
        let last_reading = Gauge::default();
        let collections = Family::<OutcomeLabels, Counter>::default();

        reg.register(
            "barometer_pressure_pascals",
            "Most recently stored barometric pressure in pascals",
            pressure.clone(),
        );
        reg.register(
            "barometer_last_reading_timestamp_seconds",
            "Unix timestamp of the most recently stored reading",
            last_reading.clone(),
        );
        reg.register(
            "barometer_collections",
            "Collection cycles by outcome",
            collections.clone(),
        );

        // Make every outcome visible at zero before the first failure happens
        for outcome in [Outcome::Ok, Outcome::FetchError, Outcome::ParseError, Outcome::StorageError] {
            let _ = collections.get_or_create(&OutcomeLabels { outcome });
        }

        Self {
            pressure,
            last_reading,
            collections,
        }
    }

    /// Record a reading that was successfully stored.
    pub fn stored(&self, reading: &Reading) {
        self.pressure.set(reading.pressure_pa);
        self.last_reading.set(reading.timestamp.timestamp());
        self.outcome(Outcome::Ok);
    }

    /// Record a cycle that did not result in a stored reading.
    pub fn failed(&self, outcome: Outcome) {
        self.outcome(outcome);
    }

    fn outcome(&self, outcome: Outcome) {
        self.collections.get_or_create(&OutcomeLabels { outcome }).inc();
    }
}
