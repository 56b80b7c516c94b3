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

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single attempt to fetch a reading from the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    FetchError,
    ParseError,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::FetchError => "fetch_error",
            Self::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "fetch_error" => Ok(Self::FetchError),
            "parse_error" => Ok(Self::ParseError),
            _ => Err(format!("unknown status {}", s)),
        }
    }
}

/// A single timestamped pressure observation.
///
/// Readings are created by a `RouterClient` and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<FixedOffset>,
    pub pressure_pa: f64,
    pub status: Status,
}

impl Reading {
    /// Create a successful reading taken at `timestamp`.
    pub fn ok(timestamp: DateTime<FixedOffset>, pressure_pa: f64) -> Self {
        Reading {
            timestamp,
            pressure_pa,
            status: Status::Ok,
        }
    }

    /// Pressure in hectopascals, for display.
    pub fn hpa(&self) -> f64 {
        self.pressure_pa / 100.0
    }
}
