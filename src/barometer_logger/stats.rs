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

use crate::reading::Reading;
use std::fmt;

/// Summary of a sequence of stored readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min_pa: f64,
    pub max_pa: f64,
    pub mean_pa: f64,
    pub first: Reading,
    pub latest: Reading,
}

impl Summary {
    /// Summarize readings in the order they were stored. Returns `None` when there
    /// are no readings.
    pub fn from_readings<I>(readings: I) -> Option<Self>
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut readings = readings.into_iter();
        let first = readings.next()?;

        let mut summary = Summary {
            count: 1,
            min_pa: first.pressure_pa,
            max_pa: first.pressure_pa,
            mean_pa: 0.0,
            latest: first.clone(),
            first,
        };

        let mut total = summary.first.pressure_pa;
        for r in readings {
            summary.count += 1;
            summary.min_pa = summary.min_pa.min(r.pressure_pa);
            summary.max_pa = summary.max_pa.max(r.pressure_pa);
            total += r.pressure_pa;
            summary.latest = r;
        }

        summary.mean_pa = total / summary.count as f64;
        Some(summary)
    }

    /// Change in pressure between the first and latest reading, in pascals.
    pub fn change_pa(&self) -> f64 {
        self.latest.pressure_pa - self.first.pressure_pa
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Readings: {}", self.count)?;
        writeln!(
            f,
            "First:    {} ({:.2} hPa)",
            self.first.timestamp.to_rfc3339(),
            self.first.hpa()
        )?;
        writeln!(
            f,
            "Latest:   {} ({:.2} hPa)",
            self.latest.timestamp.to_rfc3339(),
            self.latest.hpa()
        )?;
        writeln!(f, "Min:      {:.2} hPa", self.min_pa / 100.0)?;
        writeln!(f, "Max:      {:.2} hPa", self.max_pa / 100.0)?;
        writeln!(f, "Mean:     {:.2} hPa", self.mean_pa / 100.0)?;
        write!(f, "Change:   {:+.2} hPa", self.change_pa() / 100.0)
    }
}
