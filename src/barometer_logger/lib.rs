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

//! Barometric pressure logger for router admin pages
//!
//! ## Features
//!
//! Some consumer routers have a barometric pressure sensor and show its current value
//! on a status page of their admin web interface. `barometer_logger` logs into that page at a fixed interval, pulls the
//! pressure value out of it and appends it to a CSV file. It can also summarize the
//! readings collected so far and expose the most recent one as Prometheus metrics.
//!
//! Readings are stored one per row, in the order they were taken:
//!
//! ```text
//! timestamp,pressure_pa,status
//! 2026-10-18T08:15:00.250113-04:00,96231,ok
//! 2026-10-18T08:20:00.249871-04:00,96228,ok
//! ```
//!
//! Attempts that fail (router unreachable, wrong password, page layout changed) are
//! logged and skipped. They never show up in the CSV file.
//!
//! ## Build
//!
//! `barometer_logger` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Configuration
//!
//! Router details are read from a YAML file, `config.yaml` in the current directory by
//! default. Only `url`, `username`, `password` and `wait_time` are required.
//!
//! ```yaml
//! url: https://192.168.1.254/cgi-bin/sysinfo.ha
//! username: admin
//! password: your-device-access-code
//! wait_time: 300                  # seconds between readings
//! timeout_millis: 10000           # per request
//! data_path: data/readings.csv
//! accept_invalid_certs: true      # routers usually use self-signed certificates
//! field_label: Barometer Value    # label of the table row holding the value
//! ```
//!
//! Log output goes to stdout. Pass `--log-file barometer_readings.log` to also append
//! it to a file.
//!
//! ### Run
//!
//! Collect a reading every `wait_time` seconds until interrupted with Ctrl-C or
//! SIGTERM. Metrics are served on port `9783` at `/metrics` while running.
//!
//! ```text
//! ./barometer_logger --config config.yaml run
//! ```
//!
//! Collect a single reading and exit, with a non-zero exit code if it failed:
//!
//! ```text
//! ./barometer_logger once
//! ```
//!
//! Summarize the readings stored so far:
//!
//! ```text
//! ./barometer_logger stats
//! ```
//!
//! ### Prometheus
//!
//! The following metrics are exposed by the `run` command.
//!
//! * `barometer_pressure_pascals` - Most recently stored pressure, in pascals.
//! * `barometer_last_reading_timestamp_seconds` - Time of the most recently stored reading.
//! * `barometer_collections_total{outcome=$OUTCOME}` - Collection cycles by outcome, one
//!   of `ok`, `fetch_error`, `parse_error` or `storage_error`.
//!

pub mod client;
pub mod clock;
pub mod config;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod reading;
pub mod scheduler;
pub mod stats;
pub mod store;
