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

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Destination for log output: stdout, and additionally `log_file` when given.
///
/// The log file is opened for appending and created, along with its parent
/// directory, if it doesn't exist.
pub fn log_writer(log_file: Option<&Path>) -> io::Result<BoxMakeWriter> {
    let path = match log_file {
        Some(p) => p,
        None => return Ok(BoxMakeWriter::new(io::stdout)),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BoxMakeWriter::new(io::stdout.and(Mutex::new(file))))
}

#[cfg(test)]
mod tests {
    use super::log_writer;
    use std::fs;
    use tracing::Level;

    #[test]
    fn events_are_appended_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("barometer_readings.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "earlier run\n").unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(log_writer(Some(&path)).unwrap())
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(message = "stored reading", pressure_pa = 96231.0);
            tracing::debug!(message = "not written");
        });

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(2, lines.len());
        assert_eq!("earlier run", lines[0]);
        assert!(lines[1].contains("INFO"));
        assert!(lines[1].contains("stored reading"));
        assert!(lines[1].contains("pressure_pa=96231"));
    }

    #[test]
    fn log_file_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("barometer_readings.log");

        log_writer(Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(log_writer(Some(dir.path())).is_err());
    }
}
