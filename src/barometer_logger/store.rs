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
use chrono::{DateTime, SecondsFormat};
use fs2::FileExt;
use std::error;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum StoreError {
    Io(PathBuf, io::Error),
    Rejected(Status),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "{}: {}", path.display(), e),
            Self::Rejected(status) => write!(f, "refusing to store reading with status {}", status),
        }
    }
}

impl error::Error for StoreError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Append-only CSV log of readings.
///
/// Each row is `timestamp,pressure_pa,status` with the timestamp in RFC 3339 form,
/// preceded by a single header row written when the file is created. Rows are never
/// rewritten or reordered once they are in the file.
///
/// The file is reopened by path for every append so a file moved away or truncated by
/// an archiver between appends is handled: appending simply continues against whatever
/// is at the path, creating it with a fresh header when needed. Only one process is
/// expected to write at a time, but appends take an exclusive lock on the file anyway so
/// that two collectors pointed at the same file cannot interleave partial rows.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    path: PathBuf,
}

impl ReadingStore {
    pub const HEADER: &'static str = "timestamp,pressure_pa,status";

    /// Open the store at `path`, creating the parent directory and the file with its
    /// header row if they do not exist yet.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_owned(), e))?;
        }

        let store = ReadingStore { path };
        store.locked(prepare).map_err(|e| store.io_error(e))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append a single reading.
    ///
    /// The row is written with one write call and flushed to disk before this method
    /// returns. If a previous write was cut short by a crash, the partial row is
    /// terminated first so it cannot merge with the new one. Only readings with an `ok`
    /// status are accepted.
    pub fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        if reading.status != Status::Ok {
            return Err(StoreError::Rejected(reading.status));
        }

        let row = encode_row(reading);
        self.locked(|file| {
            prepare(file)?;
            file.write_all(row.as_bytes())?;
            file.sync_data()
        })
        .map_err(|e| self.io_error(e))
    }

    /// Lazily iterate over every reading in the store, oldest first.
    ///
    /// Every call starts again from the beginning of the file that is currently at the
    /// store's path. A missing file is an empty store. A final row without a trailing
    /// newline is a write that hasn't finished (or never will) and is not returned.
    pub fn read_all(&self) -> Result<Readings, StoreError> {
        let reader = match File::open(&self.path) {
            Ok(f) => Some(BufReader::new(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(Readings {
            path: self.path.clone(),
            reader,
            buf: String::new(),
            line: 0,
        })
    }

    fn locked<F>(&self, op: F) -> io::Result<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        FileExt::lock_exclusive(&file)?;
        let res = op(&mut file);
        let unlock = FileExt::unlock(&file);
        res.and(unlock)
    }

    fn io_error(&self, e: io::Error) -> StoreError {
        StoreError::Io(self.path.clone(), e)
    }
}

/// Write the header to an empty file, or finish off a torn final row.
///
/// A file holding only part of the header was cut short while being created and is
/// started over.
fn prepare(file: &mut File) -> io::Result<()> {
    let header = format!("{}\n", ReadingStore::HEADER);
    let len = file.metadata()?.len();
    if len < header.len() as u64 {
        let mut start = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut start)?;
        if header.as_bytes().starts_with(&start) {
            if !start.is_empty() {
                tracing::warn!(message = "rewriting incomplete header left by an interrupted write");
                file.set_len(0)?;
            }

            return file.write_all(header.as_bytes());
        }
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        tracing::warn!(message = "terminating incomplete row left by an interrupted write");
        file.write_all(b"\n")?;
    }

    Ok(())
}

fn encode_row(reading: &Reading) -> String {
    format!(
        "{},{},{}\n",
        reading.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
        reading.pressure_pa,
        reading.status
    )
}

fn decode_row(row: &str) -> Result<Reading, String> {
    let mut fields = row.split(',');
    let (timestamp, pressure, status) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(t), Some(p), Some(s), None) => (t, p, s),
        _ => return Err("expected 3 fields".to_owned()),
    };

    Ok(Reading {
        timestamp: DateTime::parse_from_rfc3339(timestamp).map_err(|e| format!("timestamp {}: {}", timestamp, e))?,
        pressure_pa: pressure
            .parse::<f64>()
            .map_err(|e| format!("pressure {}: {}", pressure, e))?,
        status: status.parse()?,
    })
}

/// Iterator over readings in a `ReadingStore`, returned by `ReadingStore::read_all`.
///
/// Rows that can't be parsed are skipped with a warning. I/O errors are returned once
/// and end the iteration.
#[derive(Debug)]
pub struct Readings {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    buf: String,
    line: usize,
}

impl Iterator for Readings {
    type Item = Result<Reading, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            self.buf.clear();

            match reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) if !self.buf.ends_with('\n') => {
                    tracing::debug!(message = "ignoring incomplete final row", path = %self.path.display(), line = self.line + 1);
                    self.reader = None;
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    let row = self.buf.trim_end_matches(&['\r', '\n'][..]);
                    if row.is_empty() || row == ReadingStore::HEADER {
                        continue;
                    }

                    match decode_row(row) {
                        Ok(reading) => return Some(Ok(reading)),
                        Err(reason) => {
                            tracing::warn!(message = "skipping malformed row", path = %self.path.display(), line = self.line, reason = %reason);
                        }
                    }
                }
                Err(e) => {
                    self.reader = None;
                    return Some(Err(StoreError::Io(self.path.clone(), e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadingStore, StoreError};
    use crate::reading::{Reading, Status};
    use chrono::{DateTime, Duration, FixedOffset};
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    fn ts(offset_secs: i64) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-18T08:15:00.250-04:00").unwrap() + Duration::seconds(offset_secs)
    }

    fn all(store: &ReadingStore) -> Vec<Reading> {
        store.read_all().unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn open_creates_directory_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("readings.csv");
        let store = ReadingStore::open(&path).unwrap();

        assert_eq!(path, store.path());
        assert_eq!("timestamp,pressure_pa,status\n", fs::read_to_string(&path).unwrap());
        assert!(all(&store).is_empty());
    }

    #[test]
    fn reopen_does_not_repeat_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");

        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();
        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(300), 96240.0)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(1, content.matches(ReadingStore::HEADER).count());
        assert_eq!(3, content.lines().count());
    }

    #[test]
    fn rows_are_human_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();
        store.append(&Reading::ok(ts(60), 1013.2)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(
            vec![
                "timestamp,pressure_pa,status",
                "2026-10-18T08:15:00.250000-04:00,96231,ok",
                "2026-10-18T08:16:00.250000-04:00,1013.2,ok",
            ],
            rows
        );
    }

    #[test]
    fn read_all_returns_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();
        let expected: Vec<Reading> = (0..10).map(|i| Reading::ok(ts(i * 300), 96000.0 + i as f64)).collect();

        for r in &expected {
            store.append(r).unwrap();
        }

        assert_eq!(expected, all(&store));
    }

    #[test]
    fn read_all_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();
        for i in 0..4 {
            store.append(&Reading::ok(ts(i), 100_000.0 - i as f64)).unwrap();
        }

        let first = all(&store);
        let second = all(&store);
        assert_eq!(4, first.len());
        assert_eq!(first, second);
    }

    #[test]
    fn earlier_rows_do_not_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();

        let mut snapshots = Vec::new();
        for i in 0..6 {
            store.append(&Reading::ok(ts(i * 60), 96200.0 + i as f64 * 0.5)).unwrap();
            snapshots.push(all(&store).pop().unwrap());
        }

        assert_eq!(snapshots, all(&store));
    }

    #[test]
    fn failed_readings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();
        let failed = Reading {
            timestamp: ts(0),
            pressure_pa: 0.0,
            status: Status::FetchError,
        };

        assert!(matches!(
            store.append(&failed),
            Err(StoreError::Rejected(Status::FetchError))
        ));
        assert!(all(&store).is_empty());
    }

    #[test]
    fn truncated_row_is_ignored_and_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let store = ReadingStore::open(&path).unwrap();
        for i in 0..3 {
            store.append(&Reading::ok(ts(i * 60), 96231.0 + i as f64)).unwrap();
        }

        // Simulate a crash part way through writing the final row
        let len = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 12).unwrap();
        drop(file);

        let readings = all(&store);
        assert_eq!(2, readings.len());
        assert_eq!(96232.0, readings[1].pressure_pa);

        store.append(&Reading::ok(ts(600), 96300.0)).unwrap();
        let readings = all(&store);
        assert_eq!(3, readings.len());
        assert_eq!(96232.0, readings[1].pressure_pa);
        assert_eq!(96300.0, readings[2].pressure_pa);
    }

    #[test]
    fn partially_written_row_is_absent_to_readers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"2026-10-18T08:20:00.000000-04:00,962").unwrap();
        drop(file);

        assert_eq!(vec![Reading::ok(ts(0), 96231.0)], all(&store));
    }

    #[test]
    fn partially_written_header_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        fs::write(&path, "timest").unwrap();

        let store = ReadingStore::open(&path).unwrap();
        assert_eq!("timestamp,pressure_pa,status\n", fs::read_to_string(&path).unwrap());

        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();
        assert_eq!(vec![Reading::ok(ts(0), 96231.0)], all(&store));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            vec!["timestamp,pressure_pa,status", "2026-10-18T08:15:00.250000-04:00,96231,ok"],
            content.lines().collect::<Vec<_>>()
        );
    }

    #[test]
    fn header_without_newline_is_completed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        fs::write(&path, ReadingStore::HEADER).unwrap();

        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(1, content.matches(ReadingStore::HEADER).count());
        assert_eq!(vec![Reading::ok(ts(0), 96231.0)], all(&store));
    }

    #[test]
    fn rotated_file_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let store = ReadingStore::open(&path).unwrap();
        store.append(&Reading::ok(ts(0), 96231.0)).unwrap();

        fs::rename(&path, dir.path().join("readings-2026-10.csv")).unwrap();
        assert!(all(&store).is_empty());

        store.append(&Reading::ok(ts(60), 96235.0)).unwrap();
        assert_eq!(vec![Reading::ok(ts(60), 96235.0)], all(&store));
        assert!(fs::read_to_string(&path).unwrap().starts_with(ReadingStore::HEADER));
    }

    #[test]
    fn open_fails_when_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ReadingStore::open(dir.path()), Err(StoreError::Io(_, _))));
    }
}
