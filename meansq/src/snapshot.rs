//! Periodic dumps of the aggregate to binary files.
//!
//! # File format
//!
//! ```text
//! +----------------+-----------------------------+
//! | count (4)      | entries (4 * count)         |
//! | i32 big-endian | each an i32, big-endian     |
//! +----------------+-----------------------------+
//! ```
//!
//! Entries use the same encoding as a request on the wire. One file is
//! written per tick and never touched again.

use crate::aggregate::Aggregate;
use crate::codec::{decode_request, encode_request, Frame, MSG_SIZE};
use crate::error::Error;
use crate::shutdown::StopSignal;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

pub fn encode_snapshot(values: &[i32]) -> Result<Vec<u8>, Error> {
    let count = i32::try_from(values.len()).map_err(|_| Error::SnapshotTooLarge(values.len()))?;

    let mut bytes = Vec::with_capacity(MSG_SIZE * (values.len() + 1));
    bytes.extend_from_slice(&encode_request(count)?);
    for &value in values {
        bytes.extend_from_slice(&encode_request(value)?);
    }
    Ok(bytes)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<i32>, Error> {
    let mut frames = bytes.chunks(MSG_SIZE).map(|chunk| {
        Frame::try_from(chunk)
            .map_err(|_| Error::MalformedSnapshot(format!("{} trailing bytes", chunk.len())))
    });

    let count = match frames.next() {
        Some(frame) => decode_request(&frame?)?,
        None => return Err(Error::MalformedSnapshot("missing count".to_string())),
    };

    let values = frames
        .map(|frame| decode_request(&frame?))
        .collect::<Result<Vec<_>, _>>()?;

    if usize::try_from(count).ok() != Some(values.len()) {
        return Err(Error::MalformedSnapshot(format!(
            "count is {count} but {} entries follow",
            values.len()
        )));
    }
    Ok(values)
}

/// Writes `values` to a new file in `dir` named after `timestamp`.
///
/// Never overwrites: if the name is taken a numeric suffix is added.
pub fn write_snapshot(
    dir: &Path,
    values: &[i32],
    timestamp: DateTime<Local>,
) -> Result<PathBuf, Error> {
    let bytes = encode_snapshot(values)?;
    let stem = format!("server_dump_{}", timestamp.format("%Y%m%d_%H%M%S_%3f"));

    let mut attempt = 0;
    loop {
        let path = match attempt {
            0 => dir.join(format!("{stem}.bin")),
            n => dir.join(format!("{stem}-{n}.bin")),
        };

        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        match file {
            Ok(mut file) => {
                return file
                    .write_all(&bytes)
                    .and_then(|()| file.sync_all())
                    .map(|()| path.clone())
                    .map_err(|source| Error::SnapshotWriteFailed { path, source });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(Error::SnapshotWriteFailed { path, source }),
        }
    }
}

pub struct SnapshotScheduler {
    aggregate: Arc<Aggregate>,
    dir: PathBuf,
    interval: Duration,
    stop: StopSignal,
}

impl SnapshotScheduler {
    pub fn new(
        aggregate: Arc<Aggregate>,
        dir: impl Into<PathBuf>,
        interval: Duration,
        stop: StopSignal,
    ) -> SnapshotScheduler {
        SnapshotScheduler {
            aggregate,
            dir: dir.into(),
            interval,
            stop,
        }
    }

    /// Copies the aggregate and writes one snapshot file.
    pub fn tick(&self) -> Result<PathBuf, Error> {
        let values = self.aggregate.snapshot();
        let path = write_snapshot(&self.dir, &values, Local::now())?;
        info!(path = %path.display(), count = values.len(), "Dump created");
        Ok(path)
    }

    /// Ticks every interval until stopped. A failed write is logged and the
    /// schedule goes on.
    pub fn run(self) {
        info!(
            dir = %self.dir.display(),
            interval_secs = self.interval.as_secs_f64(),
            "Snapshot scheduler started"
        );
        while !self.stop.sleep(self.interval) {
            if let Err(e) = self.tick() {
                error!(error = ?e, "Failed to create dump");
            }
        }
        info!("Snapshot scheduler stopped");
    }

    pub fn spawn(self) -> Result<JoinHandle<()>, Error> {
        thread::Builder::new()
            .name("snapshot".to_string())
            .spawn(move || self.run())
            .map_err(Error::ThreadSpawnFailed)
    }
}
