//! Ranging sources
//!
//! Pull-based record sources in the `embedded-hal` style: `poll_next`
//! returns `nb::Error::WouldBlock` when nothing is available yet, so the same
//! processing loop drives a recorded session, a parser over text lines or a
//! live queue fed by another thread.
//!
//! | Source | Feature | Ends when |
//! |--------|---------|-----------|
//! | [`MemorySource`] | `source-memory` | slice exhausted |
//! | [`RecordSource`] | always | line iterator exhausted |
//! | [`QueueSource`] | `source-queue` | queue closed and drained |

use thiserror_no_std::Error;

use crate::{errors::TrackError, measurement::RangeMeasurement, time::Timestamp};

/// Source failures
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SourceError {
    /// No more records will arrive
    #[error("End of stream")]
    EndOfStream,
    /// A record could not be turned into a measurement
    #[error("Bad record: {0}")]
    Record(TrackError),
}

/// Pull-based source of ranging records
pub trait RangingSource {
    /// Next record, `WouldBlock` if none is ready yet
    fn poll_next(&mut self) -> nb::Result<RangeMeasurement, SourceError>;

    /// Bounds on the number of remaining records
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

/// Replays records from a slice
#[cfg(feature = "source-memory")]
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    records: &'a [RangeMeasurement],
    position: usize,
}

#[cfg(feature = "source-memory")]
impl<'a> MemorySource<'a> {
    /// Source over `records`
    pub fn new(records: &'a [RangeMeasurement]) -> Self {
        Self { records, position: 0 }
    }

    /// Rewind to the first record
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Whether every record has been returned
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.records.len()
    }
}

#[cfg(feature = "source-memory")]
impl RangingSource for MemorySource<'_> {
    fn poll_next(&mut self) -> nb::Result<RangeMeasurement, SourceError> {
        let record = self
            .records
            .get(self.position)
            .copied()
            .ok_or(nb::Error::Other(SourceError::EndOfStream))?;
        self.position += 1;
        Ok(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

/// Parses comma-separated ranging records from text lines
///
/// Blank lines and `#` comments are skipped. Malformed lines surface as
/// `SourceError::Record`; polling again continues with the next line.
#[derive(Debug, Clone)]
pub struct RecordSource<I> {
    lines: I,
    arrival: fn() -> Timestamp,
    line_number: usize,
}

fn no_arrival_clock() -> Timestamp {
    0
}

impl<I, S> RecordSource<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    /// Source over `lines`, with a zero arrival timestamp
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            arrival: no_arrival_clock,
            line_number: 0,
        }
    }

    /// Stamp each record with the collector clock
    pub fn with_arrival_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.arrival = clock;
        self
    }

    /// Lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<I, S> RangingSource for RecordSource<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    fn poll_next(&mut self) -> nb::Result<RangeMeasurement, SourceError> {
        loop {
            let line = self
                .lines
                .next()
                .ok_or(nb::Error::Other(SourceError::EndOfStream))?;
            self.line_number += 1;

            let text = line.as_ref().trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return RangeMeasurement::parse_record(text, (self.arrival)())
                .map_err(|err| nb::Error::Other(SourceError::Record(err)));
        }
    }
}

/// Drains an [`IngestQueue`](crate::queue::IngestQueue) shared with producers
#[cfg(feature = "source-queue")]
#[derive(Debug, Clone)]
pub struct QueueSource {
    queue: std::sync::Arc<crate::queue::IngestQueue>,
}

#[cfg(feature = "source-queue")]
impl QueueSource {
    /// Source over a shared queue
    pub fn new(queue: std::sync::Arc<crate::queue::IngestQueue>) -> Self {
        Self { queue }
    }

    /// Underlying queue
    pub fn queue(&self) -> &std::sync::Arc<crate::queue::IngestQueue> {
        &self.queue
    }
}

#[cfg(feature = "source-queue")]
impl RangingSource for QueueSource {
    fn poll_next(&mut self) -> nb::Result<RangeMeasurement, SourceError> {
        match self.queue.pop() {
            Some(record) => Ok(record),
            None if self.queue.is_closed() => Err(nb::Error::Other(SourceError::EndOfStream)),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let queued = self.queue.len();
        if self.queue.is_closed() {
            (queued, Some(queued))
        } else {
            (queued, None)
        }
    }
}
