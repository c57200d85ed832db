//! Multi-tag tracker
//!
//! ## Overview
//!
//! The tracker owns one [`TagSession`] per tag and routes every ranging
//! record to the session of its tag, creating sessions on first sight.
//!
//! ```text
//! producers ──push──→ IngestQueue ──drain──→ group by tag ──→ TagSession (tag 1)
//!                                                        ──→ TagSession (tag 2)
//! RangingSource ──poll_next──────────────────────────────→ ...
//! ```
//!
//! ## Concurrency
//!
//! Records of one tag are always processed in arrival order by a single
//! thread. With the `parallel` feature, `process_pending` spreads the tags of
//! a drained batch over scoped worker threads; sessions never share state,
//! so the result is identical to sequential processing.
//!
//! ## Shutdown
//!
//! `shutdown()` closes the queue, processes what is still queued, flushes
//! every session and hands back each tag's finished [`Trajectory`].

use std::collections::HashMap;
use std::sync::{Arc, RwLockReadGuard};

use crate::{
    anchors::{AnchorMap, SharedAnchors},
    filter::FilterStep,
    macros::{log_debug, log_warn},
    measurement::{RangeMeasurement, TagId},
    queue::{IngestQueue, QueueConfig},
    resample::{GapFiller, Trajectory},
    session::{SessionConfig, TagSession},
    source::{RangingSource, SourceError},
};

/// Tracker configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerConfig {
    /// Configuration of every tag session
    pub session: SessionConfig,
    /// Ingest queue sizing
    pub queue: QueueConfig,
    /// Worker threads for `process_pending` (`parallel` feature only)
    pub workers: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            queue: QueueConfig::default(),
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl TrackerConfig {
    /// Set the session configuration
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the queue configuration
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Set the worker count (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Tracker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Records routed to a session
    pub records: u64,
    /// Records discarded as malformed
    pub malformed: u64,
    /// Sessions created
    pub sessions: u64,
}

fn read_anchors(anchors: &SharedAnchors) -> RwLockReadGuard<'_, AnchorMap> {
    // a writer panicking mid-update cannot leave the BTreeMap half-built
    anchors.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Routes ranging records to per-tag sessions
///
/// `new_filler` is called once per new tag to build that session's gap
/// filler (typically a trajectory predictor).
pub struct Tracker<F, M>
where
    F: GapFiller + Send,
    M: FnMut(TagId) -> F,
{
    config: TrackerConfig,
    anchors: SharedAnchors,
    queue: Arc<IngestQueue>,
    sessions: HashMap<TagId, TagSession<F>>,
    new_filler: M,
    stats: TrackerStats,
}

impl<F, M> Tracker<F, M>
where
    F: GapFiller + Send,
    M: FnMut(TagId) -> F,
{
    /// Create a tracker over a shared anchor map
    pub fn new(config: TrackerConfig, anchors: SharedAnchors, new_filler: M) -> Self {
        Self {
            queue: Arc::new(config.queue.build()),
            config,
            anchors,
            sessions: HashMap::new(),
            new_filler,
            stats: TrackerStats::default(),
        }
    }

    /// Queue for producers on other threads
    pub fn queue(&self) -> Arc<IngestQueue> {
        Arc::clone(&self.queue)
    }

    /// Shared anchor map; updates apply to the next processed record
    pub fn anchors(&self) -> &SharedAnchors {
        &self.anchors
    }

    /// Counters
    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Tags with a session
    pub fn tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.sessions.keys().copied()
    }

    /// Session of `tag_id`, if it has been seen
    pub fn session(&self, tag_id: TagId) -> Option<&TagSession<F>> {
        self.sessions.get(&tag_id)
    }

    /// Mutable session of `tag_id`, e.g. to poll its new frames
    pub fn session_mut(&mut self, tag_id: TagId) -> Option<&mut TagSession<F>> {
        self.sessions.get_mut(&tag_id)
    }

    fn ensure_session(&mut self, tag_id: TagId) {
        if !self.sessions.contains_key(&tag_id) {
            log_debug!("new session for tag {}", tag_id);
            let filler = (self.new_filler)(tag_id);
            self.sessions
                .insert(tag_id, TagSession::new(tag_id, self.config.session, filler));
            self.stats.sessions += 1;
        }
    }

    /// Process one record on the calling thread
    pub fn route(&mut self, record: RangeMeasurement) -> Option<FilterStep> {
        self.ensure_session(record.tag_id);
        self.stats.records += 1;
        let anchors = read_anchors(&self.anchors);
        self.sessions
            .get_mut(&record.tag_id)
            .and_then(|session| session.push(record, &anchors))
    }

    /// Pull records from `source` until it blocks or ends
    ///
    /// Malformed records are counted and skipped. Returns the number of
    /// records routed.
    pub fn run_source<S: RangingSource>(&mut self, source: &mut S) -> usize {
        let mut routed = 0;
        loop {
            match source.poll_next() {
                Ok(record) => {
                    self.route(record);
                    routed += 1;
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(SourceError::EndOfStream)) => break,
                Err(nb::Error::Other(SourceError::Record(_err))) => {
                    log_warn!("discarding malformed record: {}", _err);
                    self.stats.malformed += 1;
                }
            }
        }
        routed
    }

    /// Drain the ingest queue and process every queued record
    ///
    /// Returns the number of records processed.
    pub fn process_pending(&mut self) -> usize {
        let records = self.queue.drain();
        let count = records.len();
        if count == 0 {
            return 0;
        }

        let mut by_tag: HashMap<TagId, Vec<RangeMeasurement>> = HashMap::new();
        for record in records {
            by_tag.entry(record.tag_id).or_default().push(record);
        }
        for &tag_id in by_tag.keys() {
            self.ensure_session(tag_id);
        }
        self.stats.records += count as u64;

        let anchors = read_anchors(&self.anchors);
        let mut work: Vec<(&mut TagSession<F>, Vec<RangeMeasurement>)> = self
            .sessions
            .iter_mut()
            .filter_map(|(tag_id, session)| by_tag.remove(tag_id).map(|records| (session, records)))
            .collect();

        #[cfg(feature = "parallel")]
        {
            if self.config.workers > 1 && work.len() > 1 {
                let per_worker = work.len().div_ceil(self.config.workers);
                let anchors: &AnchorMap = &anchors;
                std::thread::scope(|scope| {
                    for chunk in work.chunks_mut(per_worker) {
                        scope.spawn(move || {
                            for (session, records) in chunk.iter_mut() {
                                for record in records.drain(..) {
                                    session.push(record, anchors);
                                }
                            }
                        });
                    }
                });
                return count;
            }
        }

        for (session, records) in work.iter_mut() {
            for record in records.drain(..) {
                session.push(record, &anchors);
            }
        }
        count
    }

    /// Close the queue, flush every session and return the trajectories
    pub fn shutdown(mut self) -> HashMap<TagId, Trajectory> {
        self.queue.close();
        self.process_pending();

        let anchors = read_anchors(&self.anchors);
        let finished: HashMap<_, _> = self
            .sessions
            .drain()
            .map(|(tag_id, session)| (tag_id, session.finish(&anchors)))
            .collect();
        log_debug!("tracker shut down with {} tags", finished.len());
        finished
    }
}

impl<F, M> core::fmt::Debug for Tracker<F, M>
where
    F: GapFiller + Send,
    M: FnMut(TagId) -> F,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracker")
            .field("tags", &self.sessions.len())
            .field("queued", &self.queue.len())
            .field("stats", &self.stats)
            .finish()
    }
}
