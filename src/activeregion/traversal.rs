use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::activeregion::{
    ActiveRegion, ActiveRegionWalker, ActivityResult, ReadAssignment, ReadState, ReadStates,
};
use crate::genomics::AlignedRead;
use crate::locus::{GenomeLoc, IntervalSet, SequenceDictionary};

/// Default number of bases added on each side of a region's core span.
pub const DEFAULT_EXTENSION: u32 = 50;

/// Default activity threshold; a base is active when its value exceeds it.
pub const DEFAULT_ACTIVE_THRESHOLD: f64 = 0.002;

/// Errors that abort an active-region traversal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TraversalError {
    /// Walker returned an activity value outside `[0, 1]`.
    #[error("activity value {value} at {locus} is outside [0, 1]")]
    PreconditionViolation {
        /// Base whose activity was rejected.
        locus: GenomeLoc,
        /// Offending value.
        value: f64,
    },

    /// Internal contract broken (a bug, or a driver misusing the protocol).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Limit applied when padding a region's core span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionBounds {
    /// Extended span stays inside the enclosing analysis interval.
    #[default]
    Interval,
    /// Extended span may leave the interval but stays on the contig.
    Contig,
}

/// Configuration for an active-region traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalConfig {
    /// Bases added on each side of a core span.
    pub extension: u32,
    /// Activity threshold separating active from inactive bases.
    pub active_threshold: f64,
    /// Clipping applied to extended spans.
    pub extension_bounds: ExtensionBounds,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION,
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
            extension_bounds: ExtensionBounds::Interval,
        }
    }
}

impl TraversalConfig {
    /// Set the extension margin.
    pub fn with_extension(mut self, extension: u32) -> Self {
        self.extension = extension;
        self
    }

    /// Set the activity threshold.
    pub fn with_active_threshold(mut self, threshold: f64) -> Self {
        self.active_threshold = threshold;
        self
    }

    /// Set how extended spans are clipped.
    pub fn with_extension_bounds(mut self, bounds: ExtensionBounds) -> Self {
        self.extension_bounds = bounds;
        self
    }
}

/// Span of consecutive bases inside one interval, with the reads overlapping it.
#[derive(Debug, Clone)]
pub struct LocusWindow {
    span: GenomeLoc,
    reads: Vec<Arc<AlignedRead>>,
}

impl LocusWindow {
    /// Window over `span` carrying `reads`.
    pub fn new(span: GenomeLoc, reads: Vec<Arc<AlignedRead>>) -> Self {
        Self { span, reads }
    }

    /// Bases covered by the window.
    pub fn span(&self) -> &GenomeLoc {
        &self.span
    }

    /// Reads supplied with the window.
    pub fn reads(&self) -> &[Arc<AlignedRead>] {
        &self.reads
    }
}

#[derive(Debug)]
struct OpenRegion {
    interval: GenomeLoc,
    start: u32,
    stop: u32,
    is_active: bool,
}

#[derive(Debug)]
struct PendingRegion {
    core: GenomeLoc,
    extended: GenomeLoc,
    is_active: bool,
}

// Live reads all sit on the current contig, so position plus name identifies them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ReadKey {
    start: u32,
    end: u32,
    name: Arc<str>,
}

impl ReadKey {
    fn of(read: &AlignedRead) -> Self {
        Self {
            start: read.start,
            end: read.end(),
            name: Arc::clone(&read.name),
        }
    }
}

/// Incremental active-region traversal over an interval set.
///
/// Windows must arrive in ascending genomic order. Each base of a window is
/// scored by the walker; runs of same-activity bases become regions that
/// never cross an interval boundary. A closed region is held back until
/// every read touching it has seen all the regions it overlaps, then its
/// reads are classified and the region is returned.
#[derive(Debug)]
pub struct TraverseActiveRegions {
    intervals: IntervalSet,
    dictionary: SequenceDictionary,
    config: TraversalConfig,
    contig: Option<usize>,
    interval: Option<GenomeLoc>,
    last_pos: Option<u32>,
    open: Option<OpenRegion>,
    pending: VecDeque<PendingRegion>,
    closed_cores: VecDeque<GenomeLoc>,
    reads: BTreeMap<ReadKey, Arc<AlignedRead>>,
    primaries: HashMap<ReadKey, GenomeLoc>,
    failure: Option<TraversalError>,
}

impl TraverseActiveRegions {
    /// Traversal over `intervals`, whose contigs come from `dictionary`.
    pub fn new(
        intervals: IntervalSet,
        dictionary: SequenceDictionary,
        config: TraversalConfig,
    ) -> Self {
        Self {
            intervals,
            dictionary,
            config,
            contig: None,
            interval: None,
            last_pos: None,
            open: None,
            pending: VecDeque::new(),
            closed_cores: VecDeque::new(),
            reads: BTreeMap::new(),
            primaries: HashMap::new(),
            failure: None,
        }
    }

    /// Traversal configuration.
    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Analysis intervals.
    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    /// Score every base of `window` and return the regions that became final.
    ///
    /// Within an interval, each window must start right after the previous
    /// one; a new interval may only be entered once the previous one has
    /// been traversed to its stop. Any error poisons the traversal: later
    /// calls return the same error.
    pub fn traverse<W>(
        &mut self,
        walker: &mut W,
        window: &LocusWindow,
    ) -> Result<Vec<ActiveRegion>, TraversalError>
    where
        W: ActiveRegionWalker + ?Sized,
    {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let result = self.traverse_window(walker, window);
        self.record_failure(result)
    }

    /// Close any open region and return every region still held back.
    ///
    /// Fails if the last interval visited was not traversed to its stop.
    pub fn end_traversal<W>(&mut self, walker: &mut W) -> Result<Vec<ActiveRegion>, TraversalError>
    where
        W: ActiveRegionWalker + ?Sized,
    {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let desired = walker.desired_read_states();
        let result = self
            .check_interval_finished(None)
            .and_then(|()| self.close_open())
            .and_then(|()| self.finish_contig(desired));
        self.contig = None;
        self.record_failure(result)
    }

    /// Drive the whole interval set, one window per interval, then flush.
    ///
    /// Each window carries the reads within `extension` bases of its interval.
    pub fn traverse_intervals<W>(
        &mut self,
        walker: &mut W,
        reads: &[Arc<AlignedRead>],
    ) -> Result<Vec<ActiveRegion>, TraversalError>
    where
        W: ActiveRegionWalker + ?Sized,
    {
        let extension = self.config.extension;
        let intervals: Vec<GenomeLoc> = self.intervals.iter().cloned().collect();
        let mut regions = Vec::new();
        for interval in intervals {
            let lo = interval.start().saturating_sub(extension);
            let hi = interval.stop().saturating_add(extension);
            let window_reads = reads
                .iter()
                .filter(|read| {
                    read.contig_index == interval.contig_index()
                        && read.start <= hi
                        && read.end() >= lo
                })
                .cloned()
                .collect();
            regions.extend(self.traverse(walker, &LocusWindow::new(interval, window_reads))?);
        }
        regions.extend(self.end_traversal(walker)?);
        Ok(regions)
    }

    fn record_failure(
        &mut self,
        result: Result<Vec<ActiveRegion>, TraversalError>,
    ) -> Result<Vec<ActiveRegion>, TraversalError> {
        if let Err(err) = &result {
            warn!(error = %err, "aborting active region traversal");
            self.failure = Some(err.clone());
        }
        result
    }

    fn traverse_window<W>(
        &mut self,
        walker: &mut W,
        window: &LocusWindow,
    ) -> Result<Vec<ActiveRegion>, TraversalError>
    where
        W: ActiveRegionWalker + ?Sized,
    {
        let span = window.span();
        let interval = self.intervals.containing(span).cloned().ok_or_else(|| {
            TraversalError::InvariantViolation(format!(
                "window {span} does not lie inside an analysis interval"
            ))
        })?;
        self.check_window_order(span, &interval)?;
        self.interval = Some(interval.clone());

        let desired = walker.desired_read_states();
        let mut emitted = Vec::new();
        if self.contig != Some(span.contig_index()) {
            if self.contig.is_some() {
                self.close_open()?;
                emitted.extend(self.finish_contig(desired)?);
            }
            self.contig = Some(span.contig_index());
        }

        let mut covering_order: Vec<&Arc<AlignedRead>> = Vec::new();
        for read in window.reads() {
            if read.contig_index != span.contig_index() {
                continue;
            }
            self.reads
                .entry(ReadKey::of(read))
                .or_insert_with(|| Arc::clone(read));
            if read.start <= span.stop() && read.end() >= span.start() {
                covering_order.push(read);
            }
        }
        covering_order.sort_by_key(|read| read.start);

        let mut next = 0;
        let mut covering: Vec<Arc<AlignedRead>> = Vec::new();
        for locus in span.single_bases() {
            let pos = locus.start();
            while next < covering_order.len() && covering_order[next].start <= pos {
                covering.push(Arc::clone(covering_order[next]));
                next += 1;
            }
            covering.retain(|read| read.end() >= pos);

            let value = walker.is_active(&locus, &covering);
            let activity = ActivityResult::new(locus, value)?;
            self.add_activity(&interval, &activity)?;
        }

        emitted.extend(self.drain_ready(desired, false)?);
        self.evict_reads();
        Ok(emitted)
    }

    fn check_window_order(
        &self,
        span: &GenomeLoc,
        interval: &GenomeLoc,
    ) -> Result<(), TraversalError> {
        let expected = match (&self.interval, self.last_pos) {
            (Some(current), Some(last)) if current == interval => last + 1,
            (Some(current), _) if interval <= current => {
                return Err(TraversalError::InvariantViolation(format!(
                    "window {span} arrived out of order after interval {current}"
                )));
            }
            _ => {
                self.check_interval_finished(Some(span))?;
                interval.start()
            }
        };
        if span.start() != expected {
            return Err(TraversalError::InvariantViolation(format!(
                "window {span} does not start at {}:{expected}",
                span.contig()
            )));
        }
        Ok(())
    }

    fn check_interval_finished(&self, next: Option<&GenomeLoc>) -> Result<(), TraversalError> {
        match (&self.interval, self.last_pos) {
            (Some(current), Some(last)) if last < current.stop() => {
                let at = next.map_or_else(|| "end of traversal".to_string(), ToString::to_string);
                Err(TraversalError::InvariantViolation(format!(
                    "interval {current} left at {last} before its stop ({at})"
                )))
            }
            _ => Ok(()),
        }
    }

    fn add_activity(
        &mut self,
        interval: &GenomeLoc,
        activity: &ActivityResult,
    ) -> Result<(), TraversalError> {
        let pos = activity.locus().start();
        let is_active = activity.value() > self.config.active_threshold;

        match &mut self.open {
            Some(open)
                if open.is_active == is_active
                    && open.stop + 1 == pos
                    && open.interval == *interval =>
            {
                open.stop = pos;
            }
            _ => {
                self.close_open()?;
                self.open = Some(OpenRegion {
                    interval: interval.clone(),
                    start: pos,
                    stop: pos,
                    is_active,
                });
            }
        }

        self.last_pos = Some(pos);
        if pos == interval.stop() {
            self.close_open()?;
        }
        Ok(())
    }

    fn close_open(&mut self) -> Result<(), TraversalError> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };
        let core = open.interval.with_bounds(open.start, open.stop);
        if !open.interval.contains(&core) {
            return Err(TraversalError::InvariantViolation(format!(
                "region {core} extends outside interval {}",
                open.interval
            )));
        }
        let extended = self.extend(&core, &open.interval);
        trace!(region = %core, active = open.is_active, "closed region");

        self.closed_cores.push_back(core.clone());
        self.pending.push_back(PendingRegion {
            core,
            extended,
            is_active: open.is_active,
        });
        Ok(())
    }

    fn extend(&self, core: &GenomeLoc, interval: &GenomeLoc) -> GenomeLoc {
        let (lo, hi) = match self.config.extension_bounds {
            ExtensionBounds::Interval => (interval.start(), interval.stop()),
            ExtensionBounds::Contig => {
                let length = self
                    .dictionary
                    .get(core.contig_index())
                    .map_or(interval.stop(), |contig| contig.length.max(interval.stop()));
                (1, length)
            }
        };
        let start = core.start().saturating_sub(self.config.extension).max(lo);
        let stop = core.stop().saturating_add(self.config.extension).min(hi);
        core.with_bounds(start, stop)
    }

    // Every tiling decision on the current contig up to this position is final.
    fn settled_through(&self) -> u32 {
        if let Some(open) = &self.open {
            return open.start - 1;
        }
        match (self.contig, self.last_pos) {
            (Some(contig), Some(last)) => self
                .intervals
                .next_base_after(contig, last)
                .map_or(u32::MAX, |next| next - 1),
            _ => 0,
        }
    }

    fn touching<'a>(&'a self, span: &GenomeLoc) -> impl Iterator<Item = &'a Arc<AlignedRead>> + 'a {
        let (start, stop) = (span.start(), span.stop());
        self.reads
            .iter()
            .take_while(move |(key, _)| key.start <= stop)
            .filter(move |(key, _)| key.end >= start)
            .map(|(_, read)| read)
    }

    fn is_ready(&self, region: &PendingRegion, settled: u32) -> bool {
        if settled == u32::MAX {
            return true;
        }
        if self.last_pos.unwrap_or(0) < region.extended.stop() {
            return false;
        }
        let needed = self
            .touching(&region.extended)
            .map(|read| read.end())
            .max()
            .unwrap_or(0);
        settled >= needed
    }

    fn drain_ready(
        &mut self,
        desired: ReadStates,
        flush: bool,
    ) -> Result<Vec<ActiveRegion>, TraversalError> {
        let settled = if flush { u32::MAX } else { self.settled_through() };
        let mut ready = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|front| self.is_ready(front, settled))
        {
            if let Some(region) = self.pending.pop_front() {
                ready.push(self.finalize(region, desired)?);
            }
        }
        Ok(ready)
    }

    fn finish_contig(&mut self, desired: ReadStates) -> Result<Vec<ActiveRegion>, TraversalError> {
        let regions = self.drain_ready(desired, true)?;
        self.reads.clear();
        self.primaries.clear();
        self.closed_cores.clear();
        self.last_pos = None;
        Ok(regions)
    }

    // Core with the largest overlap among all closed regions, earliest on ties.
    fn primary_core(&self, read: &GenomeLoc) -> Option<&GenomeLoc> {
        let first = self
            .closed_cores
            .partition_point(|core| core.stop() < read.start());
        let mut best: Option<(&GenomeLoc, u32)> = None;
        for core in self
            .closed_cores
            .range(first..)
            .take_while(|core| core.start() <= read.stop())
        {
            let overlap = read.overlap_len(core);
            if overlap > best.map_or(0, |(_, len)| len) {
                best = Some((core, overlap));
            }
        }
        best.map(|(core, _)| core)
    }

    fn finalize(
        &mut self,
        region: PendingRegion,
        desired: ReadStates,
    ) -> Result<ActiveRegion, TraversalError> {
        let mut assignments = Vec::new();
        for read in self.touching(&region.extended) {
            let span = read.location();
            let state = if span.overlaps(&region.core) {
                let primary = self.primary_core(&span).ok_or_else(|| {
                    TraversalError::InvariantViolation(format!(
                        "read {} overlaps {} but no closed region",
                        read.name, region.core
                    ))
                })?;
                if *primary == region.core {
                    ReadState::Primary
                } else {
                    ReadState::NonPrimary
                }
            } else {
                ReadState::Extended
            };
            assignments.push(ReadAssignment {
                read: Arc::clone(read),
                state,
            });
        }

        for assignment in assignments
            .iter()
            .filter(|assignment| assignment.state == ReadState::Primary)
        {
            match self.primaries.entry(ReadKey::of(&assignment.read)) {
                Entry::Occupied(entry) if *entry.get() != region.core => {
                    return Err(TraversalError::InvariantViolation(format!(
                        "read {} is PRIMARY in both {} and {}",
                        assignment.read.name,
                        entry.get(),
                        region.core
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(entry) => {
                    entry.insert(region.core.clone());
                }
            }
        }

        debug!(
            region = %region.core,
            extended = %region.extended,
            active = region.is_active,
            reads = assignments.len(),
            "emitting active region"
        );
        Ok(ActiveRegion::new(
            region.core,
            region.extended,
            region.is_active,
            assignments,
            desired,
        ))
    }

    fn evict_reads(&mut self) {
        let horizon = self
            .settled_through()
            .saturating_add(1)
            .saturating_sub(self.config.extension);
        let pending_start = self
            .pending
            .front()
            .map_or(u32::MAX, |region| region.extended.start());
        let limit = horizon.min(pending_start);
        self.reads.retain(|key, _| key.end >= limit);
        self.primaries.retain(|key, _| key.end >= limit);

        // Cores left of every live read can no longer decide a PRIMARY.
        let first_live = self.reads.keys().next().map_or(u32::MAX, |key| key.start);
        let cutoff = limit.min(first_live);
        while self
            .closed_cores
            .front()
            .is_some_and(|core| core.stop() < cutoff)
        {
            self.closed_cores.pop_front();
        }
    }
}
