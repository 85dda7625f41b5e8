//! Owns every tracked tile and decides which ones the viewport needs.
//!
//! Tiles are requested for the current level and the level below it, so
//! zooming out finds imagery already loaded. Loads are throttled by a global
//! cap and started newest-first. Tiles the viewport no longer needs are
//! dropped from tracking at once; their images go to the surface to fade.

use super::loader::{Completion, LoadTicket, TileCompletion, TileLoader, TileRequest};
use super::record::{TileLoadState, TileRecord};
use super::source::TileSource;
use crate::core::config::TileLoadingConfig;
use crate::core::geo::TileId;
use crate::core::projection::CoordinateProjection;
use crate::core::viewport::Viewport;
use crate::prelude::{HashMap, HashSet};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Counters describing the cache, mostly for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub tracked: usize,
    pub requested: usize,
    pub loading: usize,
    pub loaded: usize,
    pub failed: usize,
    /// State changes applied to records since the cache was created
    pub transitions: u64,
    pub stale_completions: u64,
}

/// What [`TileCache::complete`] did with an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Loaded,
    Failed,
    /// The record was evicted or replaced; only the slot was released
    Stale,
    /// The ticket was never issued or was already answered
    Unknown,
}

/// A record the cache stopped tracking
#[derive(Debug)]
pub struct RetiredTile<H> {
    pub id: TileId,
    pub handle: Option<H>,
}

/// Changes made by one [`TileCache::recompute_required_set`] call
#[derive(Debug)]
pub struct RecomputeOutcome<H> {
    pub created: Vec<TileId>,
    pub retired: Vec<RetiredTile<H>>,
}

impl<H> RecomputeOutcome<H> {
    fn empty() -> Self {
        Self {
            created: Vec::new(),
            retired: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.retired.is_empty()
    }
}

#[derive(Debug)]
pub struct TileCache<H> {
    config: TileLoadingConfig,
    records: HashMap<TileId, TileRecord<H>>,
    /// Identities still in `Requested`, oldest first
    pending: Vec<TileId>,
    /// Issued tickets not yet answered, including those of evicted records
    in_flight: HashMap<LoadTicket, TileId>,
    next_ticket: u64,
    completion_tx: Sender<TileCompletion<H>>,
    completion_rx: Receiver<TileCompletion<H>>,
    transitions: u64,
    stale_completions: u64,
}

impl<H> TileCache<H> {
    pub fn new(config: TileLoadingConfig) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        Self {
            config,
            records: HashMap::default(),
            pending: Vec::new(),
            in_flight: HashMap::default(),
            next_ticket: 0,
            completion_tx,
            completion_rx,
            transitions: 0,
            stale_completions: 0,
        }
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    pub fn get(&self, id: &TileId) -> Option<&TileRecord<H>> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &TileId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads started and not answered yet. Evicted records still hold
    /// their slot until the loader answers.
    pub fn loading_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Tracked tiles with imagery, ready to be drawn
    pub fn loaded(&self) -> impl Iterator<Item = (TileId, &H)> + '_ {
        self.records
            .values()
            .filter(|record| record.is_loaded())
            .filter_map(|record| record.handle().map(|handle| (record.id(), handle)))
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            tracked: self.records.len(),
            transitions: self.transitions,
            stale_completions: self.stale_completions,
            ..CacheStats::default()
        };
        for record in self.records.values() {
            match record.state() {
                TileLoadState::Requested => stats.requested += 1,
                TileLoadState::Loading(_) => stats.loading += 1,
                TileLoadState::Loaded => stats.loaded += 1,
                TileLoadState::Failed(_) => stats.failed += 1,
                TileLoadState::FadingOut | TileLoadState::Removed => {}
            }
        }
        stats
    }

    fn advance(&mut self, id: &TileId, next: TileLoadState) -> Result<()> {
        if let Some(record) = self.records.get_mut(id) {
            record.transition(next)?;
            self.transitions += 1;
        }
        Ok(())
    }

    /// Whether a tile at `zoom` may stay tracked while the view is at `level`.
    fn keeps_zoom(&self, zoom: u8, level: u8) -> bool {
        let zoom = zoom as i32;
        let level = level as i32;
        zoom >= level - self.config.keep_levels_below as i32
            && zoom <= level + self.config.keep_levels_above as i32
    }

    /// Brings the tracked set in line with the viewport at tile level `level`.
    ///
    /// Missing identities from the required ranges at `level` and
    /// `level - 1` become `Requested` records, unless the kept zoom window
    /// excludes `level - 1`; tracked records outside
    /// those ranges or outside the kept zoom window are retired. Calling
    /// this again with the same arguments changes nothing.
    pub fn recompute_required_set(&mut self, viewport: &Viewport, level: u8) -> RecomputeOutcome<H> {
        if !viewport.has_area() || !viewport.zoom.is_finite() {
            return RecomputeOutcome::empty();
        }

        // The current level is pushed last and therefore loads first.
        let mut required_order = Vec::new();
        let mut required = HashSet::default();
        for zoom in level.saturating_sub(1)..=level {
            if !self.keeps_zoom(zoom, level) {
                continue;
            }
            let range = CoordinateProjection::required_tile_range_with_margin(
                viewport,
                zoom,
                self.config.prefetch_margin,
            );
            for id in range.iter() {
                if required.insert(id) {
                    required_order.push(id);
                }
            }
        }

        let mut outcome = RecomputeOutcome::empty();

        let mut stale: Vec<TileId> = self
            .records
            .keys()
            .filter(|id| !required.contains(*id) || !self.keeps_zoom(id.zoom, level))
            .copied()
            .collect();
        stale.sort_unstable();
        for id in stale {
            outcome.retired.push(self.retire(id));
        }

        for id in required_order {
            if self.records.contains_key(&id) {
                continue;
            }
            self.records.insert(id, TileRecord::new(id));
            self.pending.push(id);
            outcome.created.push(id);
        }

        if !outcome.is_noop() {
            log::debug!(
                "level {}: {} tiles requested, {} retired, {} tracked",
                level,
                outcome.created.len(),
                outcome.retired.len(),
                self.records.len()
            );
        }
        outcome
    }

    /// Moves a record through `FadingOut` to `Removed` and stops tracking it.
    /// A running load keeps its slot until the loader answers.
    fn retire(&mut self, id: TileId) -> RetiredTile<H> {
        for next in [TileLoadState::FadingOut, TileLoadState::Removed] {
            if let Err(e) = self.advance(&id, next) {
                log::error!("retiring tile {}: {}", id, e);
            }
        }
        self.pending.retain(|pending| *pending != id);
        let handle = self
            .records
            .remove(&id)
            .and_then(|mut record| record.take_handle());
        log::trace!("tile {} retired", id);
        RetiredTile { id, handle }
    }

    /// Stops tracking everything.
    pub fn clear(&mut self) -> Vec<RetiredTile<H>> {
        let mut ids: Vec<TileId> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.retire(id)).collect()
    }

    /// Starts loading the most recently requested tile, if a slot is free.
    ///
    /// The source is asked for the resource key exactly once per load, with
    /// the identity's wrapped coordinate.
    pub fn admit_next<L>(&mut self, source: &dyn TileSource, loader: &mut L) -> Option<TileId>
    where
        L: TileLoader<Handle = H>,
    {
        if self.in_flight.len() >= self.config.max_concurrent_loads {
            return None;
        }

        while let Some(id) = self.pending.pop() {
            if !self.records.contains_key(&id) {
                continue;
            }
            let ticket = LoadTicket(self.next_ticket);
            if let Err(e) = self.advance(&id, TileLoadState::Loading(ticket)) {
                log::error!("cannot start tile {}: {}", id, e);
                continue;
            }
            self.next_ticket += 1;
            self.in_flight.insert(ticket, id);

            let coord = id.resource_coord();
            let key = source.url(coord);
            log::debug!(
                "load {} for tile {} ({}/{} in flight)",
                ticket,
                id,
                self.in_flight.len(),
                self.config.max_concurrent_loads
            );
            let completion = Completion::new(ticket, self.completion_tx.clone());
            loader.load(
                TileRequest {
                    ticket,
                    id,
                    coord,
                    key,
                },
                completion,
            );
            return Some(id);
        }
        None
    }

    /// Applies one loader answer.
    ///
    /// The slot is released whenever the ticket was in flight, even if the
    /// record it belonged to has been evicted or replaced since.
    pub fn complete(&mut self, ticket: LoadTicket, outcome: Result<H>) -> CompletionStatus {
        let Some(id) = self.in_flight.remove(&ticket) else {
            log::debug!("ignoring answer for unknown load {}", ticket);
            return CompletionStatus::Unknown;
        };

        let current = self.records.get(&id).and_then(|record| record.ticket());
        if current != Some(ticket) {
            self.stale_completions += 1;
            log::debug!("load {} for tile {} finished after eviction", ticket, id);
            return CompletionStatus::Stale;
        }

        match outcome {
            Ok(handle) => {
                if let Err(e) = self.advance(&id, TileLoadState::Loaded) {
                    log::error!("finishing tile {}: {}", id, e);
                    return CompletionStatus::Stale;
                }
                if let Some(record) = self.records.get_mut(&id) {
                    record.attach(handle);
                    log::debug!(
                        "tile {} loaded {:?} after it was requested",
                        id,
                        record.requested_at().elapsed()
                    );
                }
                CompletionStatus::Loaded
            }
            Err(e) => {
                log::warn!("tile {} failed to load: {}", id, e);
                if let Err(e) = self.advance(&id, TileLoadState::Failed(e.to_string())) {
                    log::error!("failing tile {}: {}", id, e);
                    return CompletionStatus::Stale;
                }
                CompletionStatus::Failed
            }
        }
    }

    /// Applies every queued loader answer and returns the tiles that became
    /// `Loaded`.
    pub fn pump_completions(&mut self) -> Vec<TileId> {
        let mut loaded = Vec::new();
        while let Ok(TileCompletion { ticket, outcome }) = self.completion_rx.try_recv() {
            let id = self.in_flight.get(&ticket).copied();
            if self.complete(ticket, outcome) == CompletionStatus::Loaded {
                loaded.extend(id);
            }
        }
        loaded
    }
}

impl<H> Default for TileCache<H> {
    fn default() -> Self {
        Self::new(TileLoadingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::tiles::source::OpenStreetMapSource;

    /// Keeps completions so tests decide when loads finish
    #[derive(Default)]
    struct HeldLoader {
        requests: Vec<(TileRequest, Completion<u32>)>,
    }

    impl TileLoader for HeldLoader {
        type Handle = u32;

        fn load(&mut self, request: TileRequest, completion: Completion<u32>) {
            self.requests.push((request, completion));
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(
            Point::new(-0.52, -0.33),
            CoordinateProjection::level_to_zoom(9.0),
            Point::new(640.0, 480.0),
        )
    }

    #[test]
    fn test_recompute_requests_two_levels() {
        let mut cache: TileCache<u32> = TileCache::default();
        let outcome = cache.recompute_required_set(&viewport(), 9);
        assert!(!outcome.created.is_empty());
        assert!(outcome.retired.is_empty());
        assert!(outcome.created.iter().any(|id| id.zoom == 9));
        assert!(outcome.created.iter().any(|id| id.zoom == 8));
        assert!(outcome.created.iter().all(|id| id.zoom == 8 || id.zoom == 9));
        assert_eq!(cache.stats().requested, cache.len());
        // current level sits on top of the pending stack
        assert_eq!(outcome.created.last().map(|id| id.zoom), Some(9));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut cache: TileCache<u32> = TileCache::default();
        cache.recompute_required_set(&viewport(), 9);
        let before = cache.stats();
        let again = cache.recompute_required_set(&viewport(), 9);
        assert!(again.is_noop());
        assert_eq!(cache.stats(), before);
    }

    #[test]
    fn test_level_zero_requests_a_single_level() {
        let mut cache: TileCache<u32> = TileCache::default();
        let view = Viewport::new(Point::new(-0.5, -0.5), 200.0, Point::new(100.0, 100.0));
        let outcome = cache.recompute_required_set(&view, 0);
        assert!(outcome.created.iter().all(|id| id.zoom == 0));
    }

    #[test]
    fn test_moving_away_retires_tiles() {
        let mut cache: TileCache<u32> = TileCache::default();
        let mut view = viewport();
        let first = cache.recompute_required_set(&view, 9);
        view.position = view.position.add(&Point::new(0.25, 0.0));
        let second = cache.recompute_required_set(&view, 9);
        assert_eq!(second.retired.len(), first.created.len());
        assert!(first.created.iter().all(|id| !cache.contains(id)));
        assert_eq!(cache.pending_count(), cache.len());
    }

    #[test]
    fn test_zoom_window_evicts_far_levels() {
        let mut cache: TileCache<u32> = TileCache::default();
        let view = viewport();
        cache.recompute_required_set(&view, 9);
        let outcome = cache.recompute_required_set(&view, 12);
        assert!(outcome.retired.iter().all(|tile| tile.id.zoom < 10));
        assert!(cache.stats().tracked > 0);
        for (id, _) in cache.records.iter() {
            assert!(id.zoom == 11 || id.zoom == 12);
        }
    }

    #[test]
    fn test_narrow_window_skips_and_evicts_coarser_level() {
        let config = TileLoadingConfig {
            keep_levels_below: 0,
            ..TileLoadingConfig::default()
        };
        let mut cache: TileCache<u32> = TileCache::new(config);
        let view = viewport();
        let outcome = cache.recompute_required_set(&view, 8);
        assert!(!outcome.created.is_empty());
        assert!(outcome.created.iter().all(|id| id.zoom == 8));
        assert!(cache.recompute_required_set(&view, 8).is_noop());

        // level 8 is now one below the current level and falls out of the window
        let outcome = cache.recompute_required_set(&view, 9);
        assert!(!outcome.retired.is_empty());
        assert!(outcome.retired.iter().all(|tile| tile.id.zoom == 8));
        assert!(cache.records.keys().all(|id| id.zoom == 9));
        assert!(cache.recompute_required_set(&view, 9).is_noop());
    }

    #[test]
    fn test_admission_respects_cap_and_lifo_order() {
        let mut cache: TileCache<u32> = TileCache::default();
        let created = cache.recompute_required_set(&viewport(), 9).created;
        let mut loader = HeldLoader::default();
        let source = OpenStreetMapSource::new();

        let first = cache.admit_next(&source, &mut loader);
        assert_eq!(first, created.last().copied());
        cache.admit_next(&source, &mut loader);
        cache.admit_next(&source, &mut loader);
        assert_eq!(cache.loading_count(), 3);
        assert_eq!(cache.admit_next(&source, &mut loader), None);
        assert_eq!(loader.requests.len(), 3);

        let (request, completion) = loader.requests.remove(0);
        assert_eq!(request.coord, request.id.resource_coord());
        assert_eq!(
            request.key,
            format!(
                "https://tile.openstreetmap.org/{}/{}/{}.png",
                request.coord.z, request.coord.x, request.coord.y
            )
        );
        completion.succeed(1);
        assert_eq!(cache.pump_completions(), vec![request.id]);
        assert_eq!(cache.loading_count(), 2);
        assert!(cache.get(&request.id).unwrap().is_loaded());
        assert_eq!(cache.loaded().count(), 1);
        assert!(cache.admit_next(&source, &mut loader).is_some());
    }

    #[test]
    fn test_failure_marks_record_failed() {
        let mut cache: TileCache<u32> = TileCache::default();
        cache.recompute_required_set(&viewport(), 9);
        let mut loader = HeldLoader::default();
        let id = cache
            .admit_next(&OpenStreetMapSource::new(), &mut loader)
            .unwrap();
        let (request, completion) = loader.requests.pop().unwrap();
        completion.fail("HTTP 404");

        assert!(cache.pump_completions().is_empty());
        let record = cache.get(&id).unwrap();
        assert!(matches!(record.state(), TileLoadState::Failed(_)));
        assert!(record.handle().is_none());
        assert_eq!(cache.loading_count(), 0);
        assert_eq!(cache.complete(request.ticket, Ok(5)), CompletionStatus::Unknown);
    }

    #[test]
    fn test_completion_after_eviction_releases_slot() {
        let mut cache: TileCache<u32> = TileCache::default();
        let mut view = viewport();
        cache.recompute_required_set(&view, 9);
        let mut loader = HeldLoader::default();
        let source = OpenStreetMapSource::new();
        let id = cache.admit_next(&source, &mut loader).unwrap();

        view.position = view.position.add(&Point::new(0.5, 0.5));
        let outcome = cache.recompute_required_set(&view, 9);
        assert!(outcome.retired.iter().any(|tile| tile.id == id));
        assert_eq!(cache.loading_count(), 1);

        let (request, _completion) = loader.requests.pop().unwrap();
        assert_eq!(cache.complete(request.ticket, Ok(3)), CompletionStatus::Stale);
        assert_eq!(cache.loading_count(), 0);
        assert_eq!(cache.stats().stale_completions, 1);
        assert!(!cache.contains(&id));
    }

    #[test]
    fn test_reissued_tile_ignores_old_answer() {
        let mut cache: TileCache<u32> = TileCache::default();
        let view = viewport();
        cache.recompute_required_set(&view, 9);
        let mut loader = HeldLoader::default();
        let source = OpenStreetMapSource::new();
        let id = cache.admit_next(&source, &mut loader).unwrap();
        let (old_request, old_completion) = loader.requests.pop().unwrap();

        // evict everything, then come back to the same view
        let away = Viewport::new(Point::new(-0.1, -0.9), view.zoom, view.size);
        cache.recompute_required_set(&away, 9);
        cache.recompute_required_set(&view, 9);
        assert_eq!(cache.get(&id).unwrap().state(), &TileLoadState::Requested);

        old_completion.succeed(99);
        assert!(cache.pump_completions().is_empty());
        assert_eq!(cache.get(&id).unwrap().state(), &TileLoadState::Requested);
        assert_eq!(cache.loading_count(), 0);
        assert_eq!(cache.complete(old_request.ticket, Ok(1)), CompletionStatus::Unknown);
    }

    #[test]
    fn test_clear_retires_everything() {
        let mut cache: TileCache<u32> = TileCache::default();
        let created = cache.recompute_required_set(&viewport(), 9).created.len();
        assert_eq!(cache.clear().len(), created);
        assert!(cache.is_empty());
        assert_eq!(cache.pending_count(), 0);
    }
}
