use super::loader::LoadTicket;
use crate::core::geo::TileId;
use crate::{MapError, Result};
use instant::Instant;

/// Lifecycle of a tracked tile.
///
/// `Requested → Loading → Loaded | Failed → FadingOut → Removed`; an
/// eviction may also move `Requested` or `Loading` straight to `FadingOut`.
/// States only ever advance.
#[derive(Debug, Clone, PartialEq)]
pub enum TileLoadState {
    Requested,
    Loading(LoadTicket),
    Loaded,
    Failed(String),
    FadingOut,
    Removed,
}

impl TileLoadState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Loading(_) => "loading",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
            Self::FadingOut => "fading-out",
            Self::Removed => "removed",
        }
    }

    fn can_advance_to(&self, next: &TileLoadState) -> bool {
        use TileLoadState::*;
        matches!(
            (self, next),
            (Requested, Loading(_))
                | (Loading(_), Loaded)
                | (Loading(_), Failed(_))
                | (Requested | Loading(_) | Loaded | Failed(_), FadingOut)
                | (FadingOut, Removed)
        )
    }
}

/// A tile the cache is tracking, with its image once loaded
#[derive(Debug)]
pub struct TileRecord<H> {
    id: TileId,
    state: TileLoadState,
    handle: Option<H>,
    requested_at: Instant,
}

impl<H> TileRecord<H> {
    pub fn new(id: TileId) -> Self {
        Self {
            id,
            state: TileLoadState::Requested,
            handle: None,
            requested_at: Instant::now(),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn state(&self) -> &TileLoadState {
        &self.state
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn requested_at(&self) -> Instant {
        self.requested_at
    }

    pub fn is_loaded(&self) -> bool {
        self.state == TileLoadState::Loaded
    }

    /// The ticket of the running load, if any
    pub fn ticket(&self) -> Option<LoadTicket> {
        match self.state {
            TileLoadState::Loading(ticket) => Some(ticket),
            _ => None,
        }
    }

    pub fn transition(&mut self, next: TileLoadState) -> Result<()> {
        if !self.state.can_advance_to(&next) {
            return Err(MapError::InvalidTransition {
                id: self.id,
                from: self.state.name(),
                to: next.name(),
            });
        }
        log::trace!("tile {}: {} -> {}", self.id, self.state.name(), next.name());
        self.state = next;
        Ok(())
    }

    pub(crate) fn attach(&mut self, handle: H) {
        self.handle = Some(handle);
    }

    pub(crate) fn take_handle(&mut self) -> Option<H> {
        self.handle.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut record: TileRecord<()> = TileRecord::new(TileId::new(4, 3, 2));
        assert_eq!(record.state(), &TileLoadState::Requested);
        record.transition(TileLoadState::Loading(LoadTicket(1))).unwrap();
        assert_eq!(record.ticket(), Some(LoadTicket(1)));
        record.transition(TileLoadState::Loaded).unwrap();
        assert!(record.is_loaded());
        record.transition(TileLoadState::FadingOut).unwrap();
        record.transition(TileLoadState::Removed).unwrap();
    }

    #[test]
    fn test_backward_and_skipping_transitions_fail() {
        let mut record: TileRecord<()> = TileRecord::new(TileId::new(4, 3, 2));
        let err = record.transition(TileLoadState::Loaded).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidTransition {
                from: "requested",
                to: "loaded",
                ..
            }
        ));

        record.transition(TileLoadState::Loading(LoadTicket(2))).unwrap();
        record.transition(TileLoadState::Failed("404".into())).unwrap();
        assert_eq!(record.state().name(), "failed");
        assert!(record.transition(TileLoadState::Loading(LoadTicket(3))).is_err());
        assert!(record.transition(TileLoadState::Loaded).is_err());
    }

    #[test]
    fn test_unloaded_tile_can_be_evicted() {
        let mut record: TileRecord<()> = TileRecord::new(TileId::new(1, 0, 0));
        record.transition(TileLoadState::FadingOut).unwrap();
        assert!(record.transition(TileLoadState::Requested).is_err());
        record.transition(TileLoadState::Removed).unwrap();
    }
}
