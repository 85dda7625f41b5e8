//! The asynchronous boundary of the tile pipeline.
//!
//! The cache hands every load to a [`TileLoader`] together with a
//! [`Completion`] token. The token is the only way to report back and it is
//! consumed by [`Completion::finish`], so a request can be answered once at
//! most. A token dropped without an answer reports a failure on its own,
//! which keeps the concurrency slot from leaking. Answers travel through a
//! channel and are applied by the cache on the frame thread.

use crate::core::geo::{TileCoord, TileId};
use crate::{MapError, Result};
use crossbeam_channel::Sender;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;

/// Identifies one load attempt. A re-requested tile gets a new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a loader needs to fetch one tile
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub ticket: LoadTicket,
    /// Slot the image is for (unwrapped)
    pub id: TileId,
    /// Wrapped coordinate the resource key was built from
    pub coord: TileCoord,
    /// Resource key from the [`TileSource`](super::source::TileSource), usually a URL
    pub key: String,
}

/// Result of a load attempt as it travels back to the cache
#[derive(Debug)]
pub struct TileCompletion<H> {
    pub ticket: LoadTicket,
    pub outcome: Result<H>,
}

/// One-shot answer token for a [`TileRequest`]
#[derive(Debug)]
pub struct Completion<H> {
    ticket: LoadTicket,
    sender: Option<Sender<TileCompletion<H>>>,
}

impl<H> Completion<H> {
    pub(crate) fn new(ticket: LoadTicket, sender: Sender<TileCompletion<H>>) -> Self {
        Self {
            ticket,
            sender: Some(sender),
        }
    }

    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn finish(mut self, outcome: Result<H>) {
        self.send(outcome);
    }

    pub fn succeed(self, handle: H) {
        self.finish(Ok(handle));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.finish(Err(MapError::TileLoad(reason.into())));
    }

    fn send(&mut self, outcome: Result<H>) {
        if let Some(sender) = self.sender.take() {
            // The cache may already be gone; nothing is waiting then.
            let _ = sender.send(TileCompletion {
                ticket: self.ticket,
                outcome,
            });
        }
    }
}

impl<H> Drop for Completion<H> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            log::warn!("load {} dropped without an answer", self.ticket);
            self.send(Err(MapError::TileLoad(
                "loader dropped the request".to_string(),
            )));
        }
    }
}

/// Fetches tile images. Implementations must eventually answer every
/// request through its [`Completion`].
pub trait TileLoader {
    /// Whatever the surface draws, e.g. a decoded texture id
    type Handle;

    fn load(&mut self, request: TileRequest, completion: Completion<Self::Handle>);
}

/// Runs a blocking fetch function on a detached thread per request.
pub struct ThreadLoader<F, H> {
    fetch: Arc<F>,
    _handle: PhantomData<fn() -> H>,
}

impl<F, H> ThreadLoader<F, H>
where
    F: Fn(&TileRequest) -> Result<H> + Send + Sync + 'static,
    H: Send + 'static,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch: Arc::new(fetch),
            _handle: PhantomData,
        }
    }
}

impl<F, H> TileLoader for ThreadLoader<F, H>
where
    F: Fn(&TileRequest) -> Result<H> + Send + Sync + 'static,
    H: Send + 'static,
{
    type Handle = H;

    fn load(&mut self, request: TileRequest, completion: Completion<H>) {
        let fetch = Arc::clone(&self.fetch);
        thread::spawn(move || {
            log::debug!("fetch tile {} from {}", request.id, request.key);
            let outcome = fetch(&request);
            if let Err(e) = &outcome {
                log::warn!("tile {} failed: {}", request.id, e);
            }
            completion.finish(outcome);
        });
    }
}
