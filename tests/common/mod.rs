//! Test doubles shared by the scenario tests.

#![allow(dead_code)]

use glidemap::{Completion, TilePlacement, TileId, TileLoader, TileRequest, TileSurface};
use std::time::Duration;

/// Holds every request so the test decides when and how loads finish
#[derive(Default)]
pub struct RecordingLoader {
    pub pending: Vec<(TileRequest, Completion<u32>)>,
    pub keys: Vec<String>,
}

impl RecordingLoader {
    /// Answers the oldest outstanding request successfully
    pub fn succeed_oldest(&mut self) -> Option<TileRequest> {
        if self.pending.is_empty() {
            return None;
        }
        let (request, completion) = self.pending.remove(0);
        completion.succeed(request.ticket.0 as u32);
        Some(request)
    }

    pub fn fail_oldest(&mut self, reason: &str) -> Option<TileRequest> {
        if self.pending.is_empty() {
            return None;
        }
        let (request, completion) = self.pending.remove(0);
        completion.fail(reason);
        Some(request)
    }

    pub fn succeed_all(&mut self) -> usize {
        let n = self.pending.len();
        for (request, completion) in self.pending.drain(..) {
            completion.succeed(request.ticket.0 as u32);
        }
        n
    }
}

impl TileLoader for RecordingLoader {
    type Handle = u32;

    fn load(&mut self, request: TileRequest, completion: Completion<u32>) {
        self.keys.push(request.key.clone());
        self.pending.push((request, completion));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Show(TileId, u32, TilePlacement),
    Place(TileId, TilePlacement),
    Retire(TileId, Option<u32>),
}

/// Remembers every call the controller makes
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn shown(&self) -> Vec<TileId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Show(id, _, _) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn retired(&self) -> Vec<TileId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Retire(id, _) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl TileSurface<u32> for RecordingSurface {
    fn show(&mut self, id: TileId, handle: &u32, placement: TilePlacement, _fade: Duration) {
        self.calls.push(SurfaceCall::Show(id, *handle, placement));
    }

    fn place(&mut self, id: TileId, _handle: &u32, placement: TilePlacement) {
        self.calls.push(SurfaceCall::Place(id, placement));
    }

    fn retire(&mut self, id: TileId, handle: Option<u32>, _fade: Duration) {
        self.calls.push(SurfaceCall::Retire(id, handle));
    }
}
