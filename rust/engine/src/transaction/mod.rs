// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reversible edits.
//!
//! Every mutation a user can undo is a [`StateRequest`]. The
//! [`TransactionManager`] runs requests against the graph and keeps the
//! undo and redo stacks. A request moves through
//! `Pending → Committed → Undone ⇄ Redone`; a request whose commit fails
//! is dropped and never reaches the stacks.

mod requests;

pub use requests::{
    AddRoofRequest, AddSlabHoleRequest, DirectionTarget, MoveVertexRequest,
    SetExtrusionValueRequest, UpdateRoofDirectionRequest,
};

use floorkit_topology::{EntityKey, KernelContext, TopologyGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Lifecycle position of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    #[default]
    Pending,
    Committed,
    Undone,
    Redone,
}

impl RequestState {
    pub fn can_undo(self) -> bool {
        matches!(self, RequestState::Committed | RequestState::Redone)
    }

    pub fn can_redo(self) -> bool {
        self == RequestState::Undone
    }
}

/// A reversible unit of graph mutation.
///
/// `on_commit` performs the edit and captures whatever it needs to reverse
/// it exactly. It must leave the graph untouched when it fails. `on_redo`
/// reapplies the captured result through the same path as the commit, and
/// `on_undo` restores the captured prior state and repeats the dirty marks
/// and rebuilds the commit triggered.
pub trait StateRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()>;

    fn on_undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()>;

    fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()>;

    /// Entity created or updated by the last successful commit or redo.
    fn result(&self) -> Option<EntityKey> {
        None
    }

    fn description(&self) -> &str;
}

struct Entry {
    request: Box<dyn StateRequest>,
    state: RequestState,
}

/// Undo/redo stacks over committed requests.
#[derive(Default)]
pub struct TransactionManager {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits a request, returning its result entity.
    ///
    /// A successful commit clears the redo stack.
    pub fn commit(
        &mut self,
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        mut request: Box<dyn StateRequest>,
    ) -> Result<Option<EntityKey>> {
        if let Err(e) = request.on_commit(graph, ctx) {
            warn!(request = request.description(), error = %e, "Commit failed");
            return Err(e);
        }
        let result = request.result();
        info!(request = request.description(), "Committed");
        self.redo_stack.clear();
        self.undo_stack.push(Entry {
            request,
            state: RequestState::Committed,
        });
        Ok(result)
    }

    pub fn undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let mut entry = self.undo_stack.pop().ok_or(Error::NothingToUndo)?;
        if !entry.state.can_undo() {
            let state = entry.state;
            self.undo_stack.push(entry);
            return Err(Error::InvalidRequestState { state, action: "undo" });
        }
        if let Err(e) = entry.request.on_undo(graph, ctx) {
            warn!(request = entry.request.description(), error = %e, "Undo failed");
            self.undo_stack.push(entry);
            return Err(e);
        }
        entry.state = RequestState::Undone;
        info!(request = entry.request.description(), "Undone");
        self.redo_stack.push(entry);
        Ok(())
    }

    pub fn redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let mut entry = self.redo_stack.pop().ok_or(Error::NothingToRedo)?;
        if !entry.state.can_redo() {
            let state = entry.state;
            self.redo_stack.push(entry);
            return Err(Error::InvalidRequestState { state, action: "redo" });
        }
        if let Err(e) = entry.request.on_redo(graph, ctx) {
            warn!(request = entry.request.description(), error = %e, "Redo failed");
            self.redo_stack.push(entry);
            return Err(e);
        }
        entry.state = RequestState::Redone;
        info!(request = entry.request.description(), "Redone");
        self.undo_stack.push(entry);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// State of the request that the next undo would revert.
    pub fn last_state(&self) -> Option<RequestState> {
        self.undo_stack.last().map(|e| e.state)
    }

    /// Result entity of the request that the next undo would revert.
    pub fn last_result(&self) -> Option<EntityKey> {
        self.undo_stack.last().and_then(|e| e.request.result())
    }

    pub fn clear(&mut self) {
        debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "Clearing transaction history"
        );
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Does nothing; fails its commit on demand.
    struct Noop {
        fail: bool,
    }

    impl StateRequest for Noop {
        fn on_commit(&mut self, _: &mut TopologyGraph, _: &mut KernelContext) -> Result<()> {
            if self.fail {
                return Err(Error::InvalidParameter("refused".into()));
            }
            Ok(())
        }

        fn on_undo(&mut self, _: &mut TopologyGraph, _: &mut KernelContext) -> Result<()> {
            Ok(())
        }

        fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
            self.on_commit(graph, ctx)
        }

        fn description(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn stacks_follow_the_request_lifecycle() {
        let mut graph = TopologyGraph::new();
        let mut ctx = KernelContext::default();
        let mut manager = TransactionManager::new();
        assert!(matches!(manager.undo(&mut graph, &mut ctx), Err(Error::NothingToUndo)));

        manager
            .commit(&mut graph, &mut ctx, Box::new(Noop { fail: false }))
            .unwrap();
        assert_eq!(manager.last_state(), Some(RequestState::Committed));

        manager.undo(&mut graph, &mut ctx).unwrap();
        assert!(!manager.can_undo());
        assert!(manager.can_redo());

        manager.redo(&mut graph, &mut ctx).unwrap();
        assert_eq!(manager.last_state(), Some(RequestState::Redone));
        assert!(matches!(manager.redo(&mut graph, &mut ctx), Err(Error::NothingToRedo)));
    }

    #[test]
    fn failed_commit_is_not_recorded() {
        let mut graph = TopologyGraph::new();
        let mut ctx = KernelContext::default();
        let mut manager = TransactionManager::new();
        manager
            .commit(&mut graph, &mut ctx, Box::new(Noop { fail: false }))
            .unwrap();
        manager.undo(&mut graph, &mut ctx).unwrap();

        let failed = manager.commit(&mut graph, &mut ctx, Box::new(Noop { fail: true }));
        assert!(failed.is_err());
        assert!(!manager.can_undo());
        // a failed commit leaves the redo history alone
        assert!(manager.can_redo());
    }
}
