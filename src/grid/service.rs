//! Mutation Service
//!
//! Owns the authoritative grid state for the lifetime of the process.
//! Loaded once from the store at startup, written back on every mutation.
//! The in-memory state is only replaced after the store accepted the write.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::error::{GridError, Result};
use crate::grid::command::GridCommand;
use crate::grid::events::GridEvent;
use crate::grid::state::GridState;
use crate::store::{StateStore, StoreError};

/// A committed mutation: the new state and what changed.
#[derive(Clone, Debug)]
pub struct Committed {
    /// Complete state after the mutation.
    pub state: GridState,
    /// Description of the change.
    pub event: GridEvent,
}

/// Applies admin commands against the stored grid.
pub struct GridService {
    state: RwLock<GridState>,
    store: Arc<dyn StateStore>,
}

impl GridService {
    /// Construct from whatever the store currently holds.
    pub fn load(store: Arc<dyn StateStore>) -> std::result::Result<Self, StoreError> {
        let state = store.load()?;
        info!(
            rows = state.rows,
            cols = state.cols,
            blocked = state.blocked.len(),
            names = state.names.len(),
            "Loaded grid state"
        );
        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// Current state.
    pub async fn snapshot(&self) -> GridState {
        self.state.read().await.clone()
    }

    /// Validate, apply and persist a command.
    ///
    /// Mutations are applied one at a time. On any error the state is left
    /// exactly as it was.
    #[instrument(skip(self))]
    pub async fn apply(&self, command: GridCommand) -> Result<Committed> {
        let mut current = self.state.write().await;
        let (next, event) = command.apply(&current)?;

        self.store.save(&next).map_err(|e| {
            error!("Failed to persist grid state: {}", e);
            GridError::StorageFailure(e)
        })?;

        *current = next.clone();
        info!(operation = event.operation(), "{}", event);

        Ok(Committed { state: next, event })
    }
}
