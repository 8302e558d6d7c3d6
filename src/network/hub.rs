//! Grid Hub
//!
//! Ties the access guard, the mutation service and the broadcast channel
//! together. Every mutation goes through [`GridHub::execute`]:
//! authorize → validate → apply + persist → publish.
//!
//! Publishing never waits on viewers. A subscriber that falls more than
//! [`UPDATE_CHANNEL_CAPACITY`] updates behind sees `Lagged` and is moved to
//! the current state by [`GridHub::resync`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::grid::service::{Committed, GridService};
use crate::grid::state::GridState;
use crate::network::auth::{AccessGuard, IssuedToken, TokenClaims};
use crate::network::protocol::MutationRequest;

/// Buffered updates per subscriber before it starts lagging.
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Shared entry point for every connection.
pub struct GridHub {
    service: GridService,
    guard: AccessGuard,
    updates: broadcast::Sender<Arc<GridState>>,
}

impl GridHub {
    /// Create a hub around a loaded service.
    pub fn new(service: GridService, guard: AccessGuard) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { service, guard, updates }
    }

    /// Subscribe to committed states.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GridState>> {
        self.updates.subscribe()
    }

    /// Number of live subscriptions.
    pub fn viewer_count(&self) -> usize {
        self.updates.receiver_count()
    }

    /// Current state (public).
    pub async fn snapshot(&self) -> GridState {
        self.service.snapshot().await
    }

    /// Admin login.
    pub fn login(&self, identity: &str, secret: &str) -> Result<IssuedToken> {
        Ok(self.guard.login(identity, secret)?)
    }

    /// Check a token presented by a client.
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        Ok(self.guard.verify(token)?)
    }

    /// Run an admin mutation end to end.
    ///
    /// Authorization happens first: an unauthorized request never reaches
    /// validation or the store.
    #[instrument(skip(self, token, request), fields(operation = request.operation()))]
    pub async fn execute(&self, token: Option<&str>, request: MutationRequest) -> Result<Committed> {
        let claims = self.guard.authorize(token)?;
        let command = request.into_command()?;
        let committed = self.service.apply(command).await?;

        let receivers = self.publish(&committed.state);
        debug!(jti = %claims.jti, receivers, "Published grid update");

        Ok(committed)
    }

    /// Catch a lagging subscriber up.
    ///
    /// Skips every buffered update and returns the current state instead, so
    /// the subscriber never sees an older state after the one returned here.
    pub async fn resync(&self, updates: &mut broadcast::Receiver<Arc<GridState>>, skipped: u64) -> GridState {
        warn!(skipped, "Subscriber lagged, resyncing from snapshot");
        *updates = updates.resubscribe();
        self.snapshot().await
    }

    /// Fan a state out to every subscriber. Returns how many received it.
    pub fn publish(&self, state: &GridState) -> usize {
        // Err only means nobody is subscribed
        self.updates.send(Arc::new(state.clone())).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    use crate::error::GridError;
    use crate::network::auth::AuthConfig;
    use crate::network::protocol::{GenerateRequest, UpdateRequest};
    use crate::store::MemoryStore;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            identity: "admin".into(),
            secret: "pw".into(),
            signing_key: "hub-test-key".into(),
            token_max_age: Duration::from_secs(600),
        }
    }

    fn hub_with_store() -> (GridHub, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = GridService::load(store.clone()).unwrap();
        (GridHub::new(service, AccessGuard::new(auth_config())), store)
    }

    fn generate(rows: u32, cols: u32) -> MutationRequest {
        MutationRequest::Generate(GenerateRequest {
            rows: Some(json!(rows)),
            cols: Some(json!(cols)),
        })
    }

    #[tokio::test]
    async fn test_unauthenticated_mutation_rejected() {
        let (hub, _) = hub_with_store();
        let mut rx = hub.subscribe();
        let before = hub.snapshot().await;

        for token in [None, Some("garbage")] {
            let result = hub.execute(token, generate(5, 5)).await;
            assert!(matches!(result, Err(GridError::Unauthorized(_))));
        }

        assert_eq!(hub.snapshot().await, before);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unauthorized_beats_invalid_argument() {
        let (hub, _) = hub_with_store();
        let bad = MutationRequest::Generate(GenerateRequest::default());

        let result = hub.execute(None, bad).await;
        assert!(matches!(result, Err(GridError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_mutation_is_broadcast() {
        let (hub, _) = hub_with_store();
        let mut viewer_a = hub.subscribe();
        let mut viewer_b = hub.subscribe();
        assert_eq!(hub.viewer_count(), 2);

        let token = hub.login("admin", "pw").unwrap().token;
        let committed = hub.execute(Some(&token), generate(2, 4)).await.unwrap();
        assert_eq!(committed.state, GridState::empty(2, 4));

        assert_eq!(*viewer_a.recv().await.unwrap(), committed.state);
        assert_eq!(*viewer_b.recv().await.unwrap(), committed.state);
    }

    #[tokio::test]
    async fn test_failed_mutation_not_broadcast() {
        let (hub, store) = hub_with_store();
        let mut rx = hub.subscribe();
        let token = hub.login("admin", "pw").unwrap().token;

        let hide_missing = MutationRequest::Update(UpdateRequest {
            box_num: Some(json!(99)),
            subtitle: None,
            visibility: Some("hide".into()),
        });
        assert!(matches!(
            hub.execute(Some(&token), hide_missing).await,
            Err(GridError::NotFound(99))
        ));

        store.set_offline(true);
        assert!(matches!(
            hub.execute(Some(&token), MutationRequest::Reset).await,
            Err(GridError::StorageFailure(_))
        ));

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_login_failure_is_unauthorized() {
        let (hub, _) = hub_with_store();
        assert!(matches!(hub.login("admin", "nope"), Err(GridError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_resyncs_to_current_state() {
        let (hub, _) = hub_with_store();
        let mut rx = hub.subscribe();
        let token = hub.login("admin", "pw").unwrap().token;

        let total = UPDATE_CHANNEL_CAPACITY + 6;
        for n in 1..=total {
            let label = MutationRequest::Update(UpdateRequest {
                box_num: Some(json!(n)),
                subtitle: Some(json!(format!("item {n}"))),
                visibility: None,
            });
            hub.execute(Some(&token), label).await.unwrap();
        }

        let skipped = match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => skipped,
            other => panic!("expected lag, got {other:?}"),
        };
        assert_eq!(skipped, 6);

        let current = hub.resync(&mut rx, skipped).await;
        assert_eq!(current, hub.snapshot().await);
        assert_eq!(current.names.len(), total);

        // Buffered older states are gone
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Later updates still arrive
        hub.execute(Some(&token), MutationRequest::Reset).await.unwrap();
        assert_eq!(*rx.recv().await.unwrap(), GridState::default());
    }

    #[tokio::test]
    async fn test_publish_without_viewers() {
        let (hub, _) = hub_with_store();
        assert_eq!(hub.publish(&GridState::default()), 0);
    }
}
