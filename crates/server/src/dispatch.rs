//! Fire-and-forget submission of asset writes.
//!
//! Handlers run the synchronous checks, claim a pending slot and return
//! `202 Accepted`. The commit runs on its own task; its outcome is only
//! reported on the user's event stream. Failed commits are never retried.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use api_types::event::{Collection, Event, FailureKind, MutationAction};
use engine::EngineError;
use uuid::Uuid;

use crate::{ServerError, events::EventHub};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PendingKey {
    user_id: String,
    action: MutationAction,
    target: String,
}

/// Logical actions currently in flight. A second submission of the same
/// action on the same target is refused until the first one settles.
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    pending: Arc<Mutex<HashSet<PendingKey>>>,
}

/// Holds a pending slot; releasing happens on drop.
#[derive(Debug)]
pub struct PendingGuard {
    pending: Arc<Mutex<HashSet<PendingKey>>>,
    key: PendingKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Everything a spawned commit needs to report back.
#[derive(Clone, Debug)]
pub struct Submission {
    pub user_id: String,
    pub action: MutationAction,
    pub asset_id: Uuid,
}

pub(crate) fn failure_kind(err: &EngineError) -> FailureKind {
    match err {
        EngineError::Forbidden(_) => FailureKind::PermissionDenied,
        EngineError::KeyNotFound(_) => FailureKind::NotFound,
        EngineError::InvalidState(_) => FailureKind::InvalidState,
        EngineError::Validation(_) | EngineError::InvalidId(_) | EngineError::Csv(_) => {
            FailureKind::Validation
        }
        EngineError::ExistingKey(_)
        | EngineError::InUse(_)
        | EngineError::Password(_)
        | EngineError::Database(_) => FailureKind::Store,
    }
}

impl Dispatcher {
    /// Reserve `(user, action, target)`. `Conflict` when already in flight.
    pub fn claim(
        &self,
        user_id: &str,
        action: MutationAction,
        target: impl Into<String>,
    ) -> Result<PendingGuard, ServerError> {
        let key = PendingKey {
            user_id: user_id.to_string(),
            action,
            target: target.into(),
        };
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key.clone()) {
            return Err(ServerError::Conflict(format!(
                "{action:?} on {} already in progress",
                key.target
            )));
        }
        Ok(PendingGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run `commit` in the background and report its outcome on `events`.
    pub fn submit<F, T>(
        &self,
        guard: PendingGuard,
        events: EventHub,
        submission: Submission,
        commit: F,
    ) where
        F: Future<Output = Result<T, EngineError>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = commit.await;
            drop(guard);
            let Submission {
                user_id,
                action,
                asset_id,
            } = submission;
            match outcome {
                Ok(_) => {
                    tracing::debug!(user = %user_id, ?action, %asset_id, "mutation committed");
                    events
                        .changed(&user_id, &[Collection::Assets, Collection::History])
                        .await;
                }
                Err(err) => {
                    let kind = failure_kind(&err);
                    let message = match err {
                        EngineError::Database(db_err) => {
                            tracing::error!(user = %user_id, ?action, %asset_id, "database error: {db_err}");
                            "internal server error".to_string()
                        }
                        other => {
                            tracing::warn!(user = %user_id, ?action, %asset_id, "mutation failed: {other}");
                            other.to_string()
                        }
                    };
                    events
                        .publish(
                            &user_id,
                            Event::MutationFailed {
                                action,
                                asset_id,
                                kind,
                                message,
                            },
                        )
                        .await;
                }
            }
        });
    }
}
