//! Per-user live change notifications, streamed at `GET /events`.

use std::{collections::HashMap, convert::Infallible, sync::Arc};

use api_types::event::{Collection, Event};
use axum::{
    Extension,
    extract::State,
    response::sse::{self, KeepAlive, Sse},
};
use engine::Actor;
use futures::{Stream, stream};
use tokio::sync::{RwLock, broadcast};

use crate::server::ServerState;

const CHANNEL_CAPACITY: usize = 64;

/// In-memory pub/sub, one broadcast channel per user.
#[derive(Clone, Debug, Default)]
pub struct EventHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
}

impl EventHub {
    /// Publish to every open stream of `user_id`. Without subscribers the
    /// event is dropped.
    pub async fn publish(&self, user_id: &str, event: Event) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(user_id) {
            let _ = tx.send(event);
        }
    }

    pub async fn changed(&self, user_id: &str, collections: &[Collection]) {
        for collection in collections {
            self.publish(
                user_id,
                Event::Changed {
                    collection: *collection,
                },
            )
            .await;
        }
    }

    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Event> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

fn to_sse(event: &Event) -> sse::Event {
    let frame = sse::Event::default().event(event.name());
    match serde_json::to_string(event) {
        Ok(data) => frame.data(data),
        Err(err) => {
            tracing::error!("failed to encode event: {err}");
            frame.data("{}")
        }
    }
}

/// Turn a receiver into an SSE stream. A lagging client skips the events
/// it missed; it recomputes its views on the next one anyway.
pub(crate) fn event_stream(
    rx: broadcast::Receiver<Event>,
) -> impl Stream<Item = Result<sse::Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(to_sse(&event)), rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

pub async fn open(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    let rx = state.events.subscribe(&actor.user_id).await;
    tracing::debug!(user = %actor.user_id, "event stream opened");
    Sse::new(event_stream(rx)).keep_alive(KeepAlive::default())
}
