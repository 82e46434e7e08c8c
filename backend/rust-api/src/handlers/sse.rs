use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use super::games::find_game;
use crate::{
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::events::{GameEvent, HostMessage},
    services::AppState,
};

/// Keeps the connection gauge accurate however the stream ends
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// SSE endpoint for game events
/// GET /api/v1/games/{id}/stream
pub async fn game_stream(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let game = find_game(&state, &game_id).await?;
    tracing::info!("Client connected to SSE stream: game={}", game_id);

    // Subscribe before reading the current message so nothing is missed in between
    let receiver = game.subscribe();
    let view = game.view();
    let current = GameEvent::HostMessage(HostMessage {
        game_id: view.game_id.clone(),
        message: view.message,
        phase: view.phase,
        timestamp: Utc::now(),
    });

    let stream = create_event_stream(
        game_id,
        current,
        BroadcastStream::new(receiver),
        game.shutdown_token().cancelled_owned(),
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn create_event_stream(
    game_id: String,
    current: GameEvent,
    events: BroadcastStream<GameEvent>,
    closed: impl std::future::Future<Output = ()> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = ConnectionGuard::open();

    let live = events.filter_map(move |received| {
        let game_id = game_id.clone();
        async move {
            match received {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "SSE subscriber lagged: game={}, skipped={}",
                        game_id,
                        skipped
                    );
                    None
                }
            }
        }
    });

    stream::once(async move { current })
        .chain(live)
        .take_until(closed)
        .map(move |event| {
            let _connected = &guard;
            Ok(Event::default()
                .event(event.event_name())
                .data(event.to_sse_data()))
        })
}
