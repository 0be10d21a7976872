// src/handlers/realtime.rs

use std::{convert::Infallible, sync::Arc};

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::{
    error::AppError,
    realtime::{
        ChangeEvent, Filter, Table,
        feed::ChangeFeed,
        policy::{authorize, gated_quiz, view},
    },
    services::{QuizService, Services},
    utils::jwt::Actor,
};

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    /// `column=eq.value`
    pub filter: Option<String>,
}

/// Streams row changes of one table as Server-Sent Events.
///
/// * One `change` event per insert, update or delete, JSON encoded.
/// * Students are narrowed to what they may read (own attempts, no answer
///   key, questions of active quizzes only).
/// * The subscription ends when the client disconnects.
pub async fn subscribe(
    State(feed): State<ChangeFeed>,
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(table): Path<String>,
    Query(params): Query<SubscribeParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let table: Table = table.parse()?;
    let filter = params.filter.as_deref().map(str::parse::<Filter>).transpose()?;
    let filter = authorize(&actor, table, filter)?;

    tracing::debug!(user = %actor.user_id, %table, "Realtime subscription opened");

    let events = feed
        .subscribe(table, filter)
        .into_stream()
        .filter_map(move |event| change_event(services.quizzes.clone(), actor, event));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn change_event(
    quizzes: QuizService,
    actor: Actor,
    event: Arc<ChangeEvent>,
) -> Option<Result<Event, Infallible>> {
    let visible = view(&actor, &event)?;
    if let Some(quiz_id) = gated_quiz(&actor, &visible) {
        // Inactive or deleted quiz: same as a failed read.
        quizzes.get(&actor, quiz_id).await.ok()?;
    }
    Event::default()
        .event("change")
        .json_data(&visible)
        .map_err(|e| tracing::error!("Failed to encode change event: {}", e))
        .ok()
        .map(Ok)
}
