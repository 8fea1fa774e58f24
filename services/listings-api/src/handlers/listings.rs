use crate::error::AppError;
use crate::notify;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use types::listing::{Listing, NewListing};

/// GET /listings
pub async fn list_listings(State(state): State<AppState>) -> Json<Vec<Listing>> {
    Json(state.store.list_all())
}

/// POST /listings
///
/// Store first, then fan out to subscribers, then hand the notification to
/// a background task. Only validation can fail this request.
pub async fn create_listing(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Listing>, AppError> {
    let Json(body) = payload?;
    let candidate = NewListing::from_json(&body)?;

    let listing = state.store.create(candidate);
    tracing::info!(listing_id = %listing.id, title = %listing.title, "Listing created");

    match serde_json::to_string(&listing) {
        Ok(frame) => {
            state.registry.broadcast(&frame);
        }
        Err(e) => tracing::error!(listing_id = %listing.id, error = %e, "Failed to serialize listing for broadcast"),
    }

    notify::dispatch(
        state.notifier.clone(),
        notify::listing_message(&listing),
        state.notify_timeout,
    );

    Ok(Json(listing))
}
