use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use concourse_core::identity::AuthContext;
use concourse_core::models::{Booking, BookingRequest, VisaRequirement};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/flights/search", get(search_flights))
        .route(
            "/api/v1/flights/visa-requirements/{country}",
            get(visa_requirements),
        )
        .route("/flights/book", post(book_flight))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    origin: String,
    destination: String,
    date: String,
}

/// GET /api/v1/flights/search — single-hop forwarding to flight search.
async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let results = state
        .flight_search
        .search(&params.origin, &params.destination, &params.date)
        .await?;
    Ok(Json(results))
}

/// GET /api/v1/flights/visa-requirements/{country}
async fn visa_requirements(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<VisaRequirement>, AppError> {
    let requirement = state.visa.check_requirement(&country).await?;
    Ok(Json(requirement))
}

/// POST /flights/book — runs the booking saga for the authenticated user.
async fn book_flight(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request_id = headers
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok());

    let booking = state
        .coordinator
        .book_flight(&ctx, &request, request_id)
        .await?;

    tracing::info!(user_id = %ctx.user_id, booking_id = %booking.id, "flight booked");
    Ok((StatusCode::CREATED, Json(booking)))
}
