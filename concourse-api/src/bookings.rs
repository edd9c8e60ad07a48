use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use concourse_core::identity::AuthContext;
use concourse_core::models::BookingVisaReport;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/bookings/{booking_id}/visa-status",
        get(booking_visa_status),
    )
}

/// GET /bookings/{booking_id}/visa-status — ownership-checked aggregation
/// of the booking's visa state.
async fn booking_visa_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingVisaReport>, AppError> {
    let report = state.aggregator.get_status(booking_id, &ctx).await?;
    Ok(Json(report))
}
