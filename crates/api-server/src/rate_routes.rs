//! Rate API Routes
//!
//! Latest quotes with their all-time-high marks, and daily history for charts.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use fx_core::{HistoryPoint, PairId};
use rate_watcher::RatesSnapshot;

use crate::requests::{HistoryQuery, ValidQuery};
use crate::{AppError, AppState};

pub fn rate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rates", get(get_rates))
        .route("/api/rates/:pair/history", get(get_history))
}

async fn get_rates(State(state): State<AppState>) -> Json<RatesSnapshot> {
    Json(state.board.snapshot().await)
}

async fn get_history(
    State(state): State<AppState>,
    pair: Result<Path<String>, PathRejection>,
    ValidQuery(query): ValidQuery<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    let Path(pair) = pair?;
    let pair: PairId = pair.parse()?;
    Ok(Json(state.rates.history(&pair, query.days())?))
}
