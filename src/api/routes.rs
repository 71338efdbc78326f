use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_SLIPPAGE_BPS;
use crate::engine::{lifecycle, markets, orders, quote, wallets};
use crate::engine::markets::CreateMarketInput;
use crate::error::EngineError;
use crate::types::{Market, MarketStats, Order, Position, QuoteResult, Wallet};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/markets", post(create_market).get(get_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/stats", get(get_market_stats))
        .route("/markets/:id/quote", post(quote_order))
        .route("/markets/:id/orders", post(place_order))
        .route("/markets/:id/close", post(close_market))
        .route("/markets/:id/cancel", post(cancel_market))
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders", get(get_user_orders))
        .route("/wallets/:user_id", post(provision_wallet).get(get_wallet))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies / query params
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct QuoteBody {
    pub outcome_id: String,
    pub position: Position,
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct PlaceOrderBody {
    pub user_id: String,
    pub outcome_id: String,
    pub position: Position,
    pub amount: f64,
    pub max_slippage_bps: Option<u32>,
}

#[derive(Deserialize)]
pub struct CancelOrderBody {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ResolveBody {
    pub outcome_id: String,
    pub position: Position,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UserOrdersQuery {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn create_market(
    State(state): State<ApiState>,
    Json(body): Json<CreateMarketInput>,
) -> Result<Json<Market>, EngineError> {
    Ok(Json(markets::create_market(&state.pool, &body).await?))
}

async fn get_markets(State(state): State<ApiState>) -> Result<Json<Vec<Market>>, EngineError> {
    Ok(Json(markets::list_markets(&state.pool).await?))
}

async fn get_market(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<Market>, EngineError> {
    Ok(Json(markets::find_market(&state.pool, &market_id).await?))
}

async fn get_market_stats(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<MarketStats>, EngineError> {
    let stats = markets::market_stats(&state.pool, &market_id, params.user_id.as_deref()).await?;
    Ok(Json(stats))
}

async fn quote_order(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Json(body): Json<QuoteBody>,
) -> Result<Json<QuoteResult>, EngineError> {
    let input = quote::QuoteInput {
        market_id,
        outcome_id: body.outcome_id,
        position: body.position,
        amount: body.amount,
    };
    Ok(Json(quote::quote(&state.pool, &input).await?))
}

async fn place_order(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Json(body): Json<PlaceOrderBody>,
) -> Result<Json<Order>, EngineError> {
    let input = orders::PlaceOrderInput {
        user_id: body.user_id,
        market_id,
        outcome_id: body.outcome_id,
        position: body.position,
        amount: body.amount,
        // The engine only enforces a cap the caller asked for; the HTTP
        // surface supplies a sane default when the body omits one.
        max_slippage_bps: body.max_slippage_bps.or(Some(DEFAULT_MAX_SLIPPAGE_BPS)),
    };
    Ok(Json(orders::place_order(&state.pool, &input).await?))
}

async fn cancel_order(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<Order>, EngineError> {
    let order = orders::cancel_order(&state.pool, &order_id, &body.user_id).await?;
    Ok(Json(order))
}

async fn get_user_orders(
    State(state): State<ApiState>,
    Query(params): Query<UserOrdersQuery>,
) -> Result<Json<Vec<Order>>, EngineError> {
    Ok(Json(
        orders::list_user_orders(&state.pool, &params.user_id).await?,
    ))
}

async fn close_market(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<Market>, EngineError> {
    Ok(Json(lifecycle::close_market(&state.pool, &market_id).await?))
}

async fn cancel_market(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<Market>, EngineError> {
    Ok(Json(
        lifecycle::cancel_market(&state.pool, &market_id).await?,
    ))
}

async fn resolve_market(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<Market>, EngineError> {
    let market =
        lifecycle::resolve_market(&state.pool, &market_id, &body.outcome_id, body.position).await?;
    Ok(Json(market))
}

async fn get_wallet(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Wallet>, EngineError> {
    Ok(Json(wallets::get_wallet(&state.pool, &user_id).await?))
}

async fn provision_wallet(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Wallet>, EngineError> {
    Ok(Json(wallets::provision_wallet(&state.pool, &user_id).await?))
}
