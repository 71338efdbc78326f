//! Market creation and read-side queries.

use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::config::{DEFAULT_FEE_BPS, MAX_FEE_BPS};
use crate::db::{self, liquidity, markets, now_ms, orders};
use crate::error::{EngineError, Result};
use crate::types::{
    AmmConfig, AmmCurve, Market, MarketStats, MarketStatus, MarketType, Outcome, OutcomeStatus,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOutcomeInput {
    pub slug: String,
    pub label: String,
    pub position: Option<i64>,
    pub status: Option<OutcomeStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAmmConfigInput {
    pub curve: Option<AmmCurve>,
    pub fee_bps: Option<u32>,
    pub lmsr_b: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMarketInput {
    pub question: String,
    pub description: Option<String>,
    /// Epoch millis; must be in the future.
    pub betting_close_at: i64,
    pub created_by: String,
    pub market_type: Option<MarketType>,
    pub outcomes: Option<Vec<CreateOutcomeInput>>,
    pub amm_config: Option<CreateAmmConfigInput>,
}

struct NormalizedOutcome {
    slug: String,
    label: String,
    position: i64,
    status: OutcomeStatus,
}

fn normalize_outcomes(
    market_type: MarketType,
    outcomes: Option<&[CreateOutcomeInput]>,
) -> Result<Vec<NormalizedOutcome>> {
    let inputs = match outcomes {
        None | Some([]) => {
            return Ok(vec![NormalizedOutcome {
                slug: "default".to_string(),
                label: "Default outcome".to_string(),
                position: 0,
                status: OutcomeStatus::Active,
            }])
        }
        Some(inputs) => inputs,
    };

    let mut normalized: Vec<NormalizedOutcome> = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| NormalizedOutcome {
            slug: input.slug.trim().to_string(),
            label: input.label.trim().to_string(),
            position: input.position.unwrap_or(index as i64),
            status: input.status.unwrap_or(OutcomeStatus::Active),
        })
        .collect();

    if normalized.iter().any(|o| o.slug.is_empty() || o.label.is_empty()) {
        return Err(EngineError::Validation(
            "each outcome must have a slug and label".to_string(),
        ));
    }

    let mut slugs: Vec<&str> = normalized.iter().map(|o| o.slug.as_str()).collect();
    slugs.sort_unstable();
    slugs.dedup();
    if slugs.len() != normalized.len() {
        return Err(EngineError::Validation(
            "outcome slugs must be unique within a market".to_string(),
        ));
    }

    let mut positions: Vec<i64> = normalized.iter().map(|o| o.position).collect();
    positions.sort_unstable();
    positions.dedup();
    if positions.len() != normalized.len() {
        return Err(EngineError::Validation(
            "outcome positions must be unique within a market".to_string(),
        ));
    }

    match market_type {
        MarketType::MultiChoice if normalized.len() < 2 => {
            return Err(EngineError::Validation(
                "MULTI_CHOICE market requires at least 2 outcomes".to_string(),
            ));
        }
        MarketType::Binary if normalized.len() > 2 => {
            return Err(EngineError::Validation(
                "BINARY market supports at most 2 outcomes".to_string(),
            ));
        }
        _ => {}
    }

    normalized.sort_by_key(|o| o.position);
    Ok(normalized)
}

fn normalize_amm_config(input: Option<&CreateAmmConfigInput>) -> Result<(AmmCurve, u32, Option<f64>)> {
    let curve = input.and_then(|c| c.curve).unwrap_or(AmmCurve::Cpmm);
    let fee_bps = input.and_then(|c| c.fee_bps).unwrap_or(DEFAULT_FEE_BPS);
    let lmsr_b = input.and_then(|c| c.lmsr_b);

    if fee_bps > MAX_FEE_BPS {
        return Err(EngineError::Validation(format!(
            "fee_bps must be between 0 and {MAX_FEE_BPS}"
        )));
    }

    if curve == AmmCurve::Lmsr && !lmsr_b.is_some_and(|b| b > 0.0) {
        return Err(EngineError::Validation(
            "LMSR requires a positive lmsr_b".to_string(),
        ));
    }

    Ok((curve, fee_bps, lmsr_b))
}

/// Creates a market with its outcomes and AMM config in one transaction.
pub async fn create_market(pool: &SqlitePool, input: &CreateMarketInput) -> Result<Market> {
    let question = input.question.trim().to_string();
    if question.is_empty() {
        return Err(EngineError::Validation("question is required".to_string()));
    }
    if input.betting_close_at <= now_ms() {
        return Err(EngineError::Validation(
            "betting_close_at must be in the future".to_string(),
        ));
    }

    let market_type = input.market_type.unwrap_or(MarketType::Binary);
    let outcomes = normalize_outcomes(market_type, input.outcomes.as_deref())?;
    let (curve, fee_bps, lmsr_b) = normalize_amm_config(input.amm_config.as_ref())?;

    let market_id = Uuid::new_v4().to_string();
    let now = now_ms();

    let market = Market {
        id: market_id.clone(),
        question,
        description: input.description.clone(),
        status: MarketStatus::Open,
        market_type,
        betting_close_at: input.betting_close_at,
        resolve_at: None,
        resolved_outcome_id: None,
        resolved_position: None,
        created_by: input.created_by.clone(),
        created_at: now,
        outcomes: outcomes
            .iter()
            .map(|o| Outcome {
                id: Uuid::new_v4().to_string(),
                market_id: market_id.clone(),
                slug: o.slug.clone(),
                label: o.label.clone(),
                position: o.position,
                status: o.status,
                created_at: now,
            })
            .collect(),
        amm_config: Some(AmmConfig {
            id: Uuid::new_v4().to_string(),
            market_id: market_id.clone(),
            curve,
            fee_bps,
            lmsr_b,
            created_at: now,
        }),
    };

    let created = db::with_tx(pool, |conn| {
        let market = market.clone();
        Box::pin(async move { create_market_tx(conn, &market).await })
    })
    .await?;

    info!(market_id = %created.id, market_type = %created.market_type, "market created");

    Ok(created)
}

async fn create_market_tx(conn: &mut SqliteConnection, market: &Market) -> Result<Market> {
    markets::insert(&mut *conn, market).await?;
    for outcome in &market.outcomes {
        markets::insert_outcome(&mut *conn, outcome).await?;
    }
    if let Some(config) = &market.amm_config {
        liquidity::insert_config(&mut *conn, config).await?;
    }

    markets::find_by_id(conn, &market.id)
        .await?
        .ok_or(EngineError::MarketNotFound)
}

pub async fn find_market(pool: &SqlitePool, market_id: &str) -> Result<Market> {
    let mut conn = pool.acquire().await?;
    markets::find_by_id(&mut conn, market_id)
        .await?
        .ok_or(EngineError::MarketNotFound)
}

pub async fn list_markets(pool: &SqlitePool) -> Result<Vec<Market>> {
    let mut conn = pool.acquire().await?;
    markets::list(&mut conn).await
}

/// Bet count / volume over non-cancelled orders, plus one user's share.
pub async fn market_stats(
    pool: &SqlitePool,
    market_id: &str,
    user_id: Option<&str>,
) -> Result<MarketStats> {
    let mut conn = pool.acquire().await?;
    orders::market_stats(&mut conn, market_id, user_id).await
}
