//! API Handlers
//!
//! HTTP request handlers for each endpoint. Dashboard reads go through the
//! cache-aside wrapper; every successful write clears the cached aggregates
//! and stamps the freshness marker before responding.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::api::AppState;
use crate::auth::{verify_password, CurrentUser};
use crate::cache::{DataStatus, StatsSnapshot};
use crate::error::{ApiError, Result};
use crate::models::{
    policies, AveragePrice, Collection, CreateCollectionRequest, DashboardFilters,
    DriverHistoryQuery, HealthResponse, ListQuery, LoginRequest, PricePoint, TokenResponse,
    TopConsumer, TotalRevenue, UpdateCollectionRequest, UserInfo, VehicleVolume,
};

// == Public ==
/// Handler for GET /health
///
/// Reports API status and whether the cache store answers.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.cache();
    Json(HealthResponse::new(cache.ping().await, cache.backend()))
}

/// Handler for POST /auth/token
///
/// Exchanges email and password for a bearer token.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or(ApiError::Unauthenticated)?;

    let token = state.tokens.issue(&user)?;
    info!(user_id = user.id, "access token issued");
    Ok(Json(TokenResponse::bearer(token)))
}

/// Handler for GET /data-status
///
/// How long ago the data behind the dashboards last changed.
pub async fn data_status_handler(State(state): State<AppState>) -> Json<DataStatus> {
    Json(state.tracker.status().await)
}

// == Session ==
/// Handler for GET /auth/me
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserInfo> {
    Json(UserInfo::from(&user))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Json<StatsSnapshot> {
    Json(state.cache().stats().snapshot())
}

// == Collections ==
/// Handler for GET /collections
pub async fn list_collections_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Collection>>> {
    Ok(Json(state.repo.list(&query).await?))
}

/// Handler for POST /collections
pub async fn create_collection_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let record = state.repo.create(req).await?;
    state.tracker.record_mutation().await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for GET /collections/:id
pub async fn get_collection_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Collection>> {
    state
        .repo
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| collection_not_found(id))
}

/// Handler for PUT /collections/:id
pub async fn update_collection_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCollectionRequest>,
) -> Result<Json<Collection>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let record = state
        .repo
        .update(id, req)
        .await?
        .ok_or_else(|| collection_not_found(id))?;
    state.tracker.record_mutation().await;
    Ok(Json(record))
}

/// Handler for DELETE /collections/:id
pub async fn delete_collection_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    if !state.repo.delete(id).await? {
        return Err(collection_not_found(id));
    }
    state.tracker.record_mutation().await;
    Ok(StatusCode::NO_CONTENT)
}

fn collection_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Collection {id} not found"))
}

// == Dashboard ==
/// Handler for GET /dashboard/average-price
pub async fn average_price_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(filters): Query<DashboardFilters>,
) -> Result<Json<Vec<AveragePrice>>> {
    let rows = state
        .aside
        .fetch(&policies::AVERAGE_PRICE, &filters, || {
            state.repo.average_price_by_fuel(&filters)
        })
        .await?;
    Ok(Json(rows))
}

/// Handler for GET /dashboard/volume-by-vehicle
pub async fn volume_by_vehicle_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(filters): Query<DashboardFilters>,
) -> Result<Json<Vec<VehicleVolume>>> {
    let rows = state
        .aside
        .fetch(&policies::VOLUME_BY_VEHICLE, &filters, || {
            state.repo.volume_by_vehicle(&filters)
        })
        .await?;
    Ok(Json(rows))
}

/// Handler for GET /dashboard/price-history
pub async fn price_history_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(filters): Query<DashboardFilters>,
) -> Result<Json<Vec<PricePoint>>> {
    let repo = state.repo.clone();
    let history = state
        .aside
        .wrap(policies::PRICE_HISTORY, move |filters: DashboardFilters| {
            let repo = repo.clone();
            async move { repo.price_history(&filters).await }
        });
    Ok(Json(history.call(filters).await?))
}

/// Handler for GET /dashboard/top-consumer
pub async fn top_consumer_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(filters): Query<DashboardFilters>,
) -> Result<Json<TopConsumer>> {
    let top = state
        .aside
        .fetch(&policies::TOP_CONSUMER, &filters, || async {
            state
                .repo
                .top_consumer(&filters)
                .await?
                .ok_or_else(|| ApiError::NotFound("No consumption data available".to_string()))
        })
        .await?;
    Ok(Json(top))
}

/// Handler for GET /dashboard/total-revenue
pub async fn total_revenue_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(filters): Query<DashboardFilters>,
) -> Result<Json<TotalRevenue>> {
    let revenue = state
        .aside
        .fetch(&policies::TOTAL_REVENUE, &filters, || {
            state.repo.total_revenue(&filters)
        })
        .await?;
    Ok(Json(revenue))
}

// == Drivers ==
/// Handler for GET /drivers/history
///
/// Not cached: lookups are per driver and rarely repeated.
pub async fn driver_history_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<DriverHistoryQuery>,
) -> Result<Json<Vec<Collection>>> {
    if let Some(error_msg) = query.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let rows = state.repo.driver_history(&query).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound(
            "No history found for the given criteria".to_string(),
        ));
    }
    Ok(Json(rows))
}

/// Handler for GET /drivers/ranking
pub async fn driver_ranking_handler(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>> {
    let rows = state
        .aside
        .fetch(&policies::DRIVER_RANKING, &(), || async {
            let rows = state.repo.ranking_by_volume().await?;
            if rows.is_empty() {
                Err(ApiError::NotFound("No collections recorded".to_string()))
            } else {
                Ok(rows)
            }
        })
        .await?;
    Ok(Json(rows))
}
