//! REST API for the slotting service.
//!
//! A thin shell over the core: it owns JSON (de)serialization and hands request-owned data
//! to the allocator, the route planner and the location codec. Uses Axum as the web
//! framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};

use crate::codec::{CellRef, ColumnLayout, locate, locate_inverse};
use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::highlight::{
    HighlightCell, HighlightFailure, HighlightPlan, HighlightRequestEntry, highlight_plan,
};
use crate::model::{Category, Destination, DestinationTable, Item, Order, Pallet, StockRecord};
use crate::routing::{
    Exclusion, ExclusionReason, PalletBucket, PickInstruction, PickPlan, PlanEvent, PlanStrategy,
    PlannerConfig, Shortfall, ShortfallReason, plan_picks_with_config, plan_picks_with_progress,
};
use crate::slotting::{
    AllocationOutcome, DestinationAdjustment, LocatedItem, NotAdjustedReason, PalletDraw,
    PlacementSource, assign_locations,
};
use crate::types::LocationKey;

/// Per-server settings handed to every handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiState {
    pub layout: ColumnLayout,
    pub planner: PlannerConfig,
}

impl ApiState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            layout: config.layout.column_layout(),
            planner: config.planner.planner_config(),
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>slotting-engine API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            {
                "id": 1,
                "sku": "OLN-ERGOACE-CRM",
                "pick_frequency": 92.0,
                "quantity": 4,
                "destination_id": 7
            },
            { "id": 2, "sku": "sku2", "pick_frequency": 40.0, "quantity": 10, "destination_id": 9 }
        ],
        "pallets": [
            { "item_id": 2, "location": "52-a-15", "remaining_space": 20 }
        ],
        "destinations": [
            { "id": 7, "preferred_zone": "North" }
        ]
    })
)]
pub struct AllocateRequest {
    pub items: Vec<ItemEntry>,
    #[serde(default)]
    pub pallets: Vec<Pallet>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

/// Inbound item as sent over HTTP. The demand score is read per record so one unreadable
/// value rejects only its own item.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ItemEntry {
    pub id: u64,
    pub sku: String,
    /// Number, or a string holding one.
    #[schema(value_type = f64, example = 92.0)]
    pub pick_frequency: serde_json::Value,
    pub quantity: u32,
    pub destination_id: u64,
}

impl ItemEntry {
    fn into_item(self) -> Result<Item, RejectedItemEntry> {
        let frequency = match &self.pick_frequency {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(raw) => raw.trim().parse::<f64>().ok(),
            _ => None,
        };
        match frequency {
            Some(value) => Ok(Item::new(
                self.id,
                self.sku,
                value,
                self.quantity,
                self.destination_id,
            )),
            None => {
                let reason = ValidationError::NonNumericCategoryInput {
                    item_id: self.id,
                    raw: self.pick_frequency.to_string(),
                };
                tracing::warn!(item = self.id, %reason, "item rejected");
                Err(RejectedItemEntry::new(self.id, self.sku, &reason))
            }
        }
    }
}

/// Item that was not allocated.
#[derive(Serialize, ToSchema)]
pub struct RejectedItemEntry {
    pub id: u64,
    pub sku: String,
    pub reason_code: String,
    pub reason: String,
}

impl RejectedItemEntry {
    fn new(id: u64, sku: String, reason: &ValidationError) -> Self {
        Self {
            id,
            sku,
            reason_code: reason.code().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AllocateResponse {
    pub items: Vec<LocatedItem>,
    pub rejected: Vec<RejectedItemEntry>,
    pub pallets: Vec<Pallet>,
    pub pallet_draws: Vec<PalletDraw>,
    pub clustered: usize,
    pub is_complete: bool,
}

impl AllocateResponse {
    /// Builds the response; `unread` holds items rejected before allocation.
    pub fn from_outcome(outcome: AllocationOutcome, unread: Vec<RejectedItemEntry>) -> Self {
        let is_complete = outcome.is_complete() && unread.is_empty();
        let clustered = outcome.clustered_count();
        let AllocationOutcome {
            items,
            rejected,
            pallets,
            pallet_draws,
        } = outcome;

        Self {
            items,
            rejected: unread
                .into_iter()
                .chain(rejected.into_iter().map(|entry| {
                    RejectedItemEntry::new(entry.item.id, entry.item.sku, &entry.reason)
                }))
                .collect(),
            pallets,
            pallet_draws,
            clustered,
            is_complete,
        }
    }
}

// ---------------------------------------------------------------------------
// Route planning
// ---------------------------------------------------------------------------

/// Stock line as sent by the inventory collaborator. The location is parsed per record so
/// one bad key does not reject the whole request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct StockEntry {
    #[schema(example = "10-a-2")]
    pub location: String,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "orders": [ { "sku": "sku1", "quantity_requested": 30 } ],
        "stock": [
            { "location": "1-a-1", "sku": "sku1", "quantity": 12 },
            { "location": "10-a-2", "sku": "sku1", "quantity": 12 },
            { "location": "50-a-3", "sku": "sku1", "quantity": 24 }
        ]
    })
)]
pub struct PlanRequest {
    pub orders: Vec<Order>,
    pub stock: Vec<StockEntry>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub pallet_size: Option<u32>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub strict_pallet_buckets: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub strategy: Option<PlanStrategy>,
}

/// Stock line whose location could not be parsed.
#[derive(Serialize, ToSchema)]
pub struct SkippedStockEntry {
    pub location: String,
    pub sku: String,
    pub quantity: u32,
    pub reason_code: String,
    pub reason: String,
}

impl SkippedStockEntry {
    fn to_event(&self) -> PlanEvent {
        PlanEvent::StockSkipped {
            location: self.location.clone(),
            sku: self.sku.clone(),
            quantity: self.quantity,
            reason_code: self.reason_code.clone(),
            reason: self.reason.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RejectedOrderEntry {
    pub sku: String,
    pub quantity_requested: u32,
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub instructions: Vec<PickInstruction>,
    pub shortfalls: Vec<Shortfall>,
    pub exclusions: Vec<Exclusion>,
    pub rejected_orders: Vec<RejectedOrderEntry>,
    pub skipped_stock: Vec<SkippedStockEntry>,
    pub stock: Vec<StockRecord>,
    pub total_missing: u64,
    pub is_complete: bool,
}

impl PlanResponse {
    fn from_plan(plan: PickPlan, skipped_stock: Vec<SkippedStockEntry>) -> Self {
        let total_missing = plan.total_missing();
        let is_complete = plan.is_complete() && skipped_stock.is_empty();
        let PickPlan {
            instructions,
            shortfalls,
            exclusions,
            rejected_orders,
            stock,
        } = plan;

        Self {
            instructions,
            shortfalls,
            exclusions,
            rejected_orders: rejected_orders
                .into_iter()
                .map(|entry| RejectedOrderEntry {
                    sku: entry.order.sku,
                    quantity_requested: entry.order.quantity_requested,
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            skipped_stock,
            stock,
            total_missing,
            is_complete,
        }
    }
}

#[derive(Debug)]
struct ValidatedPlanRequest {
    orders: Vec<Order>,
    stock: Vec<StockRecord>,
    config: PlannerConfig,
}

impl PlanRequest {
    fn into_validated(
        self,
        defaults: PlannerConfig,
    ) -> Result<(ValidatedPlanRequest, Vec<SkippedStockEntry>), String> {
        let mut config = defaults;
        if let Some(size) = self.pallet_size {
            if size == 0 {
                return Err("pallet_size must be greater than 0".to_string());
            }
            config.pallet_size = size;
        }
        if let Some(strict) = self.strict_pallet_buckets {
            config.strict_pallet_buckets = strict;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }

        let mut stock = Vec::with_capacity(self.stock.len());
        let mut skipped = Vec::new();
        for entry in self.stock {
            match entry.location.parse::<LocationKey>() {
                Ok(location) => stock.push(StockRecord::new(location, entry.sku, entry.quantity)),
                Err(err) => {
                    tracing::warn!(
                        location = %entry.location,
                        error = %err,
                        "skipping stock record"
                    );
                    skipped.push(SkippedStockEntry {
                        location: entry.location,
                        sku: entry.sku,
                        quantity: entry.quantity,
                        reason_code: err.code().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok((
            ValidatedPlanRequest {
                orders: self.orders,
                stock,
                config,
            },
            skipped,
        ))
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "locations": ["53-d-45", "52-a1-15"], "cells": ["H16"] }))]
pub struct LocateRequest {
    #[serde(default)]
    pub locations: Vec<String>,
    /// Cell references to map back to location keys.
    #[serde(default)]
    pub cells: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LocateEntry {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LocateResponse {
    pub locations: Vec<LocateEntry>,
    pub cells: Vec<LocateEntry>,
}

fn locate_entry(input: &str, layout: ColumnLayout) -> LocateEntry {
    let outcome = input
        .parse::<LocationKey>()
        .map(|key| (key.to_string(), locate(&key, layout).to_string()));
    match outcome {
        Ok((canonical, cell)) => LocateEntry {
            input: input.to_string(),
            cell: Some(cell),
            location: Some(canonical),
            error_code: None,
            error: None,
        },
        Err(err) => LocateEntry {
            input: input.to_string(),
            cell: None,
            location: None,
            error_code: Some(err.code().to_string()),
            error: Some(err.to_string()),
        },
    }
}

fn inverse_entry(input: &str, layout: ColumnLayout) -> LocateEntry {
    let outcome = input
        .parse::<CellRef>()
        .and_then(|cell| locate_inverse(&cell, layout).map(|key| (cell, key)));
    match outcome {
        Ok((cell, key)) => LocateEntry {
            input: input.to_string(),
            cell: Some(cell.to_string()),
            location: Some(key.to_string()),
            error_code: None,
            error: None,
        },
        Err(err) => LocateEntry {
            input: input.to_string(),
            cell: None,
            location: None,
            error_code: Some(err.code().to_string()),
            error: Some(err.to_string()),
        },
    }
}

#[derive(Deserialize, ToSchema)]
pub struct HighlightRequest {
    pub entries: Vec<HighlightRequestEntry>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn worker_error(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "planning worker failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal error",
        err.to_string(),
    )
}

fn parse_plan_request(
    payload: Result<Json<PlanRequest>, JsonRejection>,
    defaults: PlannerConfig,
) -> Result<(ValidatedPlanRequest, Vec<SkippedStockEntry>), Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated(defaults).map_err(validation_error)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_allocate,
        handle_plan,
        handle_plan_stream,
        handle_locate,
        handle_highlight
    ),
    components(
        schemas(
            AllocateRequest,
            AllocateResponse,
            RejectedItemEntry,
            ItemEntry,
            Item,
            Category,
            Pallet,
            Destination,
            LocatedItem,
            PlacementSource,
            DestinationAdjustment,
            NotAdjustedReason,
            PalletDraw,
            PlanRequest,
            PlanResponse,
            StockEntry,
            SkippedStockEntry,
            RejectedOrderEntry,
            Order,
            StockRecord,
            PickInstruction,
            PalletBucket,
            PlanStrategy,
            Shortfall,
            ShortfallReason,
            Exclusion,
            ExclusionReason,
            LocateRequest,
            LocateResponse,
            LocateEntry,
            HighlightRequest,
            HighlightRequestEntry,
            HighlightPlan,
            HighlightCell,
            HighlightFailure,
            ErrorResponse
        )
    ),
    tags(
        (name = "slotting", description = "Storage location assignment"),
        (name = "picking", description = "Pick-route planning"),
        (name = "layout", description = "Floor-plan coordinates")
    )
)]
struct ApiDoc;

/// Assembles the router with all endpoints and middleware.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/allocate", post(handle_allocate))
        .route("/plan", post(handle_plan))
        .route("/plan_stream", post(handle_plan_stream))
        .route("/locate", post(handle_locate))
        .route("/highlight", post(handle_highlight))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: AppConfig) -> std::io::Result<()> {
    let app = build_router(ApiState::from_config(&config));

    let api_config = &config.api;
    let addr = api_config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "server running on http://{}:{}",
        api_config.display_host(),
        api_config.port()
    );
    if api_config.binds_to_all_interfaces() {
        tracing::info!("local access: http://localhost:{}", api_config.port());
    }
    tracing::info!(
        layout = ?config.layout.column_layout(),
        planner = ?config.planner.planner_config(),
        "endpoints: POST /allocate /plan /plan_stream /locate /highlight, GET /docs"
    );

    axum::serve(listener, app).await
}

/// Handler for POST /allocate.
///
/// Assigns a storage location to every valid item. Items whose pick frequency is not a
/// number or is out of range are reported under `rejected`; the rest of the batch is still
/// allocated.
#[utoipa::path(
    post,
    path = "/allocate",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Items located", body = AllocateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON data", body = ErrorResponse)
    ),
    tag = "slotting"
)]
async fn handle_allocate(payload: Result<Json<AllocateRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    tracing::info!(
        items = request.items.len(),
        pallets = request.pallets.len(),
        destinations = request.destinations.len(),
        "allocation request"
    );

    let mut items = Vec::with_capacity(request.items.len());
    let mut unread = Vec::new();
    for entry in request.items {
        match entry.into_item() {
            Ok(item) => items.push(item),
            Err(rejected) => unread.push(rejected),
        }
    }

    let outcome = tokio::task::spawn_blocking(move || {
        let destinations: DestinationTable = request.destinations.into_iter().collect();
        assign_locations(items, &request.pallets, &destinations)
    })
    .await;

    match outcome {
        Ok(outcome) => {
            let response = AllocateResponse::from_outcome(outcome, unread);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => worker_error(err),
    }
}

/// Handler for POST /plan.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Pick list computed", body = PlanResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or planner override",
            body = ErrorResponse
        )
    ),
    tag = "picking"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let (request, skipped) = match parse_plan_request(payload, state.planner) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    tracing::info!(
        orders = request.orders.len(),
        stock = request.stock.len(),
        skipped = skipped.len(),
        "plan request"
    );

    let plan = tokio::task::spawn_blocking(move || {
        plan_picks_with_config(&request.orders, &request.stock, request.config)
    })
    .await;

    match plan {
        Ok(plan) => {
            tracing::info!(
                picks = plan.instructions.len(),
                missing = plan.total_missing(),
                "plan computed"
            );
            (StatusCode::OK, Json(PlanResponse::from_plan(plan, skipped))).into_response()
        }
        Err(err) => worker_error(err),
    }
}

/// Handler for POST /plan_stream (SSE).
///
/// Streams every planning decision as a Server-Sent Event, ending with `Finished`. Stock
/// lines that could not be read are announced first as `StockSkipped`.
#[utoipa::path(
    post,
    path = "/plan_stream",
    request_body = PlanRequest,
    responses(
        (
            status = 200,
            description = "Streams planning events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or planner override",
            body = ErrorResponse
        )
    ),
    tag = "picking"
)]
async fn handle_plan_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let (request, skipped) = match parse_plan_request(payload, state.planner) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let send = |evt: &PlanEvent| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        };
        for entry in &skipped {
            send(&entry.to_event());
        }
        let _ = plan_picks_with_progress(&request.orders, &request.stock, request.config, send);
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /locate.
///
/// Maps location keys to sheet cells and cells back to keys. Errors are reported per entry.
#[utoipa::path(
    post,
    path = "/locate",
    request_body = LocateRequest,
    responses(
        (status = 200, description = "Coordinates resolved", body = LocateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON data", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_locate(
    State(state): State<ApiState>,
    payload: Result<Json<LocateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let response = LocateResponse {
        locations: request
            .locations
            .iter()
            .map(|raw| locate_entry(raw, state.layout))
            .collect(),
        cells: request
            .cells
            .iter()
            .map(|raw| inverse_entry(raw, state.layout))
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /highlight.
#[utoipa::path(
    post,
    path = "/highlight",
    request_body = HighlightRequest,
    responses(
        (status = 200, description = "Cell paint plan", body = HighlightPlan),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON data", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_highlight(
    State(state): State<ApiState>,
    payload: Result<Json<HighlightRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let plan = highlight_plan(&request.entries, state.layout);
    if !plan.failures.is_empty() {
        tracing::warn!(failures = plan.failures.len(), "highlight entries skipped");
    }
    (StatusCode::OK, Json(plan)).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn post(uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let app = build_router(ApiState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, bytes) = post(uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn item_json(id: u64, sku: &str, pick_frequency: Value) -> Value {
        json!({
            "id": id,
            "sku": sku,
            "pick_frequency": pick_frequency,
            "quantity": 2,
            "destination_id": 1
        })
    }

    /// Decodes the `data:` lines of an SSE body.
    fn sse_events(body: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(body)
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect()
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/allocate", "/plan", "/plan_stream", "/locate", "/highlight"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in [
            "AllocateRequest",
            "AllocateResponse",
            "PlanRequest",
            "PlanResponse",
            "HighlightPlan",
            "ErrorResponse",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn plan_request_parses_overrides_when_absent() {
        let json = r#"{
            "orders": [{"sku": "sku1", "quantity_requested": 5}],
            "stock": [{"location": "1-a-1", "sku": "sku1", "quantity": 12}]
        }"#;
        let request: PlanRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.pallet_size, None);
        assert_eq!(request.strict_pallet_buckets, None);
        assert_eq!(request.strategy, None);
    }

    #[test]
    fn plan_request_rejects_zero_pallet_size() {
        let request = PlanRequest {
            orders: vec![],
            stock: vec![],
            pallet_size: Some(0),
            strict_pallet_buckets: None,
            strategy: None,
        };
        assert!(request.into_validated(PlannerConfig::default()).is_err());
    }

    #[test]
    fn plan_request_skips_unparseable_stock() {
        let request = PlanRequest {
            orders: vec![Order::new("sku1", 5)],
            stock: vec![
                StockEntry {
                    location: "1-a-1".into(),
                    sku: "sku1".into(),
                    quantity: 12,
                },
                StockEntry {
                    location: "1-z-1".into(),
                    sku: "sku1".into(),
                    quantity: 12,
                },
            ],
            pallet_size: None,
            strict_pallet_buckets: Some(true),
            strategy: Some(PlanStrategy::Sequenced),
        };
        let (validated, skipped) = request
            .into_validated(PlannerConfig::default())
            .expect("request is valid");
        assert_eq!(validated.stock.len(), 1);
        assert!(validated.config.strict_pallet_buckets);
        assert_eq!(validated.config.strategy, PlanStrategy::Sequenced);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason_code, "unknown_shelf");
    }

    #[tokio::test]
    async fn plan_endpoint_splits_order_over_nearest_stock() {
        let (status, body) = post_json(
            "/plan",
            json!({
                "orders": [{ "sku": "sku1", "quantity_requested": 30 }],
                "stock": [
                    { "location": "1-a-1", "sku": "sku1", "quantity": 12 },
                    { "location": "10-a-2", "sku": "sku1", "quantity": 12 },
                    { "location": "50-a-3", "sku": "sku1", "quantity": 24 }
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let picked: Vec<u64> = body["instructions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pick| pick["quantity_picked"].as_u64().unwrap())
            .collect();
        assert_eq!(picked, vec![12, 12, 6]);
        assert_eq!(body["is_complete"], json!(true));
        assert_eq!(body["stock"][2]["quantity"], json!(18));
    }

    #[tokio::test]
    async fn plan_endpoint_reports_shortfall() {
        let (status, body) = post_json(
            "/plan",
            json!({
                "orders": [{ "sku": "sku2", "quantity_requested": 50 }],
                "stock": [{ "location": "2-a-4", "sku": "sku2", "quantity": 10 }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shortfalls"][0]["missing"], json!(40));
        assert_eq!(body["total_missing"], json!(40));
        assert_eq!(body["shortfalls"][0]["reason"], json!("stock_exhausted"));
        assert_eq!(body["is_complete"], json!(false));
    }

    #[tokio::test]
    async fn plan_endpoint_sums_missing_beyond_u32() {
        let (status, body) = post_json(
            "/plan",
            json!({
                "orders": [
                    { "sku": "a", "quantity_requested": u32::MAX },
                    { "sku": "b", "quantity_requested": u32::MAX }
                ],
                "stock": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_missing"], json!(2 * u64::from(u32::MAX)));
    }

    #[tokio::test]
    async fn plan_endpoint_honours_strategy_override() {
        let (status, body) = post_json(
            "/plan",
            json!({
                "orders": [{ "sku": "s", "quantity_requested": 5 }],
                "stock": [
                    { "location": "1-b-1", "sku": "s", "quantity": 10 },
                    { "location": "5-a-1", "sku": "s", "quantity": 24 }
                ],
                "strategy": "shelf_priority"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        // Nearest first would have drawn from 1-b-1.
        assert_eq!(body["instructions"][0]["location"], json!("5-a-1"));
        assert_eq!(body["instructions"][0]["pallet"], json!("full"));
    }

    #[tokio::test]
    async fn plan_stream_announces_skipped_stock_before_planning() {
        let (status, body) = post(
            "/plan_stream",
            json!({
                "orders": [{ "sku": "sku1", "quantity_requested": 5 }],
                "stock": [
                    { "location": "1-z-1", "sku": "sku1", "quantity": 7 },
                    { "location": "1-a-1", "sku": "sku1", "quantity": 12 }
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let events = sse_events(&body);
        let types: Vec<&str> = events
            .iter()
            .map(|evt| evt["type"].as_str().unwrap())
            .collect();
        assert_eq!(types, ["StockSkipped", "OrderStarted", "Picked", "Finished"]);
        assert_eq!(events[0]["location"], json!("1-z-1"));
        assert_eq!(events[0]["quantity"], json!(7));
        assert_eq!(events[0]["reason_code"], json!("unknown_shelf"));
    }

    #[tokio::test]
    async fn malformed_json_yields_422() {
        let (status, body) = post_json("/plan", json!({ "orders": "nope" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], json!("Invalid JSON data"));
    }

    #[tokio::test]
    async fn allocate_endpoint_locates_and_rejects_per_item() {
        let (status, body) = post_json(
            "/allocate",
            json!({
                "items": [
                    item_json(1, "a", json!(95.0)),
                    item_json(2, "b", json!(140.0))
                ],
                "destinations": [{ "id": 1, "preferred_zone": "North" }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["item"]["location"], json!("North-Row1-Column1"));
        assert_eq!(body["rejected"][0]["reason_code"], json!("invalid_category_input"));
        assert_eq!(body["is_complete"], json!(false));
    }

    #[tokio::test]
    async fn allocate_endpoint_rejects_non_numeric_frequency_per_item() {
        let (status, body) = post_json(
            "/allocate",
            json!({
                "items": [
                    item_json(1, "a", json!("high")),
                    item_json(2, "b", json!("85")),
                    item_json(3, "c", Value::Null)
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["item"]["id"], json!(2));
        assert_eq!(items[0]["item"]["category"], json!("A"));
        let rejected = body["rejected"].as_array().unwrap();
        assert_eq!(rejected.len(), 2);
        assert!(
            rejected
                .iter()
                .all(|entry| entry["reason_code"] == json!("invalid_category_input"))
        );
        assert_eq!(rejected[0]["id"], json!(1));
        assert_eq!(rejected[1]["id"], json!(3));
    }

    #[tokio::test]
    async fn locate_endpoint_reports_errors_inline() {
        let (status, body) = post_json(
            "/locate",
            json!({ "locations": ["53-d-45", "53-x-45"], "cells": ["BJ331", "H27"] }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locations"][0]["cell"], json!("BJ331"));
        assert_eq!(body["locations"][1]["error_code"], json!("unknown_shelf"));
        assert_eq!(body["cells"][0]["location"], json!("53-d-45"));
        assert_eq!(body["cells"][1]["error_code"], json!("off_grid_cell"));
    }

    #[tokio::test]
    async fn highlight_endpoint_returns_paint_plan() {
        let (status, body) = post_json(
            "/highlight",
            json!({ "entries": [{ "location": "1-a-1", "sku": "sku1", "quantity": 12 }] }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cells"][0]["cell"], json!("H16"));
        assert_eq!(body["cells"][0]["label"], json!("sku1: 12"));
    }
}
