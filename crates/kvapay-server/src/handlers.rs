//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kvapay_payments::{
    BillingDetails, CallbackOutcome, CheckoutResult, GATEWAY_ID, GatewayError, Order, OrderId,
    OrderStatus, SIGNATURE_HEADER,
};

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: String,
    pub enabled: bool,
    pub test_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: CallbackOutcome,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub id: String,
    pub total: Decimal,
    pub currency: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThankYouQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ThankYouResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub message: String,
}

fn error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

/// Map a rejected callback to an HTTP error so KvaPay sees the failure
fn callback_error(err: &GatewayError) -> ApiError {
    let (status, code) = match err {
        GatewayError::InvalidSignature => (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
        GatewayError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD"),
        GatewayError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
        GatewayError::PaymentMethodMismatch { .. } => {
            (StatusCode::CONFLICT, "PAYMENT_METHOD_MISMATCH")
        }
        GatewayError::AmountMismatch { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "AMOUNT_MISMATCH")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "CALLBACK_ERROR"),
    };
    error(status, err.to_string(), code)
}

fn storage_error(err: &GatewayError) -> ApiError {
    tracing::error!("Order store error: {}", err);
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        err.user_message(),
        "STORAGE_ERROR",
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway: state.config.title.clone(),
        enabled: state.config.enabled,
        test_mode: state.config.test_mode,
    })
}

/// Start a KvaPay payment for an order
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Json<CheckoutResult> {
    let order_id = OrderId::new(payload.order_id);
    Json(state.checkout.initiate(&order_id).await)
}

/// KvaPay callback endpoint
///
/// Takes the body as raw bytes: the signature is computed over them.
pub async fn kvapay_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .callbacks
        .handle(&body, signature)
        .map_err(|e| callback_error(&e))?;

    Ok(Json(CallbackAck {
        status: "ok",
        outcome,
    }))
}

/// Thank-you page data for the buyer returning from KvaPay
pub async fn thank_you(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ThankYouQuery>,
) -> Result<Json<ThankYouResponse>, ApiError> {
    let order = state
        .store
        .get(&OrderId::new(id))
        .map_err(|e| storage_error(&e))?
        .filter(|order| order.key == query.key)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Order not found.", "ORDER_NOT_FOUND"))?;

    Ok(Json(ThankYouResponse {
        order_id: order.id,
        status: order.status,
        message: state.config.description.clone(),
    }))
}

/// Create an order in the store
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order_id = OrderId::new(payload.id);

    if state
        .store
        .get(&order_id)
        .map_err(|e| storage_error(&e))?
        .is_some()
    {
        return Err(error(
            StatusCode::CONFLICT,
            format!("Order #{order_id} already exists"),
            "ORDER_EXISTS",
        ));
    }

    let order = Order::new(
        order_id,
        payload.total,
        payload.currency,
        BillingDetails {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
        },
        payload.payment_method.unwrap_or_else(|| GATEWAY_ID.into()),
    );

    state.store.save(&order).map_err(|e| storage_error(&e))?;
    tracing::info!(order_id = %order.id, total = %order.total, "Created order");

    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its notes
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    state
        .store
        .get(&OrderId::new(id))
        .map_err(|e| storage_error(&e))?
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Order not found.", "ORDER_NOT_FOUND"))
}
