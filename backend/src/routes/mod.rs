//! Route definitions for the Reseller Ledger API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .merge(protected_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
}

/// Everything behind a bearer token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/payments", payment_routes())
        .nest("/transactions", transaction_routes())
        .nest("/balance", balance_routes())
        .route("/dashboard", get(handlers::get_dashboard))
        .nest("/resellers", reseller_routes())
        .nest("/products", product_routes())
        .route("/users/profile", get(handlers::get_profile))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .route("/:order_id/cancel", patch(handlers::cancel_order))
}

/// Payment routes
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_payments))
        .route("/order/:order_id", get(handlers::get_payment_by_order))
        .route("/order/:order_id/pay", post(handlers::record_payment))
}

/// Cash ledger routes
fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transactions))
        .route("/cash-in", post(handlers::record_cash_in))
        .route("/cash-out", post(handlers::record_cash_out))
        .route("/export", get(handlers::export_transactions))
}

/// Balance routes
fn balance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_balance).put(handlers::update_balance))
        .route("/reconcile", post(handlers::reconcile_balance))
}

/// Reseller routes
fn reseller_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resellers).post(handlers::create_reseller),
        )
        .route(
            "/:reseller_id",
            get(handlers::get_reseller)
                .put(handlers::update_reseller)
                .delete(handlers::delete_reseller),
        )
        .route("/:reseller_id/orders", get(handlers::get_reseller_orders))
}

/// Product routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/low-stock", get(handlers::list_low_stock_products))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/restock", post(handlers::restock_product))
}
