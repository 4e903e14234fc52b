//! Application startup and lifecycle management.
//!
//! Connect to MongoDB, ping it, create indexes, bind the listener, then serve
//! until SIGINT/SIGTERM and shut the database client down.

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_admin, require_auth};
use crate::services::{
    CartStore, CatalogStore, JwtService, MongoDb, OrderStore, PaymentGateway, PaymentService,
    PaymentSettings, SslCommerzClient, UserStore,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub carts: Arc<dyn CartStore>,
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub payments: PaymentService,
    pub jwt: JwtService,
}

/// The storage backends the state is assembled from.
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub carts: Arc<dyn CartStore>,
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    pub fn new(config: &Config, stores: Stores, gateway: Arc<dyn PaymentGateway>) -> Self {
        let payments = PaymentService::new(
            stores.orders.clone(),
            stores.carts.clone(),
            gateway,
            PaymentSettings::from_config(config),
        );

        Self {
            orders: stores.orders,
            carts: stores.carts,
            users: stores.users,
            catalog: stores.catalog,
            payments,
            jwt: JwtService::new(&config.auth),
        }
    }
}

pub fn router(state: AppState, frontend_url: &str) -> Router {
    let authenticated = Router::new()
        .route("/payment/init", post(handlers::payment::init_payment))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:transaction_id", get(handlers::orders::get_order))
        .route(
            "/carts",
            get(handlers::carts::list_cart).post(handlers::carts::add_to_cart),
        )
        .route(
            "/carts/:id",
            patch(handlers::carts::update_cart_item).delete(handlers::carts::remove_cart_item),
        )
        .route("/users/admin/:user", get(handlers::users::check_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/admin/orders", get(handlers::admin::list_all_orders))
        .route(
            "/admin/orders/:transaction_id",
            patch(handlers::admin::override_order_status),
        )
        .route("/users", get(handlers::users::list_users))
        .route("/users/admin/:user", patch(handlers::users::make_admin))
        .route("/users/:id", axum::routing::delete(handlers::users::delete_user))
        .route("/products/:category", post(handlers::catalog::create_product))
        .route(
            "/products/:category/:id",
            axum::routing::put(handlers::catalog::update_product)
                .delete(handlers::catalog::delete_product),
        )
        .route("/stats", get(handlers::stats::get_stats))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/payment/success/:transaction_id",
            post(handlers::payment::payment_success),
        )
        .route(
            "/payment/fail/:transaction_id",
            post(handlers::payment::payment_fail),
        )
        .route(
            "/payment/cancel/:transaction_id",
            post(handlers::payment::payment_cancel),
        )
        .route(
            "/payment/verify/:transaction_id",
            get(handlers::payment::verify_payment),
        )
        .route("/products/:category", get(handlers::catalog::list_products))
        .route("/products/:category/:id", get(handlers::catalog::get_product))
        .route("/users", post(handlers::users::register_user))
        .route("/jwt", post(handlers::users::issue_token));

    public
        .merge(authenticated)
        .merge(admin)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(cors_layer(frontend_url))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url = %frontend_url, error = %e, "Invalid CORS origin");
            layer
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: Option<MongoDb>,
}

impl Application {
    /// Build the production application: MongoDB stores and the SSLCommerz
    /// gateway client.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let db = MongoDb::connect(
            config.database.url.expose_secret(),
            &config.database.db_name,
        )
        .await?;

        // Fail fast rather than accept traffic with no database behind it.
        db.ping().await?;
        db.initialize_indexes().await?;

        let gateway = SslCommerzClient::new(config.gateway.clone()).map_err(|e| {
            tracing::error!("Failed to build payment gateway client: {}", e);
            AppError::ConfigError(anyhow::anyhow!("Gateway client error: {}", e))
        })?;
        if gateway.is_configured() {
            tracing::info!(base_url = %config.gateway.api_base_url, "Payment gateway client initialized");
        } else {
            tracing::warn!("Payment gateway credentials not configured - checkout will fail");
        }

        let stores = Stores {
            orders: Arc::new(db.orders()),
            carts: Arc::new(db.carts()),
            users: Arc::new(db.users()),
            catalog: Arc::new(db.catalog()),
        };
        let state = AppState::new(&config, stores, Arc::new(gateway));

        let mut app = Self::with_state(&config, state).await?;
        app.db = Some(db);
        Ok(app)
    }

    /// Bind the listener for an already-assembled state (port 0 = random port
    /// for testing).
    pub async fn with_state(config: &Config, state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Storefront service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: router(state, &config.urls.frontend_url),
            db: None,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(db) = self.db {
            db.shutdown().await;
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
