use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handlers::{
    create_shared_link, delete_shared_link, get_payment_records, health_check, mark_payment_paid,
    mark_payment_pending, validate_shared_link, AppState,
};

pub fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Reconciled payment view (session or shared link)
                .route("/payments", get(get_payment_records))
                // Ledger mutations (manager/finance session, or shared link)
                .route("/payments/mark-paid", post(mark_payment_paid))
                .route("/payments/mark-pending", post(mark_payment_pending))
                // Shared invoice links; validation is the public path
                .route("/shared-links", post(create_shared_link))
                .route(
                    "/shared-links/:token",
                    get(validate_shared_link).delete(delete_shared_link),
                ),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::very_permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
