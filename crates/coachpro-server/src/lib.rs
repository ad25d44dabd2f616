pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Prefix of every JSON endpoint.
pub const API_PREFIX: &str = "/api/coachpro/v1";

fn api_routes() -> Router<AppState> {
    use routes::*;

    Router::new()
        // Catalogue
        .route(
            "/programs",
            get(programs::list_programs).post(programs::create_program),
        )
        .route("/programs/{id}", put(programs::update_program))
        .route(
            "/coaches",
            get(coaches::list_coaches).post(coaches::create_coach),
        )
        // Sessions
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/reply", post(sessions::reply))
        // Reporting
        .route(
            "/analytics",
            get(analytics::list_analytics).post(analytics::record_snapshot),
        )
        .route("/analytics/compute", post(analytics::compute_snapshot))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings)
                .put(settings::save_settings)
                .post(settings::save_settings),
        )
        // Identity
        .route("/me", get(me::get_me))
        .route("/nonce", get(me::get_nonce))
        .route(
            "/profiles/me",
            get(profiles::get_my_profile).put(profiles::put_my_profile),
        )
        .route("/profiles/{user_id}", get(profiles::get_profile))
        // Enrollment and progress
        .route("/enrollments", get(enrollments::list_for_program))
        .route("/enrollments/me", get(enrollments::list_mine))
        .route(
            "/enrollments/{student_id}/{program_id}",
            put(enrollments::set_status),
        )
        .route(
            "/progress/{student_id}/{program_id}",
            put(progress::update_progress),
        )
        .route(
            "/recommendations",
            get(recommendations::list_recommendations)
                .post(recommendations::create_recommendation),
        )
        // Assessments
        .route(
            "/assessments",
            get(assessments::list_assessments).post(assessments::create_assessment),
        )
        .route(
            "/assessments/{id}",
            get(assessments::get_assessment).put(assessments::update_assessment),
        )
        .route(
            "/assessments/{id}/responses",
            get(assessments::list_responses).post(assessments::submit_response),
        )
        .route("/responses/{id}/score", put(assessments::grade_response))
        // Commerce
        .route(
            "/products/{product_id}/program",
            put(commerce::map_product).delete(commerce::unmap_product),
        )
        .route(
            "/woocommerce/order-completed",
            post(commerce::order_completed),
        )
        // Custom GPTs
        .route("/gpts", get(gpts::list_public))
        .route("/gpts/{id}/prompt", post(gpts::build_prompt))
        .route(
            "/admin/gpts",
            get(gpts::admin_list).post(gpts::admin_create),
        )
        .route(
            "/admin/gpts/{id}",
            get(gpts::admin_get)
                .put(gpts::admin_update)
                .delete(gpts::admin_delete),
        )
}

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(API_PREFIX, api_routes())
        .route("/ajax/{action}", post(routes::ajax::dispatch))
        .route("/coaching-programs/{slug}", get(routes::pages::program_page))
        .route("/coaching-programs/{slug}/", get(routes::pages::program_page))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the server on `host:port`.
pub async fn serve(app_state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    serve_on(app_state, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(app_state);

    tracing::info!("CoachPro server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::warn!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    }
}
