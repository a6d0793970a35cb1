//! Study Notes Service: binary entrypoint.
//! Boots the Axum HTTP server on Shuttle with the router built by the library.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    study_notes_service::telemetry::init_tracing();

    let router = study_notes_service::app()?;
    Ok(router.into())
}
