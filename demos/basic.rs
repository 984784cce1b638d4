//! Basic example showing how to trace SeaORM operations through hooks.
//!
//! Run with: cargo run --example basic

use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
use sea_orm_hook_tracing::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,sea_orm_hook_tracing=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    // Option 1: wrap explicitly, failing on a missing handle
    let traced = wrap_db(HookedConnection::new(db))?;

    // Option 2: the extension trait, with a custom configuration
    // let traced = db.with_tracing_config(TracingConfig::production().with_namespace("api"));

    let request = tracing::info_span!("request", path = "/users");
    let handle = traced.with_context(Some(TraceContext::new(request.clone())));

    // Spans for this statement nest under `request`.
    let rows = handle
        .query_all(Statement::from_string(
            DbBackend::Postgres,
            "SELECT 1 AS one",
        ))
        .await?;
    tracing::info!(parent: &request, rows = rows.len(), "query finished");

    // No context attached: runs untraced.
    traced
        .with_context(None)
        .execute_unprepared("SELECT 1")
        .await?;

    Ok(())
}
