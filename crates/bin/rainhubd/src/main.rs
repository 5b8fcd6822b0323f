//! # rainhubd — rainhub daemon
//!
//! Composition root that wires all adapters together and runs the hub.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct application services, injecting repositories via port traits
//! - Start the scheduler and the MQTT consumer loop
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rainhub_adapter_mqtt::MqttBridge;
use rainhub_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteAutomationRepository, SqliteTelemetryRepository,
};
use rainhub_app::evaluator::ConditionEvaluator;
use rainhub_app::executor::AutomationExecutor;
use rainhub_app::ingest::IngestService;
use rainhub_app::router::TriggerRouter;
use rainhub_app::scheduler::Scheduler;
use rainhub_domain::error::RainHubError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let telemetry = Arc::new(SqliteTelemetryRepository::new(pool.clone()));
    let automations = Arc::new(SqliteAutomationRepository::new(pool));

    // MQTT
    let bridge = MqttBridge::connect(config.mqtt.clone());
    let publisher = Arc::new(bridge.publisher());

    // Services
    let coordinates = config.coordinates();
    let evaluator = ConditionEvaluator::new(Arc::clone(&telemetry), coordinates);
    let executor = AutomationExecutor::new(
        Arc::clone(&automations),
        Arc::clone(&telemetry),
        evaluator,
        publisher,
        config.dry_run,
    );
    let router = Arc::new(TriggerRouter::new(Arc::clone(&automations), executor));
    let ingest = Arc::new(IngestService::new(Arc::clone(&telemetry)));

    // Scheduler
    let scheduler = Scheduler::new(Arc::clone(&router), coordinates);
    scheduler.start().await;
    info!(jobs = scheduler.jobs().len(), "scheduler started");

    // Consumer loop: ingest first, then route triggers
    let consumer = bridge.run(move |topic, payload| {
        let ingest = Arc::clone(&ingest);
        let router = Arc::clone(&router);
        async move {
            ingest.ingest(&topic, &payload).await?;
            let parsed: Value = serde_json::from_str(&payload).map_err(RainHubError::Parse)?;
            if let Value::Object(object) = parsed {
                router.trigger_topic_automations(&topic, &object).await?;
            }
            Ok(())
        }
    });

    tokio::select! {
        result = consumer => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            scheduler.shutdown();
        }
    }

    Ok(())
}
