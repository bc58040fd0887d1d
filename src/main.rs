//! Review Risk Pipeline - Main Entry Point
//!
//! Consumes order records from NATS, predicts negative-review risk with
//! per-feature explanations, and publishes a response envelope for each request.

use anyhow::{Context, Result};
use futures::StreamExt;
use review_risk_pipeline::{
    config::AppConfig,
    consumer::OrderConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::ReviewRiskPipeline,
    producer::ResultProducer,
    types::{ExplanationStatus, OrderRecord, ResponseEnvelope},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const METRICS_INTERVAL_SECS: u64 = 30;

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("review_risk_pipeline={}", config.logging.level))
    });

    if config.logging.format == "pretty" {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config);

    info!("Starting Review Risk Pipeline");
    info!(
        top_reasons = config.explanation.top_reasons,
        workers = config.pipeline.workers,
        "Configuration loaded"
    );

    // Refuse to serve without a consistent set of artifacts
    let pipeline = Arc::new(
        ReviewRiskPipeline::from_artifacts(&config.artifacts)
            .context("Failed to load trained artifacts")?,
    );
    info!(
        model_version = %pipeline.model_version(),
        features = pipeline.contract().len(),
        "Pipeline ready"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = OrderConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        config.nats.queue_group.as_deref(),
    );
    let producer = Arc::new(ResultProducer::new(client.clone(), &config.nats.result_subject));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!(
        "Publishing results to: {} (unless a reply subject is set)",
        producer.subject()
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let top_reasons = config.explanation.top_reasons;

    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, METRICS_INTERVAL_SECS);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            warn!("Worker semaphore closed, stopping intake");
            break;
        };

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let outcome = OrderRecord::from_json(&message.payload)
                .and_then(|order| pipeline.predict(&order));

            let envelope = match outcome {
                Ok(result) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_prediction(
                        processing_time,
                        result.probability,
                        result.is_negative,
                    );
                    if let ExplanationStatus::Degraded { reason } = &result.explanation {
                        metrics.record_degraded_explanation();
                        warn!(reason = %reason, "Published prediction without explanation");
                    }

                    debug!(
                        probability = result.probability,
                        is_negative = result.is_negative,
                        processing_time_us = processing_time.as_micros(),
                        "Order processed"
                    );
                    ResponseEnvelope::ok(result.truncated(top_reasons))
                }
                Err(e) => {
                    metrics.record_error(e.kind());
                    if e.is_client_error() {
                        warn!(kind = e.kind(), field = ?e.field(), error = %e, "Rejected request");
                    } else {
                        error!(
                            kind = e.kind(),
                            field = ?e.field(),
                            error = %e,
                            "Prediction failed"
                        );
                    }
                    ResponseEnvelope::error(&e)
                }
            };

            if let Err(e) = producer.publish(&envelope, message.reply.as_deref()).await {
                error!(
                    request_id = %envelope.request_id,
                    error = %e,
                    "Failed to publish response"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
