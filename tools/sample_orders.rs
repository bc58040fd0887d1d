//! Sample Order Producer
//!
//! Generates order records and publishes them to NATS to exercise a running
//! review-risk pipeline. Falls back to a dry run when NATS is unreachable.
//!
//! Usage: sample-orders [nats_url] [subject] [count] [late_rate] [delay_ms]

use chrono::{NaiveDateTime, TimeDelta, Utc};
use rand::Rng;
use review_risk_pipeline::types::order::{Financials, ItemInfo, Location};
use review_risk_pipeline::OrderRecord;
use std::time::Duration;
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const POSITIVE_REVIEWS: &[&str] = &[
    "Produto chegou bem, sem problemas",
    "Entrega rápida, recomendo",
    "Muito bom, chegou antes do prazo",
    "Ótimo vendedor",
    "",
];

const NEGATIVE_REVIEWS: &[&str] = &[
    "Não recebi o produto até agora!!! Cadê?",
    "Atrasou muito, péssimo atendimento!",
    "Produto veio errado, quero meu dinheiro de volta!!",
    "Comprei e nunca chegou. Alguém vai responder?",
];

const CATEGORIES: &[&str] = &[
    "bed_bath_table",
    "health_beauty",
    "sports_leisure",
    "furniture_decor",
    "housewares",
];

/// Order generator for exercising the service
struct OrderGenerator {
    rng: rand::rngs::ThreadRng,
    order_counter: u64,
}

impl OrderGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            order_counter: 0,
        }
    }

    /// Generate an order delivered on time with a neutral or happy review
    fn generate_on_time(&mut self) -> OrderRecord {
        let delay = -self.rng.gen_range(1..15);
        let text = self.random_choice(POSITIVE_REVIEWS);
        self.generate(delay, text)
    }

    /// Generate an order delivered late with a complaint
    fn generate_late(&mut self) -> OrderRecord {
        let delay = self.rng.gen_range(3..30);
        let text = self.random_choice(NEGATIVE_REVIEWS);
        self.generate(delay, text)
    }

    fn generate(&mut self, delay_days: i64, review: &str) -> OrderRecord {
        self.order_counter += 1;

        let purchase = Utc::now().naive_utc() - TimeDelta::days(self.rng.gen_range(30..365));
        let promised = purchase + TimeDelta::days(self.rng.gen_range(10..30));
        let dispatched = purchase + TimeDelta::hours(self.rng.gen_range(6..120));
        let delivered = promised + TimeDelta::days(delay_days);

        let mut order = OrderRecord::new(&format_ts(purchase), &format_ts(promised), review)
            .with_delivery_dates(Some(&format_ts(dispatched)), Some(&format_ts(delivered)));

        // Leave some optional blocks out so the imputation path is exercised
        if self.rng.gen_bool(0.8) {
            let price = (self.rng.gen_range(15.0..600.0_f64) * 100.0).round() / 100.0;
            let shipping = (self.rng.gen_range(5.0..60.0_f64) * 100.0).round() / 100.0;
            order.financials = Some(Financials {
                order_total: Some(price + shipping),
                shipping_cost: Some(shipping),
                payment_installments: Some(self.rng.gen_range(1..10)),
                currency: "BRL".to_string(),
            });
        }
        if self.rng.gen_bool(0.7) {
            order.location = Some(Location {
                distance_km: Some(self.rng.gen_range(5.0..2500.0)),
            });
        }
        if self.rng.gen_bool(0.7) {
            order.item = Some(ItemInfo {
                category: Some(self.random_choice(CATEGORIES).to_string()),
                weight_g: Some(self.rng.gen_range(100.0..15000.0)),
                description_length: Some(self.rng.gen_range(50..3000)),
                media_count: Some(self.rng.gen_range(1..8)),
            });
        }

        order
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_orders=info".parse()?),
        )
        .init();

    info!("Starting Sample Order Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("reviews.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let late_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.2_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        late_rate = late_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, late_rate, delay_ms).await;
        }
    };

    let mut generator = OrderGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} orders...", count);

    let mut on_time_count = 0;
    let mut late_count = 0;

    for i in 0..count {
        let order = if rng.gen_bool(late_rate) {
            late_count += 1;
            generator.generate_late()
        } else {
            on_time_count += 1;
            generator.generate_on_time()
        };

        let payload = serde_json::to_vec(&order)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} orders ({} on time, {} late)",
                i + 1,
                count,
                on_time_count,
                late_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} orders ({} on time, {} late)",
        count, on_time_count, late_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, late_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = OrderGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let order = if rng.gen_bool(late_rate) {
            generator.generate_late()
        } else {
            generator.generate_on_time()
        };

        let json = serde_json::to_string_pretty(&order)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample order {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
