//! Feature extraction for negative-review model inference.
//!
//! Maps a validated order onto the 16 contract features, using the same
//! derivations as the training pipeline. Optional inputs that are absent fall
//! back to the training medians.

use crate::error::{PipelineError, Result};
use crate::features::{FeatureContract, FeatureVector, MedianImputer, TextStats};
use crate::types::order::ValidatedOrder;
use chrono::TimeDelta;
use tracing::debug;

/// Fallback for `payment_installments` when the median table has no entry.
pub const DEFAULT_PAYMENT_INSTALLMENTS: f64 = 1.0;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Where a feature value comes from for one order.
enum Source {
    Observed(f64),
    Imputed { fallback: Option<f64> },
}

impl Source {
    fn from_optional(value: Option<f64>) -> Self {
        match value {
            Some(v) => Source::Observed(v),
            None => Source::Imputed { fallback: None },
        }
    }
}

/// Feature extractor that transforms orders into model input features.
pub struct FeatureExtractor {
    contract: FeatureContract,
    imputer: MedianImputer,
}

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new(contract: FeatureContract, imputer: MedianImputer) -> Self {
        Self { contract, imputer }
    }

    /// Extract features from a validated order.
    ///
    /// Returns a vector in contract order with every feature populated, or a
    /// contract mismatch naming the first feature that could not be filled.
    pub fn extract(&self, order: &ValidatedOrder) -> Result<FeatureVector> {
        let text = TextStats::from_text(&order.review_text);

        // Missing milestones collapse onto their neighbours
        let dispatched = order.dispatched.unwrap_or(order.purchase);
        let delivered = order.delivered.unwrap_or(order.promised);

        FeatureVector::assemble(&self.contract, |name| {
            let source = match name {
                // Temporal (3)
                "delivery_delta_days" => Source::Observed(whole_days(delivered - order.promised)),
                "seller_dispatch_days" => Source::Observed(whole_days(dispatched - order.purchase)),
                "carrier_transit_days" => Source::Observed(whole_days(delivered - dispatched)),

                // Location (1)
                "distance_seller_customer_km" => Source::from_optional(order.distance_km),

                // Financial (4)
                "price" => Source::from_optional(
                    order.totals.map(|(total, shipping)| (total - shipping).max(0.0)),
                ),
                "freight_value" => {
                    Source::from_optional(order.totals.map(|(_, shipping)| shipping))
                }
                "payment_value" => Source::from_optional(order.totals.map(|(total, _)| total)),
                "payment_installments" => match order.payment_installments {
                    Some(n) => Source::Observed(f64::from(n)),
                    None => Source::Imputed {
                        fallback: Some(DEFAULT_PAYMENT_INSTALLMENTS),
                    },
                },

                // Item (3)
                "product_weight_g" => Source::from_optional(order.weight_g),
                "product_description_lenght" => {
                    Source::from_optional(order.description_length.map(f64::from))
                }
                "product_photos_qty" => Source::from_optional(order.media_count.map(f64::from)),

                // Review text (5), never imputed
                "char_count" => Source::Observed(text.char_count as f64),
                "word_count" => Source::Observed(text.word_count as f64),
                "exclamation_count" => Source::Observed(text.exclamation_count as f64),
                "question_count" => Source::Observed(text.question_count as f64),
                "avg_word_length" => Source::Observed(text.avg_word_length),

                _ => {
                    return Err(PipelineError::contract_mismatch(
                        name,
                        "feature has no derivation in this build",
                    ))
                }
            };

            match source {
                Source::Observed(value) => Ok(value),
                Source::Imputed { fallback } => {
                    let value = self.imputer.value_or(name, fallback)?;
                    debug!(feature = %name, value = value, "Imputed missing feature");
                    Ok(value)
                }
            }
        })
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }
}

/// Whole days in a time delta, rounded toward negative infinity.
///
/// Two hours early is -1 day, matching calendar arithmetic used in training.
fn whole_days(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros.div_euclid(MICROS_PER_DAY) as f64,
        // Beyond ~292k years; day granularity is exact enough there
        None => delta.num_days() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::order::OrderRecord;
    use std::collections::BTreeMap;

    fn medians() -> MedianImputer {
        let mut m = BTreeMap::new();
        m.insert("distance_seller_customer_km".to_string(), 433.9);
        m.insert("price".to_string(), 74.9);
        m.insert("freight_value".to_string(), 16.28);
        m.insert("payment_value".to_string(), 108.2);
        m.insert("payment_installments".to_string(), 2.0);
        m.insert("product_weight_g".to_string(), 700.0);
        m.insert("product_description_lenght".to_string(), 603.0);
        m.insert("product_photos_qty".to_string(), 1.0);
        MedianImputer::new(m)
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureContract::canonical(), medians())
    }

    fn extract(order: &OrderRecord) -> Result<FeatureVector> {
        extractor().extract(&order.validate()?)
    }

    #[test]
    fn test_minimal_order_uses_defaults_and_medians() {
        let order = OrderRecord::new(
            "2024-01-01T10:00:00",
            "2024-01-08T23:59:59",
            "Produto chegou bem, sem problemas",
        );

        let features = extract(&order).unwrap();

        assert_eq!(features.len(), 16);
        assert_eq!(features.get("delivery_delta_days"), Some(0.0));
        assert_eq!(features.get("seller_dispatch_days"), Some(0.0));
        assert_eq!(features.get("carrier_transit_days"), Some(7.0));
        assert_eq!(features.get("word_count"), Some(5.0));
        assert_eq!(features.get("exclamation_count"), Some(0.0));
        assert_eq!(features.get("question_count"), Some(0.0));

        let imputer = medians();
        for name in [
            "distance_seller_customer_km",
            "price",
            "freight_value",
            "payment_value",
            "payment_installments",
            "product_weight_g",
            "product_description_lenght",
            "product_photos_qty",
        ] {
            assert_eq!(features.get(name), imputer.get(name), "{name} should be imputed");
        }
    }

    #[test]
    fn test_full_order() {
        let mut order = OrderRecord::new("2024-01-01T10:00:00", "2024-01-08T23:59:59", "Tudo certo")
            .with_delivery_dates(Some("2024-01-02T14:00:00"), Some("2024-01-12T15:30:00"))
            .with_financials(189.90, 24.50, Some(3));
        order.location = Some(crate::types::order::Location { distance_km: Some(1127.4) });
        order.item = Some(crate::types::order::ItemInfo {
            category: Some("electronics".to_string()),
            weight_g: Some(850.0),
            description_length: Some(320),
            media_count: Some(2),
        });

        let features = extract(&order).unwrap();

        assert_eq!(features.get("delivery_delta_days"), Some(3.0));
        assert_eq!(features.get("seller_dispatch_days"), Some(1.0));
        assert_eq!(features.get("carrier_transit_days"), Some(10.0));
        assert!((features.get("price").unwrap() - 165.4).abs() < 1e-9);
        assert_eq!(features.get("freight_value"), Some(24.5));
        assert_eq!(features.get("payment_value"), Some(189.9));
        assert_eq!(features.get("payment_installments"), Some(3.0));
        assert_eq!(features.get("distance_seller_customer_km"), Some(1127.4));
        assert_eq!(features.get("product_weight_g"), Some(850.0));
        assert_eq!(features.get("product_description_lenght"), Some(320.0));
        assert_eq!(features.get("product_photos_qty"), Some(2.0));
        assert_eq!(features.get("char_count"), Some(10.0));
        assert_eq!(features.get("avg_word_length"), Some(4.5));
    }

    #[test]
    fn test_early_delivery_is_negative_floor() {
        let order = OrderRecord::new("2024-01-01T10:00:00", "2024-01-08T12:00:00", "ok")
            .with_delivery_dates(None, Some("2024-01-08T10:00:00"));

        let features = extract(&order).unwrap();
        assert_eq!(features.get("delivery_delta_days"), Some(-1.0));
    }

    #[test]
    fn test_price_clamped_at_zero() {
        let order =
            OrderRecord::new("2024-01-01", "2024-01-08", "ok").with_financials(10.0, 25.0, None);

        let features = extract(&order).unwrap();
        assert_eq!(features.get("price"), Some(0.0));
        assert_eq!(features.get("freight_value"), Some(25.0));
    }

    #[test]
    fn test_explicit_zero_is_present() {
        let order =
            OrderRecord::new("2024-01-01", "2024-01-08", "ok").with_financials(0.0, 0.0, Some(0));

        let features = extract(&order).unwrap();
        assert_eq!(features.get("payment_installments"), Some(0.0));
        assert_eq!(features.get("payment_value"), Some(0.0));
    }

    #[test]
    fn test_installments_fallback_without_median() {
        let mut table: BTreeMap<String, f64> =
            serde_json::from_str(&medians().to_json().unwrap()).unwrap();
        table.remove("payment_installments");
        let extractor =
            FeatureExtractor::new(FeatureContract::canonical(), MedianImputer::new(table));
        let order = OrderRecord::new("2024-01-01", "2024-01-08", "ok").validate().unwrap();

        let features = extractor.extract(&order).unwrap();
        assert_eq!(features.get("payment_installments"), Some(DEFAULT_PAYMENT_INSTALLMENTS));
    }

    #[test]
    fn test_missing_median_is_contract_mismatch() {
        let extractor =
            FeatureExtractor::new(FeatureContract::canonical(), MedianImputer::default());
        let order = OrderRecord::new("2024-01-01", "2024-01-08", "ok").validate().unwrap();

        let err = extractor.extract(&order).unwrap_err();
        assert_eq!(err.kind(), "contract_mismatch");
        assert_eq!(err.field(), Some("distance_seller_customer_km"));
    }

    #[test]
    fn test_empty_review_text() {
        let order = OrderRecord::new("2024-01-01", "2024-01-08", "");

        let features = extract(&order).unwrap();
        assert_eq!(features.get("word_count"), Some(0.0));
        assert_eq!(features.get("avg_word_length"), Some(0.0));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let order = OrderRecord::new(
            "2024-01-01T10:00:00",
            "2024-01-08T23:59:59",
            "Atrasou muito!!",
        )
        .validate()
            .unwrap();
        let extractor = extractor();

        assert_eq!(extractor.extract(&order).unwrap(), extractor.extract(&order).unwrap());
    }

    #[test]
    fn test_whole_days() {
        assert_eq!(whole_days(TimeDelta::hours(23)), 0.0);
        assert_eq!(whole_days(TimeDelta::hours(24)), 1.0);
        assert_eq!(whole_days(TimeDelta::hours(-1)), -1.0);
        assert_eq!(whole_days(TimeDelta::milliseconds(-1)), -1.0);
        assert_eq!(whole_days(TimeDelta::hours(-48)), -2.0);
    }
}
