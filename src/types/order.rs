//! Order record data structures for negative-review prediction

use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw order record as received from a caller.
///
/// Only `delivery` and `review` are required; every other block is optional and
/// is imputed from training medians when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Delivery timeline
    pub delivery: DeliveryInfo,

    /// Order financials
    #[serde(default)]
    pub financials: Option<Financials>,

    /// Seller/customer location
    #[serde(default)]
    pub location: Option<Location>,

    /// Purchased item metadata
    #[serde(default)]
    pub item: Option<ItemInfo>,

    /// Customer review
    pub review: Review,
}

/// Delivery timestamps, ISO-8601 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInfo {
    /// When the order was placed
    pub purchase_date: String,

    /// Delivery date promised to the customer
    pub promised_date: String,

    /// When the seller handed the order to the carrier
    #[serde(default)]
    pub dispatched_date: Option<String>,

    /// When the customer received the order
    #[serde(default)]
    pub delivered_date: Option<String>,
}

/// Order financials. `order_total` and `shipping_cost` come as a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financials {
    /// Total paid, shipping included
    #[serde(default)]
    pub order_total: Option<f64>,

    /// Shipping (freight) cost
    #[serde(default)]
    pub shipping_cost: Option<f64>,

    /// Number of payment installments
    #[serde(default, deserialize_with = "optional_count")]
    pub payment_installments: Option<u32>,

    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "BRL".to_string()
}

/// Seller/customer location summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    /// Straight-line distance between seller and customer
    #[serde(default)]
    pub distance_km: Option<f64>,
}

/// Item metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Product category (informational)
    #[serde(default)]
    pub category: Option<String>,

    /// Product weight in grams
    #[serde(default)]
    pub weight_g: Option<f64>,

    /// Length of the product description in characters
    #[serde(default, deserialize_with = "optional_count")]
    pub description_length: Option<u32>,

    /// Number of product photos/media
    #[serde(default, deserialize_with = "optional_count")]
    pub media_count: Option<u32>,
}

/// Customer review text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
}

/// Order whose timestamps are parsed and whose invariants have been checked.
///
/// This is the only input the feature extractor accepts.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub purchase: NaiveDateTime,
    pub promised: NaiveDateTime,
    pub dispatched: Option<NaiveDateTime>,
    pub delivered: Option<NaiveDateTime>,
    /// `(order_total, shipping_cost)` when both were supplied
    pub totals: Option<(f64, f64)>,
    pub payment_installments: Option<u32>,
    pub distance_km: Option<f64>,
    pub weight_g: Option<f64>,
    pub description_length: Option<u32>,
    pub media_count: Option<u32>,
    pub review_text: String,
}

impl OrderRecord {
    /// Create a record with only the required fields.
    pub fn new(purchase_date: &str, promised_date: &str, review_text: &str) -> Self {
        Self {
            delivery: DeliveryInfo {
                purchase_date: purchase_date.to_string(),
                promised_date: promised_date.to_string(),
                dispatched_date: None,
                delivered_date: None,
            },
            financials: None,
            location: None,
            item: None,
            review: Review {
                text: review_text.to_string(),
            },
        }
    }

    /// Parse a record from a JSON payload. Schema failures are validation errors.
    ///
    /// The error's field is the JSON path of the offending value (e.g.
    /// `item.weight_g`), or `body` when the document itself is malformed.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(payload);
        let order: Self = serde_path_to_error::deserialize(&mut de).map_err(|e| {
            let path = e.path().to_string();
            let field = if path.is_empty() || path == "." { "body".to_string() } else { path };
            PipelineError::validation(field, e.into_inner().to_string())
        })?;
        de.end()
            .map_err(|e| PipelineError::validation("body", e.to_string()))?;
        Ok(order)
    }

    /// Check field-level invariants and parse timestamps.
    pub fn validate(&self) -> Result<ValidatedOrder> {
        let delivery = &self.delivery;
        let purchase = parse_timestamp("delivery.purchase_date", &delivery.purchase_date)?;
        let promised = parse_timestamp("delivery.promised_date", &delivery.promised_date)?;
        let dispatched = delivery
            .dispatched_date
            .as_deref()
            .map(|s| parse_timestamp("delivery.dispatched_date", s))
            .transpose()?;
        let delivered = delivery
            .delivered_date
            .as_deref()
            .map(|s| parse_timestamp("delivery.delivered_date", s))
            .transpose()?;

        let (totals, payment_installments) = match &self.financials {
            Some(fin) => {
                let totals = match (fin.order_total, fin.shipping_cost) {
                    (Some(total), Some(shipping)) => {
                        ensure_finite("financials.order_total", total)?;
                        ensure_finite("financials.shipping_cost", shipping)?;
                        Some((total, shipping))
                    }
                    (None, None) => None,
                    _ => {
                        return Err(PipelineError::validation(
                            "financials",
                            "order_total and shipping_cost must both be present or both absent",
                        ))
                    }
                };
                (totals, fin.payment_installments)
            }
            None => (None, None),
        };

        let distance_km = self.location.as_ref().and_then(|l| l.distance_km);
        if let Some(distance) = distance_km {
            ensure_finite("location.distance_km", distance)?;
        }

        let item = self.item.clone().unwrap_or_default();
        if let Some(weight) = item.weight_g {
            ensure_finite("item.weight_g", weight)?;
        }

        Ok(ValidatedOrder {
            purchase,
            promised,
            dispatched,
            delivered,
            totals,
            payment_installments,
            distance_km,
            weight_g: item.weight_g,
            description_length: item.description_length,
            media_count: item.media_count,
            review_text: self.review.text.clone(),
        })
    }

    /// Builder: attach financials.
    pub fn with_financials(
        mut self,
        order_total: f64,
        shipping_cost: f64,
        installments: Option<u32>,
    ) -> Self {
        self.financials = Some(Financials {
            order_total: Some(order_total),
            shipping_cost: Some(shipping_cost),
            payment_installments: installments,
            currency: default_currency(),
        });
        self
    }

    /// Builder: attach dispatch and delivery dates.
    pub fn with_delivery_dates(
        mut self,
        dispatched: Option<&str>,
        delivered: Option<&str>,
    ) -> Self {
        self.delivery.dispatched_date = dispatched.map(str::to_string);
        self.delivery.delivered_date = delivered.map(str::to_string);
        self
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Offset-aware values are converted to UTC; naive values are taken as-is and a
/// bare date means midnight.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    Err(PipelineError::validation(
        field,
        format!("'{raw}' is not a valid ISO-8601 timestamp"),
    ))
}

/// Count field that also accepts whole-valued floats such as `320.0`.
fn optional_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) => {
            Ok(Some(v as u32))
        }
        Some(v) => Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {v}"
        ))),
    }
}

fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::validation(field, "value must be a finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_deserialization_minimal() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01T10:00:00", "promised_date": "2024-01-08T23:59:59"},
            "review": {"text": "Produto chegou bem, sem problemas"}
        }"#;

        let order = OrderRecord::from_json(json.as_bytes()).unwrap();
        assert!(order.financials.is_none());
        assert!(order.location.is_none());
        assert!(order.item.is_none());
        assert_eq!(order.review.text, "Produto chegou bem, sem problemas");
    }

    #[test]
    fn test_missing_review_is_validation_error() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"}
        }"#;

        let err = OrderRecord::from_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("review"));
    }

    #[test]
    fn test_partial_financials_rejected() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01T10:00:00", "promised_date": "2024-01-08T23:59:59"},
            "financials": {"shipping_cost": 24.50},
            "review": {"text": "ok"}
        }"#;

        let order = OrderRecord::from_json(json.as_bytes()).unwrap();
        let err = order.validate().unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.field(), Some("financials"));
    }

    #[test]
    fn test_empty_financials_block_is_valid() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "financials": {"payment_installments": 0},
            "review": {"text": ""}
        }"#;

        let validated = OrderRecord::from_json(json.as_bytes()).unwrap().validate().unwrap();
        assert!(validated.totals.is_none());
        assert_eq!(validated.payment_installments, Some(0));
    }

    #[test]
    fn test_malformed_date_names_field() {
        let order = OrderRecord::new("2024-01-01T10:00:00", "next tuesday", "ok");

        let err = order.validate().unwrap_err();
        assert_eq!(err.field(), Some("delivery.promised_date"));
    }

    #[test]
    fn test_malformed_optional_date_is_not_ignored() {
        let order = OrderRecord::new("2024-01-01", "2024-01-08", "ok")
            .with_delivery_dates(Some("2024-13-40"), None);

        let err = order.validate().unwrap_err();
        assert_eq!(err.field(), Some("delivery.dispatched_date"));
    }

    #[test]
    fn test_timestamp_formats() {
        let naive = parse_timestamp("f", "2024-01-08T23:59:59").unwrap();
        assert_eq!(naive.to_string(), "2024-01-08 23:59:59");

        let fractional = parse_timestamp("f", "2024-01-08 23:59:59.250").unwrap();
        assert_eq!(fractional.and_utc().timestamp_subsec_millis(), 250);

        let aware = parse_timestamp("f", "2024-01-08T22:00:00-03:00").unwrap();
        assert_eq!(aware.to_string(), "2024-01-09 01:00:00");

        let date_only = parse_timestamp("f", "2024-01-08").unwrap();
        assert_eq!(date_only.to_string(), "2024-01-08 00:00:00");
    }

    #[test]
    fn test_wrong_typed_optional_field_names_path() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "item": {"weight_g": "heavy"},
            "review": {"text": "ok"}
        }"#;

        let err = OrderRecord::from_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.field(), Some("item.weight_g"));
    }

    #[test]
    fn test_null_review_text_names_path() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "review": {"text": null}
        }"#;

        let err = OrderRecord::from_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.field(), Some("review.text"));
    }

    #[test]
    fn test_trailing_garbage_is_body_error() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "review": {"text": "ok"}
        } trailing"#;

        let err = OrderRecord::from_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.field(), Some("body"));
    }

    #[test]
    fn test_whole_float_counts_accepted() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "financials": {"payment_installments": 3.0},
            "item": {"description_length": 320.0, "media_count": 2},
            "review": {"text": "ok"}
        }"#;

        let validated = OrderRecord::from_json(json.as_bytes()).unwrap().validate().unwrap();
        assert_eq!(validated.payment_installments, Some(3));
        assert_eq!(validated.description_length, Some(320));
        assert_eq!(validated.media_count, Some(2));
    }

    #[test]
    fn test_fractional_count_rejected_with_path() {
        let json = r#"{
            "delivery": {"purchase_date": "2024-01-01", "promised_date": "2024-01-08"},
            "item": {"media_count": 1.5},
            "review": {"text": "ok"}
        }"#;

        let err = OrderRecord::from_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.field(), Some("item.media_count"));
    }

    #[test]
    fn test_currency_defaults_to_brl() {
        let json = r#"{"order_total": 10.0, "shipping_cost": 2.0}"#;
        let fin: Financials = serde_json::from_str(json).unwrap();
        assert_eq!(fin.currency, "BRL");
    }
}
