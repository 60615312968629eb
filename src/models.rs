use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Numeric cell that is blank, unparseable or non-finite (`NaN`, `inf`) becomes `None`
fn finite_option<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(csv::invalid_option::<D, f64>(de)?.filter(|v| v.is_finite()))
}

/// Raw order line as exported by the offline analytics job
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderCsvRecord {
    pub order_id: String,
    #[serde(alias = "purchased_at")]
    pub order_purchase_timestamp: String,
    #[serde(default, deserialize_with = "finite_option")]
    pub price: Option<f64>,
    /// Actual minus promised delivery date, in days (positive = late)
    #[serde(
        default,
        alias = "delivery_deviation_days",
        deserialize_with = "finite_option"
    )]
    pub diferencia_estimada_dias: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    pub review_score: Option<f64>,
    #[serde(default)]
    pub order_status: String,
    #[serde(default)]
    pub customer_state: String,
}

/// Order line with a parsed purchase timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub purchased_at: NaiveDateTime,
    pub price: Option<f64>,
    pub delivery_deviation_days: Option<f64>,
    pub review_score: Option<f64>,
    pub order_status: String,
    pub customer_state: String,
}

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse the purchase timestamps seen in the exports; a bare date maps to midnight.
pub fn parse_timestamp(raw: &str) -> anyhow::Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid midnight for {}", raw))
}

impl OrderCsvRecord {
    pub fn to_order(&self) -> anyhow::Result<Order> {
        let purchased_at = parse_timestamp(&self.order_purchase_timestamp)?;

        Ok(Order {
            order_id: self.order_id.clone(),
            purchased_at,
            price: self.price,
            delivery_deviation_days: self.diferencia_estimada_dias,
            review_score: self.review_score,
            order_status: self.order_status.trim().to_string(),
            customer_state: self.customer_state.trim().to_uppercase(),
        })
    }
}

/// One customer row of the offline clustering output.
///
/// Feature cells that fail numeric coercion are kept as `None` and excluded
/// from every aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerClusterRecord {
    #[serde(default, alias = "customer_unique_id")]
    pub customer_id: Option<String>,
    #[serde(rename = "cluster", alias = "cluster_id")]
    pub cluster_id: i64,
    /// Days since last purchase
    #[serde(default, deserialize_with = "finite_option")]
    pub recency: Option<f64>,
    /// Purchase count
    #[serde(default, deserialize_with = "finite_option")]
    pub frequency: Option<f64>,
    /// Total historical spend
    #[serde(default, deserialize_with = "finite_option")]
    pub monetary: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    pub avg_review_score: Option<f64>,
}

impl CustomerClusterRecord {
    pub fn new(cluster_id: i64) -> Self {
        Self {
            customer_id: None,
            cluster_id,
            recency: None,
            frequency: None,
            monetary: None,
            avg_review_score: None,
        }
    }

    pub fn with_recency(mut self, recency: f64) -> Self {
        self.recency = Some(recency);
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_monetary(mut self, monetary: f64) -> Self {
        self.monetary = Some(monetary);
        self
    }

    pub fn with_review(mut self, avg_review_score: f64) -> Self {
        self.avg_review_score = Some(avg_review_score);
        self
    }
}
