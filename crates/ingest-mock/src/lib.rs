#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Deterministic synthetic source loader.
//!
//! [`MockLoader`] ignores `path_or_url` and generates records for the source's
//! schema. The same seed yields the same records on the same day; dates are
//! anchored at midnight UTC of the current day.
//!
//! # Example
//!
//! ```
//! use ingest_core::{DataSourceConfig, SourceLoader, SourceType};
//! use ingest_mock::MockLoader;
//! use std::path::Path;
//!
//! # tokio_test(async {
//! let config = DataSourceConfig::new("demo", SourceType::Mock, "", "account");
//! let batch = MockLoader::new().load(&config, Path::new(".")).await.unwrap();
//! assert_eq!(batch.len(), 100);
//! # });
//! # fn tokio_test<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f);
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ingest_core::{DataSourceConfig, EntityKind, Result, SourceBatch, SourceLoader, SourceType};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, warn};

/// Records generated per source unless configured otherwise.
pub const DEFAULT_RECORD_COUNT: usize = 100;

/// Seed used unless configured otherwise.
pub const DEFAULT_SEED: u64 = 0x5EED_F1A7;

/// Marker contained in every generated id.
pub const MOCK_ID_PREFIX: &str = "mock_";

const CATEGORIES: [&str; 6] = [
    "food_dining",
    "transportation",
    "bills_utilities",
    "entertainment",
    "shopping",
    "healthcare",
];

const BANKS: [&str; 4] = ["Mock Bank", "Sample Bank", "Demo Cooperative", "Test Savings Bank"];

/// Loader that generates synthetic records.
#[derive(Debug, Clone, Copy)]
pub struct MockLoader {
    count: usize,
    seed: u64,
}

impl Default for MockLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLoader {
    /// Create a loader generating [`DEFAULT_RECORD_COUNT`] records per source.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: DEFAULT_RECORD_COUNT,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the number of records generated per source.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of records generated per source.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Generates records for an entity kind, anchored at `today`.
    #[must_use]
    pub fn generate(&self, kind: EntityKind, today: DateTime<Utc>) -> Vec<Value> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ kind_salt(kind));
        (0..self.count)
            .map(|i| match kind {
                EntityKind::Transaction => transaction(&mut rng, i, today),
                EntityKind::Account => account(&mut rng, i),
                EntityKind::Investment => investment(&mut rng, i, today),
                EntityKind::Liability => liability(&mut rng, i),
                EntityKind::Asset => asset(&mut rng, i, today),
            })
            .collect()
    }
}

const fn kind_salt(kind: EntityKind) -> u64 {
    match kind {
        EntityKind::Transaction => 1,
        EntityKind::Account => 2,
        EntityKind::Investment => 3,
        EntityKind::Liability => 4,
        EntityKind::Asset => 5,
    }
}

fn midnight_today() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |dt| dt.and_utc())
}

fn money(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    (rng.gen_range(low..high) * 100.0).round() / 100.0
}

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

fn transaction(rng: &mut StdRng, i: usize, today: DateTime<Utc>) -> Value {
    let date = today - Duration::days(rng.gen_range(0..=90));
    let category = pick(rng, &CATEGORIES);
    json!({
        "id": format!("{MOCK_ID_PREFIX}txn_{i:04}"),
        "date": date.to_rfc3339(),
        "amount": -money(rng, 100.0, 5000.0),
        "description": format!("Mock {category} transaction"),
        "category": category,
        "type": "expense",
    })
}

fn account(rng: &mut StdRng, i: usize) -> Value {
    let kind = pick(rng, &["savings", "current", "credit", "investment"]);
    json!({
        "id": format!("{MOCK_ID_PREFIX}acc_{i:04}"),
        "name": format!("Mock {kind} account {i}"),
        "type": kind,
        "balance": money(rng, 1000.0, 500_000.0),
        "currency": "INR",
        "bank": pick(rng, &BANKS),
        "is_active": true,
    })
}

fn investment(rng: &mut StdRng, i: usize, today: DateTime<Utc>) -> Value {
    let purchase_price = money(rng, 5000.0, 200_000.0);
    let current_value = money(rng, purchase_price * 0.7, purchase_price * 1.5);
    json!({
        "id": format!("{MOCK_ID_PREFIX}inv_{i:04}"),
        "name": format!("Mock Fund {i}"),
        "type": pick(rng, &["mutual_fund", "stock", "bond", "etf", "ppf"]),
        "current_value": current_value,
        "purchase_price": purchase_price,
        "units": money(rng, 1.0, 5000.0),
        "purchase_date": (today - Duration::days(rng.gen_range(30..=1825))).to_rfc3339(),
        "risk_level": pick(rng, &["low", "medium", "high"]),
    })
}

fn liability(rng: &mut StdRng, i: usize) -> Value {
    let original_amount = money(rng, 50_000.0, 5_000_000.0);
    let balance = money(rng, original_amount * 0.2, original_amount);
    let interest_rate = money(rng, 6.0, 18.0);
    // Payment covers the monthly interest plus at least 0.5% of principal.
    let monthly_interest = balance * interest_rate / 1200.0;
    let monthly_payment = money(rng, monthly_interest + balance * 0.005, monthly_interest + balance * 0.05);
    json!({
        "id": format!("{MOCK_ID_PREFIX}loan_{i:04}"),
        "name": format!("Mock Loan {i}"),
        "type": pick(rng, &["home_loan", "personal_loan", "car_loan", "credit_card"]),
        "balance": balance,
        "original_amount": original_amount,
        "interest_rate": interest_rate,
        "monthly_payment": monthly_payment,
        "emi_date": rng.gen_range(1..=28),
    })
}

fn asset(rng: &mut StdRng, i: usize, today: DateTime<Utc>) -> Value {
    json!({
        "id": format!("{MOCK_ID_PREFIX}asset_{i:04}"),
        "name": format!("Mock Asset {i}"),
        "type": pick(rng, &["property", "vehicle", "jewelry", "electronics", "other"]),
        "value": money(rng, 10_000.0, 10_000_000.0),
        "purchase_date": (today - Duration::days(rng.gen_range(30..=3650))).to_rfc3339(),
        "depreciation_rate": money(rng, 0.0, 20.0),
    })
}

#[async_trait]
impl SourceLoader for MockLoader {
    fn name(&self) -> &str {
        "Mock"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Mock
    }

    async fn load(&self, config: &DataSourceConfig, _data_dir: &Path) -> Result<SourceBatch> {
        let Ok(kind) = config.schema_name.parse::<EntityKind>() else {
            warn!(
                source = %config.name,
                schema = %config.schema_name,
                "No mock generator for schema"
            );
            return Ok(SourceBatch::new());
        };

        let records = self.generate(kind, midnight_today());
        debug!(source = %config.name, count = records.len(), "Generated mock records");
        Ok(SourceBatch::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_validate::Validator;

    fn config(schema: &str) -> DataSourceConfig {
        DataSourceConfig::new("mock", SourceType::Mock, "", schema)
    }

    #[tokio::test]
    async fn test_generates_default_count_with_prefixed_ids() {
        let batch = MockLoader::new()
            .load(&config("transaction"), Path::new("."))
            .await
            .unwrap();
        assert_eq!(batch.len(), DEFAULT_RECORD_COUNT);
        assert!(
            batch
                .records()
                .all(|r| r["id"].as_str().is_some_and(|id| id.starts_with("mock_txn_")))
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let today = midnight_today();
        let loader = MockLoader::new().with_count(10);
        for kind in EntityKind::ALL {
            assert_eq!(loader.generate(kind, today), loader.generate(kind, today));
        }
        assert_ne!(
            loader.generate(EntityKind::Asset, today),
            loader.with_seed(7).generate(EntityKind::Asset, today)
        );
    }

    #[test]
    fn test_every_generated_record_validates() {
        let validator = Validator::new();
        let loader = MockLoader::new();
        for kind in EntityKind::ALL {
            let records = loader.generate(kind, midnight_today());
            let outcome = validator.validate_bulk(&records, kind.as_str()).unwrap();
            assert_eq!(outcome.invalid_count(), 0, "{kind}: {:?}", outcome.error_summary());
            assert_eq!(outcome.valid_count(), DEFAULT_RECORD_COUNT);
        }
    }

    #[tokio::test]
    async fn test_unknown_schema_is_empty() {
        let batch = MockLoader::new()
            .load(&config("budget"), Path::new("."))
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_custom_count() {
        let batch = MockLoader::new()
            .with_count(3)
            .load(&config("account"), Path::new("."))
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
    }
}
