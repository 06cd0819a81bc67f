//! Entity-specific normalization rules applied to valid records.
//!
//! These run after type coercion, so every declared field they read already
//! carries its schema type.

use chrono::{DateTime, Utc};
use ingest_core::{EntityKind, FieldValue, NormalizedRecord};

/// Mapping from free-form transaction categories to canonical ones.
const CATEGORY_ALIASES: [(&str, &str); 22] = [
    ("food", "food_dining"),
    ("restaurant", "food_dining"),
    ("dining", "food_dining"),
    ("groceries", "food_dining"),
    ("grocery", "food_dining"),
    ("transport", "transportation"),
    ("taxi", "transportation"),
    ("uber", "transportation"),
    ("ola", "transportation"),
    ("fuel", "transportation"),
    ("petrol", "transportation"),
    ("utilities", "bills_utilities"),
    ("electricity", "bills_utilities"),
    ("phone", "bills_utilities"),
    ("internet", "bills_utilities"),
    ("entertainment", "entertainment"),
    ("movies", "entertainment"),
    ("gaming", "entertainment"),
    ("shopping", "shopping"),
    ("retail", "shopping"),
    ("clothes", "shopping"),
    ("clothing", "shopping"),
];

/// Default account currency.
pub const DEFAULT_CURRENCY: &str = "inr";

const DAYS_PER_YEAR: f64 = 365.25;

/// Applies the rules for `kind` to a freshly coerced record.
pub fn normalize(record: &mut NormalizedRecord, kind: EntityKind, now: DateTime<Utc>) {
    match kind {
        EntityKind::Transaction => normalize_transaction(record),
        EntityKind::Account => normalize_account(record),
        EntityKind::Investment => normalize_investment(record),
        EntityKind::Asset => normalize_asset(record, now),
        EntityKind::Liability => normalize_liability(record),
    }
}

/// Lower-cases a category and maps known aliases to canonical names.
#[must_use]
pub fn canonical_category(category: &str) -> String {
    let lowered = category.trim().to_lowercase();
    CATEGORY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or(lowered.clone(), |(_, canonical)| (*canonical).to_string())
}

fn normalize_transaction(record: &mut NormalizedRecord) {
    if let Some(category) = record.text("category").map(canonical_category) {
        record.set("category", FieldValue::Text(category));
    }
}

fn normalize_account(record: &mut NormalizedRecord) {
    if record.get("currency").is_none() {
        record.set("currency", FieldValue::Enum(DEFAULT_CURRENCY.to_string()));
    }
}

fn normalize_investment(record: &mut NormalizedRecord) {
    let (Some(current), Some(purchase)) =
        (record.number("current_value"), record.number("purchase_price"))
    else {
        return;
    };
    if purchase > 0.0 {
        let returns = (current - purchase) / purchase * 100.0;
        record.set("returns", FieldValue::Number(round2(returns)));
    }
}

fn normalize_asset(record: &mut NormalizedRecord, now: DateTime<Utc>) {
    let (Some(value), Some(purchased), Some(rate)) = (
        record.number("value"),
        record.date("purchase_date"),
        record.number("depreciation_rate"),
    ) else {
        return;
    };
    let years = now.signed_duration_since(purchased).num_days() as f64 / DAYS_PER_YEAR;
    let depreciated = value - value * (rate / 100.0) * years.max(0.0);
    record.set(
        "depreciated_value",
        FieldValue::Number(round2(depreciated.max(0.0))),
    );
}

fn normalize_liability(record: &mut NormalizedRecord) {
    let (Some(balance), Some(payment), Some(rate)) = (
        record.number("balance"),
        record.number("monthly_payment"),
        record.number("interest_rate"),
    ) else {
        return;
    };
    if let Some(months) = payoff_months(balance, payment, rate) {
        record.set("estimated_payoff_months", FieldValue::Integer(months));
    }
}

/// Months needed to repay `balance` at `payment` per month and `annual_rate` percent.
///
/// Returns `None` when the payment never covers the monthly interest.
#[must_use]
pub fn payoff_months(balance: f64, payment: f64, annual_rate: f64) -> Option<i64> {
    if balance <= 0.0 || payment <= 0.0 {
        return Some(0);
    }
    let monthly_rate = annual_rate / 100.0 / 12.0;
    if monthly_rate == 0.0 {
        return Some((balance / payment).ceil() as i64);
    }
    let interest = balance * monthly_rate;
    if payment <= interest {
        return None;
    }
    let months = -(1.0 - interest / payment).ln() / (1.0 + monthly_rate).ln();
    Some(months.round() as i64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn record(schema: &str, fields: Vec<(&str, FieldValue)>) -> NormalizedRecord {
        let fields: BTreeMap<_, _> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        NormalizedRecord::new(schema, fields, Utc::now())
    }

    #[test]
    fn test_canonical_category() {
        assert_eq!(canonical_category("Groceries"), "food_dining");
        assert_eq!(canonical_category(" UBER "), "transportation");
        assert_eq!(canonical_category("salary"), "salary");
    }

    #[test]
    fn test_transaction_category_mapped() {
        let mut txn = record(
            "transaction",
            vec![("category", FieldValue::Text("Petrol".into()))],
        );
        normalize(&mut txn, EntityKind::Transaction, Utc::now());
        assert_eq!(txn.text("category"), Some("transportation"));
    }

    #[test]
    fn test_account_default_currency() {
        let mut account = record("account", vec![]);
        normalize(&mut account, EntityKind::Account, Utc::now());
        assert_eq!(account.text("currency"), Some("inr"));

        let mut usd = record("account", vec![("currency", FieldValue::Enum("usd".into()))]);
        normalize(&mut usd, EntityKind::Account, Utc::now());
        assert_eq!(usd.text("currency"), Some("usd"));
    }

    #[test]
    fn test_investment_returns() {
        let mut inv = record(
            "investment",
            vec![
                ("current_value", FieldValue::Number(85000.0)),
                ("purchase_price", FieldValue::Number(80000.0)),
            ],
        );
        normalize(&mut inv, EntityKind::Investment, Utc::now());
        assert_eq!(inv.number("returns"), Some(6.25));
    }

    #[test]
    fn test_asset_depreciation() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let purchased = Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap();
        let mut asset = record(
            "asset",
            vec![
                ("value", FieldValue::Number(100_000.0)),
                ("purchase_date", FieldValue::Date(purchased)),
                ("depreciation_rate", FieldValue::Number(10.0)),
            ],
        );
        normalize(&mut asset, EntityKind::Asset, now);
        assert_eq!(asset.number("depreciated_value"), Some(60_000.0));

        let mut fully = record(
            "asset",
            vec![
                ("value", FieldValue::Number(1000.0)),
                ("purchase_date", FieldValue::Date(purchased)),
                ("depreciation_rate", FieldValue::Number(50.0)),
            ],
        );
        normalize(&mut fully, EntityKind::Asset, now);
        assert_eq!(fully.number("depreciated_value"), Some(0.0));
    }

    #[test]
    fn test_payoff_months() {
        assert_eq!(payoff_months(12_000.0, 1000.0, 0.0), Some(12));
        assert_eq!(payoff_months(0.0, 1000.0, 10.0), Some(0));
        assert_eq!(payoff_months(2_500_000.0, 10_000.0, 7.5), None);

        let months = payoff_months(2_500_000.0, 18_500.0, 7.5).unwrap();
        assert_eq!(months, 299);
    }
}
