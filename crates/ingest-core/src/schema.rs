//! Schema registry and field rules.
//!
//! A [`Schema`] is an ordered list of named [`FieldRule`]s describing one entity
//! type. The [`SchemaRegistry`] ships with the five built-in finance schemas and
//! is immutable once shared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{IngestError, Result};

/// Built-in entity types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A single debit or credit on an account.
    Transaction,
    /// A bank or wallet account.
    Account,
    /// A holding such as a fund, stock or deposit.
    Investment,
    /// A loan or other debt.
    Liability,
    /// A physical or other non-financial asset.
    Asset,
}

impl EntityKind {
    /// All built-in entity kinds.
    pub const ALL: [Self; 5] = [
        Self::Transaction,
        Self::Account,
        Self::Investment,
        Self::Liability,
        Self::Asset,
    ];

    /// Returns the schema name for this entity kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Account => "account",
            Self::Investment => "investment",
            Self::Liability => "liability",
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transaction" => Ok(Self::Transaction),
            "account" => Ok(Self::Account),
            "investment" => Ok(Self::Investment),
            "liability" => Ok(Self::Liability),
            "asset" => Ok(Self::Asset),
            other => Err(IngestError::SchemaNotFound(other.to_string())),
        }
    }
}

/// Runtime type a field is coerced to during validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    String,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// True or false.
    Boolean,
    /// Point in time, normalized to UTC.
    Date,
    /// One of a fixed set of lower-case values.
    Enum,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Validation rule for a single field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Type the value is coerced to.
    pub field_type: FieldType,
    /// Whether the field must be present and non-empty.
    pub required: bool,
    /// Allowed values for [`FieldType::Enum`] fields.
    pub enum_values: Option<Vec<String>>,
    /// Inclusive lower bound for numbers, or Unix seconds for dates.
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers, or Unix seconds for dates.
    pub max: Option<f64>,
    /// Maximum character count for string fields.
    pub max_length: Option<usize>,
}

impl FieldRule {
    /// Creates an optional rule of the given type with no constraints.
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            enum_values: None,
            min: None,
            max: None,
            max_length: None,
        }
    }

    /// Optional string field.
    #[must_use]
    pub const fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Optional number field.
    #[must_use]
    pub const fn number() -> Self {
        Self::new(FieldType::Number)
    }

    /// Optional integer field.
    #[must_use]
    pub const fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    /// Optional boolean field.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Optional date field.
    #[must_use]
    pub const fn date() -> Self {
        Self::new(FieldType::Date)
    }

    /// Optional enum field restricted to `values`.
    ///
    /// Values are stored lower-cased since enum input is case-folded.
    #[must_use]
    pub fn one_of(values: &[&str]) -> Self {
        Self {
            enum_values: Some(values.iter().map(|v| v.to_lowercase()).collect()),
            ..Self::new(FieldType::Enum)
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the inclusive lower bound.
    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the maximum string length in characters.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Returns true if `value` is allowed by this rule's enum set.
    ///
    /// Rules without an enum set accept anything.
    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        self.enum_values
            .as_ref()
            .is_none_or(|values| values.iter().any(|v| v == value))
    }
}

/// Named, ordered set of field rules for one entity type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field rule, replacing any existing rule with the same name.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entity kind if this is a built-in schema.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        self.name.parse().ok()
    }

    /// Iterates over field rules in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Looks up the rule for a field.
    #[must_use]
    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, r)| r)
    }

    /// Names of required fields in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, r)| r.required)
            .map(|(n, _)| n.as_str())
    }
}

/// Immutable lookup table from schema name to [`Schema`].
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Creates a registry holding the five built-in finance schemas.
    #[must_use]
    pub fn new() -> Self {
        let schemas = EntityKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), builtin_schema(*kind)))
            .collect();
        Self { schemas }
    }

    /// Creates a registry with no schemas.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Adds or replaces a schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schemas.insert(schema.name().to_string(), schema);
        self
    }

    /// Looks up a schema by name.
    ///
    /// # Errors
    /// Returns [`IngestError::SchemaNotFound`] for unknown names.
    pub fn get_schema(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| IngestError::SchemaNotFound(name.to_string()))
    }

    /// Returns true if a schema with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schema names in sorted order.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

fn builtin_schema(kind: EntityKind) -> Schema {
    let schema = Schema::new(kind.as_str())
        .field("id", FieldRule::string().required().max_length(100));

    match kind {
        EntityKind::Transaction => schema
            .field("date", FieldRule::date().required())
            .field("amount", FieldRule::number().required())
            .field("description", FieldRule::string().required().max_length(500))
            .field("category", FieldRule::string().required().max_length(100))
            .field("type", FieldRule::one_of(&["income", "expense", "transfer"]))
            .field("account", FieldRule::string().max_length(100))
            .field("merchant", FieldRule::string().max_length(200))
            .field("reference", FieldRule::string()),
        EntityKind::Account => schema
            .field("name", FieldRule::string().required().max_length(200))
            .field(
                "type",
                FieldRule::one_of(&[
                    "savings",
                    "current",
                    "credit",
                    "investment",
                    "epf",
                    "checking",
                ])
                .required(),
            )
            .field("balance", FieldRule::number().required().min(0.0))
            .field("currency", FieldRule::one_of(&["inr", "usd", "eur"]))
            .field("bank", FieldRule::string().max_length(100))
            .field("account_number", FieldRule::string())
            .field("is_active", FieldRule::boolean())
            .field("last_updated", FieldRule::date()),
        EntityKind::Investment => schema
            .field("name", FieldRule::string().required().max_length(200))
            .field(
                "type",
                FieldRule::one_of(&[
                    "mutual_fund",
                    "stock",
                    "bond",
                    "fd",
                    "ppf",
                    "elss",
                    "etf",
                    "equity",
                    "debt",
                    "fixed_deposit",
                ])
                .required(),
            )
            .field("current_value", FieldRule::number().required().min(0.0))
            .field("units", FieldRule::number().min(0.0))
            .field("purchase_price", FieldRule::number().min(0.0))
            .field("purchase_date", FieldRule::date())
            .field("returns", FieldRule::number())
            .field("risk_level", FieldRule::one_of(&["low", "medium", "high"]))
            .field("portfolio_percentage", FieldRule::number().min(0.0).max(100.0)),
        EntityKind::Liability => schema
            .field("name", FieldRule::string().required().max_length(200))
            .field(
                "type",
                FieldRule::one_of(&[
                    "home_loan",
                    "personal_loan",
                    "car_loan",
                    "credit_card",
                    "other",
                    "mortgage",
                    "auto",
                ])
                .required(),
            )
            .field("balance", FieldRule::number().required().min(0.0))
            .field("original_amount", FieldRule::number().min(0.0))
            .field("interest_rate", FieldRule::number().required().min(0.0).max(100.0))
            .field("monthly_payment", FieldRule::number().min(0.0))
            .field("emi_date", FieldRule::integer().min(1.0).max(31.0))
            .field("tenure_months", FieldRule::integer().min(1.0))
            .field("remaining_months", FieldRule::integer().min(0.0)),
        EntityKind::Asset => schema
            .field("name", FieldRule::string().required().max_length(200))
            .field(
                "type",
                FieldRule::one_of(&["property", "vehicle", "jewelry", "electronics", "other"])
                    .required(),
            )
            .field("value", FieldRule::number().required().min(0.0))
            .field("purchase_date", FieldRule::date())
            .field("depreciation_rate", FieldRule::number().min(0.0).max(100.0))
            .field("location", FieldRule::string())
            .field("description", FieldRule::string().max_length(500)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas_present() {
        let registry = SchemaRegistry::new();
        for kind in EntityKind::ALL {
            let schema = registry.get_schema(kind.as_str()).unwrap();
            assert_eq!(schema.kind(), Some(kind));
            assert!(schema.rule("id").unwrap().required);
        }
    }

    #[test]
    fn test_unknown_schema() {
        let registry = SchemaRegistry::new();
        let err = registry.get_schema("pension").unwrap_err();
        assert_eq!(err, IngestError::SchemaNotFound("pension".to_string()));
    }

    #[test]
    fn test_required_fields_in_order() {
        let registry = SchemaRegistry::new();
        let schema = registry.get_schema("transaction").unwrap();
        let required: Vec<_> = schema.required_fields().collect();
        assert_eq!(
            required,
            vec!["id", "date", "amount", "description", "category"]
        );
    }

    #[test]
    fn test_with_schema_replaces() {
        let custom = Schema::new("account").field("id", FieldRule::string().required());
        let registry = SchemaRegistry::new().with_schema(custom);
        let schema = registry.get_schema("account").unwrap();
        assert_eq!(schema.fields().count(), 1);
    }

    #[test]
    fn test_enum_values_lowercased() {
        let rule = FieldRule::one_of(&["INR", "Usd"]);
        assert!(rule.allows("inr"));
        assert!(rule.allows("usd"));
        assert!(!rule.allows("INR"));
        assert!(FieldRule::string().allows("anything"));
    }

    #[test]
    fn test_entity_kind_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("loan".parse::<EntityKind>().is_err());
    }
}
