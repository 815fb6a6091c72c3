use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::model::{REPO_INVALID_TABLE, VALIDATION_DUPLICATE_FIELD};

/// Static description of one domain table: its name plus the handful of
/// behavioural switches the accessor layer consults.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    /// Rows are written once and never updated.
    pub append_only: bool,
    /// Rows may be edited but not deleted through the generic accessors.
    pub protected: bool,
    /// Money columns, in minor units, covered by the integrity rules.
    pub amount_columns: &'static [&'static str],
}

pub const DOMAIN_TABLES: &[TableSpec] = &[
    TableSpec {
        name: "users",
        append_only: false,
        protected: false,
        amount_columns: &[],
    },
    TableSpec {
        name: "properties",
        append_only: false,
        protected: false,
        amount_columns: &["price"],
    },
    TableSpec {
        name: "units",
        append_only: false,
        protected: false,
        amount_columns: &["rent_amount"],
    },
    TableSpec {
        name: "tenants",
        append_only: false,
        protected: false,
        amount_columns: &[],
    },
    TableSpec {
        name: "guarantors",
        append_only: false,
        protected: false,
        amount_columns: &[],
    },
    TableSpec {
        name: "leases",
        append_only: false,
        protected: false,
        amount_columns: &["rent_amount", "deposit"],
    },
    TableSpec {
        name: "payments",
        append_only: false,
        protected: false,
        amount_columns: &["amount"],
    },
    TableSpec {
        name: "maintenance",
        append_only: false,
        protected: false,
        amount_columns: &["cost"],
    },
    TableSpec {
        name: "requests",
        append_only: false,
        protected: false,
        amount_columns: &[],
    },
    TableSpec {
        name: "audit_logs",
        append_only: true,
        protected: false,
        amount_columns: &[],
    },
    TableSpec {
        name: "expenses",
        append_only: false,
        protected: false,
        amount_columns: &["amount"],
    },
    TableSpec {
        name: "settings",
        append_only: false,
        protected: true,
        amount_columns: &[],
    },
];

pub fn table_spec(table: &str) -> Option<&'static TableSpec> {
    DOMAIN_TABLES.iter().find(|spec| spec.name == table)
}

pub fn ensure_table(table: &str) -> AppResult<&'static TableSpec> {
    table_spec(table).ok_or_else(|| {
        AppError::new(REPO_INVALID_TABLE, "Unknown table").with_context("table", table.to_string())
    })
}

/// Renames that a plain case fold cannot derive. Applied after folding, so
/// both `Type` and `type` land on `kind`.
static KEY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("_id", "id");
    m.insert("type", "kind");
    m
});

/// Folds any identifier spelling callers have historically used (camelCase,
/// `fieldID` suffixes, Mongo-style `_id`) onto the single snake_case column
/// name the schema stores. Already-canonical names pass through unchanged.
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    let mut folded = String::with_capacity(trimmed.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev_lower || (prev_upper && next_lower) {
                folded.push('_');
            }
            folded.push(c.to_ascii_lowercase());
        } else {
            folded.push(c);
        }
    }
    match KEY_ALIASES.get(folded.as_str()) {
        Some(mapped) => (*mapped).to_string(),
        None => folded,
    }
}

/// Rewrites every key of an incoming payload to its canonical column name.
/// Two raw keys folding onto the same column is a caller bug and is refused
/// rather than letting one silently win.
pub fn canonicalize_payload(data: Map<String, Value>) -> AppResult<Map<String, Value>> {
    let mut out = Map::with_capacity(data.len());
    for (raw, value) in data {
        let key = canonical_key(&raw);
        if out.contains_key(&key) {
            return Err(AppError::new(
                VALIDATION_DUPLICATE_FIELD,
                "Payload spells the same column twice",
            )
            .with_context("column", key)
            .with_context("raw_key", raw));
        }
        out.insert(key, value);
    }
    Ok(out)
}
