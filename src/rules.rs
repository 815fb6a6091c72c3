use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::model::{VALIDATION_LEASE_DATE_ORDER, VALIDATION_NEGATIVE_AMOUNT};
use crate::schema::TableSpec;

/// Numeric and date invariants the schema itself does not carry. They are
/// checked at the accessor boundary, on by default, and can be switched off
/// for imports of historical data that predates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityRules {
    pub non_negative_amounts: bool,
    pub ordered_lease_dates: bool,
}

impl Default for IntegrityRules {
    fn default() -> Self {
        Self {
            non_negative_amounts: true,
            ordered_lease_dates: true,
        }
    }
}

impl IntegrityRules {
    /// The permissive legacy behaviour: nothing beyond what SQLite enforces.
    pub fn relaxed() -> Self {
        Self {
            non_negative_amounts: false,
            ordered_lease_dates: false,
        }
    }

    /// Rejects negative values in the table's money columns.
    pub fn check_amounts(&self, spec: &TableSpec, data: &Map<String, Value>) -> AppResult<()> {
        if !self.non_negative_amounts {
            return Ok(());
        }
        for col in spec.amount_columns {
            let Some(value) = data.get(*col) else {
                continue;
            };
            let negative = match value {
                Value::Number(n) => {
                    n.as_i64().map(|i| i < 0).unwrap_or(false)
                        || n.as_f64().map(|f| f < 0.0).unwrap_or(false)
                }
                _ => false,
            };
            if negative {
                return Err(AppError::new(
                    VALIDATION_NEGATIVE_AMOUNT,
                    "Amounts must not be negative",
                )
                .with_context("table", spec.name.to_string())
                .with_context("column", (*col).to_string())
                .with_context("value", value.to_string()));
            }
        }
        Ok(())
    }

    /// A lease must not end before it starts. Only enforced when both ends
    /// of the range are known.
    pub fn check_lease_dates(&self, start_date: Option<i64>, end_date: Option<i64>) -> AppResult<()> {
        if !self.ordered_lease_dates {
            return Ok(());
        }
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(AppError::new(
                    VALIDATION_LEASE_DATE_ORDER,
                    "Lease end date precedes its start date",
                )
                .with_context("start_date", start.to_string())
                .with_context("end_date", end.to_string()));
            }
        }
        Ok(())
    }
}
