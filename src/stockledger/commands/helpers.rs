use crate::error::{LedgerError, Result};
use crate::model::{Fields, Product};
use crate::view::{search_products, LedgerView};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Encodes a typed record as the field bag written to the store.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Fields::new()),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses user-typed `YYYY-MM-DD` text.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", text)))
}

/// Millisecond timestamp used in generated references such as `Venta-1718000000000`.
pub fn reference_token() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Finds exactly one product by store id, exact sku, or name/sku substring.
pub fn resolve_product(view: &LedgerView, selector: &str) -> Result<Product> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(LedgerError::Validation("No product selected".to_string()));
    }

    if let Some(product) = view.product(selector) {
        return Ok(product.clone());
    }

    let by_sku: Vec<&Product> = view
        .products()
        .iter()
        .filter(|p| {
            p.sku
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(selector))
        })
        .collect();
    if by_sku.len() == 1 {
        return Ok(by_sku[0].clone());
    }

    let matches = search_products(view.products(), Some(selector), None);
    match matches.as_slice() {
        [] => Err(LedgerError::Validation(format!(
            "No product matches '{}'",
            selector
        ))),
        [only] => Ok((*only).clone()),
        many => Err(LedgerError::Validation(format!(
            "'{}' matches {} products: {}",
            selector,
            many.len(),
            many.iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Runs the steps of a non-transactional write in order.
///
/// The first failing step ends the sequence. A failure before anything was
/// written passes through unchanged; a later one becomes
/// [`LedgerError::PartialWrite`].
#[derive(Debug, Default)]
pub(crate) struct WriteSteps {
    completed: Vec<String>,
}

impl WriteSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<T>(&mut self, step: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        match op() {
            Ok(value) => {
                self.completed.push(step.to_string());
                Ok(value)
            }
            Err(err) if self.completed.is_empty() => Err(err),
            Err(err) => {
                warn!(
                    completed = ?self.completed,
                    failed_step = step,
                    error = %err,
                    "multi-step write left partially applied"
                );
                Err(LedgerError::PartialWrite {
                    completed: self.completed.clone(),
                    failed_step: step.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}
