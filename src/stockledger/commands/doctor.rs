//! Reconciliation report.
//!
//! Multi-step writes are not transactional, so an interrupted command can leave
//! stock changed without the records that explain it. `doctor` looks for the
//! traces of such gaps and lists them. Nothing is repaired.
//!
//! Checks:
//!
//! - movements and shrinkages pointing at a product that no longer exists
//! - products with negative stock
//! - outbound movements with no same-day income record for `price * quantity`
//!
//! The sale check uses the product's current price, so a price edited after
//! the sale also shows up here.

use crate::commands::{CmdMessage, CmdResult};
use crate::model::{Collection, MoneyType, MovementType};
use crate::view::LedgerView;
use std::collections::HashSet;

const AMOUNT_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq)]
pub struct DanglingReference {
    pub collection: Collection,
    pub id: String,
    pub product_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegativeStock {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnbookedSale {
    pub movement_id: String,
    pub product_name: String,
    pub date: String,
    pub expected_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorReport {
    pub dangling: Vec<DanglingReference>,
    pub negative_stock: Vec<NegativeStock>,
    pub unbooked_sales: Vec<UnbookedSale>,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.negative_stock.is_empty() && self.unbooked_sales.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.dangling.len() + self.negative_stock.len() + self.unbooked_sales.len()
    }
}

pub fn run(view: &LedgerView) -> DoctorReport {
    let mut report = DoctorReport::default();

    for movement in view.movements() {
        if view.product(&movement.product_id).is_none() {
            report.dangling.push(DanglingReference {
                collection: Collection::Movements,
                id: movement.id.clone(),
                product_id: movement.product_id.clone(),
            });
        }
    }
    for shrinkage in view.shrinkages() {
        if view.product(&shrinkage.product_id).is_none() {
            report.dangling.push(DanglingReference {
                collection: Collection::Shrinkages,
                id: shrinkage.id.clone(),
                product_id: shrinkage.product_id.clone(),
            });
        }
    }

    report.negative_stock = view
        .products()
        .iter()
        .filter(|p| p.stock() < 0)
        .map(|p| NegativeStock {
            product_id: p.id.clone(),
            name: p.name.clone(),
            stock: p.stock(),
        })
        .collect();

    // Each income record can account for one sale only
    let mut matched: HashSet<&str> = HashSet::new();
    for movement in view.movements() {
        if movement.movement_type != Some(MovementType::Salida) {
            continue;
        }
        let Some(product) = view.product(&movement.product_id) else {
            continue;
        };
        let expected = product.price() * movement.quantity() as f64;
        let date = movement.date.clone().unwrap_or_default();

        let income = view.money().iter().find(|m| {
            m.money_type == Some(MoneyType::Ingreso)
                && m.date.as_deref().unwrap_or_default() == date
                && (m.amount() - expected).abs() < AMOUNT_TOLERANCE
                && !matched.contains(m.id.as_str())
        });
        match income {
            Some(record) => {
                matched.insert(record.id.as_str());
            }
            None => report.unbooked_sales.push(UnbookedSale {
                movement_id: movement.id.clone(),
                product_name: product.name.clone(),
                date,
                expected_amount: expected,
            }),
        }
    }

    report
}

/// The report as leveled messages, one per finding.
pub fn messages(report: &DoctorReport) -> CmdResult {
    let mut result = CmdResult::default();
    if report.is_clean() {
        result.add_message(CmdMessage::success("No inconsistencies found"));
        return result;
    }

    for item in &report.dangling {
        result.add_message(CmdMessage::warning(format!(
            "{} {} points at missing product {}",
            item.collection, item.id, item.product_id
        )));
    }
    for item in &report.negative_stock {
        result.add_message(CmdMessage::error(format!(
            "{} has negative stock ({})",
            item.name, item.stock
        )));
    }
    for item in &report.unbooked_sales {
        result.add_message(CmdMessage::warning(format!(
            "Sale of {} on {} has no income record of {}",
            item.product_name, item.date, item.expected_amount
        )));
    }
    result.add_message(CmdMessage::info(format!(
        "{} issue(s) found; nothing was changed",
        report.issue_count()
    )));
    result
}
