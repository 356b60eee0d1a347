//! Period reports and the filtered listings behind the list commands.

use crate::error::{LedgerError, Result};
use crate::model::{MoneyRecord, MoneyType, Movement, MovementType, Product, Shrinkage};
use crate::view::{
    aggregate_money, aggregate_shrinkage_loss, filter_by_date_range, inventory_value, low_stock,
    movement_totals, search_products, sort_by_date_desc, DateField, DateRange, LedgerView,
    MoneySummary, MovementTotals,
};
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Custom(DateRange),
}

impl Period {
    pub fn range(&self, today: NaiveDate) -> DateRange {
        match self {
            Period::Daily => DateRange::day(today),
            Period::Weekly => DateRange::last_days(today, 7),
            Period::Monthly => DateRange::new(today.with_day(1), Some(today)),
            Period::Custom(range) => *range,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Daily => "Diario",
            Period::Weekly => "Semanal",
            Period::Monthly => "Mensual",
            Period::Custom(_) => "Personalizado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    General,
    Products,
    Movements,
    Shrinkage,
    Money,
}

impl ReportKind {
    fn includes(&self, section: ReportKind) -> bool {
        *self == ReportKind::General || *self == section
    }
}

impl FromStr for ReportKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(ReportKind::General),
            "products" => Ok(ReportKind::Products),
            "movements" => Ok(ReportKind::Movements),
            "shrinkage" => Ok(ReportKind::Shrinkage),
            "money" => Ok(ReportKind::Money),
            other => Err(LedgerError::Validation(format!(
                "Unknown report type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSection {
    pub count: usize,
    pub inventory_value: f64,
    pub low_stock_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementSection {
    pub count: usize,
    pub entry_count: usize,
    pub exit_count: usize,
    pub totals: MovementTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkageSection {
    pub count: usize,
    pub loss: f64,
}

/// Sections are `None` when the report kind leaves them out. The product
/// section is a point-in-time view and ignores the period.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub period_label: &'static str,
    pub range: DateRange,
    pub products: Option<ProductSection>,
    pub movements: Option<MovementSection>,
    pub shrinkage: Option<ShrinkageSection>,
    pub money: Option<MoneySummary>,
}

pub fn build(view: &LedgerView, kind: ReportKind, period: Period, today: NaiveDate) -> Report {
    let range = period.range(today);

    let products = kind.includes(ReportKind::Products).then(|| ProductSection {
        count: view.products().len(),
        inventory_value: inventory_value(view.products()),
        low_stock_count: low_stock(view.products()).len(),
    });

    let movements = kind.includes(ReportKind::Movements).then(|| {
        let rows = filter_by_date_range(view.movements(), DateField::Date, range.from, range.to);
        let count_of = |t: MovementType| rows.iter().filter(|m| m.movement_type == Some(t)).count();
        MovementSection {
            count: rows.len(),
            entry_count: count_of(MovementType::Entrada),
            exit_count: count_of(MovementType::Salida),
            totals: movement_totals(&rows),
        }
    });

    let shrinkage = kind.includes(ReportKind::Shrinkage).then(|| {
        let rows = filter_by_date_range(view.shrinkages(), DateField::Date, range.from, range.to);
        ShrinkageSection {
            count: rows.len(),
            loss: aggregate_shrinkage_loss(&rows),
        }
    });

    let money = kind.includes(ReportKind::Money).then(|| {
        aggregate_money(&filter_by_date_range(
            view.money(),
            DateField::Date,
            range.from,
            range.to,
        ))
    });

    Report {
        kind,
        period_label: period.label(),
        range,
        products,
        movements,
        shrinkage,
        money,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementListing {
    pub rows: Vec<Movement>,
    pub totals: MovementTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkageListing {
    pub rows: Vec<Shrinkage>,
    pub loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoneyListing {
    pub rows: Vec<MoneyRecord>,
    pub summary: MoneySummary,
}

pub fn list_products(view: &LedgerView, term: Option<&str>, category: Option<&str>) -> Vec<Product> {
    search_products(view.products(), term, category)
        .into_iter()
        .cloned()
        .collect()
}

/// Movements in `range`, newest first; totals cover the listed rows.
pub fn list_movements(
    view: &LedgerView,
    range: DateRange,
    movement_type: Option<MovementType>,
) -> MovementListing {
    let mut rows: Vec<Movement> =
        filter_by_date_range(view.movements(), DateField::Date, range.from, range.to)
            .into_iter()
            .filter(|m| movement_type.is_none() || m.movement_type == movement_type)
            .collect();
    sort_by_date_desc(&mut rows);
    let totals = movement_totals(&rows);
    MovementListing { rows, totals }
}

pub fn list_shrinkages(view: &LedgerView, range: DateRange) -> ShrinkageListing {
    let mut rows = filter_by_date_range(view.shrinkages(), DateField::Date, range.from, range.to);
    sort_by_date_desc(&mut rows);
    let loss = aggregate_shrinkage_loss(&rows);
    ShrinkageListing { rows, loss }
}

pub fn list_money(
    view: &LedgerView,
    range: DateRange,
    money_type: Option<MoneyType>,
) -> MoneyListing {
    let mut rows: Vec<MoneyRecord> =
        filter_by_date_range(view.money(), DateField::Date, range.from, range.to)
            .into_iter()
            .filter(|m| money_type.is_none() || m.money_type == money_type)
            .collect();
    sort_by_date_desc(&mut rows);
    let summary = aggregate_money(&rows);
    MoneyListing { rows, summary }
}
