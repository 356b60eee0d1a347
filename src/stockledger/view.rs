//! # Derived View Engine
//!
//! Pure functions from the current record set (plus filter parameters) to
//! derived views. Nothing here mutates its inputs or touches storage; every
//! snapshot is reduced from scratch by [`LedgerView::from_snapshot`].
//!
//! ## Missing Fields
//!
//! Aggregates never fail and never produce `NaN`: every numeric term goes
//! through the accessors on the model types, which read missing or unusable
//! values as zero (and `minStock` as 5).
//!
//! ## Dates
//!
//! Records carry dates as text. Range filters floor `from` to the start of its
//! day and ceil `to` to the last millisecond of its day, so `from == to` selects
//! exactly one calendar day. A record whose date text cannot be parsed never
//! matches a bounded range; with no bounds at all the input passes through
//! untouched.

use crate::model::{
    parse_timestamp, MoneyRecord, MoneyType, Movement, MovementType, Product, RecordType,
    Shrinkage, TaggedRecord, DELETED_PRODUCT_LABEL,
};
use crate::normalize::normalize;
use crate::store::Snapshot;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// The four typed collections, each in normalized order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    pub products: Vec<Product>,
    pub movements: Vec<Movement>,
    pub shrinkages: Vec<Shrinkage>,
    pub money: Vec<MoneyRecord>,
}

impl Partitioned {
    pub fn len(&self) -> usize {
        self.products.len() + self.movements.len() + self.shrinkages.len() + self.money.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decode<T: DeserializeOwned>(record: &TaggedRecord) -> Option<T> {
    match serde_json::from_value(Value::Object(record.fields.clone())) {
        Ok(typed) => Some(typed),
        Err(err) => {
            warn!(id = %record.id, error = %err, "skipping undecodable record");
            None
        }
    }
}

/// Splits records by type tag. Records with an unknown tag are left out.
pub fn partition(records: &[TaggedRecord]) -> Partitioned {
    let mut out = Partitioned::default();

    for record in records {
        match RecordType::parse(&record.record_type) {
            Some(RecordType::Product) => {
                if let Some(mut product) = decode::<Product>(record) {
                    product.id = record.id.clone();
                    out.products.push(product);
                }
            }
            Some(RecordType::Movement) => {
                if let Some(mut movement) = decode::<Movement>(record) {
                    movement.id = record.id.clone();
                    out.movements.push(movement);
                }
            }
            Some(RecordType::Shrinkage) => {
                if let Some(mut shrinkage) = decode::<Shrinkage>(record) {
                    shrinkage.id = record.id.clone();
                    out.shrinkages.push(shrinkage);
                }
            }
            Some(RecordType::Money) => {
                if let Some(mut money) = decode::<MoneyRecord>(record) {
                    money.id = record.id.clone();
                    out.money.push(money);
                }
            }
            None => debug!(id = %record.id, tag = %record.record_type, "ignoring unknown record type"),
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Date,
    CreatedAt,
}

/// Records that carry date text.
pub trait Dated {
    fn date_text(&self, field: DateField) -> Option<&str>;

    /// `date`, falling back to `createdAt` when `date` is absent or empty.
    fn activity_time(&self) -> Option<NaiveDateTime> {
        self.date_text(DateField::Date)
            .filter(|d| !d.is_empty())
            .or_else(|| self.date_text(DateField::CreatedAt))
            .and_then(parse_timestamp)
    }
}

macro_rules! impl_dated {
    ($($ty:ty),*) => {
        $(impl Dated for $ty {
            fn date_text(&self, field: DateField) -> Option<&str> {
                match field {
                    DateField::Date => self.date.as_deref(),
                    DateField::CreatedAt => self.created_at.as_deref(),
                }
            }
        })*
    };
}

impl_dated!(Movement, Shrinkage, MoneyRecord);

impl Dated for Product {
    fn date_text(&self, field: DateField) -> Option<&str> {
        match field {
            DateField::Date => None,
            DateField::CreatedAt => self.created_at.as_deref(),
        }
    }
}

pub fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    start_of_day(day) + Duration::milliseconds(86_399_999)
}

/// Inclusive day range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn day(day: NaiveDate) -> Self {
        Self::new(Some(day), Some(day))
    }

    /// `today - days` through `today`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self::new(Some(today - Duration::days(days)), Some(today))
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let after_start = self.from.map_or(true, |d| at >= start_of_day(d));
        let before_end = self.to.map_or(true, |d| at <= end_of_day(d));
        after_start && before_end
    }
}

pub fn filter_by_date_range<T: Dated + Clone>(
    items: &[T],
    field: DateField,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<T> {
    let range = DateRange::new(from, to);
    if range.is_unbounded() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| {
            item.date_text(field)
                .and_then(parse_timestamp)
                .map(|at| range.contains(at))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoneySummary {
    pub income_total: f64,
    pub expense_total: f64,
    pub balance: f64,
}

pub fn aggregate_money(records: &[MoneyRecord]) -> MoneySummary {
    let mut summary = MoneySummary::default();
    for record in records {
        match record.money_type {
            Some(MoneyType::Ingreso) => summary.income_total += record.amount(),
            Some(MoneyType::Salida) => summary.expense_total += record.amount(),
            None => {}
        }
    }
    summary.balance = summary.income_total - summary.expense_total;
    summary
}

pub fn aggregate_shrinkage_loss(records: &[Shrinkage]) -> f64 {
    records.iter().map(Shrinkage::total).sum()
}

pub fn low_stock(products: &[Product]) -> Vec<&Product> {
    products.iter().filter(|p| p.is_low_stock()).collect()
}

pub fn inventory_value(products: &[Product]) -> f64 {
    products.iter().map(Product::stock_value).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementTotals {
    pub entries: i64,
    pub exits: i64,
}

/// Quantity moved in and out, summed over `movements`.
pub fn movement_totals(movements: &[Movement]) -> MovementTotals {
    let mut totals = MovementTotals::default();
    for movement in movements {
        match movement.movement_type {
            Some(MovementType::Entrada) => totals.entries += movement.quantity(),
            Some(MovementType::Salida) => totals.exits += movement.quantity(),
            None => {}
        }
    }
    totals
}

/// Distinct non-empty categories in first-seen order.
pub fn categories_of(products: &[Product]) -> Vec<String> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter_map(|p| p.category.as_deref())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_string()))
        .map(str::to_string)
        .collect()
}

/// Products whose name or sku contains `term` (case-insensitive), optionally
/// restricted to one category.
pub fn search_products<'a>(
    products: &'a [Product],
    term: Option<&str>,
    category: Option<&str>,
) -> Vec<&'a Product> {
    let term = term.map(str::to_lowercase).filter(|t| !t.is_empty());
    products
        .iter()
        .filter(|p| match &term {
            Some(t) => {
                p.name.to_lowercase().contains(t)
                    || p.sku.as_deref().is_some_and(|s| s.to_lowercase().contains(t))
            }
            None => true,
        })
        .filter(|p| match category {
            Some(c) if !c.is_empty() => p.category.as_deref() == Some(c),
            _ => true,
        })
        .collect()
}

/// Orders by `date`, newest first. Undated records go last; ties keep input order.
pub fn sort_by_date_desc<T: Dated>(items: &mut [T]) {
    items.sort_by(|a, b| {
        newest_first(
            a.date_text(DateField::Date).and_then(parse_timestamp),
            b.date_text(DateField::Date).and_then(parse_timestamp),
        )
    });
}

fn newest_first(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Movement(Movement),
    Shrinkage(Shrinkage),
    Money(MoneyRecord),
}

impl Activity {
    pub fn id(&self) -> &str {
        match self {
            Activity::Movement(m) => &m.id,
            Activity::Shrinkage(s) => &s.id,
            Activity::Money(m) => &m.id,
        }
    }

    pub fn time(&self) -> Option<NaiveDateTime> {
        match self {
            Activity::Movement(m) => m.activity_time(),
            Activity::Shrinkage(s) => s.activity_time(),
            Activity::Money(m) => m.activity_time(),
        }
    }
}

/// Newest `limit` entries across the three feeds.
///
/// Inputs are merged movements, then shrinkages, then money; the sort is
/// stable so equal times keep that order.
pub fn recent_activity(
    movements: &[Movement],
    shrinkages: &[Shrinkage],
    money: &[MoneyRecord],
    limit: usize,
) -> Vec<Activity> {
    let mut merged: Vec<(Option<NaiveDateTime>, Activity)> = movements
        .iter()
        .cloned()
        .map(Activity::Movement)
        .chain(shrinkages.iter().cloned().map(Activity::Shrinkage))
        .chain(money.iter().cloned().map(Activity::Money))
        .map(|a| (a.time(), a))
        .collect();

    merged.sort_by(|(a, _), (b, _)| newest_first(*a, *b));
    merged.into_iter().take(limit).map(|(_, a)| a).collect()
}

/// The partitioned record set plus an id index over products.
///
/// Movements and shrinkages refer to products by id only; a missing product is
/// a normal state (the product was deleted) and resolves to
/// [`DELETED_PRODUCT_LABEL`] for display.
#[derive(Debug, Clone, Default)]
pub struct LedgerView {
    pub records: Partitioned,
    product_index: HashMap<String, usize>,
}

impl LedgerView {
    pub fn new(records: Partitioned) -> Self {
        let product_index = records
            .products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self {
            records,
            product_index,
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(partition(&normalize(snapshot)))
    }

    pub fn products(&self) -> &[Product] {
        &self.records.products
    }

    pub fn movements(&self) -> &[Movement] {
        &self.records.movements
    }

    pub fn shrinkages(&self) -> &[Shrinkage] {
        &self.records.shrinkages
    }

    pub fn money(&self) -> &[MoneyRecord] {
        &self.records.money
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.product_index
            .get(id)
            .and_then(|i| self.records.products.get(*i))
    }

    pub fn product_name(&self, id: &str) -> &str {
        self.product(id)
            .map(|p| p.name.as_str())
            .unwrap_or(DELETED_PRODUCT_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagged(id: &str, tag: &str, fields: Value) -> TaggedRecord {
        TaggedRecord {
            id: id.to_string(),
            record_type: tag.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    fn money(money_type: MoneyType, amount: Option<f64>, date: &str) -> MoneyRecord {
        MoneyRecord {
            money_type: Some(money_type),
            amount,
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn movement(id: &str, date: Option<&str>, created_at: Option<&str>) -> Movement {
        Movement {
            id: id.to_string(),
            quantity: Some(1),
            movement_type: Some(MovementType::Entrada),
            date: date.map(str::to_string),
            created_at: created_at.map(str::to_string),
            ..Default::default()
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn partition_keeps_every_known_record_and_drops_unknown_tags() {
        let records = vec![
            tagged("p1", "product", json!({ "name": "Pan" })),
            tagged("m1", "movement", json!({ "quantity": 2 })),
            tagged("x1", "order", json!({ "total": 1 })),
            tagged("s1", "shrinkage", json!({})),
            tagged("d1", "money", json!({ "amount": "garbage" })),
            tagged("p2", "product", json!({})),
        ];

        let parts = partition(&records);
        assert_eq!(parts.len(), 5);
        let product_ids: Vec<&str> = parts.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(product_ids, vec!["p1", "p2"]);
        assert_eq!(parts.movements[0].id, "m1");
        assert_eq!(parts.shrinkages[0].id, "s1");
        assert_eq!(parts.money[0].id, "d1");
        assert_eq!(parts.money[0].amount, None);
    }

    #[test]
    fn filter_without_bounds_returns_input_unchanged() {
        let items = vec![movement("a", Some("not a date"), None), movement("b", None, None)];
        let out = filter_by_date_range(&items, DateField::Date, None, None);
        assert_eq!(out, items);
    }

    #[test]
    fn filter_single_day_is_inclusive_at_both_ends() {
        let items = vec![
            movement("before", Some("2024-03-09T23:59:59.999Z"), None),
            movement("start", Some("2024-03-10"), None),
            movement("noon", Some("2024-03-10T12:00:00Z"), None),
            movement("end", Some("2024-03-10T23:59:59.999Z"), None),
            movement("after", Some("2024-03-11T00:00:00Z"), None),
        ];
        let d = day(2024, 3, 10);
        let out = filter_by_date_range(&items, DateField::Date, Some(d), Some(d));
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "noon", "end"]);
    }

    #[test]
    fn filter_with_one_open_end() {
        let items = vec![
            movement("old", Some("2024-01-01"), None),
            movement("new", Some("2024-06-01"), None),
        ];
        let since = filter_by_date_range(&items, DateField::Date, Some(day(2024, 3, 1)), None);
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].id, "new");

        let until = filter_by_date_range(&items, DateField::Date, None, Some(day(2024, 3, 1)));
        assert_eq!(until.len(), 1);
        assert_eq!(until[0].id, "old");
    }

    #[test]
    fn filter_excludes_unparseable_dates_when_bounded() {
        let items = vec![movement("bad", Some("31/12/2024"), None)];
        let out = filter_by_date_range(&items, DateField::Date, Some(day(2024, 1, 1)), None);
        assert!(out.is_empty());
    }

    #[test]
    fn filter_on_created_at_field() {
        let items = vec![movement("a", None, Some("2024-02-02T08:00:00.000Z"))];
        let d = day(2024, 2, 2);
        assert_eq!(
            filter_by_date_range(&items, DateField::CreatedAt, Some(d), Some(d)).len(),
            1
        );
        assert!(filter_by_date_range(&items, DateField::Date, Some(d), Some(d)).is_empty());
    }

    #[test]
    fn aggregate_money_treats_missing_amounts_as_zero() {
        let records = vec![
            money(MoneyType::Ingreso, Some(3000.0), "2024-01-01"),
            money(MoneyType::Ingreso, None, "2024-01-01"),
            money(MoneyType::Salida, Some(1200.5), "2024-01-02"),
            MoneyRecord {
                amount: Some(99.0),
                ..Default::default()
            },
        ];
        let summary = aggregate_money(&records);
        assert_eq!(summary.income_total, 3000.0);
        assert_eq!(summary.expense_total, 1200.5);
        assert_eq!(summary.balance, 1799.5);
    }

    #[test]
    fn aggregate_money_is_additive_over_disjoint_sets() {
        let a = vec![
            money(MoneyType::Ingreso, Some(10.0), "2024-01-01"),
            money(MoneyType::Salida, Some(4.0), "2024-01-01"),
        ];
        let b = vec![
            money(MoneyType::Ingreso, Some(32.5), "2024-01-02"),
            money(MoneyType::Ingreso, None, "2024-01-02"),
        ];
        let all: Vec<MoneyRecord> = a.iter().chain(b.iter()).cloned().collect();

        let (sa, sb, sall) = (aggregate_money(&a), aggregate_money(&b), aggregate_money(&all));
        assert_eq!(sall.income_total, sa.income_total + sb.income_total);
        assert_eq!(sall.expense_total, sa.expense_total + sb.expense_total);
        assert_eq!(sall.balance, sa.balance + sb.balance);
    }

    #[test]
    fn shrinkage_loss_skips_missing_totals() {
        let records = vec![
            Shrinkage {
                total: Some(1600.0),
                ..Default::default()
            },
            Shrinkage::default(),
            Shrinkage {
                total: Some(f64::NAN),
                ..Default::default()
            },
        ];
        assert_eq!(aggregate_shrinkage_loss(&records), 1600.0);
    }

    #[test]
    fn low_stock_uses_defaults_for_missing_fields() {
        let products = vec![
            Product {
                id: "ok".into(),
                stock: Some(10),
                min_stock: Some(5),
                ..Default::default()
            },
            Product {
                id: "edge".into(),
                stock: Some(5),
                ..Default::default()
            },
            Product {
                id: "empty".into(),
                ..Default::default()
            },
        ];
        let ids: Vec<&str> = low_stock(&products).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "empty"]);
    }

    #[test]
    fn inventory_value_uses_cost_then_price() {
        let products = vec![
            Product {
                cost: Some(800.0),
                price: Some(1000.0),
                stock: Some(2),
                ..Default::default()
            },
            Product {
                price: Some(500.0),
                stock: Some(3),
                ..Default::default()
            },
            Product {
                stock: Some(100),
                ..Default::default()
            },
        ];
        assert_eq!(inventory_value(&products), 1600.0 + 1500.0);
    }

    #[test]
    fn recent_activity_sorts_newest_first_with_created_at_fallback() {
        let movements = vec![
            movement("m-old", Some("2024-01-01"), None),
            movement("m-created", None, Some("2024-01-05T10:00:00Z")),
        ];
        let shrinkages = vec![Shrinkage {
            id: "s".into(),
            date: Some("2024-01-03".into()),
            ..Default::default()
        }];
        let money = vec![MoneyRecord {
            id: "d".into(),
            date: Some("2024-01-04".into()),
            ..Default::default()
        }];

        let feed = recent_activity(&movements, &shrinkages, &money, 3);
        let ids: Vec<&str> = feed.iter().map(Activity::id).collect();
        assert_eq!(ids, vec!["m-created", "d", "s"]);
    }

    #[test]
    fn recent_activity_is_stable_on_ties() {
        let movements = vec![movement("m1", Some("2024-01-01"), None)];
        let shrinkages = vec![Shrinkage {
            id: "s1".into(),
            date: Some("2024-01-01".into()),
            ..Default::default()
        }];
        let money = vec![MoneyRecord {
            id: "d1".into(),
            date: Some("2024-01-01".into()),
            ..Default::default()
        }];
        let feed = recent_activity(&movements, &shrinkages, &money, 5);
        let ids: Vec<&str> = feed.iter().map(Activity::id).collect();
        assert_eq!(ids, vec!["m1", "s1", "d1"]);
    }

    #[test]
    fn recent_activity_respects_limit() {
        let movements: Vec<Movement> = (1..=9)
            .map(|i| movement(&format!("m{}", i), Some(&format!("2024-01-0{}", i)), None))
            .collect();
        let feed = recent_activity(&movements, &[], &[], 5);
        assert_eq!(feed.len(), 5);
        assert_eq!(feed[0].id(), "m9");
    }

    #[test]
    fn categories_are_unique_and_non_empty() {
        let products: Vec<Product> = ["Lácteos", "", "Panadería", "Lácteos"]
            .iter()
            .map(|c| Product {
                category: Some(c.to_string()),
                ..Default::default()
            })
            .chain(std::iter::once(Product::default()))
            .collect();
        assert_eq!(categories_of(&products), vec!["Lácteos", "Panadería"]);
    }

    #[test]
    fn search_matches_name_or_sku_and_category() {
        let products = vec![
            Product {
                id: "1".into(),
                name: "Leche Entera".into(),
                sku: Some("LE-01".into()),
                category: Some("Lácteos".into()),
                ..Default::default()
            },
            Product {
                id: "2".into(),
                name: "Pan".into(),
                sku: Some("PAN-9".into()),
                category: Some("Panadería".into()),
                ..Default::default()
            },
        ];
        let ids = |found: Vec<&Product>| found.iter().map(|p| p.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(search_products(&products, Some("leche"), None)), vec!["1"]);
        assert_eq!(ids(search_products(&products, Some("pan-"), None)), vec!["2"]);
        assert_eq!(ids(search_products(&products, None, Some("Lácteos"))), vec!["1"]);
        assert_eq!(ids(search_products(&products, Some(""), None)).len(), 2);
    }

    #[test]
    fn movement_totals_split_by_type() {
        let mut out = movement("o", Some("2024-01-01"), None);
        out.movement_type = Some(MovementType::Salida);
        out.quantity = Some(4);
        let items = vec![movement("i", Some("2024-01-01"), None), out];
        assert_eq!(
            movement_totals(&items),
            MovementTotals {
                entries: 1,
                exits: 4
            }
        );
    }

    #[test]
    fn sort_by_date_desc_puts_undated_last() {
        let mut items = vec![
            movement("none", None, None),
            movement("old", Some("2023-01-01"), None),
            movement("new", Some("2024-01-01"), None),
        ];
        sort_by_date_desc(&mut items);
        let ids: Vec<&str> = items.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
    }

    #[test]
    fn ledger_view_resolves_dangling_product_references() {
        let snapshot = Snapshot::new(
            json!({
                "products": { "p1": { "name": "Pan" } },
                "movements": { "m1": { "productId": "gone", "quantity": 1 } },
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let view = LedgerView::from_snapshot(&snapshot);
        assert_eq!(view.product_name("p1"), "Pan");
        assert_eq!(view.product_name(&view.movements()[0].product_id), "Producto eliminado");
        assert!(view.product("gone").is_none());
    }
}
