use crate::model::{MoneyType, MovementType, Product};
use crate::view::{
    aggregate_money, aggregate_shrinkage_loss, filter_by_date_range, inventory_value, low_stock,
    recent_activity, Activity, DateField, DateRange, LedgerView, MoneySummary,
};
use chrono::NaiveDate;

/// Default dashboard window: a week back through today.
pub fn default_range(today: NaiveDate) -> DateRange {
    DateRange::last_days(today, 7)
}

/// Direction of an activity line, used by renderers for coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    In,
    Out,
    Loss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLine {
    pub id: String,
    pub date: Option<String>,
    pub flow: Flow,
    pub text: String,
    pub amount: Option<f64>,
}

impl ActivityLine {
    pub fn describe(view: &LedgerView, activity: &Activity) -> Self {
        match activity {
            Activity::Movement(m) => {
                let (flow, label) = match m.movement_type {
                    Some(MovementType::Entrada) => (Flow::In, "Entrada"),
                    _ => (Flow::Out, "Salida"),
                };
                Self {
                    id: m.id.clone(),
                    date: m.date.clone(),
                    flow,
                    text: format!("{}: {} ({})", label, view.product_name(&m.product_id), m.quantity()),
                    amount: None,
                }
            }
            Activity::Shrinkage(s) => Self {
                id: s.id.clone(),
                date: s.date.clone(),
                flow: Flow::Loss,
                text: format!("Merma: {} ({})", view.product_name(&s.product_id), s.quantity()),
                amount: Some(s.total()),
            },
            Activity::Money(m) => Self {
                id: m.id.clone(),
                date: m.date.clone(),
                flow: if m.money_type == Some(MoneyType::Ingreso) {
                    Flow::In
                } else {
                    Flow::Out
                },
                text: m.description.clone(),
                amount: Some(m.amount()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub range: DateRange,
    pub product_count: usize,
    /// Money within `range`.
    pub money: MoneySummary,
    /// Shrinkage loss within `range`.
    pub shrinkage_loss: f64,
    pub inventory_value: f64,
    pub low_stock: Vec<Product>,
    /// Newest activity across all time.
    pub recent: Vec<ActivityLine>,
}

pub fn build(view: &LedgerView, range: DateRange, recent_limit: usize) -> Dashboard {
    let money = filter_by_date_range(view.money(), DateField::Date, range.from, range.to);
    let shrinkages = filter_by_date_range(view.shrinkages(), DateField::Date, range.from, range.to);

    let recent = recent_activity(view.movements(), view.shrinkages(), view.money(), recent_limit)
        .iter()
        .map(|a| ActivityLine::describe(view, a))
        .collect();

    Dashboard {
        range,
        product_count: view.products().len(),
        money: aggregate_money(&money),
        shrinkage_loss: aggregate_shrinkage_loss(&shrinkages),
        inventory_value: inventory_value(view.products()),
        low_stock: low_stock(view.products()).into_iter().cloned().collect(),
        recent,
    }
}
