use crate::commands::helpers::{format_date, to_fields};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LedgerError, Result};
use crate::model::{now_iso, today, Collection, MoneyRecord, MoneyType};
use crate::store::DataStore;
use crate::view::LedgerView;
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct MoneyInput {
    pub money_type: MoneyType,
    pub amount: Option<f64>,
    pub description: String,
    pub reference: Option<String>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

pub fn create<S: DataStore>(store: &S, input: MoneyInput) -> Result<CmdResult> {
    let amount = input.amount.unwrap_or(0.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(LedgerError::Validation(
            "Amount must be a non-negative number".to_string(),
        ));
    }
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(LedgerError::Validation(
            "Description cannot be empty".to_string(),
        ));
    }

    let record = MoneyRecord {
        id: String::new(),
        money_type: Some(input.money_type),
        amount: Some(amount),
        description,
        reference: input
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        date: Some(format_date(input.date.unwrap_or_else(today))),
        created_at: Some(now_iso()),
    };
    let id = store.push(Collection::Money, &to_fields(&record)?)?;
    info!(%id, money_type = %input.money_type, amount, "money record created");

    let mut result = CmdResult::default().with_affected_ids(vec![id]);
    result.add_message(CmdMessage::success(format!(
        "{} recorded: {}",
        input.money_type, record.description
    )));
    Ok(result)
}

pub fn delete<S: DataStore>(store: &S, view: &LedgerView, id: &str) -> Result<CmdResult> {
    let record = view
        .money()
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| LedgerError::NotFound {
            collection: Collection::Money,
            id: id.to_string(),
        })?;
    store.remove(Collection::Money, id)?;
    info!(%id, "money record deleted");

    let mut result = CmdResult::default().with_affected_ids(vec![id.to_string()]);
    result.add_message(CmdMessage::success(format!(
        "Money record deleted: {}",
        record.description
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn input(money_type: MoneyType, amount: Option<f64>) -> MoneyInput {
        MoneyInput {
            money_type,
            amount,
            description: "Arriendo".into(),
            reference: None,
            date: NaiveDate::from_ymd_opt(2024, 2, 1),
        }
    }

    #[test]
    fn create_and_delete() {
        let store = InMemoryStore::new();
        let result = create(&store, input(MoneyType::Salida, Some(250000.0))).unwrap();
        let id = result.affected_ids[0].clone();

        let view = LedgerView::from_snapshot(&store.snapshot().unwrap());
        let record = &view.money()[0];
        assert_eq!(record.id, id);
        assert_eq!(record.money_type, Some(MoneyType::Salida));
        assert_eq!(record.amount(), 250000.0);
        assert_eq!(record.date.as_deref(), Some("2024-02-01"));

        delete(&store, &view, &id).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn amount_and_date_have_defaults() {
        let store = InMemoryStore::new();
        let mut req = input(MoneyType::Ingreso, None);
        req.date = None;
        create(&store, req).unwrap();

        let view = LedgerView::from_snapshot(&store.snapshot().unwrap());
        assert_eq!(view.money()[0].amount, Some(0.0));
        assert_eq!(
            view.money()[0].date.as_deref(),
            Some(format_date(today()).as_str())
        );
    }

    #[test]
    fn rejects_negative_amount_and_empty_description() {
        let store = InMemoryStore::new();
        assert!(matches!(
            create(&store, input(MoneyType::Ingreso, Some(-5.0))),
            Err(LedgerError::Validation(_))
        ));
        let mut req = input(MoneyType::Ingreso, Some(5.0));
        req.description = "  ".into();
        assert!(matches!(create(&store, req), Err(LedgerError::Validation(_))));
    }
}
