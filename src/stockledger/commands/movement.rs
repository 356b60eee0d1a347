//! Stock movements.
//!
//! Recording a movement is three ordered writes with no transaction around
//! them:
//!
//! 1. overwrite the product with its new stock,
//! 2. append the movement,
//! 3. for `salida` only, append an `ingreso` money record worth
//!    `price * quantity`.
//!
//! Every outbound movement is booked as a sale. The stock check runs before
//! the first write, so a rejected movement writes nothing.

use crate::commands::helpers::{format_date, reference_token, to_fields, WriteSteps};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LedgerError, Result};
use crate::model::{now_iso, Collection, MoneyRecord, MoneyType, Movement, MovementType, Product};
use crate::store::DataStore;
use crate::view::LedgerView;
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub date: NaiveDate,
}

pub(crate) fn check_quantity(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(LedgerError::Validation(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_available(product: &Product, quantity: i64) -> Result<()> {
    if quantity > product.stock() {
        return Err(LedgerError::InsufficientStock {
            product: product.name.clone(),
            requested: quantity,
            available: product.stock(),
        });
    }
    Ok(())
}

fn sale_description(product: &Product, quantity: i64) -> String {
    format!("Venta: {} ({} {})", product.name, quantity, product.unit())
}

pub fn record<S: DataStore>(
    store: &S,
    product: &Product,
    request: MovementRequest,
) -> Result<CmdResult> {
    check_quantity(request.quantity)?;
    let stock = match request.movement_type {
        MovementType::Entrada => product.stock() + request.quantity,
        MovementType::Salida => {
            check_available(product, request.quantity)?;
            product.stock() - request.quantity
        }
    };

    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let date = format_date(request.date);
    let mut steps = WriteSteps::new();
    let mut affected = Vec::new();

    let updated = Product {
        stock: Some(stock),
        ..product.clone()
    };
    steps.run("update product stock", || {
        store.set(Collection::Products, &product.id, &to_fields(&updated)?)
    })?;
    affected.push(product.id.clone());

    let movement = Movement {
        id: String::new(),
        product_id: product.id.clone(),
        quantity: Some(request.quantity),
        movement_type: Some(request.movement_type),
        reason: reason.clone(),
        date: Some(date.clone()),
        created_at: Some(now_iso()),
    };
    let movement_id = steps.run("create movement", || {
        store.push(Collection::Movements, &to_fields(&movement)?)
    })?;
    affected.push(movement_id);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} of {} {} recorded for {} (stock now {})",
        request.movement_type,
        request.quantity,
        product.unit(),
        product.name,
        stock
    )));

    if request.movement_type == MovementType::Salida {
        let amount = product.price() * request.quantity as f64;
        let income = MoneyRecord {
            id: String::new(),
            money_type: Some(MoneyType::Ingreso),
            amount: Some(amount),
            description: reason.unwrap_or_else(|| sale_description(product, request.quantity)),
            reference: Some(format!("Venta-{}", reference_token())),
            date: Some(date),
            created_at: Some(now_iso()),
        };
        let money_id = steps.run("create income record", || {
            store.push(Collection::Money, &to_fields(&income)?)
        })?;
        affected.push(money_id);
        result.add_message(CmdMessage::info(format!(
            "Income recorded: {}",
            income.description
        )));
    }

    info!(product = %product.id, movement_type = %request.movement_type, quantity = request.quantity, "movement recorded");
    Ok(result.with_affected_ids(affected))
}

/// Removes the movement record only; stock is not reverted.
pub fn delete<S: DataStore>(store: &S, view: &LedgerView, id: &str) -> Result<CmdResult> {
    if !view.movements().iter().any(|m| m.id == id) {
        return Err(LedgerError::NotFound {
            collection: Collection::Movements,
            id: id.to_string(),
        });
    }
    store.remove(Collection::Movements, id)?;
    info!(%id, "movement deleted");

    let mut result = CmdResult::default().with_affected_ids(vec![id.to_string()]);
    result.add_message(CmdMessage::success("Movement deleted"));
    result.add_message(CmdMessage::info("Product stock was not changed."));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;

    fn setup() -> (StoreFixture, Product) {
        let fixture = StoreFixture::new().with_product("Leche", 10, 5, 1000.0);
        let id = fixture.product_id("Leche");
        let view = LedgerView::from_snapshot(&fixture.store.snapshot().unwrap());
        let product = view.product(&id).unwrap().clone();
        (fixture, product)
    }

    fn view(fixture: &StoreFixture) -> LedgerView {
        LedgerView::from_snapshot(&fixture.store.snapshot().unwrap())
    }

    fn request(movement_type: MovementType, quantity: i64) -> MovementRequest {
        MovementRequest {
            movement_type,
            quantity,
            reason: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        }
    }

    #[test]
    fn salida_decrements_stock_and_books_a_sale() {
        let (fixture, product) = setup();
        let result = record(&fixture.store, &product, request(MovementType::Salida, 3)).unwrap();
        assert_eq!(result.affected_ids.len(), 3);

        let view = view(&fixture);
        let updated = view.product(&product.id).unwrap();
        assert_eq!(updated.stock(), 7);
        assert!(!updated.is_low_stock());

        assert_eq!(view.movements().len(), 1);
        let movement = &view.movements()[0];
        assert_eq!(movement.quantity(), 3);
        assert_eq!(movement.movement_type, Some(MovementType::Salida));
        assert_eq!(movement.date.as_deref(), Some("2024-03-10"));

        assert_eq!(view.money().len(), 1);
        let income = &view.money()[0];
        assert_eq!(income.money_type, Some(MoneyType::Ingreso));
        assert_eq!(income.amount(), 3000.0);
        assert_eq!(income.description, "Venta: Leche (3 unidad)");
        assert!(income.reference.as_deref().unwrap().starts_with("Venta-"));
        assert_eq!(income.date.as_deref(), Some("2024-03-10"));
    }

    #[test]
    fn salida_beyond_stock_is_rejected_without_writes() {
        let (fixture, product) = setup();
        let saves = fixture.store.backend().save_count();

        let err = record(&fixture.store, &product, request(MovementType::Salida, 12)).unwrap_err();
        match err {
            LedgerError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 12);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(fixture.store.backend().save_count(), saves);
        let view = view(&fixture);
        assert_eq!(view.product(&product.id).unwrap().stock(), 10);
        assert!(view.movements().is_empty());
        assert!(view.money().is_empty());
    }

    #[test]
    fn salida_of_entire_stock_is_allowed() {
        let (fixture, product) = setup();
        record(&fixture.store, &product, request(MovementType::Salida, 10)).unwrap();
        assert_eq!(view(&fixture).product(&product.id).unwrap().stock(), 0);
    }

    #[test]
    fn entrada_increments_stock_without_money() {
        let (fixture, product) = setup();
        let result = record(&fixture.store, &product, request(MovementType::Entrada, 5)).unwrap();
        assert_eq!(result.affected_ids.len(), 2);

        let view = view(&fixture);
        assert_eq!(view.product(&product.id).unwrap().stock(), 15);
        assert_eq!(view.movements().len(), 1);
        assert!(view.money().is_empty());
    }

    #[test]
    fn reason_becomes_the_income_description() {
        let (fixture, product) = setup();
        let mut req = request(MovementType::Salida, 1);
        req.reason = Some("Pedido mayorista".into());
        record(&fixture.store, &product, req).unwrap();

        let view = view(&fixture);
        assert_eq!(view.money()[0].description, "Pedido mayorista");
        assert_eq!(view.movements()[0].reason.as_deref(), Some("Pedido mayorista"));
    }

    #[test]
    fn non_positive_quantity_is_a_validation_error() {
        let (fixture, product) = setup();
        assert!(matches!(
            record(&fixture.store, &product, request(MovementType::Entrada, 0)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            record(&fixture.store, &product, request(MovementType::Salida, -2)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn failing_first_write_changes_nothing() {
        let (fixture, product) = setup();
        fixture.store.backend().set_simulate_write_error(true);

        let err = record(&fixture.store, &product, request(MovementType::Salida, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::RemoteWrite(_)));
        assert_eq!(view(&fixture).product(&product.id).unwrap().stock(), 10);
    }

    #[test]
    fn failure_after_stock_update_is_reported_as_partial_write() {
        let (fixture, product) = setup();
        fixture.store.backend().fail_after(1);

        let err = record(&fixture.store, &product, request(MovementType::Salida, 2)).unwrap_err();
        match err {
            LedgerError::PartialWrite {
                completed,
                failed_step,
                ..
            } => {
                assert_eq!(completed, vec!["update product stock"]);
                assert_eq!(failed_step, "create movement");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let view = view(&fixture);
        assert_eq!(view.product(&product.id).unwrap().stock(), 8);
        assert!(view.movements().is_empty());
    }

    #[test]
    fn failure_on_income_record_keeps_movement() {
        let (fixture, product) = setup();
        fixture.store.backend().fail_after(2);

        let err = record(&fixture.store, &product, request(MovementType::Salida, 2)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::PartialWrite { ref failed_step, .. } if failed_step == "create income record"
        ));
        let view = view(&fixture);
        assert_eq!(view.movements().len(), 1);
        assert!(view.money().is_empty());
    }

    #[test]
    fn delete_keeps_stock() {
        let (fixture, product) = setup();
        record(&fixture.store, &product, request(MovementType::Entrada, 5)).unwrap();
        let before = view(&fixture);
        let id = before.movements()[0].id.clone();

        delete(&fixture.store, &before, &id).unwrap();
        let after = view(&fixture);
        assert!(after.movements().is_empty());
        assert_eq!(after.product(&product.id).unwrap().stock(), 15);
    }

    #[test]
    fn delete_unknown_movement_is_not_found() {
        let (fixture, _) = setup();
        assert!(matches!(
            delete(&fixture.store, &view(&fixture), "missing"),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
