use crate::commands::helpers::{format_date, to_fields, WriteSteps};
use crate::commands::movement::{check_available, check_quantity};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LedgerError, Result};
use crate::model::{now_iso, Collection, Product, Shrinkage};
use crate::store::DataStore;
use crate::view::LedgerView;
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkageRequest {
    pub quantity: i64,
    pub reason: Option<String>,
    pub date: NaiveDate,
}

/// Records a loss: lowers stock, then appends the shrinkage.
///
/// `total` is priced at this instant from cost, falling back to price. Later
/// product edits leave it alone.
pub fn record<S: DataStore>(
    store: &S,
    product: &Product,
    request: ShrinkageRequest,
) -> Result<CmdResult> {
    check_quantity(request.quantity)?;
    check_available(product, request.quantity)?;

    let stock = product.stock() - request.quantity;
    let total = product.unit_value() * request.quantity as f64;
    let mut steps = WriteSteps::new();

    let updated = Product {
        stock: Some(stock),
        ..product.clone()
    };
    steps.run("update product stock", || {
        store.set(Collection::Products, &product.id, &to_fields(&updated)?)
    })?;

    let shrinkage = Shrinkage {
        id: String::new(),
        product_id: product.id.clone(),
        quantity: Some(request.quantity),
        reason: request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        date: Some(format_date(request.date)),
        total: Some(total),
        created_at: Some(now_iso()),
    };
    let shrinkage_id = steps.run("create shrinkage", || {
        store.push(Collection::Shrinkages, &to_fields(&shrinkage)?)
    })?;

    info!(product = %product.id, quantity = request.quantity, total, "shrinkage recorded");

    let mut result =
        CmdResult::default().with_affected_ids(vec![product.id.clone(), shrinkage_id]);
    result.add_message(CmdMessage::success(format!(
        "Shrinkage of {} {} recorded for {} (stock now {})",
        request.quantity,
        product.unit(),
        product.name,
        stock
    )));
    Ok(result)
}

/// Removes the shrinkage record only; stock is not reverted.
pub fn delete<S: DataStore>(store: &S, view: &LedgerView, id: &str) -> Result<CmdResult> {
    if !view.shrinkages().iter().any(|s| s.id == id) {
        return Err(LedgerError::NotFound {
            collection: Collection::Shrinkages,
            id: id.to_string(),
        });
    }
    store.remove(Collection::Shrinkages, id)?;
    info!(%id, "shrinkage deleted");

    let mut result = CmdResult::default().with_affected_ids(vec![id.to_string()]);
    result.add_message(CmdMessage::success("Shrinkage deleted"));
    result.add_message(CmdMessage::info("Product stock was not changed."));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::products::{self, ProductInput};
    use crate::store::memory::fixtures::StoreFixture;
    use serde_json::json;

    fn view(fixture: &StoreFixture) -> LedgerView {
        LedgerView::from_snapshot(&fixture.store.snapshot().unwrap())
    }

    fn setup() -> (StoreFixture, Product) {
        let fixture = StoreFixture::new();
        let id = fixture.push(
            Collection::Products,
            json!({ "name": "Queso", "stock": 10, "minStock": 5, "price": 1000, "cost": 800 }),
        );
        let product = view(&fixture).product(&id).unwrap().clone();
        (fixture, product)
    }

    fn request(quantity: i64) -> ShrinkageRequest {
        ShrinkageRequest {
            quantity,
            reason: Some("Vencido".into()),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        }
    }

    #[test]
    fn shrinkage_uses_cost_and_lowers_stock() {
        let (fixture, product) = setup();
        record(&fixture.store, &product, request(2)).unwrap();

        let view = view(&fixture);
        assert_eq!(view.product(&product.id).unwrap().stock(), 8);
        assert_eq!(view.shrinkages().len(), 1);
        let shrinkage = &view.shrinkages()[0];
        assert_eq!(shrinkage.total(), 1600.0);
        assert_eq!(shrinkage.reason.as_deref(), Some("Vencido"));
        assert!(view.money().is_empty());
    }

    #[test]
    fn shrinkage_falls_back_to_price() {
        let fixture = StoreFixture::new().with_product("Pan", 10, 5, 200.0);
        let id = fixture.product_id("Pan");
        let product = view(&fixture).product(&id).unwrap().clone();

        record(&fixture.store, &product, request(3)).unwrap();
        assert_eq!(view(&fixture).shrinkages()[0].total(), 600.0);
    }

    #[test]
    fn shrinkage_beyond_stock_is_rejected_without_writes() {
        let (fixture, product) = setup();
        let saves = fixture.store.backend().save_count();

        assert!(matches!(
            record(&fixture.store, &product, request(11)),
            Err(LedgerError::InsufficientStock { .. })
        ));
        assert_eq!(fixture.store.backend().save_count(), saves);
        assert_eq!(view(&fixture).product(&product.id).unwrap().stock(), 10);
    }

    #[test]
    fn total_is_not_recomputed_after_cost_changes() {
        let (fixture, product) = setup();
        record(&fixture.store, &product, request(2)).unwrap();

        let current = view(&fixture).product(&product.id).unwrap().clone();
        products::update(
            &fixture.store,
            &current,
            ProductInput {
                cost: Some(5000.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(view(&fixture).shrinkages()[0].total(), 1600.0);
    }

    #[test]
    fn failure_after_stock_update_is_partial() {
        let (fixture, product) = setup();
        fixture.store.backend().fail_after(1);

        assert!(matches!(
            record(&fixture.store, &product, request(2)),
            Err(LedgerError::PartialWrite { .. })
        ));
        let view = view(&fixture);
        assert_eq!(view.product(&product.id).unwrap().stock(), 8);
        assert!(view.shrinkages().is_empty());
    }

    #[test]
    fn delete_removes_only_the_record() {
        let (fixture, product) = setup();
        record(&fixture.store, &product, request(2)).unwrap();
        let before = view(&fixture);
        let id = before.shrinkages()[0].id.clone();

        delete(&fixture.store, &before, &id).unwrap();
        let after = view(&fixture);
        assert!(after.shrinkages().is_empty());
        assert_eq!(after.product(&product.id).unwrap().stock(), 8);
    }
}
