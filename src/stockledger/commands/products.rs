use crate::commands::helpers::to_fields;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LedgerError, Result};
use crate::model::{now_iso, Collection, Product, DEFAULT_MIN_STOCK, DEFAULT_UNIT};
use crate::store::DataStore;
use crate::view::LedgerView;
use tracing::info;

/// User-supplied product fields. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub unit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_amount(label: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(LedgerError::Validation(format!(
            "{} must be a non-negative number",
            label
        ))),
        _ => Ok(()),
    }
}

fn validate(input: &ProductInput) -> Result<()> {
    check_amount("Price", input.price)?;
    check_amount("Cost", input.cost)?;
    Ok(())
}

/// Builds a new product, applying the defaults for fields not given.
pub fn build(input: ProductInput) -> Result<Product> {
    validate(&input)?;
    let name = non_empty(input.name)
        .ok_or_else(|| LedgerError::Validation("Product name cannot be empty".to_string()))?;

    Ok(Product {
        id: String::new(),
        name,
        sku: non_empty(input.sku),
        category: non_empty(input.category),
        price: Some(input.price.unwrap_or(0.0)),
        cost: input.cost,
        stock: Some(input.stock.unwrap_or(0)),
        min_stock: Some(input.min_stock.unwrap_or(DEFAULT_MIN_STOCK)),
        unit: Some(non_empty(input.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string())),
        created_at: Some(now_iso()),
    })
}

pub fn create<S: DataStore>(store: &S, input: ProductInput) -> Result<CmdResult> {
    let product = build(input)?;
    let id = store.push(Collection::Products, &to_fields(&product)?)?;
    info!(%id, name = %product.name, "product created");

    let mut result = CmdResult::default().with_affected_ids(vec![id]);
    result.add_message(CmdMessage::success(format!(
        "Product created: {}",
        product.name
    )));
    Ok(result)
}

/// Rewrites the whole record: given fields replace the current ones, the rest
/// are carried over as they are.
pub fn update<S: DataStore>(store: &S, current: &Product, input: ProductInput) -> Result<CmdResult> {
    validate(&input)?;
    let mut product = current.clone();

    if let Some(name) = input.name {
        product.name = non_empty(Some(name))
            .ok_or_else(|| LedgerError::Validation("Product name cannot be empty".to_string()))?;
    }
    if input.sku.is_some() {
        product.sku = non_empty(input.sku);
    }
    if input.category.is_some() {
        product.category = non_empty(input.category);
    }
    if input.unit.is_some() {
        product.unit = non_empty(input.unit);
    }
    product.price = input.price.or(product.price);
    product.cost = input.cost.or(product.cost);
    product.stock = input.stock.or(product.stock);
    product.min_stock = input.min_stock.or(product.min_stock);

    store.set(Collection::Products, &product.id, &to_fields(&product)?)?;
    info!(id = %product.id, "product updated");

    let mut result = CmdResult::default().with_affected_ids(vec![product.id.clone()]);
    result.add_message(CmdMessage::success(format!(
        "Product updated: {}",
        product.name
    )));
    Ok(result)
}

/// Deletes the product only. Movements and shrinkages that point at it stay
/// and render as a deleted product.
pub fn delete<S: DataStore>(store: &S, view: &LedgerView, id: &str) -> Result<CmdResult> {
    let product = view.product(id).ok_or_else(|| LedgerError::NotFound {
        collection: Collection::Products,
        id: id.to_string(),
    })?;
    store.remove(Collection::Products, id)?;
    info!(%id, "product deleted");

    let mut result = CmdResult::default().with_affected_ids(vec![id.to_string()]);
    result.add_message(CmdMessage::success(format!(
        "Product deleted: {}",
        product.name
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;

    fn view_of(store: &InMemoryStore) -> LedgerView {
        LedgerView::from_snapshot(&store.snapshot().unwrap())
    }

    #[test]
    fn create_applies_defaults() {
        let store = InMemoryStore::new();
        let result = create(
            &store,
            ProductInput {
                name: Some("Arroz".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let view = view_of(&store);
        let product = view.product(&result.affected_ids[0]).unwrap();
        assert_eq!(product.name, "Arroz");
        assert_eq!(product.stock, Some(0));
        assert_eq!(product.min_stock, Some(5));
        assert_eq!(product.price, Some(0.0));
        assert_eq!(product.cost, None);
        assert_eq!(product.unit.as_deref(), Some("unidad"));
        assert!(product.created_at.is_some());
    }

    #[test]
    fn create_rejects_empty_name_and_negative_price() {
        let store = InMemoryStore::new();
        assert!(matches!(
            create(&store, ProductInput::default()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            create(
                &store,
                ProductInput {
                    name: Some("Sal".into()),
                    price: Some(-1.0),
                    ..Default::default()
                }
            ),
            Err(LedgerError::Validation(_))
        ));
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn update_overwrites_given_fields_and_keeps_the_rest() {
        let fixture = StoreFixture::new().with_product("Pan", 20, 5, 200.0);
        let id = fixture.product_id("Pan");
        let current = view_of(&fixture.store).product(&id).unwrap().clone();

        update(
            &fixture.store,
            &current,
            ProductInput {
                price: Some(250.0),
                category: Some("Panadería".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let view = view_of(&fixture.store);
        let product = view.product(&id).unwrap();
        assert_eq!(product.price, Some(250.0));
        assert_eq!(product.category.as_deref(), Some("Panadería"));
        assert_eq!(product.stock, Some(20));
        assert_eq!(product.name, "Pan");
    }

    #[test]
    fn delete_leaves_movements_dangling() {
        let fixture = StoreFixture::new().with_product("Pan", 20, 5, 200.0);
        let id = fixture.product_id("Pan");
        let fixture = fixture.with_movement(
            &id,
            crate::model::MovementType::Entrada,
            3,
            "2024-01-01",
        );

        delete(&fixture.store, &view_of(&fixture.store), &id).unwrap();

        let view = view_of(&fixture.store);
        assert!(view.products().is_empty());
        assert_eq!(view.movements().len(), 1);
        assert_eq!(view.product_name(&id), "Producto eliminado");
    }

    #[test]
    fn delete_unknown_product_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            delete(&store, &view_of(&store), "nope"),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
