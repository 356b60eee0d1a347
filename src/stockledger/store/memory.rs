use super::mem_backend::MemBackend;
use super::record_store::RecordStore;

pub type InMemoryStore = RecordStore<MemBackend>;

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        RecordStore::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{Collection, Fields, MoneyType, MovementType};
    use crate::store::DataStore;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        pub fn push(&self, collection: Collection, value: Value) -> String {
            self.store.push(collection, &fields(value)).unwrap()
        }

        pub fn with_product(self, name: &str, stock: i64, min_stock: i64, price: f64) -> Self {
            self.push(
                Collection::Products,
                json!({
                    "name": name,
                    "stock": stock,
                    "minStock": min_stock,
                    "price": price,
                    "unit": "unidad",
                }),
            );
            self
        }

        pub fn with_movement(
            self,
            product_id: &str,
            movement_type: MovementType,
            quantity: i64,
            date: &str,
        ) -> Self {
            self.push(
                Collection::Movements,
                json!({
                    "productId": product_id,
                    "movementType": movement_type.as_str(),
                    "quantity": quantity,
                    "date": date,
                }),
            );
            self
        }

        pub fn with_money(self, money_type: MoneyType, amount: f64, date: &str) -> Self {
            self.push(
                Collection::Money,
                json!({
                    "moneyType": money_type.as_str(),
                    "amount": amount,
                    "description": "fixture",
                    "date": date,
                }),
            );
            self
        }

        /// Id of the first product with the given name.
        pub fn product_id(&self, name: &str) -> String {
            let snapshot = self.store.snapshot().unwrap();
            snapshot
                .collection(Collection::Products)
                .and_then(|products| {
                    products
                        .iter()
                        .find(|(_, v)| v["name"] == name)
                        .map(|(k, _)| k.clone())
                })
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::StoreFixture;
    use super::*;
    use crate::error::LedgerError;
    use crate::model::{Collection, Fields};
    use crate::store::DataStore;
    use serde_json::json;

    fn payload(name: &str) -> Fields {
        json!({ "name": name }).as_object().unwrap().clone()
    }

    #[test]
    fn push_generates_distinct_keys_in_insertion_order() {
        let store = InMemoryStore::new();
        let a = store.push(Collection::Products, &payload("A")).unwrap();
        let b = store.push(Collection::Products, &payload("B")).unwrap();
        assert_ne!(a, b);

        let snapshot = store.snapshot().unwrap();
        let keys: Vec<&String> = snapshot
            .collection(Collection::Products)
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, vec![&a, &b]);
    }

    #[test]
    fn set_replaces_the_whole_payload() {
        let store = InMemoryStore::new();
        let id = store
            .push(
                Collection::Products,
                json!({ "name": "A", "sku": "X1" }).as_object().unwrap(),
            )
            .unwrap();
        store.set(Collection::Products, &id, &payload("B")).unwrap();

        let snapshot = store.snapshot().unwrap();
        let record = &snapshot.collection(Collection::Products).unwrap()[&id];
        assert_eq!(record, &json!({ "name": "B" }));
    }

    #[test]
    fn remove_keeps_relative_order_of_remaining_records() {
        let store = InMemoryStore::new();
        let a = store.push(Collection::Money, &payload("a")).unwrap();
        let b = store.push(Collection::Money, &payload("b")).unwrap();
        let c = store.push(Collection::Money, &payload("c")).unwrap();
        store.remove(Collection::Money, &a).unwrap();

        let snapshot = store.snapshot().unwrap();
        let keys: Vec<&String> = snapshot.collection(Collection::Money).unwrap().keys().collect();
        assert_eq!(keys, vec![&b, &c]);
    }

    #[test]
    fn remove_missing_record_is_a_noop() {
        let store = InMemoryStore::new();
        store.remove(Collection::Movements, "nope").unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn subscription_receives_initial_and_subsequent_snapshots() {
        let store = InMemoryStore::new();
        let sub = store.subscribe().unwrap();
        assert!(sub.try_next().unwrap().is_empty());

        store.push(Collection::Products, &payload("A")).unwrap();
        store.push(Collection::Products, &payload("B")).unwrap();

        let latest = sub.latest().unwrap();
        assert_eq!(latest.collection(Collection::Products).unwrap().len(), 2);
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let store = InMemoryStore::new();
        let sub = store.subscribe().unwrap();
        drop(sub);
        store.push(Collection::Products, &payload("A")).unwrap();
        assert!(store.subscribers.borrow().is_empty());
    }

    #[test]
    fn failed_write_leaves_tree_untouched_and_publishes_nothing() {
        let store = InMemoryStore::new();
        let sub = store.subscribe().unwrap();
        sub.latest();
        store.backend.set_simulate_write_error(true);

        let result = store.push(Collection::Products, &payload("A"));
        assert!(matches!(result, Err(LedgerError::RemoteWrite(_))));
        assert!(store.snapshot().unwrap().is_empty());
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn fail_after_allows_n_writes() {
        let store = InMemoryStore::new();
        store.backend.fail_after(1);
        assert!(store.push(Collection::Products, &payload("A")).is_ok());
        assert!(store.push(Collection::Products, &payload("B")).is_err());
        assert_eq!(store.backend.save_count(), 1);
    }

    #[test]
    fn remove_all_clears_every_collection() {
        let fixture = StoreFixture::new()
            .with_product("Pan", 10, 5, 1000.0)
            .with_product("Leche", 3, 5, 900.0);
        fixture.store.remove_all().unwrap();
        assert!(fixture.store.snapshot().unwrap().is_empty());
    }
}
