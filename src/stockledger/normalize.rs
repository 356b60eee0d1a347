//! # Data Normalizer
//!
//! Flattens a [`Snapshot`] into one ordered sequence of [`TaggedRecord`]s.
//!
//! - Collections are visited in a fixed order: products, movements,
//!   shrinkages, money.
//! - Within a collection, records keep the store's insertion order.
//! - The `id` is the store key and the type tag comes from the collection,
//!   overriding any `type`/`id` field inside the payload.
//! - Absent collections contribute nothing. Nothing is dropped or deduplicated;
//!   the store already guarantees key uniqueness per collection.
//!
//! A payload that is not an object still yields a record, with an empty field
//! bag, so that a later partition can decide what to do with it.

use crate::model::{Collection, Fields, TaggedRecord};
use crate::store::Snapshot;
use serde_json::Value;

pub fn normalize(snapshot: &Snapshot) -> Vec<TaggedRecord> {
    let mut records = Vec::new();

    for collection in Collection::ALL {
        let Some(entries) = snapshot.collection(collection) else {
            continue;
        };
        for (id, value) in entries {
            let mut fields = match value {
                Value::Object(map) => map.clone(),
                _ => Fields::new(),
            };
            fields.shift_remove("type");
            fields.shift_remove("id");
            records.push(TaggedRecord {
                id: id.clone(),
                record_type: collection.record_type().as_str().to_string(),
                fields,
            });
        }
    }

    records
}
