use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Raw field bag of a record as held by the remote tree.
pub type Fields = Map<String, Value>;

pub const DEFAULT_MIN_STOCK: i64 = 5;
pub const DEFAULT_UNIT: &str = "unidad";
pub const DELETED_PRODUCT_LABEL: &str = "Producto eliminado";

/// The four child collections under the remote root, in snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Movements,
    Shrinkages,
    Money,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Products,
        Collection::Movements,
        Collection::Shrinkages,
        Collection::Money,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Movements => "movements",
            Collection::Shrinkages => "shrinkages",
            Collection::Money => "money",
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Collection::Products => RecordType::Product,
            Collection::Movements => RecordType::Movement,
            Collection::Shrinkages => RecordType::Shrinkage,
            Collection::Money => RecordType::Money,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Product,
    Movement,
    Shrinkage,
    Money,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Product => "product",
            RecordType::Movement => "movement",
            RecordType::Shrinkage => "shrinkage",
            RecordType::Money => "money",
        }
    }

    /// Unknown tags yield `None`; callers drop such records.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "product" => Some(RecordType::Product),
            "movement" => Some(RecordType::Movement),
            "shrinkage" => Some(RecordType::Shrinkage),
            "money" => Some(RecordType::Money),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entrada,
    Salida,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Salida => "salida",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" | "in" => Ok(MovementType::Entrada),
            "salida" | "out" => Ok(MovementType::Salida),
            other => Err(format!("Unknown movement type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoneyType {
    Ingreso,
    Salida,
}

impl MoneyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoneyType::Ingreso => "ingreso",
            MoneyType::Salida => "salida",
        }
    }
}

impl fmt::Display for MoneyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoneyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ingreso" | "income" => Ok(MoneyType::Ingreso),
            "salida" | "expense" => Ok(MoneyType::Salida),
            other => Err(format!("Unknown money type: {}", other)),
        }
    }
}

/// A record as produced by the normalizer: the store key, the type tag derived
/// from its collection, and the untouched field bag.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub id: String,
    pub record_type: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sku: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub stock: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_stock: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Product {
    pub fn stock(&self) -> i64 {
        self.stock.unwrap_or(0)
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock.unwrap_or(DEFAULT_MIN_STOCK)
    }

    pub fn unit(&self) -> &str {
        self.unit
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT)
    }

    pub fn price(&self) -> f64 {
        finite_or_zero(self.price)
    }

    /// Cost when known, otherwise sale price, otherwise zero.
    pub fn unit_value(&self) -> f64 {
        finite_or_zero(self.cost.or(self.price))
    }

    pub fn stock_value(&self) -> f64 {
        self.unit_value() * self.stock() as f64
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock() <= self.min_stock()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub product_id: String,
    #[serde(
        default,
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient::movement_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub movement_type: Option<MovementType>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Movement {
    pub fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shrinkage {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub product_id: String,
    #[serde(
        default,
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Shrinkage {
    pub fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }

    pub fn total(&self) -> f64 {
        finite_or_zero(self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyRecord {
    #[serde(skip)]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient::money_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub money_type: Option<MoneyType>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl MoneyRecord {
    pub fn amount(&self) -> f64 {
        finite_or_zero(self.amount)
    }
}

/// A recurring bill kept in local storage. Identified by its position only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_at: String,
}

impl Service {
    pub fn new(name: impl Into<String>, amount: f64, due_date: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            amount,
            due_date: due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            created_at: now_iso(),
        }
    }

    /// Due strictly before `today`. Services without a parseable due date never are.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date
            .as_deref()
            .and_then(parse_timestamp)
            .map(|due| due.date() < today)
            .unwrap_or(false)
    }

    pub fn status_label(&self, today: NaiveDate) -> &'static str {
        if self.is_overdue(today) {
            "VENCIDO"
        } else {
            "PENDIENTE"
        }
    }
}

pub(crate) fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Current instant as an RFC 3339 string with millisecond precision.
pub fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parses the date shapes found in records: plain `YYYY-MM-DD` (start of day)
/// and RFC 3339 / ISO timestamps (UTC wall time).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    None
}

/// Field decoders that never fail: unusable values decode as absent.
pub(crate) mod lenient {
    use super::{MoneyType, MovementType};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn as_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    pub fn as_integer(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            }
            _ => None,
        }
    }

    fn as_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(as_number(&Value::deserialize(d)?))
    }

    pub fn number_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(as_number(&Value::deserialize(d)?).unwrap_or(0.0))
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(as_integer(&Value::deserialize(d)?))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(as_text(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(as_text(&Value::deserialize(d)?))
    }

    pub fn movement_type<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<MovementType>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if s == "entrada" => Some(MovementType::Entrada),
            Value::String(s) if s == "salida" => Some(MovementType::Salida),
            _ => None,
        })
    }

    pub fn money_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<MoneyType>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if s == "ingreso" => Some(MoneyType::Ingreso),
            Value::String(s) if s == "salida" => Some(MoneyType::Salida),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_defaults_apply_when_fields_missing() {
        let product: Product = serde_json::from_value(json!({ "name": "Pan" })).unwrap();
        assert_eq!(product.stock(), 0);
        assert_eq!(product.min_stock(), DEFAULT_MIN_STOCK);
        assert_eq!(product.unit(), "unidad");
        assert_eq!(product.unit_value(), 0.0);
        assert!(product.is_low_stock());
    }

    #[test]
    fn lenient_fields_accept_numeric_strings_and_ignore_garbage() {
        let product: Product = serde_json::from_value(json!({
            "name": 42,
            "price": "1500",
            "cost": "abc",
            "stock": "7",
            "minStock": 2.9,
        }))
        .unwrap();
        assert_eq!(product.name, "42");
        assert_eq!(product.price, Some(1500.0));
        assert_eq!(product.cost, None);
        assert_eq!(product.stock, Some(7));
        assert_eq!(product.min_stock, Some(2));
    }

    #[test]
    fn unit_value_prefers_cost_then_price() {
        let mut product = Product {
            price: Some(1000.0),
            ..Default::default()
        };
        assert_eq!(product.unit_value(), 1000.0);
        product.cost = Some(800.0);
        assert_eq!(product.unit_value(), 800.0);
    }

    #[test]
    fn unknown_enum_values_decode_as_absent() {
        let movement: Movement =
            serde_json::from_value(json!({ "movementType": "transfer", "quantity": 3 })).unwrap();
        assert_eq!(movement.movement_type, None);
        assert_eq!(movement.quantity(), 3);
    }

    #[test]
    fn serialization_uses_store_field_names_and_skips_id() {
        let product = Product {
            id: "abc".into(),
            name: "Leche".into(),
            min_stock: Some(3),
            ..Default::default()
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value, json!({ "name": "Leche", "minStock": 3 }));
    }

    #[test]
    fn parse_timestamp_handles_dates_and_iso_times() {
        let day = parse_timestamp("2024-03-10").unwrap();
        assert_eq!(day.to_string(), "2024-03-10 00:00:00");
        let iso = parse_timestamp("2024-03-10T15:04:05.123Z").unwrap();
        assert_eq!(iso.date(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn service_overdue_is_strictly_before_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let due_today = Service::new("Luz", 100.0, Some(today));
        let due_before = Service::new("Agua", 50.0, today.pred_opt());
        let no_date = Service::new("Gas", 10.0, None);

        assert!(!due_today.is_overdue(today));
        assert!(due_before.is_overdue(today));
        assert!(!no_date.is_overdue(today));
        assert_eq!(due_before.status_label(today), "VENCIDO");
        assert_eq!(no_date.status_label(today), "PENDIENTE");
    }
}
