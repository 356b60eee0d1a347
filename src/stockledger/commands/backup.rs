//! Delimited-text backup and restore.
//!
//! A backup is a sequence of sections, each introduced by a line holding only
//! its name (`PRODUCTOS`, `MOVIMIENTOS`, `MERMAS`, `DINERO`, `SERVICIOS`) and
//! a header row, followed by one comma-separated, quote-escaped row per
//! record. Sections are separated by a blank line.
//!
//! An exported workbook folder can be restored the same way: its `Productos`
//! and `Servicios` sheets are turned back into backup rows first.
//!
//! Restore only re-creates products and services. The other sections are read
//! and counted but never replayed, since their effects are already folded into
//! the restored products' stock.

use crate::commands::export::{number_or_blank, Sheet};
use crate::commands::helpers::{to_fields, WriteSteps};
use crate::commands::products::{self, ProductInput};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{now_iso, Collection, Service};
use crate::services::ServiceLedger;
use crate::store::local::LocalStorage;
use crate::store::DataStore;
use crate::view::LedgerView;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const PRODUCT_FIELDS: usize = 8;
const SERVICE_FIELDS: usize = 4;

/// Workbook row labels, in backup column order.
const PRODUCT_LABELS: [&str; PRODUCT_FIELDS] = [
    "Nombre",
    "SKU",
    "Categoría",
    "Precio Venta",
    "Costo",
    "Stock",
    "Stock Mínimo",
    "Unidad",
];
const SERVICE_LABELS: [&str; SERVICE_FIELDS] =
    ["Nombre", "Monto", "Fecha Vencimiento", "Fecha Creación"];
const WORKBOOK_SHEETS: [&str; 5] = ["Productos", "Movimientos", "Mermas", "Dinero", "Servicios"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Products,
    Movements,
    Shrinkages,
    Money,
    Services,
}

impl Section {
    fn title(&self) -> &'static str {
        match self {
            Section::Products => "PRODUCTOS",
            Section::Movements => "MOVIMIENTOS",
            Section::Shrinkages => "MERMAS",
            Section::Money => "DINERO",
            Section::Services => "SERVICIOS",
        }
    }

    fn header(&self) -> &'static [&'static str] {
        match self {
            Section::Products => &[
                "Nombre",
                "SKU",
                "Categoría",
                "Precio",
                "Costo",
                "Stock",
                "Stock Mínimo",
                "Unidad",
            ],
            Section::Movements => &["Producto", "Tipo", "Cantidad", "Motivo", "Fecha"],
            Section::Shrinkages => &["Producto", "Cantidad", "Motivo", "Total", "Fecha"],
            Section::Money => &["Tipo", "Monto", "Descripción", "Referencia", "Fecha"],
            Section::Services => &["Nombre", "Monto", "Fecha Vencimiento", "Fecha Creación"],
        }
    }

    fn from_title(text: &str) -> Option<Self> {
        match text.trim() {
            "PRODUCTOS" => Some(Section::Products),
            "MOVIMIENTOS" => Some(Section::Movements),
            "MERMAS" => Some(Section::Shrinkages),
            "DINERO" => Some(Section::Money),
            "SERVICIOS" => Some(Section::Services),
            _ => None,
        }
    }
}

fn render_section(section: Section, rows: Vec<Vec<String>>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record([section.title()])?;
    writer.write_record(section.header())?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Renders every collection and the service list as backup text.
pub fn render_backup(view: &LedgerView, services: &[Service]) -> Result<String> {
    let products = view
        .products()
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                text(&p.sku),
                text(&p.category),
                p.price().to_string(),
                number_or_blank(p.cost),
                p.stock().to_string(),
                p.min_stock().to_string(),
                p.unit().to_string(),
            ]
        })
        .collect();

    let movements = view
        .movements()
        .iter()
        .map(|m| {
            vec![
                view.product_name(&m.product_id).to_string(),
                m.movement_type
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                m.quantity().to_string(),
                text(&m.reason),
                text(&m.date),
            ]
        })
        .collect();

    let shrinkages = view
        .shrinkages()
        .iter()
        .map(|s| {
            vec![
                view.product_name(&s.product_id).to_string(),
                s.quantity().to_string(),
                text(&s.reason),
                s.total().to_string(),
                text(&s.date),
            ]
        })
        .collect();

    let money = view
        .money()
        .iter()
        .map(|m| {
            vec![
                m.money_type
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                m.amount().to_string(),
                m.description.clone(),
                text(&m.reference),
                text(&m.date),
            ]
        })
        .collect();

    let service_rows = services
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.amount.to_string(),
                text(&s.due_date),
                s.created_at.clone(),
            ]
        })
        .collect();

    let sections = [
        render_section(Section::Products, products)?,
        render_section(Section::Movements, movements)?,
        render_section(Section::Shrinkages, shrinkages)?,
        render_section(Section::Money, money)?,
        render_section(Section::Services, service_rows)?,
    ];
    Ok(sections.join("\n"))
}

pub fn write_backup(view: &LedgerView, services: &[Service], path: &Path) -> Result<CmdResult> {
    let content = render_backup(view, services)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    info!(path = %path.display(), "backup written");

    let mut result = CmdResult::default().with_written_paths(vec![path.to_path_buf()]);
    result.add_message(CmdMessage::success(format!(
        "Backup written to {}",
        path.display()
    )));
    Ok(result)
}

/// What a backup file holds. Only `products` and `services` are restorable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBackup {
    pub products: Vec<ProductInput>,
    pub services: Vec<Service>,
    pub movements: usize,
    pub shrinkages: usize,
    pub money: usize,
    /// Rows in a restorable section with too few fields.
    pub skipped: usize,
}

fn field(record: &csv::StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_header_row(record: &csv::StringRecord) -> bool {
    matches!(
        record.get(0).map(str::trim),
        Some("Nombre") | Some("Producto") | Some("Tipo")
    )
}

fn product_row(record: &csv::StringRecord) -> ProductInput {
    ProductInput {
        name: field(record, 0),
        sku: field(record, 1),
        category: field(record, 2),
        price: field(record, 3).and_then(|v| v.parse::<f64>().ok()),
        cost: field(record, 4).and_then(|v| v.parse::<f64>().ok()),
        stock: field(record, 5).and_then(|v| v.parse::<i64>().ok()),
        min_stock: field(record, 6).and_then(|v| v.parse::<i64>().ok()),
        unit: field(record, 7),
    }
}

fn service_row(record: &csv::StringRecord) -> Service {
    Service {
        name: field(record, 0).unwrap_or_default(),
        amount: field(record, 1)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        due_date: field(record, 2),
        created_at: field(record, 3).unwrap_or_else(now_iso),
    }
}

pub fn parse_backup(content: &str) -> Result<ParsedBackup> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut parsed = ParsedBackup::default();
    let mut section = None;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() == 1 {
            if let Some(next) = record.get(0).and_then(Section::from_title) {
                section = Some(next);
                continue;
            }
        }
        if is_header_row(&record) {
            continue;
        }

        match section {
            Some(Section::Products) if record.len() >= PRODUCT_FIELDS => {
                parsed.products.push(product_row(&record))
            }
            Some(Section::Services) if record.len() >= SERVICE_FIELDS => {
                parsed.services.push(service_row(&record))
            }
            Some(Section::Products) | Some(Section::Services) => parsed.skipped += 1,
            Some(Section::Movements) => parsed.movements += 1,
            Some(Section::Shrinkages) => parsed.shrinkages += 1,
            Some(Section::Money) => parsed.money += 1,
            None => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

pub fn read_backup(path: &Path) -> Result<ParsedBackup> {
    let content = fs::read_to_string(path)?;
    parse_backup(&content)
}

fn record_count(sheet: &Sheet, label: &str) -> usize {
    sheet
        .row(label)
        .map(|row| row.len().saturating_sub(1))
        .unwrap_or(0)
}

/// Column `c` of the labelled rows becomes backup record `c`.
fn untranspose(sheet: &Sheet, labels: &[&str]) -> Vec<csv::StringRecord> {
    let count = labels
        .iter()
        .map(|label| record_count(sheet, label))
        .max()
        .unwrap_or(0);
    (1..=count)
        .map(|col| {
            labels
                .iter()
                .map(|label| sheet.value(label, col).unwrap_or(""))
                .collect()
        })
        .collect()
}

/// Reads exported workbook sheets as if they were a backup.
pub fn parse_workbook(sheets: &[Sheet]) -> ParsedBackup {
    let mut parsed = ParsedBackup::default();
    for sheet in sheets {
        match sheet.name {
            "Productos" => parsed.products.extend(
                untranspose(sheet, &PRODUCT_LABELS)
                    .iter()
                    .map(product_row),
            ),
            "Servicios" => parsed.services.extend(
                untranspose(sheet, &SERVICE_LABELS)
                    .iter()
                    .map(service_row),
            ),
            "Movimientos" => parsed.movements += record_count(sheet, "Fecha"),
            "Mermas" => parsed.shrinkages += record_count(sheet, "Fecha"),
            "Dinero" => parsed.money += record_count(sheet, "Fecha"),
            _ => {}
        }
    }
    parsed
}

/// Loads the sheets of an exported workbook folder. Missing sheets are
/// collections that were empty at export time.
pub fn read_workbook(dir: &Path) -> Result<ParsedBackup> {
    let mut sheets = Vec::new();
    for name in WORKBOOK_SHEETS {
        let path = dir.join(format!("{}.csv", name));
        if !path.exists() {
            continue;
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        sheets.push(Sheet { name, rows });
    }
    Ok(parse_workbook(&sheets))
}

/// Re-creates the products and services of a parsed backup.
///
/// Rows that fail validation are skipped with a warning. Each write is
/// independent: a failure stops the restore and reports how far it got.
pub fn restore<S: DataStore, L: LocalStorage>(
    store: &S,
    ledger: &mut ServiceLedger<L>,
    parsed: ParsedBackup,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let mut steps = WriteSteps::new();
    let mut ids = Vec::new();

    for input in parsed.products {
        let product = match products::build(input) {
            Ok(product) => product,
            Err(err) => {
                warn!(error = %err, "skipping product row");
                result.add_message(CmdMessage::warning(format!("Skipped product: {}", err)));
                continue;
            }
        };
        let step = format!("restore product {}", product.name);
        let id = steps.run(&step, || {
            store.push(Collection::Products, &to_fields(&product)?)
        })?;
        ids.push(id);
    }

    let mut services_restored = 0;
    for service in parsed.services {
        if service.name.trim().is_empty() {
            result.add_message(CmdMessage::warning("Skipped service without a name"));
            continue;
        }
        let step = format!("restore service {}", service.name);
        steps.run(&step, || ledger.add(service))?;
        services_restored += 1;
    }

    info!(
        products = ids.len(),
        services = services_restored,
        "backup restored"
    );
    result.add_message(CmdMessage::success(format!(
        "Restored {} product(s) and {} service(s)",
        ids.len(),
        services_restored
    )));
    let informational = parsed.movements + parsed.shrinkages + parsed.money;
    if informational > 0 {
        result.add_message(CmdMessage::info(format!(
            "{} movement, shrinkage and money row(s) were read but not replayed",
            informational
        )));
    }
    if parsed.skipped > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} row(s) had too few fields",
            parsed.skipped
        )));
    }
    Ok(result.with_affected_ids(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::commands::export;
    use crate::model::{MoneyType, MovementType, Product};
    use crate::view::inventory_value;
    use crate::store::local::MemLocal;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn view() -> LedgerView {
        let fixture = StoreFixture::new();
        let leche = fixture.push(
            Collection::Products,
            json!({
                "name": "Leche, entera",
                "sku": "LE-1",
                "category": "Lácteos",
                "price": 1000,
                "cost": 800.5,
                "stock": 10,
                "minStock": 0,
                "unit": "litro",
            }),
        );
        fixture.push(Collection::Products, json!({ "name": "Pan \"amasado\"", "price": 200 }));
        let fixture = fixture
            .with_movement(&leche, MovementType::Salida, 2, "2024-03-02")
            .with_money(MoneyType::Ingreso, 2000.0, "2024-03-02");
        LedgerView::from_snapshot(&fixture.store.snapshot().unwrap())
    }

    #[derive(Debug, PartialEq)]
    struct Restorable {
        name: String,
        sku: Option<String>,
        category: Option<String>,
        price: f64,
        cost: Option<f64>,
        stock: i64,
        min_stock: i64,
        unit: String,
        unit_value: f64,
    }

    fn restorable(p: &Product) -> Restorable {
        Restorable {
            name: p.name.clone(),
            sku: p.sku.clone(),
            category: p.category.clone(),
            price: p.price(),
            cost: p.cost,
            stock: p.stock(),
            min_stock: p.min_stock(),
            unit: p.unit().to_string(),
            unit_value: p.unit_value(),
        }
    }

    fn restore_into_fresh(parsed: ParsedBackup) -> (LedgerView, ServiceLedger<MemLocal>) {
        let store = InMemoryStore::new();
        let mut ledger = ServiceLedger::load(MemLocal::new()).unwrap();
        restore(&store, &mut ledger, parsed).unwrap();
        (LedgerView::from_snapshot(&store.snapshot().unwrap()), ledger)
    }

    #[test]
    fn render_writes_every_section_with_headers() {
        let text = render_backup(&view(), &[]).unwrap();
        for title in ["PRODUCTOS", "MOVIMIENTOS", "MERMAS", "DINERO", "SERVICIOS"] {
            assert!(text.contains(&format!("{}\n", title)), "missing {}", title);
        }
        assert!(text.contains("Nombre,SKU,Categoría,Precio,Costo,Stock,Stock Mínimo,Unidad\n"));
        assert!(text.contains("\"Leche, entera\",LE-1,Lácteos,1000,800.5,10,0,litro\n"));
        assert!(text.contains("\"Pan \"\"amasado\"\"\",,,200,,0,5,unidad\n"));
    }

    #[test]
    fn products_round_trip_through_backup_text() {
        let original = view();
        let text = render_backup(&original, &[]).unwrap();
        let parsed = parse_backup(&text).unwrap();
        assert_eq!(parsed.products.len(), 2);
        assert_eq!(parsed.movements, 1);
        assert_eq!(parsed.money, 1);

        let (restored, _) = restore_into_fresh(parsed);
        let before: Vec<_> = original.products().iter().map(restorable).collect();
        let after: Vec<_> = restored.products().iter().map(restorable).collect();
        assert_eq!(before, after);
        assert_eq!(after[1].cost, None);
        assert_eq!(after[1].unit_value, 200.0);
        assert_eq!(
            inventory_value(restored.products()),
            inventory_value(original.products())
        );
        assert!(restored.movements().is_empty());
        assert!(restored.money().is_empty());
    }

    #[test]
    fn exported_workbook_restores_products_and_services() {
        let original = view();
        let services = vec![Service::new("Luz", 45000.0, NaiveDate::from_ymd_opt(2024, 3, 1))];
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = export::run(&original, &services, dir.path(), "inventario", today).unwrap();
        let folder = result.written_paths[0].parent().unwrap().to_path_buf();

        let parsed = read_workbook(&folder).unwrap();
        assert_eq!(parsed.products.len(), 2);
        assert_eq!(parsed.movements, 1);
        assert_eq!(parsed.money, 1);
        assert_eq!(parsed.shrinkages, 0);

        let (restored, ledger) = restore_into_fresh(parsed);
        let before: Vec<_> = original.products().iter().map(restorable).collect();
        let after: Vec<_> = restored.products().iter().map(restorable).collect();
        assert_eq!(before, after);
        assert_eq!(
            inventory_value(restored.products()),
            inventory_value(original.products())
        );
        assert_eq!(ledger.services().len(), 1);
        assert_eq!(ledger.services()[0].name, "Luz");
        assert_eq!(ledger.services()[0].due_date.as_deref(), Some("2024-03-01"));
        assert_eq!(ledger.services()[0].created_at, services[0].created_at);
    }

    #[test]
    fn services_are_restored_into_the_local_ledger() {
        let services = vec![
            Service::new("Luz", 45000.0, NaiveDate::from_ymd_opt(2024, 3, 1)),
            Service::new("Agua", 15000.0, None),
        ];
        let text = render_backup(&LedgerView::default(), &services).unwrap();
        let parsed = parse_backup(&text).unwrap();
        assert_eq!(parsed.services.len(), 2);
        assert_eq!(parsed.services[0].due_date.as_deref(), Some("2024-03-01"));
        assert_eq!(parsed.services[1].due_date, None);
        assert_eq!(parsed.services[0].created_at, services[0].created_at);

        let store = InMemoryStore::new();
        let mut ledger = ServiceLedger::load(MemLocal::new()).unwrap();
        let result = restore(&store, &mut ledger, parsed).unwrap();
        assert!(result.affected_ids.is_empty());
        assert_eq!(ledger.services().len(), 2);
        assert_eq!(ledger.services()[0].amount, 45000.0);
    }

    #[test]
    fn short_rows_and_unparseable_numbers() {
        let text = "PRODUCTOS\n\
                    Nombre,SKU,Categoría,Precio,Costo,Stock,Stock Mínimo,Unidad\n\
                    Arroz,,,abc,,7,x,kg\n\
                    Corto,1,2\n\
                    \n\
                    SERVICIOS\n\
                    Gas,12,,\n";
        let parsed = parse_backup(text).unwrap();
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.products.len(), 1);

        let arroz = products::build(parsed.products[0].clone()).unwrap();
        assert_eq!(arroz.price, Some(0.0));
        assert_eq!(arroz.stock, Some(7));
        assert_eq!(arroz.min_stock, Some(5));
        assert_eq!(arroz.unit.as_deref(), Some("kg"));

        assert_eq!(parsed.services.len(), 1);
        assert_eq!(parsed.services[0].amount, 12.0);
        assert!(!parsed.services[0].created_at.is_empty());
    }

    #[test]
    fn failed_write_midway_is_partial() {
        let text = render_backup(&view(), &[]).unwrap();
        let parsed = parse_backup(&text).unwrap();

        let store = InMemoryStore::new();
        store.backend().fail_after(1);
        let mut ledger = ServiceLedger::load(MemLocal::new()).unwrap();
        let err = restore(&store, &mut ledger, parsed).unwrap_err();
        assert!(matches!(err, LedgerError::PartialWrite { .. }));
    }

    #[test]
    fn write_backup_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("backup.csv");
        let result = write_backup(&view(), &[], &path).unwrap();
        assert_eq!(result.written_paths, vec![path.clone()]);
        let parsed = read_backup(&path).unwrap();
        assert_eq!(parsed.products.len(), 2);
    }
}
