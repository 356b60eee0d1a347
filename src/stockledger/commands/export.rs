//! Workbook export.
//!
//! Each collection becomes one sheet in a transposed layout: a title row, a
//! blank row, then one row per field with one column per record, followed by
//! totals and the export date. Empty collections get no sheet; the `Resumen`
//! sheet is always written. Sheets are saved as CSV files, one per sheet,
//! inside `<base>_<YYYY-MM-DD>/`.

use crate::commands::helpers::format_date;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{MoneyType, MovementType, Service};
use crate::view::{aggregate_money, aggregate_shrinkage_loss, inventory_value, low_stock, movement_totals, LedgerView};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &'static str, title: &str) -> Self {
        Self {
            name,
            rows: vec![vec![title.to_string()], vec![String::new()]],
        }
    }

    fn field<I: IntoIterator<Item = String>>(&mut self, label: &str, values: I) {
        let mut row = vec![label.to_string()];
        row.extend(values);
        self.rows.push(row);
    }

    fn pair(&mut self, label: &str, value: impl ToString) {
        self.rows.push(vec![label.to_string(), value.to_string()]);
    }

    fn blank(&mut self) {
        self.rows.push(vec![String::new()]);
    }

    fn footer(&mut self, today: &str) {
        self.blank();
        self.pair("Fecha de exportación:", today);
    }

    /// The first row labelled `label`, label included.
    pub fn row(&self, label: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some(label))
            .map(Vec::as_slice)
    }

    /// Value in column `col` of the row labelled `label`.
    pub fn value(&self, label: &str, col: usize) -> Option<&str> {
        self.row(label)
            .and_then(|row| row.get(col))
            .map(String::as_str)
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Unknown numbers stay blank so a re-import keeps them unknown.
pub(crate) fn number_or_blank(value: Option<f64>) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

pub fn build_workbook(view: &LedgerView, services: &[Service], today: NaiveDate) -> Vec<Sheet> {
    let date = format_date(today);
    let products = view.products();
    let movements = view.movements();
    let shrinkages = view.shrinkages();
    let money = view.money();
    let money_summary = aggregate_money(money);
    let mut sheets = Vec::new();

    if !products.is_empty() {
        let mut sheet = Sheet::new("Productos", "INVENTARIO DE PRODUCTOS");
        sheet.field("Nombre", products.iter().map(|p| p.name.clone()));
        sheet.field("SKU", products.iter().map(|p| text(&p.sku)));
        sheet.field("Categoría", products.iter().map(|p| text(&p.category)));
        sheet.field("Precio Venta", products.iter().map(|p| p.price().to_string()));
        sheet.field(
            "Costo",
            products
                .iter()
                .map(|p| number_or_blank(p.cost)),
        );
        sheet.field("Stock", products.iter().map(|p| p.stock().to_string()));
        sheet.field("Stock Mínimo", products.iter().map(|p| p.min_stock().to_string()));
        sheet.field("Unidad", products.iter().map(|p| p.unit().to_string()));
        sheet.field("Valor Total", products.iter().map(|p| p.stock_value().to_string()));
        sheet.footer(&date);
        sheets.push(sheet);
    }

    if !movements.is_empty() {
        let totals = movement_totals(movements);
        let mut sheet = Sheet::new("Movimientos", "REGISTRO DE MOVIMIENTOS");
        sheet.field("Fecha", movements.iter().map(|m| text(&m.date)));
        sheet.field(
            "Producto",
            movements
                .iter()
                .map(|m| view.product_name(&m.product_id).to_string()),
        );
        sheet.field(
            "Tipo",
            movements.iter().map(|m| {
                match m.movement_type {
                    Some(MovementType::Entrada) => "ENTRADA",
                    _ => "SALIDA",
                }
                .to_string()
            }),
        );
        sheet.field("Cantidad", movements.iter().map(|m| m.quantity().to_string()));
        sheet.field("Motivo", movements.iter().map(|m| text(&m.reason)));
        sheet.blank();
        sheet.pair("Total Entradas:", totals.entries);
        sheet.pair("Total Salidas:", totals.exits);
        sheet.footer(&date);
        sheets.push(sheet);
    }

    if !shrinkages.is_empty() {
        let mut sheet = Sheet::new("Mermas", "REGISTRO DE MERMAS");
        sheet.field("Fecha", shrinkages.iter().map(|s| text(&s.date)));
        sheet.field(
            "Producto",
            shrinkages
                .iter()
                .map(|s| view.product_name(&s.product_id).to_string()),
        );
        sheet.field("Cantidad", shrinkages.iter().map(|s| s.quantity().to_string()));
        sheet.field("Motivo", shrinkages.iter().map(|s| text(&s.reason)));
        sheet.field(
            "Valor Unitario",
            shrinkages.iter().map(|s| {
                view.product(&s.product_id)
                    .map(|p| p.unit_value())
                    .unwrap_or(0.0)
                    .to_string()
            }),
        );
        sheet.field("Total Pérdida", shrinkages.iter().map(|s| s.total().to_string()));
        sheet.blank();
        sheet.pair("Total mermas:", shrinkages.len());
        sheet.pair("Pérdida total:", aggregate_shrinkage_loss(shrinkages));
        sheet.footer(&date);
        sheets.push(sheet);
    }

    if !money.is_empty() {
        let mut sheet = Sheet::new("Dinero", "REGISTRO DE DINERO");
        sheet.field("Fecha", money.iter().map(|m| text(&m.date)));
        sheet.field(
            "Tipo",
            money.iter().map(|m| {
                match m.money_type {
                    Some(MoneyType::Ingreso) => "INGRESO",
                    _ => "SALIDA",
                }
                .to_string()
            }),
        );
        sheet.field("Descripción", money.iter().map(|m| m.description.clone()));
        sheet.field("Monto", money.iter().map(|m| m.amount().to_string()));
        sheet.field("Referencia", money.iter().map(|m| text(&m.reference)));
        sheet.blank();
        sheet.pair("Total Ingresos:", money_summary.income_total);
        sheet.pair("Total Salidas:", money_summary.expense_total);
        sheet.pair("Balance:", money_summary.balance);
        sheet.footer(&date);
        sheets.push(sheet);
    }

    let services_total: f64 = services.iter().map(|s| s.amount).sum();
    if !services.is_empty() {
        let mut sheet = Sheet::new("Servicios", "SERVICIOS A PAGAR");
        sheet.field("Nombre", services.iter().map(|s| s.name.clone()));
        sheet.field("Monto", services.iter().map(|s| s.amount.to_string()));
        sheet.field("Fecha Vencimiento", services.iter().map(|s| text(&s.due_date)));
        sheet.field("Fecha Creación", services.iter().map(|s| s.created_at.clone()));
        sheet.field(
            "Estado",
            services
                .iter()
                .map(|s| s.status_label(today).to_string()),
        );
        sheet.blank();
        sheet.pair("Total servicios:", services.len());
        sheet.pair("Monto total:", services_total);
        sheet.pair(
            "Servicios vencidos:",
            services.iter().filter(|s| s.is_overdue(today)).count(),
        );
        sheet.footer(&date);
        sheets.push(sheet);
    }

    let count_of = |t: MovementType| movements.iter().filter(|m| m.movement_type == Some(t)).count();
    let mut summary = Sheet::new("Resumen", "RESUMEN GENERAL DEL INVENTARIO");
    summary.pair("Fecha de exportación:", &date);
    summary.blank();
    summary.rows.push(vec!["INVENTARIO".to_string()]);
    summary.pair("Total productos:", products.len());
    summary.pair("Valor total inventario:", inventory_value(products));
    summary.pair("Productos con stock bajo:", low_stock(products).len());
    summary.blank();
    summary.rows.push(vec!["MOVIMIENTOS".to_string()]);
    summary.pair("Total movimientos:", movements.len());
    summary.pair("Entradas:", count_of(MovementType::Entrada));
    summary.pair("Salidas:", count_of(MovementType::Salida));
    summary.blank();
    summary.rows.push(vec!["MERMAS".to_string()]);
    summary.pair("Total mermas:", shrinkages.len());
    summary.pair("Pérdida total:", aggregate_shrinkage_loss(shrinkages));
    summary.blank();
    summary.rows.push(vec!["DINERO".to_string()]);
    summary.pair("Total ingresos:", money_summary.income_total);
    summary.pair("Total salidas:", money_summary.expense_total);
    summary.pair("Balance neto:", money_summary.balance);
    summary.blank();
    summary.rows.push(vec!["SERVICIOS".to_string()]);
    summary.pair("Total servicios:", services.len());
    summary.pair("Monto total servicios:", services_total);
    sheets.push(summary);

    sheets
}

/// Writes every sheet as `<dir>/<base>_<date>/<Sheet>.csv`.
pub fn write_workbook(
    dir: &Path,
    base_name: &str,
    today: NaiveDate,
    sheets: &[Sheet],
) -> Result<Vec<PathBuf>> {
    let target = dir.join(format!("{}_{}", base_name, format_date(today)));
    fs::create_dir_all(&target)?;

    let mut paths = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let path = target.join(format!("{}.csv", sheet.name));
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
        for row in &sheet.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        paths.push(path);
    }
    Ok(paths)
}

pub fn run(
    view: &LedgerView,
    services: &[Service],
    dir: &Path,
    base_name: &str,
    today: NaiveDate,
) -> Result<CmdResult> {
    let sheets = build_workbook(view, services, today);
    let paths = write_workbook(dir, base_name, today, &sheets)?;
    info!(sheets = paths.len(), dir = %dir.display(), "workbook exported");

    let mut result = CmdResult::default();
    if let Some(folder) = paths.first().and_then(|p| p.parent()) {
        result.add_message(CmdMessage::success(format!(
            "Exported {} sheet(s) to {}",
            paths.len(),
            folder.display()
        )));
    }
    Ok(result.with_written_paths(paths))
}
