//! # Rendering Module
//!
//! Turns the library's view structs into terminal text. Every `render_*`
//! function returns a `String` so layout can be tested without a terminal;
//! only [`print_messages`] writes directly.
//!
//! Layout calculations (width, truncation, padding) are Unicode-aware since
//! product names routinely carry accents.

use super::styles::STYLES;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use stockledger::api::{CmdMessage, MessageLevel};
use stockledger::commands::dashboard::{Dashboard, Flow};
use stockledger::commands::report::{MoneyListing, MovementListing, Report, ShrinkageListing};
use stockledger::config::LedgerConfig;
use stockledger::model::{parse_timestamp, MoneyType, MovementType, Product, Service};
use stockledger::services::ServiceSummary;
use stockledger::view::{DateRange, LedgerView};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const NAME_WIDTH: usize = 28;
pub const TIME_WIDTH: usize = 14;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        let style = match message.level {
            MessageLevel::Info => &STYLES.info,
            MessageLevel::Success => &STYLES.success,
            MessageLevel::Warning => &STYLES.warning,
            MessageLevel::Error => &STYLES.error,
        };
        println!("{}", style.apply_to(&message.content));
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

/// Truncates or right-pads `s` to exactly `width` columns.
fn fit(s: &str, width: usize) -> String {
    let cut = truncate_to_width(s, width);
    let padding = width.saturating_sub(cut.width());
    format!("{}{}", cut, " ".repeat(padding))
}

fn format_time_ago(at: NaiveDateTime) -> String {
    let duration = Utc::now().naive_utc().signed_duration_since(at);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

fn date_cell(date: Option<&str>) -> String {
    fit(date.unwrap_or("-"), 10)
}

fn range_label(range: &DateRange) -> String {
    let side = |d: Option<NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "…".to_string())
    };
    if range.is_unbounded() {
        "all dates".to_string()
    } else {
        format!("{} → {}", side(range.from), side(range.to))
    }
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

pub(super) fn render_dashboard(
    dashboard: &Dashboard,
    services: &ServiceSummary,
    config: &LedgerConfig,
) -> String {
    let money = |v: f64| config.format_money(v);
    let mut out = String::new();

    push_line(&mut out, STYLES.title.apply_to(&config.business_name).to_string());
    push_line(&mut out, STYLES.info.apply_to(range_label(&dashboard.range)).to_string());
    out.push('\n');

    push_line(&mut out, format!("  {} {}", fit("Productos", 20), dashboard.product_count));
    push_line(
        &mut out,
        format!(
            "  {} {}",
            fit("Ingresos", 20),
            STYLES.income.apply_to(money(dashboard.money.income_total))
        ),
    );
    push_line(
        &mut out,
        format!(
            "  {} {}",
            fit("Salidas", 20),
            STYLES.expense.apply_to(money(dashboard.money.expense_total))
        ),
    );
    push_line(
        &mut out,
        format!("  {} {}", fit("Balance", 20), money(dashboard.money.balance)),
    );
    push_line(
        &mut out,
        format!(
            "  {} {}",
            fit("Mermas", 20),
            STYLES.loss.apply_to(money(dashboard.shrinkage_loss))
        ),
    );
    push_line(
        &mut out,
        format!("  {} {}", fit("Valor inventario", 20), money(dashboard.inventory_value)),
    );
    if services.count > 0 {
        let overdue = if services.overdue_count > 0 {
            STYLES
                .overdue
                .apply_to(format!(" ({} vencidos)", services.overdue_count))
                .to_string()
        } else {
            String::new()
        };
        push_line(
            &mut out,
            format!(
                "  {} {} · {}{}",
                fit("Servicios", 20),
                services.count,
                money(services.total_amount),
                overdue
            ),
        );
    }

    out.push('\n');
    push_line(
        &mut out,
        STYLES
            .heading
            .apply_to(format!("Stock bajo ({})", dashboard.low_stock.len()))
            .to_string(),
    );
    if dashboard.low_stock.is_empty() {
        push_line(&mut out, STYLES.info.apply_to("  Nothing is running low.").to_string());
    }
    for product in &dashboard.low_stock {
        push_line(
            &mut out,
            format!(
                "  {} {}",
                fit(&product.name, NAME_WIDTH),
                STYLES.low_stock.apply_to(format!(
                    "{} / {} {}",
                    product.stock(),
                    product.min_stock(),
                    product.unit()
                ))
            ),
        );
    }

    out.push('\n');
    push_line(&mut out, STYLES.heading.apply_to("Actividad reciente").to_string());
    if dashboard.recent.is_empty() {
        push_line(&mut out, STYLES.info.apply_to("  No activity yet.").to_string());
    }
    for line in &dashboard.recent {
        let style = match line.flow {
            Flow::In => &STYLES.income,
            Flow::Out => &STYLES.expense,
            Flow::Loss => &STYLES.loss,
        };
        let amount = line.amount.map(money).unwrap_or_default();
        let when = line
            .date
            .as_deref()
            .and_then(parse_timestamp)
            .map(format_time_ago)
            .unwrap_or_else(|| " ".repeat(TIME_WIDTH));
        push_line(
            &mut out,
            format!(
                "  {} {} {} {}",
                date_cell(line.date.as_deref()),
                style.apply_to(fit(&line.text, 40)),
                fit(&amount, 12),
                STYLES.time.apply_to(when)
            ),
        );
    }
    out
}

pub(super) fn render_products(products: &[Product], config: &LedgerConfig) -> String {
    if products.is_empty() {
        return "No products found.\n".to_string();
    }
    let mut out = String::new();
    for product in products {
        let stock = format!("{} {}", product.stock(), product.unit());
        let stock = if product.is_low_stock() {
            STYLES.low_stock.apply_to(fit(&stock, 14)).to_string()
        } else {
            fit(&stock, 14)
        };
        push_line(
            &mut out,
            format!(
                "  {} {} {} {} {}",
                fit(&product.name, NAME_WIDTH),
                fit(product.sku.as_deref().unwrap_or("-"), 10),
                stock,
                fit(&config.format_money(product.price()), 12),
                STYLES.id.apply_to(&product.id)
            ),
        );
    }
    out
}

pub(super) fn render_categories(categories: &[String]) -> String {
    if categories.is_empty() {
        return "No categories yet.\n".to_string();
    }
    categories
        .iter()
        .map(|c| format!("  {}\n", c))
        .collect()
}

pub(super) fn render_movements(listing: &MovementListing, view: &LedgerView) -> String {
    if listing.rows.is_empty() {
        return "No movements found.\n".to_string();
    }
    let mut out = String::new();
    for movement in &listing.rows {
        let (label, style) = match movement.movement_type {
            Some(MovementType::Entrada) => ("entrada", &STYLES.income),
            Some(MovementType::Salida) => ("salida", &STYLES.expense),
            None => ("?", &STYLES.info),
        };
        push_line(
            &mut out,
            format!(
                "  {} {} {} {} {} {}",
                date_cell(movement.date.as_deref()),
                style.apply_to(fit(label, 8)),
                fit(view.product_name(&movement.product_id), NAME_WIDTH),
                fit(&movement.quantity().to_string(), 6),
                fit(movement.reason.as_deref().unwrap_or(""), 20),
                STYLES.id.apply_to(&movement.id)
            ),
        );
    }
    push_line(
        &mut out,
        STYLES
            .heading
            .apply_to(format!(
                "Entradas: {}  Salidas: {}",
                listing.totals.entries, listing.totals.exits
            ))
            .to_string(),
    );
    out
}

pub(super) fn render_shrinkages(
    listing: &ShrinkageListing,
    view: &LedgerView,
    config: &LedgerConfig,
) -> String {
    if listing.rows.is_empty() {
        return "No shrinkage found.\n".to_string();
    }
    let mut out = String::new();
    for shrinkage in &listing.rows {
        push_line(
            &mut out,
            format!(
                "  {} {} {} {} {} {}",
                date_cell(shrinkage.date.as_deref()),
                fit(view.product_name(&shrinkage.product_id), NAME_WIDTH),
                fit(&shrinkage.quantity().to_string(), 6),
                fit(shrinkage.reason.as_deref().unwrap_or(""), 20),
                STYLES.loss.apply_to(fit(&config.format_money(shrinkage.total()), 12)),
                STYLES.id.apply_to(&shrinkage.id)
            ),
        );
    }
    push_line(
        &mut out,
        STYLES
            .heading
            .apply_to(format!("Pérdida total: {}", config.format_money(listing.loss)))
            .to_string(),
    );
    out
}

pub(super) fn render_money(listing: &MoneyListing, config: &LedgerConfig) -> String {
    if listing.rows.is_empty() {
        return "No money records found.\n".to_string();
    }
    let mut out = String::new();
    for record in &listing.rows {
        let (label, style) = match record.money_type {
            Some(MoneyType::Ingreso) => ("ingreso", &STYLES.income),
            Some(MoneyType::Salida) => ("salida", &STYLES.expense),
            None => ("?", &STYLES.info),
        };
        push_line(
            &mut out,
            format!(
                "  {} {} {} {} {}",
                date_cell(record.date.as_deref()),
                style.apply_to(fit(label, 8)),
                fit(&record.description, 36),
                fit(&config.format_money(record.amount()), 12),
                STYLES.id.apply_to(&record.id)
            ),
        );
    }
    let summary = &listing.summary;
    push_line(
        &mut out,
        STYLES
            .heading
            .apply_to(format!(
                "Ingresos: {}  Salidas: {}  Balance: {}",
                config.format_money(summary.income_total),
                config.format_money(summary.expense_total),
                config.format_money(summary.balance)
            ))
            .to_string(),
    );
    out
}

pub(super) fn render_services(
    services: &[Service],
    summary: &ServiceSummary,
    today: NaiveDate,
    config: &LedgerConfig,
) -> String {
    if services.is_empty() {
        return "No services pending.\n".to_string();
    }
    let mut out = String::new();
    for (i, service) in services.iter().enumerate() {
        let status = service.status_label(today);
        let status = if service.is_overdue(today) {
            STYLES.overdue.apply_to(status).to_string()
        } else {
            status.to_string()
        };
        push_line(
            &mut out,
            format!(
                "  {}. {} {} {} {}",
                i + 1,
                fit(&service.name, NAME_WIDTH),
                fit(&config.format_money(service.amount), 12),
                date_cell(service.due_date.as_deref()),
                status
            ),
        );
    }
    push_line(
        &mut out,
        STYLES
            .heading
            .apply_to(format!(
                "Total: {} · {} vencidos",
                config.format_money(summary.total_amount),
                summary.overdue_count
            ))
            .to_string(),
    );
    out
}

pub(super) fn render_report(report: &Report, config: &LedgerConfig) -> String {
    let money = |v: f64| config.format_money(v);
    let mut out = String::new();
    push_line(
        &mut out,
        STYLES
            .title
            .apply_to(format!("Reporte {}", report.period_label))
            .to_string(),
    );
    push_line(&mut out, STYLES.info.apply_to(range_label(&report.range)).to_string());

    if let Some(products) = &report.products {
        out.push('\n');
        push_line(&mut out, STYLES.heading.apply_to("Productos").to_string());
        push_line(&mut out, format!("  {} {}", fit("Total", 20), products.count));
        push_line(
            &mut out,
            format!("  {} {}", fit("Valor inventario", 20), money(products.inventory_value)),
        );
        push_line(&mut out, format!("  {} {}", fit("Stock bajo", 20), products.low_stock_count));
    }
    if let Some(movements) = &report.movements {
        out.push('\n');
        push_line(&mut out, STYLES.heading.apply_to("Movimientos").to_string());
        push_line(&mut out, format!("  {} {}", fit("Total", 20), movements.count));
        push_line(
            &mut out,
            format!(
                "  {} {} ({} u.)",
                fit("Entradas", 20),
                movements.entry_count,
                movements.totals.entries
            ),
        );
        push_line(
            &mut out,
            format!(
                "  {} {} ({} u.)",
                fit("Salidas", 20),
                movements.exit_count,
                movements.totals.exits
            ),
        );
    }
    if let Some(shrinkage) = &report.shrinkage {
        out.push('\n');
        push_line(&mut out, STYLES.heading.apply_to("Mermas").to_string());
        push_line(&mut out, format!("  {} {}", fit("Total", 20), shrinkage.count));
        push_line(&mut out, format!("  {} {}", fit("Pérdida", 20), money(shrinkage.loss)));
    }
    if let Some(summary) = &report.money {
        out.push('\n');
        push_line(&mut out, STYLES.heading.apply_to("Dinero").to_string());
        push_line(&mut out, format!("  {} {}", fit("Ingresos", 20), money(summary.income_total)));
        push_line(&mut out, format!("  {} {}", fit("Salidas", 20), money(summary.expense_total)));
        push_line(&mut out, format!("  {} {}", fit("Balance", 20), money(summary.balance)));
    }
    out
}
