//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, stdin)
//! - Initializes the tracing subscriber
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Loads configuration and opens the ledger
//! - `handle_*()`: Per-command handlers that call the API and print output
//!
//! Handlers never compute business results themselves; they translate
//! arguments into API calls and hand the returned structs to `render`.

use super::render::{
    print_messages, render_categories, render_dashboard, render_money, render_movements,
    render_products, render_report, render_services, render_shrinkages,
};
use super::setup::{
    Cli, Commands, ModeArg, MoneyCommands, MovementCommands, PeriodArg, ProductCommands,
    ServiceCommands, ShrinkageCommands,
};
use chrono::NaiveDate;
use clap::Parser;
use stockledger::api::{CmdMessage, CmdResult, LedgerApi};
use stockledger::commands::doctor;
use stockledger::commands::helpers::{format_date, parse_date};
use stockledger::commands::money::MoneyInput;
use stockledger::commands::movement::MovementRequest;
use stockledger::commands::products::ProductInput;
use stockledger::commands::report::{Period, ReportKind};
use stockledger::commands::shrinkage::ShrinkageRequest;
use stockledger::config::LedgerConfig;
use stockledger::confirm::{Challenge, Verified};
use stockledger::error::{LedgerError, Result};
use stockledger::model::{today, MoneyType, MovementType, Service};
use stockledger::store::local::FileLocal;
use stockledger::store::fs_backend::FileStore;
use stockledger::view::DateRange;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: LedgerApi<FileStore, FileLocal>,
    today: NaiveDate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = init_context(&cli)?;

    match cli.command {
        None => handle_dashboard(&mut ctx, None, None),
        Some(Commands::Dashboard { from, to }) => handle_dashboard(&mut ctx, from, to),
        Some(Commands::Product(cmd)) => match cmd {
            ProductCommands::Add {
                name,
                sku,
                category,
                price,
                cost,
                stock,
                min_stock,
                unit,
            } => handle_product_add(
                &mut ctx,
                ProductInput {
                    name: Some(name),
                    sku,
                    category,
                    price,
                    cost,
                    stock,
                    min_stock,
                    unit,
                },
            ),
            ProductCommands::Edit {
                product,
                name,
                sku,
                category,
                price,
                cost,
                stock,
                min_stock,
                unit,
            } => handle_product_edit(
                &mut ctx,
                &product,
                ProductInput {
                    name,
                    sku,
                    category,
                    price,
                    cost,
                    stock,
                    min_stock,
                    unit,
                },
            ),
            ProductCommands::Rm { product, yes } => handle_product_rm(&mut ctx, &product, yes),
            ProductCommands::List { search, category } => {
                handle_product_list(&ctx, search.as_deref(), category.as_deref())
            }
            ProductCommands::Categories => {
                print!("{}", render_categories(&ctx.api.categories()));
                Ok(())
            }
        },
        Some(Commands::Movement(cmd)) => match cmd {
            MovementCommands::Add {
                product,
                movement_type,
                quantity,
                reason,
                date,
            } => handle_movement_add(&mut ctx, &product, movement_type, quantity, reason, date),
            MovementCommands::Rm { id, yes } => {
                handle_rm(&mut ctx, &format!("movement {}", id), yes, |api| {
                    api.delete_movement(&id)
                })
            }
            MovementCommands::List {
                from,
                to,
                movement_type,
            } => handle_movement_list(&ctx, from, to, movement_type),
        },
        Some(Commands::Shrinkage(cmd)) => match cmd {
            ShrinkageCommands::Add {
                product,
                quantity,
                reason,
                date,
            } => handle_shrinkage_add(&mut ctx, &product, quantity, reason, date),
            ShrinkageCommands::Rm { id, yes } => {
                handle_rm(&mut ctx, &format!("shrinkage {}", id), yes, |api| {
                    api.delete_shrinkage(&id)
                })
            }
            ShrinkageCommands::List { from, to } => {
                let range = parse_range(from, to)?;
                let listing = ctx.api.list_shrinkages(range);
                print!(
                    "{}",
                    render_shrinkages(&listing, ctx.api.view(), ctx.api.config())
                );
                Ok(())
            }
        },
        Some(Commands::Money(cmd)) => match cmd {
            MoneyCommands::Add {
                money_type,
                amount,
                description,
                reference,
                date,
            } => handle_money_add(&mut ctx, money_type, amount, description, reference, date),
            MoneyCommands::Rm { id, yes } => {
                handle_rm(&mut ctx, &format!("money record {}", id), yes, |api| {
                    api.delete_money(&id)
                })
            }
            MoneyCommands::List {
                from,
                to,
                money_type,
            } => {
                let range = parse_range(from, to)?;
                let listing = ctx.api.list_money(range, money_type);
                print!("{}", render_money(&listing, ctx.api.config()));
                Ok(())
            }
        },
        Some(Commands::Service(cmd)) => match cmd {
            ServiceCommands::Add { name, amount, due } => handle_service_add(&mut ctx, name, amount, due),
            ServiceCommands::Pay { position } => handle_service_pay(&mut ctx, position),
            ServiceCommands::Rm { position } => handle_service_rm(&mut ctx, position),
            ServiceCommands::List => handle_service_list(&ctx),
        },
        Some(Commands::Report {
            kind,
            period,
            from,
            to,
        }) => handle_report(&ctx, &kind, period, from, to),
        Some(Commands::Export { dir, name }) => handle_export(&ctx, dir, &name),
        Some(Commands::Backup { path }) => handle_backup(&ctx, path),
        Some(Commands::Restore { path }) => {
            let result = ctx.api.restore_file(&path)?;
            print_messages(&result.messages);
            Ok(())
        }
        Some(Commands::Doctor) => {
            let report = ctx.api.doctor();
            print_messages(&doctor::messages(&report).messages);
            Ok(())
        }
        Some(Commands::Clear) => handle_clear(&mut ctx),
        Some(Commands::Mode { mode }) => {
            let result = ctx.api.set_view_only(mode == ModeArg::ViewOnly)?;
            print_messages(&result.messages);
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "stockledger=debug"
    } else {
        "stockledger=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config = LedgerConfig::load(cli.data_dir.clone())?;
    debug!(data_dir = %config.data_dir().display(), "opening ledger");
    let api = LedgerApi::open(config)?;
    Ok(AppContext {
        api,
        today: today(),
    })
}

fn parse_optional_date(text: Option<String>) -> Result<Option<NaiveDate>> {
    text.as_deref().map(parse_date).transpose()
}

fn parse_range(from: Option<String>, to: Option<String>) -> Result<DateRange> {
    Ok(DateRange::new(
        parse_optional_date(from)?,
        parse_optional_date(to)?,
    ))
}

/// Asks a y/N question on stderr. Anything but `y`/`yes` is a no.
fn ask_yes_no(question: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{} [y/N]: ", question)?;
    stderr.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(
        input.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Deletes after a y/N prompt unless `yes` was given.
fn handle_rm(
    ctx: &mut AppContext,
    what: &str,
    yes: bool,
    delete: impl FnOnce(&mut LedgerApi<FileStore, FileLocal>) -> Result<CmdResult>,
) -> Result<()> {
    if !yes && !ask_yes_no(&format!("Delete {}?", what))? {
        print_messages(&[CmdMessage::info("Operation cancelled.")]);
        return Ok(());
    }
    let result = delete(&mut ctx.api)?;
    print_messages(&result.messages);
    Ok(())
}

/// Prints the challenge and reads the date and word back from stdin.
fn confirm(action: &str, today: NaiveDate) -> Result<Verified> {
    let challenge = Challenge::issue(today);
    let mut stderr = io::stderr();
    writeln!(stderr, "{}", action)?;
    writeln!(
        stderr,
        "To confirm, type today's date ({}) and then the word {}",
        challenge.date(),
        challenge.word()
    )?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    write!(stderr, "Date: ")?;
    stderr.flush()?;
    let date = lines.next().transpose()?.unwrap_or_default();
    write!(stderr, "Word: ")?;
    stderr.flush()?;
    let word = lines.next().transpose()?.unwrap_or_default();

    challenge.verify(&date, &word)
}

fn handle_dashboard(ctx: &mut AppContext, from: Option<String>, to: Option<String>) -> Result<()> {
    let range = if from.is_none() && to.is_none() {
        None
    } else {
        Some(parse_range(from, to)?)
    };
    let dashboard = ctx.api.dashboard(range, ctx.today);
    let summary = ctx.api.service_summary(ctx.today);
    print!("{}", render_dashboard(&dashboard, &summary, ctx.api.config()));
    Ok(())
}

fn handle_product_add(ctx: &mut AppContext, input: ProductInput) -> Result<()> {
    let result = ctx.api.add_product(input)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_product_edit(ctx: &mut AppContext, selector: &str, input: ProductInput) -> Result<()> {
    let result = ctx.api.update_product(selector, input)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_product_rm(ctx: &mut AppContext, selector: &str, yes: bool) -> Result<()> {
    let product = ctx.api.resolve_product(selector)?;
    handle_rm(ctx, &format!("product '{}'", product.name), yes, |api| {
        api.delete_product(&product.id)
    })
}

fn handle_product_list(ctx: &AppContext, search: Option<&str>, category: Option<&str>) -> Result<()> {
    let products = ctx.api.list_products(search, category);
    print!("{}", render_products(&products, ctx.api.config()));
    Ok(())
}

fn handle_movement_add(
    ctx: &mut AppContext,
    selector: &str,
    movement_type: MovementType,
    quantity: i64,
    reason: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let request = MovementRequest {
        movement_type,
        quantity,
        reason,
        date: parse_optional_date(date)?.unwrap_or(ctx.today),
    };
    let result = ctx.api.record_movement(selector, request)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_movement_list(
    ctx: &AppContext,
    from: Option<String>,
    to: Option<String>,
    movement_type: Option<MovementType>,
) -> Result<()> {
    let range = parse_range(from, to)?;
    let listing = ctx.api.list_movements(range, movement_type);
    print!("{}", render_movements(&listing, ctx.api.view()));
    Ok(())
}

fn handle_shrinkage_add(
    ctx: &mut AppContext,
    selector: &str,
    quantity: i64,
    reason: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let request = ShrinkageRequest {
        quantity,
        reason,
        date: parse_optional_date(date)?.unwrap_or(ctx.today),
    };
    let result = ctx.api.record_shrinkage(selector, request)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_money_add(
    ctx: &mut AppContext,
    money_type: MoneyType,
    amount: f64,
    description: String,
    reference: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let input = MoneyInput {
        money_type,
        amount: Some(amount),
        description,
        reference,
        date: parse_optional_date(date)?,
    };
    let result = ctx.api.add_money(input)?;
    print_messages(&result.messages);
    Ok(())
}

/// Positions are shown 1-based; the ledger indexes from zero.
fn service_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| LedgerError::Validation("Service positions start at 1".to_string()))
}

fn handle_service_add(
    ctx: &mut AppContext,
    name: String,
    amount: f64,
    due: Option<String>,
) -> Result<()> {
    let service = Service::new(name, amount, parse_optional_date(due)?);
    let result = ctx.api.add_service(service)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_service_pay(ctx: &mut AppContext, position: usize) -> Result<()> {
    let index = service_index(position)?;
    let result = ctx.api.pay_service(index, ctx.today)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_service_rm(ctx: &mut AppContext, position: usize) -> Result<()> {
    let index = service_index(position)?;
    let name = ctx.api.service(index)?.name.clone();
    let verified = confirm(&format!("Remove service '{}' without paying it?", name), ctx.today)?;
    let result = ctx.api.remove_service(index, verified)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_service_list(ctx: &AppContext) -> Result<()> {
    let summary = ctx.api.service_summary(ctx.today);
    print!(
        "{}",
        render_services(ctx.api.services(), &summary, ctx.today, ctx.api.config())
    );
    Ok(())
}

fn handle_report(
    ctx: &AppContext,
    kind: &str,
    period: PeriodArg,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let kind = kind.parse::<ReportKind>()?;
    let period = match period {
        PeriodArg::Daily => Period::Daily,
        PeriodArg::Weekly => Period::Weekly,
        PeriodArg::Monthly => Period::Monthly,
        PeriodArg::Custom => Period::Custom(parse_range(from, to)?),
    };
    let report = ctx.api.report(kind, period, ctx.today);
    print!("{}", render_report(&report, ctx.api.config()));
    Ok(())
}

fn handle_export(ctx: &AppContext, dir: Option<PathBuf>, name: &str) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let result = ctx.api.export(&dir, name, ctx.today)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_backup(ctx: &AppContext, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| {
        PathBuf::from(format!("backup_inventario_{}.csv", format_date(ctx.today)))
    });
    let result = ctx.api.backup(&path)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_clear(ctx: &mut AppContext) -> Result<()> {
    let records = ctx.api.view().records.len();
    let services = ctx.api.services().len();
    let verified = confirm(
        &format!(
            "This deletes {} records and {} services permanently.",
            records, services
        ),
        ctx.today,
    )?;
    let result = ctx.api.clear_all(verified)?;
    print_messages(&result.messages);
    Ok(())
}
