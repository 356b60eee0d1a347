//! # API Facade
//!
//! The API layer is the single controller of the ledger. Every UI client (the
//! `stock` CLI today) talks to [`LedgerApi`] and nothing else.
//!
//! ## Role and Responsibilities
//!
//! The facade owns the application state that the commands work against:
//!
//! - the record store and its snapshot [`Subscription`]
//! - the current [`LedgerView`], re-derived from the newest snapshot after
//!   every write
//! - the local [`ServiceLedger`]
//! - the [`LedgerConfig`]
//! - the busy flag that rejects a write while another is in flight
//!
//! It also **normalizes inputs** (product selectors become products) and
//! **gates writes**: in view-only mode every mutating call fails with
//! [`LedgerError::ReadOnly`].
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **I/O to the terminal**: no stdout, stderr or prompts
//! - **Presentation**: it returns data structures, not strings
//!
//! ## Generic Over Storage
//!
//! `LedgerApi<S: DataStore, L: LocalStorage>`:
//! - Production: `LedgerApi<FileStore, FileLocal>`
//! - Testing: `LedgerApi<InMemoryStore, MemLocal>`

use crate::commands::backup::{self, ParsedBackup};
use crate::commands::dashboard::{self, Dashboard};
use crate::commands::doctor::{self, DoctorReport};
use crate::commands::money::{self, MoneyInput};
use crate::commands::movement::{self, MovementRequest};
use crate::commands::products::{self, ProductInput};
use crate::commands::report::{
    self, MoneyListing, MovementListing, Period, Report, ReportKind, ShrinkageListing,
};
use crate::commands::shrinkage::{self, ShrinkageRequest};
use crate::commands::{clear, export, helpers};
use crate::config::LedgerConfig;
use crate::confirm::Verified;
use crate::error::{LedgerError, Result};
use crate::model::{MoneyType, MovementType, Product, Service};
use crate::services::{ServiceLedger, ServiceSummary};
use crate::store::fs_backend::FileStore;
use crate::store::local::{self, FileLocal, LocalStorage};
use crate::store::{DataStore, Subscription};
use crate::view::{categories_of, DateRange, LedgerView};
use chrono::NaiveDate;
use std::cell::Cell;
use std::path::Path;
use tracing::debug;

pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};

/// Holds the busy flag for the duration of one write.
struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            return Err(LedgerError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

pub struct LedgerApi<S: DataStore, L: LocalStorage> {
    store: S,
    services: ServiceLedger<L>,
    config: LedgerConfig,
    subscription: Subscription,
    view: LedgerView,
    busy: Cell<bool>,
}

impl LedgerApi<FileStore, FileLocal> {
    /// Opens the ledger kept in `config.data_dir()`.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let dir = config.data_dir();
        Self::new(FileStore::open(dir.clone()), FileLocal::new(dir), config)
    }
}

impl<S: DataStore, L: LocalStorage> LedgerApi<S, L> {
    pub fn new(store: S, local: L, config: LedgerConfig) -> Result<Self> {
        let subscription = store.subscribe()?;
        let view = subscription
            .latest()
            .map(|snapshot| LedgerView::from_snapshot(&snapshot))
            .unwrap_or_default();
        let services = ServiceLedger::load(local)?;
        Ok(Self {
            store,
            services,
            config,
            subscription,
            view,
            busy: Cell::new(false),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn view(&self) -> &LedgerView {
        &self.view
    }

    pub fn services(&self) -> &[Service] {
        self.services.services()
    }

    pub fn service(&self, index: usize) -> Result<&Service> {
        self.services.get(index)
    }

    pub fn is_view_only(&self) -> Result<bool> {
        local::is_view_only(self.services.local())
    }

    /// Re-derives the view from the newest pending snapshot, if any.
    pub fn refresh(&mut self) {
        if let Some(snapshot) = self.subscription.latest() {
            self.view = LedgerView::from_snapshot(&snapshot);
            debug!(records = self.view.records.len(), "view refreshed");
        }
    }

    /// Runs a mutating command: checks view-only mode, holds the busy flag
    /// while `op` runs, then refreshes the view whatever the outcome, since a
    /// failed multi-step write may still have changed the store.
    fn write<T>(
        &mut self,
        op: impl FnOnce(&S, &mut ServiceLedger<L>, &LedgerView) -> Result<T>,
    ) -> Result<T> {
        if self.is_view_only()? {
            return Err(LedgerError::ReadOnly);
        }
        let result = {
            let _guard = BusyGuard::acquire(&self.busy)?;
            op(&self.store, &mut self.services, &self.view)
        };
        self.refresh();
        result
    }

    // --- Products ---

    pub fn resolve_product(&self, selector: &str) -> Result<Product> {
        helpers::resolve_product(&self.view, selector)
    }

    pub fn add_product(&mut self, input: ProductInput) -> Result<CmdResult> {
        self.write(|store, _, _| products::create(store, input))
    }

    pub fn update_product(&mut self, selector: &str, input: ProductInput) -> Result<CmdResult> {
        let product = self.resolve_product(selector)?;
        self.write(|store, _, _| products::update(store, &product, input))
    }

    pub fn delete_product(&mut self, selector: &str) -> Result<CmdResult> {
        let product = self.resolve_product(selector)?;
        self.write(|store, _, view| products::delete(store, view, &product.id))
    }

    pub fn list_products(&self, term: Option<&str>, category: Option<&str>) -> Vec<Product> {
        report::list_products(&self.view, term, category)
    }

    pub fn categories(&self) -> Vec<String> {
        categories_of(self.view.products())
    }

    // --- Movements and shrinkage ---

    pub fn record_movement(&mut self, selector: &str, request: MovementRequest) -> Result<CmdResult> {
        let product = self.resolve_product(selector)?;
        self.write(|store, _, _| movement::record(store, &product, request))
    }

    pub fn delete_movement(&mut self, id: &str) -> Result<CmdResult> {
        self.write(|store, _, view| movement::delete(store, view, id))
    }

    pub fn list_movements(&self, range: DateRange, movement_type: Option<MovementType>) -> MovementListing {
        report::list_movements(&self.view, range, movement_type)
    }

    pub fn record_shrinkage(&mut self, selector: &str, request: ShrinkageRequest) -> Result<CmdResult> {
        let product = self.resolve_product(selector)?;
        self.write(|store, _, _| shrinkage::record(store, &product, request))
    }

    pub fn delete_shrinkage(&mut self, id: &str) -> Result<CmdResult> {
        self.write(|store, _, view| shrinkage::delete(store, view, id))
    }

    pub fn list_shrinkages(&self, range: DateRange) -> ShrinkageListing {
        report::list_shrinkages(&self.view, range)
    }

    // --- Money ---

    pub fn add_money(&mut self, input: MoneyInput) -> Result<CmdResult> {
        self.write(|store, _, _| money::create(store, input))
    }

    pub fn delete_money(&mut self, id: &str) -> Result<CmdResult> {
        self.write(|store, _, view| money::delete(store, view, id))
    }

    pub fn list_money(&self, range: DateRange, money_type: Option<MoneyType>) -> MoneyListing {
        report::list_money(&self.view, range, money_type)
    }

    // --- Views ---

    /// Defaults to the last seven days through `today`.
    pub fn dashboard(&self, range: Option<DateRange>, today: NaiveDate) -> Dashboard {
        let range = range.unwrap_or_else(|| dashboard::default_range(today));
        dashboard::build(&self.view, range, self.config.recent_limit)
    }

    pub fn report(&self, kind: ReportKind, period: Period, today: NaiveDate) -> Report {
        report::build(&self.view, kind, period, today)
    }

    pub fn doctor(&self) -> DoctorReport {
        doctor::run(&self.view)
    }

    // --- Services ---

    pub fn add_service(&mut self, service: Service) -> Result<CmdResult> {
        self.write(|_, ledger, _| ledger.add(service))
    }

    pub fn pay_service(&mut self, index: usize, today: NaiveDate) -> Result<CmdResult> {
        self.write(|store, ledger, _| ledger.pay(index, store, today))
    }

    pub fn remove_service(&mut self, index: usize, _verified: Verified) -> Result<CmdResult> {
        self.write(|_, ledger, _| ledger.remove(index))
    }

    pub fn service_summary(&self, today: NaiveDate) -> ServiceSummary {
        self.services.summary(today)
    }

    // --- Files ---

    pub fn export(&self, dir: &Path, base_name: &str, today: NaiveDate) -> Result<CmdResult> {
        export::run(&self.view, self.services.services(), dir, base_name, today)
    }

    pub fn backup(&self, path: &Path) -> Result<CmdResult> {
        backup::write_backup(&self.view, self.services.services(), path)
    }

    pub fn restore(&mut self, parsed: ParsedBackup) -> Result<CmdResult> {
        self.write(|store, ledger, _| backup::restore(store, ledger, parsed))
    }

    /// Restores from a backup file, or from an exported workbook folder.
    pub fn restore_file(&mut self, path: &Path) -> Result<CmdResult> {
        let parsed = if path.is_dir() {
            backup::read_workbook(path)?
        } else {
            backup::read_backup(path)?
        };
        self.restore(parsed)
    }

    // --- Maintenance ---

    pub fn clear_all(&mut self, verified: Verified) -> Result<CmdResult> {
        self.write(|store, ledger, _| clear::run(store, ledger, verified))
    }

    /// Toggles view-only mode. Always allowed, so the mode can be left again.
    pub fn set_view_only(&mut self, view_only: bool) -> Result<CmdResult> {
        local::set_view_only(self.services.local(), view_only)?;
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::success(if view_only {
            "View-only mode enabled"
        } else {
            "View-only mode disabled"
        }));
        Ok(result)
    }
}
