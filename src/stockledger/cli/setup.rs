use clap::{Parser, Subcommand, ValueEnum};
use stockledger::model::{MoneyType, MovementType};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format for releases: "v0.3.2"
/// Format for dev builds: "v0.3.2\ndev: abc1234 2024-01-15 14:30"
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{}\ndev: {} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "stock",
    bin_name = "stock",
    version = get_version(),
    disable_help_subcommand = true
)]
#[command(about = "Inventory ledger for a small business", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Directory holding the ledger (overrides STOCK_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summary of the period, low stock and recent activity
    #[command(alias = "d")]
    Dashboard {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Manage products
    #[command(subcommand, alias = "p")]
    Product(ProductCommands),

    /// Stock movements (in and out)
    #[command(subcommand, alias = "m")]
    Movement(MovementCommands),

    /// Shrinkage (waste, damage, theft)
    #[command(subcommand, name = "shrink")]
    Shrinkage(ShrinkageCommands),

    /// Cash ledger
    #[command(subcommand)]
    Money(MoneyCommands),

    /// Recurring bills
    #[command(subcommand)]
    Service(ServiceCommands),

    /// Period report
    Report {
        /// general, products, movements, shrinkage or money
        #[arg(default_value = "general")]
        kind: String,
        #[arg(long, value_enum, default_value_t = PeriodArg::Weekly)]
        period: PeriodArg,
        /// First day for a custom period (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day for a custom period (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Export every collection as transposed CSV sheets
    Export {
        /// Where the sheet folder is created (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Base name of the sheet folder
        #[arg(long, default_value = "inventario")]
        name: String,
    },

    /// Write a delimited-text backup
    Backup {
        /// Output file (defaults to backup_inventario_<date>.csv)
        path: Option<PathBuf>,
    },

    /// Re-create products and services from a backup
    Restore { path: PathBuf },

    /// Report inconsistencies left by interrupted writes
    Doctor,

    /// Delete every record and service (asks for confirmation)
    Clear,

    /// Switch between view-only and edit mode
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Add a product
    Add {
        name: String,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Sale price
        #[arg(long)]
        price: Option<f64>,
        /// Unit cost
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        stock: Option<i64>,
        /// Low-stock threshold (default 5)
        #[arg(long)]
        min_stock: Option<i64>,
        /// Unit of measure (default "unidad")
        #[arg(long)]
        unit: Option<String>,
    },

    /// Edit a product; fields not given keep their value
    Edit {
        product: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        stock: Option<i64>,
        #[arg(long)]
        min_stock: Option<i64>,
        #[arg(long)]
        unit: Option<String>,
    },

    /// Delete a product (its movements stay)
    Rm {
        product: String,
        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List products, optionally filtered
    #[command(alias = "ls")]
    List {
        /// Text to look for in name or SKU
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// List product categories
    Categories,
}

#[derive(Subcommand, Debug)]
pub enum MovementCommands {
    /// Record stock coming in (entrada) or going out (salida)
    Add {
        product: String,
        /// entrada|in or salida|out
        movement_type: MovementType,
        quantity: i64,
        #[arg(long)]
        reason: Option<String>,
        /// Defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a movement record (stock is not reverted)
    Rm {
        id: String,
        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List movements, newest first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long = "type")]
        movement_type: Option<MovementType>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShrinkageCommands {
    /// Record a loss
    Add {
        product: String,
        quantity: i64,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a shrinkage record (stock is not reverted)
    Rm {
        id: String,
        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List shrinkage, newest first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MoneyCommands {
    /// Record income (ingreso) or an expense (salida)
    Add {
        /// ingreso|income or salida|expense
        money_type: MoneyType,
        amount: f64,
        description: String,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a money record
    Rm {
        id: String,
        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List money records, newest first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long = "type")]
        money_type: Option<MoneyType>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// Add a recurring bill
    Add {
        name: String,
        amount: f64,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Pay a bill: books an expense and removes it from the list
    Pay {
        /// Position as shown by `stock service list`
        position: usize,
    },

    /// Remove a bill without paying it (asks for confirmation)
    Rm { position: usize },

    /// List bills with their status
    #[command(alias = "ls")]
    List,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    ViewOnly,
    Edit,
}
