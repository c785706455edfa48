use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stocktake")]
#[command(about = "A small inventory tracker with CSV snapshot comparison")]
#[command(version)]
pub struct Cli {
    /// Directory holding the database and snapshot files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to a config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database, optionally with sample products
    Init(InitArgs),

    /// Add a product
    Add(AddArgs),

    /// List products ordered by name
    List(OutputArgs),

    /// Show one product
    Show(ShowArgs),

    /// Edit product fields
    Edit(EditArgs),

    /// Delete a product
    Delete(IdArgs),

    /// Adjust stock by a signed amount (clamped at zero)
    Adjust(AdjustArgs),

    /// Products at or below their reorder threshold
    LowStock(OutputArgs),

    /// Totals: product count, units, inventory value, low-stock count
    Summary(OutputArgs),

    /// Export the inventory as a CSV snapshot
    Export(OutputArgs),

    /// Compare the two most recent snapshots row by row
    Compare(CompareArgs),

    /// List recorded snapshots
    Snapshots(OutputArgs),
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct InitArgs {
    /// Insert sample products when the store is empty
    #[arg(long, default_value_t = false)]
    pub sample: bool,
}

#[derive(Args)]
pub struct IdArgs {
    /// Product id
    pub id: i64,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Product id
    pub id: i64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub sku: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, default_value = "0")]
    pub price: Decimal,

    #[arg(long, default_value_t = 0)]
    pub stock: u32,

    /// Reorder threshold (defaults to the configured value)
    #[arg(long)]
    pub threshold: Option<u32>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Product id
    pub id: i64,

    #[arg(long)]
    pub sku: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// New description; pass an empty string to clear it
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Option<Decimal>,

    #[arg(long)]
    pub stock: Option<u32>,

    #[arg(long)]
    pub threshold: Option<u32>,
}

#[derive(Args)]
pub struct AdjustArgs {
    /// Product id
    pub id: i64,

    /// Amount to add; negative to subtract
    #[arg(allow_negative_numbers = true)]
    pub delta: i64,

    /// Why the stock changed
    #[arg(long, default_value = "")]
    pub reason: String,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Where to write the comparison CSV ('-' for stdout)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the comparison as JSON instead of writing CSV
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
