use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use stocktake::adjust;
use stocktake::cli::{Cli, Command, CompareArgs};
use stocktake::config::Config;
use stocktake::model::{NewProduct, ProductId, ProductUpdate};
use stocktake::report::{json, table};
use stocktake::snapshot::compare::{self, COMPARISON_FILE_NAME};
use stocktake::snapshot::writer::SnapshotWriter;
use stocktake::store::Store;
use stocktake::{logging, InventoryError, Result};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("{hint}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), cli.data_dir.as_deref())?;
    let mut store = Store::open(&config.database_path)?;

    match cli.command {
        Command::Init(args) => {
            let added = if args.sample { store.seed_samples()? } else { 0 };
            println!("database ready at {}", config.database_path.display());
            if added > 0 {
                println!("added {added} sample products");
            }
        }
        Command::Add(args) => {
            let mut product = NewProduct::new(args.sku, args.name, args.price, args.stock)
                .with_reorder_threshold(args.threshold.unwrap_or(config.default_reorder_threshold));
            product.description = args.description;
            let created = store.create(product)?;
            println!("Product added: #{} {}", created.id, created.sku);
        }
        Command::List(args) => {
            let products = store.list()?;
            if args.json {
                println!("{}", json::render(&products));
            } else {
                print!("{}", table::products(&products));
            }
        }
        Command::Show(args) => {
            let product = store.get(ProductId(args.id))?;
            if args.json {
                println!("{}", json::render(&product));
            } else {
                print!("{}", table::product_detail(&product));
            }
        }
        Command::Edit(args) => {
            let update = ProductUpdate {
                sku: args.sku,
                name: args.name,
                description: args.description.map(Some),
                price: args.price,
                stock: args.stock,
                reorder_threshold: args.threshold,
            };
            if update.is_empty() {
                return Err(InventoryError::invalid("edit", "no fields given"));
            }
            let updated = store.update(ProductId(args.id), &update)?;
            println!("Product updated: #{} {}", updated.id, updated.sku);
        }
        Command::Delete(args) => {
            let deleted = store.delete(ProductId(args.id))?;
            println!("Product deleted: #{} {}", deleted.id, deleted.sku);
        }
        Command::Adjust(args) => {
            let adjustment =
                adjust::apply(&mut store, ProductId(args.id), args.delta, &args.reason)?;
            print!("{}", table::adjustment(&adjustment));
        }
        Command::LowStock(args) => {
            let items = store.low_stock()?;
            if args.json {
                println!("{}", json::render(&items));
            } else {
                print!("{}", table::low_stock(&items));
            }
        }
        Command::Summary(args) => {
            let summary = store.summary()?;
            if args.json {
                println!("{}", json::render(&summary));
            } else {
                print!("{}", table::summary(&summary));
            }
        }
        Command::Export(args) => {
            let products = store.list_by_id()?;
            let handle =
                SnapshotWriter::from_config(&config).write_snapshot(&mut store, &products)?;
            if args.json {
                println!("{}", json::render(&handle));
            } else {
                println!("CSV exported to {}", handle.current_path.display());
                println!("{}", handle.quick_check);
            }
        }
        Command::Compare(args) => compare_snapshots(&mut store, &config, args)?,
        Command::Snapshots(args) => {
            let records = store.list_snapshots()?;
            if args.json {
                println!("{}", json::render(&records));
            } else {
                print!("{}", table::snapshots(&records));
            }
        }
    }

    Ok(())
}

fn compare_snapshots(store: &mut Store, config: &Config, args: CompareArgs) -> Result<()> {
    let report = store.reconcile_snapshots(&config.history_dir)?;
    if !report.removed.is_empty() || !report.adopted.is_empty() {
        eprintln!(
            "snapshot index updated: {} pruned, {} adopted",
            report.removed.len(),
            report.adopted.len()
        );
    }
    for name in &report.skipped {
        eprintln!(
            "warning: {} is not a valid snapshot and was left out of the comparison",
            config.history_dir.join(name).display()
        );
    }

    let comparison = compare::diff(store, &config.history_dir)?;

    if args.json {
        println!("{}", json::render(&comparison));
        return Ok(());
    }

    let csv = comparison.to_csv()?;
    let out = args.out.unwrap_or_else(|| PathBuf::from(COMPARISON_FILE_NAME));
    if out.as_os_str() == "-" {
        std::io::stdout()
            .write_all(&csv)
            .map_err(|e| InventoryError::io("<stdout>", e))?;
    } else {
        std::fs::write(&out, &csv).map_err(|e| InventoryError::io(&out, e))?;
        print!("{}", table::comparison(&comparison));
        println!("comparison written to {}", out.display());
    }
    Ok(())
}
