use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use nota_core::dates::{to_receipt_format, today};
use nota_core::{
    aggregate, filter_by_category, filter_by_vendor, latest_prices, monthly_prices,
    normalize_date, vendor_comparison, vendor_dates, Category, GroupBy, SortOrder,
};
use nota_ingest::{receipt_id, NfceParser};
use nota_sync::{
    write_series_csv, HttpPriceStore, IngestOutcome, Ingestor, JsonReceiptCache, PriceStore,
    ProxyFetcher,
};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod state;
mod views;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "nota",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("NOTA_BUILD_SHA"), ")"),
    about = "Track retail prices from NFC-e receipt QR codes"
)]
struct Cli {
    /// More log output (-v info, -vv debug); NOTA_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the receipt behind a scanned QR code URL
    Scan {
        url: String,

        /// Keep items that were stored when others failed (default: roll back)
        #[arg(long)]
        keep_partial: bool,
    },

    /// Price history grouped by product, vendor or month
    History {
        #[arg(long, value_enum, default_value_t = GroupArg::Product)]
        group_by: GroupArg,

        /// Newest entries first
        #[arg(long)]
        desc: bool,

        /// Only one category (limpeza, eletronicos, carnes, outros)
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,

        /// Only vendors whose name contains this text
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Latest known price of every product
    Latest {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },

    /// Compare prices of everything bought at one vendor
    Vendor { name: String },

    /// Month-by-month prices of one product
    Product {
        name: String,

        /// Calendar year (default: current)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Delete a vendor's receipt for a date (DD/MM/YYYY or YYYY-MM-DD)
    Delete {
        #[arg(long)]
        vendor: String,

        #[arg(long)]
        date: String,
    },

    /// Show the category assigned to product names
    Classify { names: Vec<String> },

    /// Parse a saved receipt page and print it as JSON
    Parse {
        file: PathBuf,

        /// Source URL, used to derive the receipt id
        #[arg(long)]
        url: Option<String>,
    },

    /// Write price history as CSV ("-" for stdout)
    Export {
        #[arg(long)]
        out: PathBuf,

        #[arg(long, value_enum, default_value_t = GroupArg::Product)]
        group_by: GroupArg,

        #[arg(long)]
        desc: bool,
    },

    /// Manage ~/.nota/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupArg {
    Product,
    Vendor,
    Month,
}

impl From<GroupArg> for GroupBy {
    fn from(g: GroupArg) -> Self {
        match g {
            GroupArg::Product => GroupBy::Product,
            GroupArg::Vendor => GroupBy::Vendor,
            GroupArg::Month => GroupBy::Month,
        }
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| format!("unknown category '{s}'"))
}

fn sort_order(desc: bool) -> SortOrder {
    if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("NOTA_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

type CliIngestor = Ingestor<ProxyFetcher, HttpPriceStore, JsonReceiptCache>;

fn build_store(cfg: &Config) -> Result<HttpPriceStore> {
    HttpPriceStore::new(
        &cfg.remote.api_url,
        cfg.remote.timeout(),
        cfg.classifier.classifier(),
    )
}

fn build_ingestor(cfg: &Config) -> Result<CliIngestor> {
    let fetcher = ProxyFetcher::new(&cfg.remote.proxy_url, cfg.remote.timeout())?;
    Ok(Ingestor::new(
        fetcher,
        build_store(cfg)?,
        state::receipt_cache()?,
        cfg.classifier.classifier(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = config::load_config()?;
    debug!(api = %cfg.remote.api_url, proxy = %cfg.remote.proxy_url, "config loaded");

    match cli.command {
        Command::Scan { url, keep_partial } => {
            scan(&cfg, &url, keep_partial).await?;
        }

        Command::History {
            group_by,
            desc,
            category,
            vendor,
        } => {
            let records = build_store(&cfg)?.list_all().await?;
            let mut records = filter_by_category(&records, category);
            if let Some(term) = vendor {
                records = filter_by_vendor(&records, &term);
            }
            views::print_series(&aggregate(&records, group_by.into(), sort_order(desc)));
        }

        Command::Latest { category } => {
            let records = build_store(&cfg)?.list_all().await?;
            let latest = latest_prices(&filter_by_category(&records, category));
            if latest.is_empty() {
                println!("(no records)");
            }
            views::print_records(&latest);
        }

        Command::Vendor { name } => {
            let records = build_store(&cfg)?.list_all().await?;
            let dates: Vec<String> = vendor_dates(&records, &name)
                .into_iter()
                .map(to_receipt_format)
                .collect();
            println!("Receipts: {}\n", dates.join(", "));
            views::print_series(&vendor_comparison(&records, &name));
        }

        Command::Product { name, year } => {
            let year = year.unwrap_or_else(|| today().year());
            let records = build_store(&cfg)?.product_history(&name, year).await?;
            views::print_monthly(&name, year, &monthly_prices(&records, &name, year));
            println!();
            views::print_series(&aggregate(&records, GroupBy::Product, SortOrder::Ascending));
        }

        Command::Delete { vendor, date } => {
            let date = normalize_date(&date)?;
            let mut ingestor = build_ingestor(&cfg)?;
            let removed = ingestor
                .remove_receipt(&vendor, date)
                .await
                .with_context(|| format!("deleting {vendor} on {}", to_receipt_format(date)))?;
            println!(
                "Deleted products of {vendor} on {} ({removed} local receipt(s) forgotten)",
                to_receipt_format(date)
            );
        }

        Command::Classify { names } => {
            if names.is_empty() {
                bail!("pass at least one product name");
            }
            let classifier = cfg.classifier.classifier();
            for name in &names {
                println!("{}\t{}", classifier.classify(name), name);
            }
        }

        Command::Parse { file, url } => {
            let markup =
                fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
            let receipt = NfceParser::new().parse(&markup);
            let source = url.unwrap_or_else(|| file.display().to_string());
            let out = serde_json::json!({
                "receipt_id": receipt_id(&receipt, &source),
                "vendor": receipt.vendor_name(),
                "receipt": receipt,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Export {
            out,
            group_by,
            desc,
        } => {
            let records = build_store(&cfg)?.list_all().await?;
            let series = aggregate(&records, group_by.into(), sort_order(desc));
            let rows = if out.as_os_str() == "-" {
                write_series_csv(&series, io::stdout().lock())?
            } else {
                let f = fs::File::create(&out)
                    .with_context(|| format!("create {}", out.display()))?;
                write_series_csv(&series, f)?
            };
            eprintln!("Wrote {rows} rows");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        },
    }

    Ok(())
}

async fn scan(cfg: &Config, url: &str, keep_partial: bool) -> Result<()> {
    let mut ingestor = build_ingestor(cfg)?;

    match ingestor.ingest(url).await? {
        IngestOutcome::Stored(receipt) => {
            println!(
                "Stored {} item(s) from {} ({})",
                receipt.records.len(),
                receipt.vendor,
                to_receipt_format(receipt.purchase_date)
            );
            views::print_records(&receipt.records);
        }

        IngestOutcome::Partial { receipt, failed } => {
            println!(
                "Stored {} of {} item(s) from {}",
                receipt.records.len(),
                receipt.records.len() + failed.len(),
                receipt.vendor
            );
            for f in &failed {
                println!("  not stored: {} ({})", f.record.product_name, f.reason);
            }
            if keep_partial {
                println!("Kept the stored items. The receipt is not marked as scanned.");
            } else {
                ingestor
                    .rollback(&receipt.records)
                    .await
                    .context("rolling back partial receipt")?;
                bail!(
                    "receipt rolled back: {} item(s) could not be stored",
                    failed.len()
                );
            }
        }

        IngestOutcome::Duplicate { receipt_id, vendor } => {
            println!("Receipt {receipt_id} was already scanned. Prices at {vendor}:\n");
            let records = ingestor.store().list_all().await?;
            views::print_series(&vendor_comparison(&records, &vendor));
        }
    }

    Ok(())
}
