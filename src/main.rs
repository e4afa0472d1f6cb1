//! sl-export - Service Layer to CSV exporter

use clap::{Parser, Subcommand};
use sl_export::export::files;
use sl_export::{Config, Error, Exporter, HttpTransport, RequestExecutor, Result, count};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sl-export")]
#[command(author, version, about = "Export SAP Business One Service Layer data to CSV")]
struct Cli {
    /// What to export
    #[command(subcommand)]
    command: Command,

    /// Service Layer base URL (e.g. https://host:50000/b1s/v1)
    #[arg(long, env = "SAP_SL_BASE", global = true)]
    base_url: Option<String>,

    /// Company database
    #[arg(long, env = "SAP_SL_COMPANY", global = true)]
    company: Option<String>,

    /// Service Layer user
    #[arg(long, env = "SAP_SL_USER", global = true)]
    user: Option<String>,

    /// Service Layer password
    #[arg(long, env = "SAP_SL_PASS", global = true, hide_env_values = true)]
    password: Option<String>,

    /// JSON config file; command-line options override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, global = true)]
    out_dir: Option<PathBuf>,

    /// Records per page
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Verify TLS certificates
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export item groups (OITB)
    ItemGroups,
    /// Export items (OITM)
    Items,
    /// Export sales persons (OSLP)
    SalesPersons,
    /// Export business partners (OCRD)
    BusinessPartners,
    /// Export invoice headers (OINV) and lines (INV1)
    Invoices {
        /// OData filter on the headers, e.g. "DocDate ge '2025-01-01'"
        #[arg(long)]
        filter: Option<String>,
    },
    /// Export one price list
    Prices {
        /// Price list number
        #[arg(long)]
        price_list: i64,
    },
    /// Export stock per warehouse and per item
    Stock {
        /// Only this warehouse
        #[arg(long)]
        warehouse: Option<String>,
    },
    /// Export OITB, OITM, OSLP, OCRD, OINV and INV1
    All {
        /// OData filter on the invoice headers
        #[arg(long)]
        invoice_filter: Option<String>,
    },
    /// Print the total the server reports for a collection
    Count {
        /// Collection name, e.g. Items
        collection: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Logs go to stderr so `count` output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "export failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Merge the config file (if any) with command-line options
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, &cli.base_url) {
        (Some(path), _) => Config::from_json_file(path)?,
        (None, Some(base_url)) => Config::new(base_url.clone()),
        (None, None) => {
            return Err(Error::config(
                "no Service Layer address; pass --base-url or set SAP_SL_BASE",
                "base_url",
            ));
        }
    };

    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(company) = &cli.company {
        config.service.company_db = company.clone();
    }
    if let Some(user) = &cli.user {
        config.service.username = user.clone();
    }
    if let Some(password) = &cli.password {
        config.service.password = password.clone();
    }
    if let Some(out_dir) = &cli.out_dir {
        config.export.output_dir = out_dir.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.pagination.page_size = page_size;
    }
    if cli.verify_tls {
        config.service.verify_tls = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let transport = HttpTransport::connect(&config).await?;
    let executor = RequestExecutor::new(Arc::new(transport), &config)?;
    let exporter = Exporter::new(executor, config.export.clone());

    match cli.command {
        Command::ItemGroups => {
            exporter
                .export_item_groups(&exporter.output_path(files::ITEM_GROUPS))
                .await?;
        }
        Command::Items => {
            exporter
                .export_items(&exporter.output_path(files::ITEMS))
                .await?;
        }
        Command::SalesPersons => {
            exporter
                .export_sales_persons(&exporter.output_path(files::SALES_PERSONS))
                .await?;
        }
        Command::BusinessPartners => {
            exporter
                .export_business_partners(&exporter.output_path(files::BUSINESS_PARTNERS))
                .await?;
        }
        Command::Invoices { filter } => {
            exporter
                .export_invoices_with_lines(
                    &exporter.output_path(files::INVOICES),
                    &exporter.output_path(files::INVOICE_LINES),
                    filter.as_deref(),
                )
                .await?;
        }
        Command::Prices { price_list } => {
            exporter
                .export_prices(price_list, &exporter.output_path(&files::price_list(price_list)))
                .await?;
        }
        Command::Stock { warehouse } => {
            exporter
                .export_stock(
                    &exporter.output_path(files::STOCK_PER_WAREHOUSE),
                    &exporter.output_path(files::STOCK_TOTALS),
                    warehouse.as_deref(),
                )
                .await?;
        }
        Command::All { invoice_filter } => {
            let summaries = exporter.export_all(invoice_filter.as_deref()).await?;
            for summary in &summaries {
                info!(table = summary.label, rows = summary.rows, path = %summary.path.display(), "written");
            }
        }
        Command::Count { collection } => match count(exporter.executor(), &collection).await {
            Some(total) => println!("{total}"),
            None => {
                return Err(Error::Other(format!(
                    "server did not report a count for {collection}"
                )));
            }
        },
    }

    info!("export complete");
    Ok(())
}
