use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lindas_hydro::config::{self, ScraperConfig};
use lindas_hydro::error::HydroError;
use lindas_hydro::scraper::Scraper;
use lindas_hydro::sites::river_station_codes;
use lindas_hydro::sparql::SparqlHttpClient;
use lindas_hydro::store::{CsvStore, SchemaMode};

#[derive(Parser)]
#[command(name = "lindas-hydro")]
#[command(about = "Collect Swiss hydrological station measurements from the LINDAS SPARQL endpoint")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run one fetch-and-append cycle (default)")]
    Scrape(ScrapeArgs),
    #[command(about = "Remove exact duplicate rows from the CSV store")]
    Compact(CompactArgs),
    #[command(about = "Print river station codes extracted from a reference CSV")]
    Sites(SitesArgs),
}

#[derive(Args, Clone, Default)]
struct ScrapeArgs {
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    data_dir: Option<String>,

    #[arg(long)]
    sites: Option<String>,

    #[arg(long)]
    parameters: Option<String>,

    #[arg(long)]
    legacy_schema: bool,
}

#[derive(Args)]
struct CompactArgs {
    #[arg(long)]
    data_dir: Option<String>,

    #[arg(long)]
    legacy_schema: bool,
}

#[derive(Args)]
struct SitesArgs {
    csv_file: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(hydro) = report.downcast_ref::<HydroError>() {
            return ExitCode::from(map_exit_code(hydro));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HydroError) -> u8 {
    match error {
        HydroError::InvalidSiteCode(_)
        | HydroError::InvalidParameter(_)
        | HydroError::EmptyParameters
        | HydroError::InvalidConfig(_) => 2,
        HydroError::SparqlHttp(_) | HydroError::SparqlStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli
        .command
        .unwrap_or_else(|| Commands::Scrape(ScrapeArgs::default()))
    {
        Commands::Scrape(args) => run_scrape(args),
        Commands::Compact(args) => run_compact(args),
        Commands::Sites(args) => run_sites(args),
    }
}

fn resolve_config(args: &ScrapeArgs) -> Result<ScraperConfig, HydroError> {
    let mut resolved = ScraperConfig::from_env()?;
    if let Some(endpoint) = &args.endpoint {
        resolved.endpoint_url = endpoint.clone();
    }
    if let Some(base_url) = &args.base_url {
        resolved.base_url = base_url.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        resolved.data_dir = Utf8PathBuf::from(data_dir);
    }
    if let Some(sites) = &args.sites {
        resolved.sites = config::parse_site_list(sites)?;
    }
    if let Some(parameters) = &args.parameters {
        resolved.parameters = config::parse_parameter_list(parameters)?;
    }
    if args.legacy_schema {
        resolved.schema = SchemaMode::Legacy;
    }
    Ok(resolved)
}

fn run_scrape(args: ScrapeArgs) -> miette::Result<()> {
    let resolved = resolve_config(&args).into_diagnostic()?;
    let client = SparqlHttpClient::new(&resolved.endpoint_url).into_diagnostic()?;
    let scraper = Scraper::new(resolved, client);
    let outcome = scraper.run().into_diagnostic()?;
    println!(
        "{} new records, {} duplicates skipped ({} sites ok, {} sites skipped)",
        outcome.new_records, outcome.duplicates, outcome.sites_ok, outcome.sites_skipped
    );
    Ok(())
}

fn run_compact(args: CompactArgs) -> miette::Result<()> {
    let mut resolved = ScraperConfig::from_env().into_diagnostic()?;
    if let Some(data_dir) = &args.data_dir {
        resolved.data_dir = Utf8PathBuf::from(data_dir);
    }
    if args.legacy_schema {
        resolved.schema = SchemaMode::Legacy;
    }
    let store = CsvStore::new(resolved.output_file(), resolved.schema);
    let outcome = store.compact().into_diagnostic()?;
    println!(
        "removed {} duplicate rows, kept {}",
        outcome.removed, outcome.kept
    );
    Ok(())
}

fn run_sites(args: SitesArgs) -> miette::Result<()> {
    let codes = river_station_codes(Utf8Path::new(&args.csv_file)).into_diagnostic()?;
    if codes.is_empty() {
        return Err(miette::Report::msg("no river stations found"));
    }
    for code in &codes {
        println!("{code}");
    }
    println!("total: {}", codes.len());
    Ok(())
}
