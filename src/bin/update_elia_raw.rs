use std::{error::Error, path::Path};

use clap::Parser;
use elia_grid::{
    api::elia::exports::EliaExportClient, config::Config, db::prod_db::ProdDb,
    utils::report::extract_table,
};
use jiff::civil::Date;
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Dotenv file with the ELIA_* and FILTER_* variables, ignored if missing
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// First day of the date filter, e.g. 2024-01-01.  Overrides FILTER_START.
    #[arg(long)]
    start: Option<Date>,

    /// Last day of the date filter.  Overrides FILTER_END.
    #[arg(long)]
    end: Option<Date>,

    /// Download the full datasets, ignore any configured date filter
    #[arg(long, conflicts_with_all = ["start", "end"])]
    no_filter: bool,
}

/// Download the Elia datasets and save one JSON snapshot per label.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let env_file = Path::new(&args.env_file);
    if env_file.exists() {
        dotenvy::from_path(env_file)?;
    }
    let config = Config::from_env()?.with_filter_overrides(args.start, args.end, args.no_filter)?;
    match &config.date_filter {
        Some(filter) => info!("Date filter: {}", filter),
        None => info!("No date filter, fetching full datasets"),
    }

    let archive = ProdDb::elia_raw(&config);
    let client = EliaExportClient::new(&config.api_base, config.request_timeout)?;
    let reports = archive.download_all(
        &client,
        &ProdDb::elia_datasets(),
        config.date_filter.as_ref(),
        config.pause,
    );

    println!("{}", extract_table(&reports));
    Ok(())
}
