use std::{error::Error, path::Path};

use clap::Parser;
use elia_grid::{
    config::Config,
    db::{elia::table_loader::load_tables, prod_db::ProdDb},
    utils::{lib_duckdb::Sink, report::load_table},
};
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Dotenv file with the ELIA_* and POSTGRES_* variables, ignored if missing
    #[arg(long, default_value = ".env")]
    env_file: String,
}

/// Load the JSON snapshots into the database, replacing each table.
/// Run after `update_elia_raw`.
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
    let config = Config::from_env()?;

    let mut sink = Sink::connect(&config.db)?;
    info!("Database connection OK");

    let archive = ProdDb::elia_raw(&config);
    let reports = load_tables(&archive, &mut sink, &ProdDb::elia_tables());

    println!("{}", load_table(&reports));
    Ok(())
}
