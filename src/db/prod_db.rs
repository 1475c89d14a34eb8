use crate::config::Config;

use super::elia::{
    raw_archive::{DatasetDescriptor, EliaRawArchive},
    table_loader::TableMapping,
};

pub struct ProdDb {}

impl ProdDb {
    pub fn elia_raw(config: &Config) -> EliaRawArchive {
        EliaRawArchive {
            base_dir: config.data_dir.clone(),
        }
    }

    /// Catalog datasets the extractor downloads, in order.
    pub fn elia_datasets() -> Vec<DatasetDescriptor> {
        vec![
            DatasetDescriptor::new("ods001", "total_load"),
            DatasetDescriptor::new("ods031", "wind_power"),
            DatasetDescriptor::new("ods032", "solar_pv_power"),
        ]
    }

    /// Tables the loader writes, in order.
    pub fn elia_tables() -> Vec<TableMapping> {
        vec![
            TableMapping::new("total_load", "elia_total_load"),
            TableMapping::new("total_generation_by_fuel", "elia_generation_by_fuel"),
            TableMapping::new("wind_power", "elia_wind_power"),
            TableMapping::new("solar_pv_power", "elia_solar_pv"),
        ]
    }
}
