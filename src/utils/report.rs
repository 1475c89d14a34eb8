use tabled::{builder::Builder, settings::Style};

use crate::db::elia::{raw_archive::ExtractReport, table_loader::LoadReport};

/// One line per dataset with the outcome of the download.
pub fn extract_table(reports: &[ExtractReport]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Dataset", "Label", "Outcome"]);
    for report in reports {
        builder.push_record(vec![
            report.dataset.dataset_id.clone(),
            report.dataset.label.clone(),
            report.outcome.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::empty());
    table
}

/// One line per label with the outcome of the load.
pub fn load_table(reports: &[LoadReport]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Label", "Table", "Outcome"]);
    for report in reports {
        builder.push_record(vec![
            report.mapping.label.clone(),
            report.mapping.table.clone(),
            report.outcome.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::empty());
    table
}
