pub mod json_normalize;
pub mod lib_duckdb;
pub mod report;
