pub mod raw_archive;
pub mod table_loader;
