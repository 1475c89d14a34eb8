pub mod elia;
pub mod prod_db;
