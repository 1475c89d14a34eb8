pub mod elia;
