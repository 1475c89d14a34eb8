pub mod _api_elia_core;
pub mod exports;
