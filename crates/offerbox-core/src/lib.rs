pub mod config;
pub mod error;
pub mod kpi;
pub mod lead;
pub mod notify;
pub mod store;
