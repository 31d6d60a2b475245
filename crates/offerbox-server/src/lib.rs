pub mod app;
pub mod client;
pub mod error;
pub mod geo;
pub mod mail;
pub mod rate_limit;
pub mod routes;
pub mod state;
