//! Photo catalog service: photos, albums and users behind a swappable
//! document store, served over HTTP.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
