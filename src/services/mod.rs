//! Catalog engine, access gate and the storage backends beneath them.

pub mod access_gate;
pub mod catalog_service;
pub mod document_store;
pub mod json_store;
pub mod memory_store;
pub mod store;
