// Adapters layer: concrete implementations for external systems (filesystem, Warehouse HTTP API).

pub mod storage;
pub mod warehouse;
