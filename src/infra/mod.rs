//! Concrete adapters for the core's ports: filesystem and persistence.

pub mod db;
pub mod fs;
