#![forbid(unsafe_code)]

pub mod demo;
pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryRepository, ProcessRepository, Storage, StorageError, ZoneRepository};
