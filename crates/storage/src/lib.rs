#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRecord, AttemptRepository, AttemptRow, CredentialStore, InMemoryRepository, Storage,
    StorageError,
};
