//! Configuration loaded from `.stordb.toml`.

pub mod settings;

pub use settings::{CipherKind, Settings};
