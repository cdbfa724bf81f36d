pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod import;
pub mod logging;
pub mod record;
pub mod store;
pub mod vault;
