pub mod add;
pub mod backup;
pub mod delete;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod list;
pub mod update;
pub mod vault_cmd;
