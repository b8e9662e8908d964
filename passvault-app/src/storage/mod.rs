mod config;
mod paths;

pub use config::{load_settings, save_settings, AppSettings};
pub use paths::{resolve_data_dir, VaultPaths, DATA_DIR_ENV};
