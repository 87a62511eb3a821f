use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static TABLES_BASE_PATH: OnceLock<PathBuf> = OnceLock::new();

pub const TABLES_PATH_ENV: &str = "SONDEBUFR_TABLES_PATH";

const DEFAULT_TABLES_DIR: &str = "tables";

/// First call wins; later calls are ignored.
pub fn set_tables_base_path<P: AsRef<Path>>(path: P) {
    let _ = TABLES_BASE_PATH.set(path.as_ref().to_path_buf());
}

/// The base path set by `set_tables_base_path`, else `$SONDEBUFR_TABLES_PATH`.
pub fn configured_tables_base_path() -> Option<PathBuf> {
    if let Some(path) = TABLES_BASE_PATH.get() {
        return Some(path.clone());
    }
    std::env::var_os(TABLES_PATH_ENV).map(PathBuf::from)
}

/// Base directory for CSV tables when no explicit path was given.
/// `./tables` only counts when it exists.
pub fn discover_tables_base_path() -> Option<PathBuf> {
    configured_tables_base_path().or_else(|| {
        let default = PathBuf::from(DEFAULT_TABLES_DIR);
        default.is_dir().then_some(default)
    })
}
