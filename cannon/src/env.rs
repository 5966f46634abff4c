use std::path::PathBuf;

use dotenvy::dotenv;

/// Loads the local `.env`, if there is one, into the process environment so
/// that `NODE`, `BASEDIR` and `RUST_LOG` can come from it.
///
/// Runs before logging is set up, so the outcome is returned for the caller
/// to log: the file that was loaded, or the reason a present file was
/// rejected. A missing or unreadable file is not an error.
pub fn load_dotenvy_vars_if_present() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(dotenvy::Error::Io(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
