//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (ARES_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software installation.
///
/// The root is read from the `ARES_SW_ROOT` environment variable, which must
/// point at the checkout containing the `params` and `sessions` directories.
pub fn get_ares_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var("ARES_SW_ROOT") {
        Ok(v) => Ok(PathBuf::from(v)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
