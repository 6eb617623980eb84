//! Termination signal wiring: SIGINT/SIGTERM flip the shutdown flag.

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::core::errors::{CsmError, Result};
use crate::core::shutdown::ShutdownFlag;

/// Install handlers that set `flag` on interrupt or termination. The process
/// keeps running; each loop winds down cooperatively on its next iteration.
pub fn register(flag: &ShutdownFlag) -> Result<()> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, flag.atomic()).map_err(|err| CsmError::Signal {
            details: format!("signal {signal}: {err}"),
        })?;
    }
    Ok(())
}
