use super::{core_err, EXIT_SUCCESS};
use berth_core::{CoreError, Engine};

pub fn run(engine: &Engine, name: &str) -> Result<u8, String> {
    match engine.enter(name) {
        Ok(()) => Ok(EXIT_SUCCESS),
        // The shell's own exit status is passed through.
        Err(CoreError::Execution { code }) => Ok(super::run::exit_status(code)),
        Err(e) => Err(core_err(e)),
    }
}
