use super::{core_err, EXIT_FAILURE, EXIT_SUCCESS};
use berth_core::{CoreError, Engine};
use berth_runtime::ExecOptions;

/// Map a command's exit status onto the process exit code.
pub fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(EXIT_FAILURE)
}

pub fn run(engine: &Engine, name: &str, command: &[String]) -> Result<u8, String> {
    let options = ExecOptions {
        interactive: true,
        capture_output: false,
    };
    match engine.exec(name, options, command) {
        Ok(_) => Ok(EXIT_SUCCESS),
        Err(CoreError::Execution { code }) => Ok(exit_status(code)),
        Err(e) => Err(core_err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_passes_small_codes() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(127), 127);
    }

    #[test]
    fn exit_status_clamps_out_of_range() {
        assert_eq!(exit_status(-1), EXIT_FAILURE);
        assert_eq!(exit_status(300), EXIT_FAILURE);
    }
}
