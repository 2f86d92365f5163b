pub mod completions;
pub mod enter;
pub mod export;
pub mod install_builtins;
pub mod man_pages;
pub mod pkg;
pub mod pkgmanagers;
pub mod run;
pub mod stacks;
pub mod start;
pub mod stop;
pub mod subsystems;
pub mod unexport;

use berth_core::CoreError;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stderr, stdin, IsTerminal};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DEFINITION_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub const DEFINITION_PREFIX: &str = "definition error:";
pub const STORE_PREFIX: &str = "store error:";

/// Render a core error for the terminal. The prefix selects the exit code
/// in `main`.
pub fn core_err(e: CoreError) -> String {
    match e {
        CoreError::Validation(_)
        | CoreError::UnknownVerb(_)
        | CoreError::UnresolvedReference { .. } => format!("{DEFINITION_PREFIX} {e}"),
        // Display already carries the "store error:" prefix.
        CoreError::Store(_) => e.to_string(),
        other => other.to_string(),
    }
}

pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with(DEFINITION_PREFIX) {
        EXIT_DEFINITION_ERROR
    } else if msg.starts_with(STORE_PREFIX) {
        EXIT_STORE_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn is_tty() -> bool {
    stdin().is_terminal() && stderr().is_terminal()
}

/// Ask before a destructive action. Without a terminal, `--yes` is required.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool, String> {
    if yes {
        return Ok(true);
    }
    if !is_tty() {
        return Err(format!("{prompt} (pass --yes to confirm without a terminal)"));
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `op` behind a spinner unless JSON output was requested.
pub fn with_spinner<T>(
    json: bool,
    msg: &str,
    done: &str,
    failed: &str,
    op: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, String> {
    let pb = (!json).then(|| spinner(msg));
    match op() {
        Ok(v) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, done);
            }
            Ok(v)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, failed);
            }
            Err(core_err(e))
        }
    }
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().cyan().bold().apply_to(state).to_string(),
        "stopped" => Style::new().green().apply_to(state).to_string(),
        "not created" => Style::new().yellow().apply_to(state).to_string(),
        "removed" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

pub fn origin_label(built_in: bool) -> &'static str {
    if built_in {
        "built-in"
    } else {
        "user"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_state_keeps_text() {
        for state in ["running", "stopped", "not created", "removed"] {
            assert!(colorize_state(state).contains(state));
        }
        assert_eq!(colorize_state("unknown"), "unknown");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_DEFINITION_ERROR);
        assert_ne!(EXIT_DEFINITION_ERROR, EXIT_STORE_ERROR);
    }

    #[test]
    fn definition_errors_map_to_exit_two() {
        let msg = core_err(CoreError::UnknownVerb("frob".to_owned()));
        assert_eq!(exit_code_for(&msg), EXIT_DEFINITION_ERROR);
        let msg = core_err(CoreError::Validation("bad".to_owned()));
        assert_eq!(exit_code_for(&msg), EXIT_DEFINITION_ERROR);
    }

    #[test]
    fn store_errors_map_to_exit_three() {
        let msg = core_err(CoreError::Store(berth_store::StoreError::VersionMismatch {
            expected: 1,
            found: 2,
        }));
        assert_eq!(exit_code_for(&msg), EXIT_STORE_ERROR);
    }

    #[test]
    fn other_errors_map_to_exit_one() {
        let msg = core_err(CoreError::NotFound {
            kind: "stack",
            name: "x".to_owned(),
        });
        assert_eq!(exit_code_for(&msg), EXIT_FAILURE);
    }

    #[test]
    fn confirm_with_yes_skips_prompt() {
        assert!(confirm("remove?", true).unwrap());
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
