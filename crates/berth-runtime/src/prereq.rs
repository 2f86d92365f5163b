use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    if Path::new(name).is_absolute() {
        return Path::new(name).is_file();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check prerequisites for the distrobox backend.
///
/// `distrobox` is the program the backend will run (a configured path or
/// plain `distrobox`). Returns an empty list when everything is present.
pub fn check_distrobox_prereqs(distrobox: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists(distrobox) {
        missing.push(MissingPrereq {
            name: "distrobox",
            purpose: "creating and entering subsystem containers",
            install_hint:
                "zypper install distrobox | apt install distrobox | dnf install distrobox | pacman -S distrobox",
        });
    }

    let has_manager = ["podman", "docker", "lilipod"]
        .iter()
        .any(|m| command_exists(m));
    if !has_manager {
        missing.push(MissingPrereq {
            name: "container manager",
            purpose: "running the containers distrobox creates",
            install_hint: "install one of: podman, docker, or lilipod",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nberth requires these tools to manage subsystems.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "distrobox",
            purpose: "containers",
            install_hint: "apt install distrobox",
        };
        let s = format!("{m}");
        assert!(s.contains("distrobox"));
        assert!(s.contains("containers"));
        assert!(s.contains("apt install distrobox"));
    }

    #[test]
    fn absolute_missing_program_is_reported() {
        let missing = check_distrobox_prereqs("/nonexistent/bin/distrobox");
        assert!(missing.iter().any(|m| m.name == "distrobox"));
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let items = vec![
            MissingPrereq {
                name: "distrobox",
                purpose: "containers",
                install_hint: "apt install distrobox",
            },
            MissingPrereq {
                name: "container manager",
                purpose: "runtime",
                install_hint: "install podman",
            },
        ];
        let output = format_missing(&items);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("distrobox"));
        assert!(output.contains("container manager"));
    }
}
