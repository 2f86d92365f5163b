//! CLI subprocess integration tests.
//!
//! These tests run the `berth` binary against a scratch store with the
//! persistent mock backend and check exit codes, output, and the files
//! left on the host.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        let builtin = sandbox.builtin();
        let out = sandbox.run(&["install-builtins", &builtin.to_string_lossy()]);
        assert!(out.status.success(), "install-builtins: {}", stderr(&out));
        sandbox
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn builtin(&self) -> PathBuf {
        self.path("builtin")
    }

    fn applications(&self) -> PathBuf {
        self.path("share/applications")
    }

    fn bin(&self) -> PathBuf {
        self.path("home/.local/bin")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_berth"));
        cmd.env("HOME", self.path("home"))
            .env("XDG_CONFIG_HOME", self.path("config"))
            .env("XDG_DATA_HOME", self.path("share"))
            .env_remove("BERTH_LOG")
            .args([
                "--data-dir",
                &self.path("data").to_string_lossy(),
                "--builtin-dir",
                &self.builtin().to_string_lossy(),
                "--backend",
                "mock",
            ]);
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().unwrap()
    }

    fn ok(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "berth {args:?} must exit 0. stderr: {}",
            stderr(&out)
        );
        stdout(&out)
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        serde_json::from_str(&self.ok(&full)).unwrap()
    }

    fn desk_subsystem(&self, name: &str) {
        self.ok(&[
            "stacks",
            "new",
            "desk",
            "--base",
            "docker.io/library/ubuntu:24.04",
            "--pkg-manager",
            "apt",
            "--packages",
            "firefox,vim",
        ]);
        self.ok(&["subsystems", "new", name, "--stack", "desk"]);
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn code(out: &Output) -> i32 {
    out.status.code().unwrap()
}

fn mypm_args(name: &str) -> Vec<String> {
    let mut args = vec!["pkgmanagers".to_owned(), "new".to_owned(), name.to_owned()];
    for flag in [
        "install", "update", "remove", "clean", "list", "search", "show", "upgrade",
    ] {
        args.push(format!("--{flag}"));
        args.push(format!("{name} {flag}"));
    }
    args
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_berth"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("berth"));
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_berth"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    for cmd in ["pkgmanagers", "stacks", "subsystems", "pkg", "export"] {
        assert!(out.contains(cmd), "help must list '{cmd}'");
    }
}

#[test]
fn cli_lists_builtin_pkg_managers() {
    let sb = Sandbox::new();
    let pms = sb.json(&["pkgmanagers", "list"]);
    let pms = pms.as_array().unwrap();
    assert_eq!(pms.len(), 5);
    assert_eq!(pms[1]["name"], "apt");
    assert_eq!(pms[1]["builtIn"], true);
    assert_eq!(pms[1]["needSudo"], true);
}

#[test]
fn cli_pkg_manager_lifecycle() {
    let sb = Sandbox::new();
    sb.ok(&as_strs(&mypm_args("mypm")));

    let pm = sb.json(&["pkgmanagers", "show", "mypm"]);
    assert_eq!(pm["cmdPurge"], "mypm remove");
    assert_eq!(pm["builtIn"], false);

    let dup = sb.run(&as_strs(&mypm_args("mypm")));
    assert_eq!(code(&dup), 1);
    assert!(stderr(&dup).contains("already exists"));

    sb.ok(&["pkgmanagers", "update", "mypm", "--search", "mypm find"]);
    assert_eq!(sb.json(&["pkgmanagers", "show", "mypm"])["cmdSearch"], "mypm find");

    sb.ok(&["pkgmanagers", "rm", "mypm", "--yes"]);
    let gone = sb.run(&["pkgmanagers", "show", "mypm"]);
    assert_eq!(code(&gone), 1);
}

#[test]
fn cli_incomplete_pkg_manager_is_definition_error() {
    let sb = Sandbox::new();
    let out = sb.run(&[
        "pkgmanagers",
        "new",
        "half",
        "--install",
        "x install",
        "--no-prompt",
    ]);
    assert_eq!(code(&out), 2, "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("search"));
}

#[test]
fn cli_builtin_cannot_be_removed() {
    let sb = Sandbox::new();
    let out = sb.run(&["pkgmanagers", "rm", "apt", "--yes"]);
    assert_eq!(code(&out), 1);
    assert!(stderr(&out).contains("built-in"));
}

#[test]
fn cli_rm_without_terminal_needs_yes() {
    let sb = Sandbox::new();
    sb.ok(&as_strs(&mypm_args("mypm")));
    let out = sb.run(&["pkgmanagers", "rm", "mypm"]);
    assert_eq!(code(&out), 1);
    assert!(stderr(&out).contains("--yes"));
}

#[test]
fn cli_pkg_manager_in_use_is_refused() {
    let sb = Sandbox::new();
    sb.ok(&as_strs(&mypm_args("mypm")));
    for stack in ["one", "two"] {
        sb.ok(&[
            "stacks",
            "new",
            stack,
            "--base",
            "img",
            "--pkg-manager",
            "mypm",
        ]);
    }
    let out = sb.run(&["pkgmanagers", "rm", "mypm", "--yes"]);
    assert_eq!(code(&out), 1);
    assert!(stderr(&out).contains("still used by: one, two"));
}

#[test]
fn cli_stack_with_unknown_pkg_manager_fails() {
    let sb = Sandbox::new();
    let out = sb.run(&[
        "stacks",
        "new",
        "bad",
        "--base",
        "img",
        "--pkg-manager",
        "nonexistent",
    ]);
    assert_eq!(code(&out), 2, "stderr: {}", stderr(&out));
}

#[test]
fn cli_stack_export_import_roundtrip() {
    let sb = Sandbox::new();
    sb.ok(&[
        "stacks",
        "new",
        "dev",
        "--base",
        "img",
        "--pkg-manager",
        "apt",
        "--packages",
        "git,make",
    ]);
    let file = sb.path("dev.yaml");
    sb.ok(&["stacks", "export", "dev", "--output", &file.to_string_lossy()]);
    sb.ok(&["stacks", "rm", "dev", "--yes"]);
    sb.ok(&["stacks", "import", &file.to_string_lossy()]);
    let stack = sb.json(&["stacks", "show", "dev"]);
    assert_eq!(stack["packages"], serde_json::json!(["git", "make"]));
    assert_eq!(stack["pkgManager"], "apt");
}

#[test]
fn cli_subsystem_create_and_list() {
    let sb = Sandbox::new();
    sb.ok(&["subsystems", "new", "dev", "--stack", "ubuntu"]);
    let list = sb.json(&["subsystems", "list"]);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "dev");
    assert_eq!(list[0]["state"], "Stopped");
    assert_eq!(list[0]["container"], "berth-dev");

    let dup = sb.run(&["subsystems", "new", "dev", "--stack", "ubuntu"]);
    assert_eq!(code(&dup), 1);

    sb.ok(&["start", "dev"]);
    assert_eq!(sb.json(&["subsystems", "list"])[0]["state"], "Running");
    sb.ok(&["stop", "dev"]);
    assert_eq!(sb.json(&["subsystems", "list"])[0]["state"], "Stopped");
}

#[test]
fn cli_pkg_dispatches_generated_command() {
    let sb = Sandbox::new();
    sb.ok(&["subsystems", "new", "dev", "--stack", "ubuntu"]);
    let out = sb.ok(&["pkg", "dev", "install", "vim", "git"]);
    assert!(out.contains("mock-exec: sudo apt install -y vim git"), "{out}");
    let out = sb.ok(&["pkg", "dev", "autoremove"]);
    assert!(out.contains("mock-exec: sudo apt autoremove -y"), "{out}");
}

#[test]
fn cli_pkg_unknown_verb_is_definition_error() {
    let sb = Sandbox::new();
    sb.ok(&["subsystems", "new", "dev", "--stack", "ubuntu"]);
    let out = sb.run(&["pkg", "dev", "frobnicate", "vim"]);
    assert_eq!(code(&out), 2);
    assert!(stderr(&out).contains("frobnicate"));
}

#[test]
fn cli_run_passes_exit_status() {
    let sb = Sandbox::new();
    sb.ok(&["subsystems", "new", "dev", "--stack", "ubuntu"]);
    let out = sb.ok(&["run", "dev", "--", "echo", "hi"]);
    assert!(out.contains("mock-exec: echo hi"));
    let failed = sb.run(&["run", "dev", "--", "false"]);
    assert_eq!(code(&failed), 1);

    let missing = sb.run(&["run", "ghost", "--", "true"]);
    assert_eq!(code(&missing), 1);
    assert!(stderr(&missing).contains("not found"));
}

#[test]
fn cli_export_and_remove_cleans_host() {
    let sb = Sandbox::new();
    sb.desk_subsystem("dev");

    sb.ok(&["export", "dev", "--app", "firefox"]);
    let entry = sb.applications().join("berth-dev-firefox.desktop");
    let content = std::fs::read_to_string(&entry).unwrap();
    assert!(content.contains("run dev -- /usr/bin/firefox %U"), "{content}");
    assert!(content.contains("X-Berth-Subsystem=dev"));

    sb.ok(&["export", "dev", "--bin", "vim"]);
    let shim = sb.bin().join("vim");
    assert!(std::fs::read_to_string(&shim).unwrap().contains("# berth-shim: dev"));

    let missing = sb.run(&["export", "dev", "--app", "nonexistent"]);
    assert_eq!(code(&missing), 1);

    let shown = sb.json(&["subsystems", "show", "dev"]);
    assert_eq!(shown["exported"]["desktop_entries"], serde_json::json!(["firefox"]));
    assert_eq!(shown["exported"]["binaries"], serde_json::json!(["vim"]));

    sb.ok(&["subsystems", "rm", "dev", "--yes"]);
    assert!(!entry.exists());
    assert!(!shim.exists());
}

#[test]
fn cli_unexport_leaves_foreign_files() {
    let sb = Sandbox::new();
    sb.desk_subsystem("dev");
    let custom = sb.path("custom-bin");
    std::fs::create_dir_all(&custom).unwrap();
    std::fs::write(custom.join("vim"), "#!/bin/sh\n").unwrap();

    let out = sb.run(&[
        "export",
        "dev",
        "--bin",
        "vim",
        "--output",
        &custom.to_string_lossy(),
    ]);
    assert_eq!(code(&out), 1);

    let out = sb.ok(&[
        "unexport",
        "dev",
        "--bin",
        "vim",
        "--output",
        &custom.to_string_lossy(),
    ]);
    assert!(out.contains("nothing to unexport"));
    assert!(custom.join("vim").exists());
}

#[test]
fn cli_install_exports_launchers() {
    let sb = Sandbox::new();
    sb.desk_subsystem("dev");
    let entry = sb.applications().join("berth-dev-firefox.desktop");

    sb.ok(&["pkg", "dev", "install", "--no-export", "firefox"]);
    assert!(!entry.exists());

    let out = sb.ok(&["pkg", "dev", "install", "firefox"]);
    assert!(out.contains("exported 1 desktop entry"), "{out}");
    assert!(entry.exists());

    sb.ok(&["pkg", "dev", "remove", "firefox"]);
    assert!(!entry.exists());
}

#[test]
fn cli_reset_keeps_stack_copy() {
    let sb = Sandbox::new();
    sb.desk_subsystem("dev");
    sb.ok(&["stacks", "update", "desk", "--base", "other:latest", "--add", "emacs"]);
    sb.ok(&["subsystems", "reset", "dev", "--yes"]);

    let shown = sb.json(&["subsystems", "show", "dev"]);
    assert_eq!(shown["subsystem"]["stack"]["base"], "docker.io/library/ubuntu:24.04");
    assert_eq!(
        shown["subsystem"]["stack"]["packages"],
        serde_json::json!(["firefox", "vim"])
    );
}

#[test]
fn cli_stack_in_use_is_refused() {
    let sb = Sandbox::new();
    sb.desk_subsystem("dev");
    let out = sb.run(&["stacks", "rm", "desk", "--yes"]);
    assert_eq!(code(&out), 1);
    assert!(stderr(&out).contains("dev"));
}

#[test]
fn cli_store_version_mismatch_exits_three() {
    let sb = Sandbox::new();
    sb.ok(&["stacks", "list"]);
    std::fs::write(
        sb.path("data/berth/version"),
        r#"{ "format_version": 99 }"#,
    )
    .unwrap();
    let out = sb.run(&["stacks", "list"]);
    assert_eq!(code(&out), 3, "stderr: {}", stderr(&out));
}

#[test]
fn cli_man_pages_written() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_berth"))
        .args(["man-pages", &dir.path().to_string_lossy()])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(Path::new(&dir.path().join("berth.1")).exists());
    assert!(dir.path().join("berth-stacks-new.1").exists());
}
