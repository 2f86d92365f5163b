use super::EXIT_SUCCESS;
use clap::CommandFactory;
use std::path::Path;

fn render(cmd: clap::Command, path: &Path) -> Result<(), String> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buf)
        .map_err(|e| format!("man page render failed: {e}"))?;
    std::fs::write(path, &buf).map_err(|e| format!("failed to write {}: {e}", path.display()))
}

/// Write `berth.1` plus one page per subcommand, recursing into the
/// definition groups (`berth-stacks-new.1`).
pub fn run<C: CommandFactory>(dir: &Path) -> Result<u8, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create dir: {e}"))?;
    let cmd = C::command();
    render(cmd.clone(), &dir.join("berth.1"))?;
    for sub in cmd.get_subcommands() {
        let sub_name = format!("berth-{}", sub.get_name());
        render(sub.clone(), &dir.join(format!("{sub_name}.1")))?;
        for nested in sub.get_subcommands() {
            let nested_name = format!("{sub_name}-{}", nested.get_name());
            render(nested.clone(), &dir.join(format!("{nested_name}.1")))?;
        }
    }
    println!("man pages written to {}", dir.display());
    Ok(EXIT_SUCCESS)
}
