use super::{core_err, json_pretty, EXIT_SUCCESS};
use berth_core::Engine;
use std::path::Path;

pub fn run(
    engine: &Engine,
    name: &str,
    app: Option<&str>,
    bin: Option<&str>,
    output: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let mut written = Vec::new();
    if let Some(app) = app {
        written.push(engine.export_desktop_entry(name, app).map_err(core_err)?);
    }
    if let Some(bin) = bin {
        written.push(engine.export_bin(name, bin, output).map_err(core_err)?);
    }

    if json {
        let payload = serde_json::json!({ "subsystem": name, "exported": written });
        println!("{}", json_pretty(&payload)?);
    } else {
        for path in &written {
            println!("exported {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
