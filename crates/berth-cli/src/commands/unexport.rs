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
    let mut removed = Vec::new();
    if let Some(app) = app {
        if engine.unexport_desktop_entry(name, app).map_err(core_err)? {
            removed.push(app.to_owned());
        }
    }
    if let Some(bin) = bin {
        if engine.unexport_bin(name, bin, output).map_err(core_err)? {
            removed.push(bin.to_owned());
        }
    }

    if json {
        let payload = serde_json::json!({ "subsystem": name, "removed": removed });
        println!("{}", json_pretty(&payload)?);
    } else if removed.is_empty() {
        println!("nothing to unexport");
    } else {
        for item in &removed {
            println!("unexported {item}");
        }
    }
    Ok(EXIT_SUCCESS)
}
