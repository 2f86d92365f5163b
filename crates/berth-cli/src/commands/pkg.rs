use super::{core_err, json_pretty, EXIT_SUCCESS};
use berth_core::{CoreError, Engine};
use berth_schema::Verb;

/// Run a package verb in subsystem `name`.
///
/// `install` exports the desktop entries of the installed packages unless
/// `no_export` is set; `remove` and `purge` withdraw them first.
pub fn run(
    engine: &Engine,
    name: &str,
    verb: &str,
    args: &[String],
    no_export: bool,
    json: bool,
) -> Result<u8, String> {
    let verb: Verb = verb.parse().map_err(|e| core_err(CoreError::from(e)))?;
    let launchers = match verb {
        Verb::Install => engine
            .install_packages(name, args, !no_export)
            .map_err(core_err)?,
        Verb::Remove => engine.remove_packages(name, args).map_err(core_err)?,
        Verb::Purge => {
            let withdrawn = engine
                .unexport_desktop_entries(name, args)
                .map_err(core_err)?;
            engine.dispatch(name, verb, args).map_err(core_err)?;
            withdrawn
        }
        _ => {
            engine.dispatch(name, verb, args).map_err(core_err)?;
            0
        }
    };

    if json {
        let payload = serde_json::json!({
            "subsystem": name,
            "verb": verb,
            "args": args,
            "launchers": launchers,
        });
        println!("{}", json_pretty(&payload)?);
    } else if launchers > 0 {
        let action = if verb == Verb::Install {
            "exported"
        } else {
            "withdrew"
        };
        println!("{action} {launchers} desktop entr{}", if launchers == 1 { "y" } else { "ies" });
    }
    Ok(EXIT_SUCCESS)
}
