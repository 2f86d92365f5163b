use super::{core_err, EXIT_SUCCESS};
use berth_core::Engine;

pub fn run(engine: &Engine, name: &str) -> Result<u8, String> {
    engine.start(name).map_err(core_err)?;
    println!("started subsystem {name}");
    Ok(EXIT_SUCCESS)
}
