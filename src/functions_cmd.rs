use crate::EngineResult;
use crate::registry;

/// Print the registry as `<id>\t<name>` lines.
pub fn run() -> EngineResult<()> {
    for line in listing() {
        println!("{line}");
    }
    Ok(())
}

pub fn listing() -> Vec<String> {
    registry::entries()
        .map(|(id, f)| format!("{id}\t{}", f.name))
        .collect()
}
