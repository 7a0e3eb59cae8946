//! List the available tasks.

use std::path::Path;

use anyhow::Result;
use kiln_tasks::{default_registry, TaskRegistry};

use super::load_config;

pub fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = default_registry(&config)?;

    print!("{}", render(&registry));
    Ok(())
}

fn render(registry: &TaskRegistry) -> String {
    let width = registry.names().map(str::len).max().unwrap_or(0);

    let mut out = String::new();
    for task in registry.tasks() {
        out.push_str(&format!(
            "{:width$}  {}",
            task.name(),
            task.description(),
            width = width
        ));
        if !task.predecessors().is_empty() {
            out.push_str(&format!(" (after {})", task.predecessors().join(", ")));
        }
        out.push('\n');
    }
    out.push_str(&format!("{:width$}  Every task above\n", "build", width = width));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::Config;

    #[test]
    fn shows_predecessors() {
        let registry = default_registry(&Config::default().resolve().unwrap()).unwrap();

        let listing = render(&registry);

        assert_eq!(listing.lines().count(), 12);
        assert!(listing
            .lines()
            .any(|l| l.starts_with("js-bundle") && l.ends_with("(after script-transpile)")));
    }
}
