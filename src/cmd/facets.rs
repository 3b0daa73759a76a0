//! The `facets` command: list registered facets and their tasks.

use anyhow::Result;
use console::style;
use whimbrel::facets::builtin_registry;

pub fn cmd_facets() -> Result<()> {
    let registry = builtin_registry();

    for facet in registry.iter() {
        let mut capabilities = Vec::new();
        if facet.detector.is_some() {
            capabilities.push("detect");
        }
        if !facet.query_index.is_empty() {
            capabilities.push("query");
        }
        if !facet.task_augmentations.is_empty() {
            capabilities.push("augment");
        }
        let suffix = if capabilities.is_empty() {
            String::new()
        } else {
            format!(" [{}]", capabilities.join(", "))
        };
        println!("{}{}", style(&facet.id).bold(), style(suffix).dim());

        for task in facet.tasks.values() {
            println!(
                "  {} {} {}",
                task.id,
                style(&task.name).dim(),
                style(format!("(fs: {})", task.fs_mode)).dim()
            );
        }
        for task_id in facet.task_augmentations.keys() {
            println!("  {} {}", style("augments").dim(), task_id);
        }
    }
    Ok(())
}
