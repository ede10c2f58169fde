//! Validate a Montage project.

use montage_common::config::AppConfig;

pub fn run(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    println!("Validating project: {id}");
    let bundle = super::load(config, id)?;
    let project = &bundle.project;

    println!("  Name: {}", project.name);
    println!("  Tracks: {}", project.tracks().len());
    println!("  Clips: {}", project.clips().count());

    let pending: Vec<_> = project.assets().filter(|a| !a.is_ready()).collect();
    if !pending.is_empty() {
        println!("  Processing assets (not exportable yet):");
        for asset in pending {
            println!("    - {} {}", asset.id, asset.name);
        }
    }

    let errors = project.validate();
    if errors.is_empty() {
        println!("\nProject is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for error in &errors {
        println!("  - {error}");
    }
    anyhow::bail!("{} issue(s) found", errors.len())
}
