//! Create a new Montage project.

use montage_common::config::AppConfig;
use montage_project_model::{MediaKind, Project, ProjectBundle};

pub fn run(config: &AppConfig, name: String, duration: Option<f64>) -> anyhow::Result<()> {
    let total = duration.unwrap_or(config.editor.default_total_duration_secs);
    let mut project = Project::with_timeline(&name, config.editor.pixels_per_second, total);
    project.add_track(MediaKind::Video);
    project.add_track(MediaKind::Audio);

    let id = super::save(config, &ProjectBundle::new(project))?;

    println!("Project '{name}' created:");
    println!("  ID: {id}");
    println!("  Store: {}", config.projects_dir.display());
    println!("  Duration: {total:.1}s");
    println!();
    println!("Layout:");
    println!("  {id}/");
    println!("  ├── meta/     (project.json)");
    println!("  └── media/    (embedded asset payloads)");

    Ok(())
}
