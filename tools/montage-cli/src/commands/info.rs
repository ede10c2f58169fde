//! Show project information.

use montage_common::config::AppConfig;

pub fn run(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let bundle = super::load(config, id)?;
    let p = &bundle.project;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Version: {}", p.version);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!("  Duration: {:.2}s (playhead {:.2}s)", p.total_duration_secs, p.current_time_secs);
    println!("  Zoom: {} px/s", p.zoom_factor);
    println!();

    println!("Assets:");
    for asset in p.assets() {
        let embedded = if bundle.payloads.contains_key(&asset.id) {
            ", embedded"
        } else {
            ""
        };
        println!(
            "  {} {} [{}] {:.2}s {:?}{embedded}",
            asset.id, asset.name, asset.media_type, asset.base_duration_secs, asset.ready_state
        );
    }
    println!();

    println!("Tracks:");
    for track in p.tracks() {
        println!("  {} {} [{}] #{}", track.id, track.name, track.kind, track.order_index);
        for clip in &track.clips {
            let group = clip
                .group_id
                .map(|g| format!(" {g}"))
                .unwrap_or_default();
            let muted = if clip.muted { " muted" } else { "" };
            println!(
                "    {} asset {} @ {:.2}s +{:.2}s (offset {:.2}s, level {:.2}){group}{muted}",
                clip.id,
                clip.asset_id,
                clip.start_secs,
                clip.duration_secs,
                clip.source_offset_secs,
                clip.level
            );
        }
    }

    Ok(())
}
