//! Show a saved project graph.

use std::path::PathBuf;

use aebridge_host_graph::{HostGraph, LayerSource, MemoryHost};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let mut host = MemoryHost::new();
    host.open_project(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let project = host.project();

    println!("Project: {}", path.display());
    println!("  Format version: {}", project.version);
    for (key, value) in &project.settings {
        println!("  {key}: {value:?}");
    }
    println!();

    println!("Compositions:");
    for comp in &project.compositions {
        let info = comp.info();
        println!(
            "  {} ({}x{} @ {}fps, frames {}-{})",
            comp.name,
            comp.width,
            comp.height,
            comp.frame_rate,
            info.display_start_frame(),
            info.end_frame()
        );
        for layer in &comp.layers {
            let source = match layer.source {
                LayerSource::Item { item } => format!("{item:?}"),
                LayerSource::Solid { .. } => "solid".to_string(),
            };
            println!(
                "    {:<28} {:<20} {:.3}s-{:.3}s{}",
                layer.name,
                source,
                layer.in_point,
                layer.out_point,
                if layer.time_remap_enabled { "  [remapped]" } else { "" }
            );
        }
    }
    println!();

    println!("Media:");
    for media in &project.media {
        println!(
            "  {} ({} frames) <- {}",
            media.name,
            media.frame_count,
            media.path.as_deref().unwrap_or("-")
        );
    }
    println!();

    println!("Render queue: {}", project.render_queue.len());
    println!("Render history:");
    if project.render_log.is_empty() {
        println!("  (none)");
    }
    for record in &project.render_log {
        println!(
            "  {} {} frames {}-{} -> {} (numbered from {})",
            record.rendered_at.format("%Y-%m-%d %H:%M:%S"),
            record.comp_name,
            record.first_frame,
            record.last_frame,
            record.output_file,
            record.numbering_start
        );
    }

    Ok(())
}
