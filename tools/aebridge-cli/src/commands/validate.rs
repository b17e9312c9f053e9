//! Validate a desired-state config.

use std::path::{Path, PathBuf};

use aebridge_config_model::DesiredState;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating config at: {}", path.display());

    let state =
        DesiredState::load(&path).map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;

    println!("  Composition: {} ({}x{})", state.comp_name, state.width, state.height);
    println!(
        "  Frames: {}-{} ({} frames, {:.3}s @ {}fps)",
        state.global_first,
        state.global_last,
        state.frame_count(),
        state.duration_secs(),
        state.frame_rate
    );
    println!("  Project: {}", state.project_path);
    match (&state.output_path, state.should_render) {
        (Some(output), true) => println!("  Render: {output}"),
        _ => println!("  Render: no"),
    }
    println!(
        "  Color: {} ({:?})",
        state.color.normalized_colorspace(),
        state.color.family()
    );
    println!("  Items: {}", state.items.len());

    let mut missing = Vec::new();
    for item in &state.items {
        let timing = state.timing_for(item);
        let source = item.source_path();
        println!(
            "    {:<24} {}-{}  start {:.3}s  length {:.3}s",
            item.name,
            item.first,
            item.last,
            timing.start,
            timing.duration
        );
        if !Path::new(&source).exists() {
            missing.push((item.name.as_str(), source));
        }
    }

    if missing.is_empty() {
        println!("\nConfig is valid.");
    } else {
        println!("\nMissing footage (these items will get placeholders):");
        for (name, source) in &missing {
            println!("  - {name}: {source}");
        }
        println!("\nConfig is valid; {} item(s) have no footage on disk.", missing.len());
    }
    Ok(())
}
