use std::path::Path;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use synthmap_core::Synthmap;

pub fn run(app: &Synthmap) -> Result<()> {
    let stats = app.status()?;
    let projects = app.projects()?;
    let output_display = match app.get_output_root()? {
        Some(p) => p.display().to_string(),
        None => "not configured".to_string(),
    };

    println!();
    println!("  Synthmap Status");
    println!("  ===============");
    println!();
    println!(
        "   Projects:   {:>8}        Entities:    {:>8}",
        stats.total_projects, stats.total_entities
    );
    println!(
        "   Images:     {:>8}        Tagged:      {:>8}",
        stats.total_images, stats.tagged_images
    );
    println!("   Output:     {output_display}");

    if projects.is_empty() {
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Label"),
        Cell::new("Images"),
        Cell::new("Image Dir"),
    ]);
    for project in &projects {
        let linked = app.catalog().project_image_ids(project.id)?.len();
        table.add_row(vec![
            Cell::new(project.id),
            Cell::new(&project.label),
            Cell::new(linked),
            Cell::new(path_display_name(&project.image_path)),
        ]);
    }

    println!();
    println!("  Projects");
    println!("  --------");
    println!("{table}");
    println!();
    Ok(())
}

/// Last two components of a path, enough to tell project folders apart.
pub(crate) fn path_display_name(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    match parts.len() {
        0 => path.display().to_string(),
        1 => parts[0].clone(),
        n => format!("{}/{}", parts[n - 2], parts[n - 1]),
    }
}
