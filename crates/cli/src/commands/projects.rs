use std::path::PathBuf;

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use synthmap_core::Synthmap;

use super::status::path_display_name;

pub fn add(
    app: &Synthmap,
    label: &str,
    project_file: Option<PathBuf>,
    db: Option<PathBuf>,
    images: Option<PathBuf>,
) -> Result<()> {
    let project = match (project_file, db, images) {
        (Some(ini), _, _) => app.add_project_file(label, &ini)?,
        (None, Some(db), Some(images)) => app.add_project(label, &db, &images)?,
        _ => bail!("pass a project.ini, or both --db and --images"),
    };
    println!(
        "Added project #{}: {} ({})",
        project.id,
        project.label,
        project.db_path.display()
    );
    println!("Run `synthmap projects register {}` to index its images.", project.id);
    Ok(())
}

pub fn register(app: &mut Synthmap, id: i64) -> Result<()> {
    let summary = app.register_project_images(id)?;
    println!(
        "Registered {} images ({} already known, {} unreadable, {} duplicate content)",
        summary.registered, summary.already_registered, summary.unreadable, summary.duplicate_content
    );
    Ok(())
}

pub fn rm(app: &Synthmap, id: i64) -> Result<()> {
    let (project, image_count) = app.remove_project(id)?;
    println!(
        "Removed project #{}: {} ({} image links removed)",
        project.id, project.label, image_count
    );
    Ok(())
}

pub fn list(app: &Synthmap) -> Result<()> {
    let projects = app.projects()?;
    if projects.is_empty() {
        println!("No projects registered. Use `synthmap projects add` to add one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Label"),
        Cell::new("Database"),
        Cell::new("Images"),
        Cell::new("Added"),
    ]);
    for project in &projects {
        table.add_row(vec![
            Cell::new(project.id),
            Cell::new(&project.label),
            Cell::new(project.db_path.display()),
            Cell::new(path_display_name(&project.image_path)),
            Cell::new(project.created.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{table}");
    Ok(())
}
