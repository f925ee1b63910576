use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use synthmap_core::Synthmap;

pub fn add(app: &Synthmap, label: &str) -> Result<()> {
    let entity = app.add_entity(label)?;
    println!("Added entity #{}: {}", entity.id, entity.label);
    Ok(())
}

pub fn tag(app: &Synthmap, entity_id: i64, image_ids: &[i64]) -> Result<()> {
    for &image_id in image_ids {
        app.tag_image(entity_id, image_id)?;
    }
    println!("Tagged {} images with entity #{}", image_ids.len(), entity_id);
    Ok(())
}

pub fn images(app: &Synthmap, entity_id: i64) -> Result<()> {
    let ids = app.entity_images(entity_id)?;
    if ids.is_empty() {
        println!("Entity #{entity_id} has no tagged images.");
        return Ok(());
    }
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    println!("Entity #{entity_id}: {}", joined.join(", "));
    Ok(())
}

pub fn list(app: &Synthmap) -> Result<()> {
    let entities = app.entities()?;
    if entities.is_empty() {
        println!("No entities. Use `synthmap entities add <label>` to create one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("ID"), Cell::new("Label"), Cell::new("Tagged")]);
    for entity in &entities {
        let tagged = app.entity_images(entity.id)?.len();
        table.add_row(vec![
            Cell::new(entity.id),
            Cell::new(&entity.label),
            Cell::new(tagged),
        ]);
    }
    println!("{table}");
    Ok(())
}
