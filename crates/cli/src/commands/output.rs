use std::path::PathBuf;

use anyhow::{Context, Result};
use synthmap_core::Synthmap;

pub fn set(app: &Synthmap, path: PathBuf) -> Result<()> {
    app.set_output_root(&path)?;
    let resolved = app
        .get_output_root()?
        .context("output root was not stored")?;
    println!("Output root set to: {}", resolved.display());
    Ok(())
}

pub fn show(app: &Synthmap) -> Result<()> {
    match app.get_output_root()? {
        Some(path) => println!("Output root: {}", path.display()),
        None => println!("No output root configured. Use `synthmap output set <path>` to set one."),
    }
    Ok(())
}
