pub mod blob;
pub mod catalog;
pub mod colmap;
pub mod domain;
pub mod error;
pub mod hasher;
pub mod merge;
pub mod pair;

#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};

use catalog::Catalog;
use colmap::project_ini::ProjectPaths;
use domain::*;
use error::{Error, Result};

pub use merge::{synthesize_entity_project, MergeReport, SynthProgress};

const OUTPUT_ROOT_KEY: &str = "output_root";

/// The main entry point for the synthmap library.
pub struct Synthmap {
    catalog: Catalog,
}

impl Synthmap {
    /// Open or create a catalog at the given path.
    pub fn open(catalog_path: &Path) -> Result<Self> {
        let catalog = Catalog::open(catalog_path)?;
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Register a project by its store and image directory.
    pub fn add_project(&self, label: &str, db_path: &Path, image_path: &Path) -> Result<Project> {
        self.catalog.add_project(label, db_path, image_path)
    }

    /// Register a project from its `project.ini`.
    pub fn add_project_file(&self, label: &str, ini_path: &Path) -> Result<Project> {
        let paths = ProjectPaths::read(ini_path)?;
        self.catalog
            .add_project(label, &paths.database_path, &paths.image_path)
    }

    pub fn remove_project(&self, project_id: i64) -> Result<(Project, usize)> {
        self.catalog.remove_project(project_id)
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.catalog.list_projects()
    }

    /// Hash a project's image files and link them to global images.
    pub fn register_project_images(&mut self, project_id: i64) -> Result<RegisterSummary> {
        self.catalog.register_project_images(project_id)
    }

    pub fn add_entity(&self, label: &str) -> Result<Entity> {
        self.catalog.add_entity(label)
    }

    pub fn entities(&self) -> Result<Vec<Entity>> {
        self.catalog.list_entities()
    }

    pub fn tag_image(&self, entity_id: i64, image_id: i64) -> Result<()> {
        self.catalog.tag_image(entity_id, image_id)
    }

    pub fn entity_images(&self, entity_id: i64) -> Result<Vec<i64>> {
        self.catalog.entity_images(entity_id)
    }

    pub fn status(&self) -> Result<CatalogStats> {
        self.catalog.stats()
    }

    /// Set the default directory synthesized projects are written under.
    pub fn set_output_root(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        let canonical = path.canonicalize()?;
        self.catalog
            .set_config(OUTPUT_ROOT_KEY, &canonical.to_string_lossy())
    }

    pub fn get_output_root(&self) -> Result<Option<PathBuf>> {
        Ok(self.catalog.get_config(OUTPUT_ROOT_KEY)?.map(PathBuf::from))
    }

    /// Merge every project related to an entity into
    /// `<output_root>/<entity_id>/main.db`. Without an explicit root the
    /// configured one is used.
    pub fn synthesize_entity_project(
        &self,
        entity_id: i64,
        output_root: Option<&Path>,
        progress_cb: Option<&mut dyn FnMut(SynthProgress)>,
    ) -> Result<MergeReport> {
        let output_root = match output_root {
            Some(root) => root.to_path_buf(),
            None => self.get_output_root()?.ok_or(Error::OutputRootNotSet)?,
        };
        merge::synthesize_entity_project(&self.catalog, entity_id, &output_root, progress_cb)
    }
}
