use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered COLMAP project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub label: String,
    pub db_path: PathBuf,
    pub image_path: PathBuf,
    pub created: DateTime<Utc>,
}

/// A real-world place or object that images can be tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub label: String,
}

/// Outcome of registering a project's images in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterSummary {
    /// Images newly linked to the project.
    pub registered: usize,
    /// Images already linked by an earlier registration.
    pub already_registered: usize,
    /// Images whose file could not be read.
    pub unreadable: usize,
    /// Images whose content is already linked to the project under another id.
    pub duplicate_content: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_projects: usize,
    pub total_images: usize,
    pub total_entities: usize,
    pub tagged_images: usize,
}
