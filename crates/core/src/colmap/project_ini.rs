use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Only the head of a `project.ini` is inspected; the paths sit at the top.
const HEADER_LINES: usize = 10;

/// The two locations a COLMAP `project.ini` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub database_path: PathBuf,
    pub image_path: PathBuf,
}

impl ProjectPaths {
    /// Read `database_path` and `image_path` from a `project.ini`.
    /// Relative paths are resolved against the file's directory.
    pub fn read(ini_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(ini_path)?;
        let base = ini_path.parent().unwrap_or(Path::new("."));

        let mut database_path = None;
        let mut image_path = None;
        for line in content.lines().take(HEADER_LINES) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "database_path" => database_path = Some(base.join(value)),
                "image_path" => image_path = Some(base.join(value)),
                _ => {}
            }
        }

        match (database_path, image_path) {
            (Some(database_path), Some(image_path)) => Ok(Self {
                database_path,
                image_path,
            }),
            (None, _) => Err(invalid(ini_path, "missing database_path")),
            (_, None) => Err(invalid(ini_path, "missing image_path")),
        }
    }

    pub fn write(&self, ini_path: &Path) -> Result<()> {
        let content = format!(
            "database_path={}\nimage_path={}\n",
            self.database_path.display(),
            self.image_path.display()
        );
        fs::write(ini_path, content)?;
        Ok(())
    }
}

fn invalid(path: &Path, message: &str) -> Error {
    Error::ProjectFileInvalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
