use rusqlite::Connection;

use crate::error::Result;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            label       TEXT NOT NULL,
            db_path     TEXT NOT NULL UNIQUE,
            image_path  TEXT NOT NULL,
            created     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS images (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sha256      TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS project_images (
            image_id         INTEGER NOT NULL REFERENCES images(id),
            project_id       INTEGER NOT NULL REFERENCES projects(id),
            project_image_id INTEGER NOT NULL,
            file_path        TEXT NOT NULL,
            UNIQUE (image_id, project_id),
            UNIQUE (project_id, project_image_id)
        );

        CREATE INDEX IF NOT EXISTS idx_project_images_image ON project_images(image_id);

        CREATE TABLE IF NOT EXISTS entities (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            label       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS image_entities (
            image_id    INTEGER NOT NULL REFERENCES images(id),
            entity_id   INTEGER NOT NULL REFERENCES entities(id),
            PRIMARY KEY (image_id, entity_id)
        );

        CREATE INDEX IF NOT EXISTS idx_image_entities_entity ON image_entities(entity_id);

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
