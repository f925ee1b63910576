use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::{Error, Result};

/// Columns every source project store must expose, per table.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "cameras",
        &["camera_id", "model", "width", "height", "params", "prior_focal_length"],
    ),
    (
        "images",
        &[
            "image_id", "name", "camera_id", "prior_qw", "prior_qx", "prior_qy", "prior_qz",
            "prior_tx", "prior_ty", "prior_tz",
        ],
    ),
    ("keypoints", &["image_id", "rows", "cols", "data"]),
    ("descriptors", &["image_id", "rows", "cols", "data"]),
    ("matches", &["pair_id", "rows", "cols", "data"]),
    (
        "two_view_geometries",
        &["pair_id", "rows", "cols", "data", "config", "F", "E", "H"],
    ),
];

/// Create the tables of a vanilla COLMAP database.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cameras (
            camera_id          INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            model              INTEGER NOT NULL,
            width              INTEGER NOT NULL,
            height             INTEGER NOT NULL,
            params             BLOB,
            prior_focal_length INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS images (
            image_id   INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name       TEXT NOT NULL UNIQUE,
            camera_id  INTEGER NOT NULL,
            prior_qw   REAL,
            prior_qx   REAL,
            prior_qy   REAL,
            prior_qz   REAL,
            prior_tx   REAL,
            prior_ty   REAL,
            prior_tz   REAL,
            CONSTRAINT image_id_check CHECK(image_id >= 0 and image_id < 2147483647),
            FOREIGN KEY(camera_id) REFERENCES cameras(camera_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_name ON images(name);

        CREATE TABLE IF NOT EXISTS keypoints (
            image_id INTEGER PRIMARY KEY NOT NULL,
            rows     INTEGER NOT NULL,
            cols     INTEGER NOT NULL,
            data     BLOB,
            FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS descriptors (
            image_id INTEGER PRIMARY KEY NOT NULL,
            rows     INTEGER NOT NULL,
            cols     INTEGER NOT NULL,
            data     BLOB,
            FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS matches (
            pair_id INTEGER PRIMARY KEY NOT NULL,
            rows    INTEGER NOT NULL,
            cols    INTEGER NOT NULL,
            data    BLOB
        );

        CREATE TABLE IF NOT EXISTS two_view_geometries (
            pair_id INTEGER PRIMARY KEY NOT NULL,
            rows    INTEGER NOT NULL,
            cols    INTEGER NOT NULL,
            data    BLOB,
            config  INTEGER NOT NULL,
            F       BLOB,
            E       BLOB,
            H       BLOB
        );
        ",
    )?;
    Ok(())
}

/// Check that `conn` carries every table and column in [`REQUIRED_COLUMNS`].
pub fn verify(conn: &Connection, path: &Path) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    for (table, columns) in REQUIRED_COLUMNS {
        let present: Vec<String> = stmt
            .query_map(params![table], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if present.is_empty() {
            return Err(Error::SchemaMismatch {
                path: path.to_path_buf(),
                missing: format!("table {table}"),
            });
        }

        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| !present.iter().any(|p| p.eq_ignore_ascii_case(c)))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch {
                path: path.to_path_buf(),
                missing: format!("{table}.{}", missing.join(", ")),
            });
        }
    }
    Ok(())
}
