use std::path::Path;

use rusqlite::{ffi, params, Connection, DatabaseName, Transaction};

use crate::blob::{self, Matrix};
use crate::colmap::{schema, Geometry, ImageRecord, PairRecord};
use crate::error::Result;
use crate::pair;

/// Result of inserting one logical row group into the output store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A uniqueness constraint rejected the rows; nothing was written.
    SkippedDuplicate,
}

/// Builds a COLMAP database in memory, then copies it to disk in one step.
pub struct ProjectWriter {
    conn: Connection,
}

impl ProjectWriter {
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Insert the camera, image, keypoints and descriptors of one image
    /// atomically, using the ids already set on `record`.
    pub fn insert_image(&self, record: &ImageRecord) -> Result<InsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        match write_image_rows(&tx, record) {
            Ok(()) => {
                tx.commit()?;
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if is_constraint_violation(&e) => {
                tracing::debug!(image_id = record.image.image_id, error = %e, "image rows rejected");
                Ok(InsertOutcome::SkippedDuplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert the `matches` and `two_view_geometries` rows of one pair.
    ///
    /// When `id1 > id2` the correspondences are re-oriented so that column 0
    /// keeps referring to the lower image id, which is what the pair id implies.
    pub fn insert_pair(&self, record: &PairRecord) -> Result<InsertOutcome> {
        let pair_id = pair::encode_pair(record.id1, record.id2)?;
        let (matches, geometry) = if record.id1 > record.id2 {
            (swap_sides(&record.matches), invert_geometry(&record.geometry, pair_id))
        } else {
            (record.matches.clone(), record.geometry.clone())
        };

        let tx = self.conn.unchecked_transaction()?;
        match write_pair_rows(&tx, pair_id, &matches, &geometry) {
            Ok(()) => {
                tx.commit()?;
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if is_constraint_violation(&e) => {
                tracing::debug!(pair_id, error = %e, "pair rows rejected");
                Ok(InsertOutcome::SkippedDuplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy the store to `path` with SQLite's online backup.
    pub fn persist(&self, path: &Path) -> Result<()> {
        self.conn.backup(DatabaseName::Main, path, None)?;
        Ok(())
    }
}

fn write_image_rows(tx: &Transaction<'_>, record: &ImageRecord) -> rusqlite::Result<()> {
    let camera = &record.camera;
    let params_blob = camera.params.as_deref().map(bytemuck::cast_slice::<f64, u8>);
    tx.execute(
        "INSERT INTO cameras (camera_id, model, width, height, params, prior_focal_length)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            camera.camera_id,
            camera.model,
            camera.width,
            camera.height,
            params_blob,
            camera.prior_focal_length
        ],
    )?;

    let image = &record.image;
    let prior = &image.prior;
    tx.execute(
        "INSERT INTO images (image_id, name, camera_id, prior_qw, prior_qx, prior_qy, prior_qz,
                             prior_tx, prior_ty, prior_tz)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            image.image_id,
            image.name,
            image.camera_id,
            prior.qw,
            prior.qx,
            prior.qy,
            prior.qz,
            prior.tx,
            prior.ty,
            prior.tz
        ],
    )?;

    tx.execute(
        "INSERT INTO keypoints (image_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
        params![
            image.image_id,
            record.keypoints.rows() as i64,
            record.keypoints.cols() as i64,
            blob::encode_nullable(&record.keypoints)
        ],
    )?;
    tx.execute(
        "INSERT INTO descriptors (image_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
        params![
            image.image_id,
            record.descriptors.rows() as i64,
            record.descriptors.cols() as i64,
            blob::encode_nullable(&record.descriptors)
        ],
    )?;
    Ok(())
}

fn write_pair_rows(
    tx: &Transaction<'_>,
    pair_id: i64,
    matches: &Matrix<u32>,
    geometry: &Geometry,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO matches (pair_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
        params![
            pair_id,
            matches.rows() as i64,
            matches.cols() as i64,
            blob::encode_nullable(matches)
        ],
    )?;
    tx.execute(
        "INSERT INTO two_view_geometries (pair_id, rows, cols, data, config, F, E, H)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            pair_id,
            geometry.inliers.rows() as i64,
            geometry.inliers.cols() as i64,
            blob::encode_nullable(&geometry.inliers),
            geometry.config,
            geometry.f.as_ref().map(blob::encode),
            geometry.e.as_ref().map(blob::encode),
            geometry.h.as_ref().map(blob::encode),
        ],
    )?;
    Ok(())
}

/// Only uniqueness failures count as duplicates. CHECK, NOT NULL and
/// foreign key failures propagate.
fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Swap the two index columns of an `N x 2` correspondence matrix.
fn swap_sides(m: &Matrix<u32>) -> Matrix<u32> {
    let mut swapped = m.clone();
    if swapped.cols() == 2 {
        swapped.swap_columns(0, 1);
    }
    swapped
}

/// Express a two-view geometry from the other image's point of view:
/// F and E are transposed, H is inverted.
fn invert_geometry(geometry: &Geometry, pair_id: i64) -> Geometry {
    let h = geometry.h.as_ref().map(|h| match invert_3x3(h) {
        Some(inv) => inv,
        None => {
            tracing::warn!(pair_id, "singular homography, stored unchanged");
            h.clone()
        }
    });
    Geometry {
        inliers: swap_sides(&geometry.inliers),
        config: geometry.config,
        f: geometry.f.as_ref().map(Matrix::transpose),
        e: geometry.e.as_ref().map(Matrix::transpose),
        h,
    }
}

fn invert_3x3(m: &Matrix<f64>) -> Option<Matrix<f64>> {
    let a = |r: usize, c: usize| m.get(r, c);
    let cof = [
        a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1),
        a(1, 2) * a(2, 0) - a(1, 0) * a(2, 2),
        a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0),
    ];
    let det = a(0, 0) * cof[0] + a(0, 1) * cof[1] + a(0, 2) * cof[2];
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv = vec![
        cof[0] / det,
        (a(0, 2) * a(2, 1) - a(0, 1) * a(2, 2)) / det,
        (a(0, 1) * a(1, 2) - a(0, 2) * a(1, 1)) / det,
        cof[1] / det,
        (a(0, 0) * a(2, 2) - a(0, 2) * a(2, 0)) / det,
        (a(0, 2) * a(1, 0) - a(0, 0) * a(1, 2)) / det,
        cof[2] / det,
        (a(0, 1) * a(2, 0) - a(0, 0) * a(2, 1)) / det,
        (a(0, 0) * a(1, 1) - a(0, 1) * a(1, 0)) / det,
    ];
    Matrix::new(3, 3, inv).ok()
}
