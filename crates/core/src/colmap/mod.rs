pub mod project_ini;
pub mod schema;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::blob::{self, Matrix};
use crate::error::{Error, Result};
use crate::pair;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub camera_id: i64,
    pub model: i64,
    pub width: i64,
    pub height: i64,
    /// `None` when the stored params blob is NULL.
    pub params: Option<Vec<f64>>,
    pub prior_focal_length: i64,
}

/// Optional pose prior stored alongside an image. Every component is nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PosePrior {
    pub qw: Option<f64>,
    pub qx: Option<f64>,
    pub qy: Option<f64>,
    pub qz: Option<f64>,
    pub tx: Option<f64>,
    pub ty: Option<f64>,
    pub tz: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub image_id: i64,
    pub name: String,
    pub camera_id: i64,
    pub prior: PosePrior,
}

/// Everything a merged store needs for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image: Image,
    pub camera: Camera,
    pub keypoints: Matrix<f32>,
    pub descriptors: Matrix<u8>,
}

/// Images of one project, keyed by project-local image id.
#[derive(Debug, Clone, Default)]
pub struct ImageSetData {
    pub images: BTreeMap<i64, ImageRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub inliers: Matrix<u32>,
    pub config: i64,
    pub f: Option<Matrix<f64>>,
    pub e: Option<Matrix<f64>>,
    pub h: Option<Matrix<f64>>,
}

/// One `matches` row joined with its `two_view_geometries` row.
/// `id1 < id2` always holds, as decoded from the pair id.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub id1: i64,
    pub id2: i64,
    pub matches: Matrix<u32>,
    pub geometry: Geometry,
}

/// Read-only handle on one COLMAP project database.
pub struct ProjectStore {
    conn: Connection,
    path: PathBuf,
}

impl ProjectStore {
    /// Open a project store read-only and check it has the expected layout.
    /// Returns [`Error::SchemaMismatch`] when tables or columns are missing.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ProjectStoreNotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        schema::verify(&conn, path)?;
        tracing::debug!(path = %path.display(), "opened project store");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// All `(image_id, name)` rows, ordered by id.
    pub fn list_images(&self) -> Result<Vec<(i64, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT image_id, name FROM images ORDER BY image_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Load image, camera, keypoints and descriptors for each requested id.
    /// Images missing any of those rows are left out.
    pub fn read_images(&self, image_ids: &BTreeSet<i64>) -> Result<ImageSetData> {
        let mut data = ImageSetData::default();
        for &image_id in image_ids {
            match self.read_image(image_id)? {
                Some(record) => {
                    data.images.insert(image_id, record);
                }
                None => tracing::warn!(
                    project = %self.path.display(),
                    image_id,
                    "image lacks camera, keypoint or descriptor data, ignoring"
                ),
            }
        }
        Ok(data)
    }

    fn read_image(&self, image_id: i64) -> Result<Option<ImageRecord>> {
        let image = self
            .conn
            .prepare_cached(
                "SELECT image_id, name, camera_id, prior_qw, prior_qx, prior_qy, prior_qz,
                        prior_tx, prior_ty, prior_tz
                 FROM images WHERE image_id = ?1",
            )?
            .query_row(params![image_id], |row| {
                Ok(Image {
                    image_id: row.get(0)?,
                    name: row.get(1)?,
                    camera_id: row.get(2)?,
                    prior: PosePrior {
                        qw: row.get(3)?,
                        qx: row.get(4)?,
                        qy: row.get(5)?,
                        qz: row.get(6)?,
                        tx: row.get(7)?,
                        ty: row.get(8)?,
                        tz: row.get(9)?,
                    },
                })
            })
            .optional()?;
        let Some(image) = image else {
            return Ok(None);
        };

        let camera = self
            .conn
            .prepare_cached(
                "SELECT camera_id, model, width, height, params, prior_focal_length
                 FROM cameras WHERE camera_id = ?1",
            )?
            .query_row(params![image.camera_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .optional()?;
        let Some((camera_id, model, width, height, params_blob, prior_focal_length)) = camera
        else {
            return Ok(None);
        };
        let camera = Camera {
            camera_id,
            model,
            width,
            height,
            params: params_blob.as_deref().map(decode_params).transpose()?,
            prior_focal_length,
        };

        let Some(keypoints) = self.read_feature_blob::<f32>("keypoints", image_id)? else {
            return Ok(None);
        };
        let Some(descriptors) = self.read_feature_blob::<u8>("descriptors", image_id)? else {
            return Ok(None);
        };

        Ok(Some(ImageRecord {
            image,
            camera,
            keypoints,
            descriptors,
        }))
    }

    fn read_feature_blob<T: blob::Element>(
        &self,
        table: &str,
        image_id: i64,
    ) -> Result<Option<Matrix<T>>> {
        let row = self
            .conn
            .prepare_cached(&format!(
                "SELECT rows, cols, data FROM {table} WHERE image_id = ?1"
            ))?
            .query_row(params![image_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<Vec<u8>>>(2)?,
                ))
            })
            .optional()?;
        match row {
            Some((rows, cols, data)) => {
                Ok(Some(blob::decode_nullable(data.as_deref(), rows, cols)?))
            }
            None => Ok(None),
        }
    }

    /// Every pair present in both `matches` and `two_view_geometries` whose
    /// endpoints both belong to `image_ids`.
    pub fn read_pairs(&self, image_ids: &BTreeSet<i64>) -> Result<Vec<PairRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.pair_id, m.rows, m.cols, m.data,
                    g.rows, g.cols, g.data, g.config, g.F, g.E, g.H
             FROM matches m
             INNER JOIN two_view_geometries g ON m.pair_id = g.pair_id
             ORDER BY m.pair_id",
        )?;
        let mut rows = stmt.query([])?;

        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            let (id1, id2) = pair::decode_pair(row.get(0)?);
            if !image_ids.contains(&id1) || !image_ids.contains(&id2) {
                continue;
            }

            let matches = blob::decode_nullable::<u32>(
                row.get::<_, Option<Vec<u8>>>(3)?.as_deref(),
                row.get(1)?,
                row.get(2)?,
            )?;
            let inliers = blob::decode_nullable::<u32>(
                row.get::<_, Option<Vec<u8>>>(6)?.as_deref(),
                row.get(4)?,
                row.get(5)?,
            )?;
            let geometry = Geometry {
                inliers,
                config: row.get(7)?,
                f: decode_geometry_matrix(row.get(8)?)?,
                e: decode_geometry_matrix(row.get(9)?)?,
                h: decode_geometry_matrix(row.get(10)?)?,
            };

            pairs.push(PairRecord {
                id1,
                id2,
                matches,
                geometry,
            });
        }
        Ok(pairs)
    }

    /// Ids of every image sharing a `matches` row with `image_id`.
    pub fn matched_image_ids(&self, image_id: i64) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare_cached("SELECT pair_id FROM matches")?;
        let mut rows = stmt.query([])?;

        let mut matched = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let (id1, id2) = pair::decode_pair(row.get(0)?);
            if id1 == image_id {
                matched.insert(id2);
            } else if id2 == image_id {
                matched.insert(id1);
            }
        }
        Ok(matched)
    }
}

fn decode_params(bytes: &[u8]) -> Result<Vec<f64>> {
    let count = bytes.len() / std::mem::size_of::<f64>();
    Ok(blob::decode::<f64>(bytes, count as i64, 1)?.into_vec())
}

/// F, E and H are 3x3 float64 blobs. NULL or empty means "not estimated".
fn decode_geometry_matrix(bytes: Option<Vec<u8>>) -> Result<Option<Matrix<f64>>> {
    match bytes {
        Some(b) if !b.is_empty() => Ok(Some(blob::decode(&b, 3, 3)?)),
        _ => Ok(None),
    }
}
