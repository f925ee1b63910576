pub mod schema;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::colmap::ProjectStore;
use crate::domain::*;
use crate::error::{Error, Result};
use crate::hasher;
use crate::merge::{ImageCatalog, ProjectLocation, RelatedImageRow};

/// SQLite-backed catalog of projects, global images and entities.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // ── Projects ─────────────────────────────────────────────────────

    pub fn add_project(&self, label: &str, db_path: &Path, image_path: &Path) -> Result<Project> {
        if !db_path.is_file() {
            return Err(Error::ProjectStoreNotFound(db_path.to_path_buf()));
        }
        let db_path = db_path.canonicalize()?;
        let image_path = image_path
            .canonicalize()
            .unwrap_or_else(|_| image_path.to_path_buf());

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM projects WHERE db_path = ?1",
                params![db_path.to_string_lossy()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::ProjectAlreadyExists(db_path));
        }

        let created = chrono::Utc::now();
        self.conn.execute(
            "INSERT INTO projects (label, db_path, image_path, created) VALUES (?1, ?2, ?3, ?4)",
            params![
                label,
                db_path.to_string_lossy(),
                image_path.to_string_lossy(),
                created.to_rfc3339()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, label, db = %db_path.display(), "registered project");
        Ok(Project {
            id,
            label: label.to_string(),
            db_path,
            image_path,
            created,
        })
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, db_path, image_path, created FROM projects ORDER BY id",
        )?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, project_id: i64) -> Result<Project> {
        self.conn
            .query_row(
                "SELECT id, label, db_path, image_path, created FROM projects WHERE id = ?1",
                params![project_id],
                project_from_row,
            )
            .optional()?
            .ok_or(Error::ProjectNotFound(project_id))
    }

    /// Remove a project and its image memberships. Global images stay.
    pub fn remove_project(&self, project_id: i64) -> Result<(Project, usize)> {
        let project = self.get_project(project_id)?;
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM project_images WHERE project_id = ?1",
            params![project_id],
        )?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
        tx.commit()?;
        Ok((project, removed))
    }

    /// Link every image of a project's store to a global image, keyed by the
    /// SHA-256 of the image file. Files are hashed in parallel; rows are
    /// written in one transaction. Images registered earlier are left alone.
    pub fn register_project_images(&mut self, project_id: i64) -> Result<RegisterSummary> {
        let project = self.get_project(project_id)?;
        let store = ProjectStore::open(&project.db_path)?;

        let known: BTreeSet<i64> = self
            .project_image_ids(project_id)?
            .into_iter()
            .map(|(_, local)| local)
            .collect();
        let mut summary = RegisterSummary::default();

        let pending: Vec<(i64, PathBuf)> = store
            .list_images()?
            .into_iter()
            .filter(|(local, _)| {
                let seen = known.contains(local);
                if seen {
                    summary.already_registered += 1;
                }
                !seen
            })
            .map(|(local, name)| (local, project.image_path.join(name)))
            .collect();

        let paths: Vec<PathBuf> = pending.iter().map(|(_, p)| p.clone()).collect();
        let digests = hasher::digest_all(&paths);

        let tx = self.conn.transaction()?;
        for ((local, path), digest) in pending.iter().zip(digests) {
            let sha256 = match digest {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read image, skipping");
                    summary.unreadable += 1;
                    continue;
                }
            };

            tx.execute(
                "INSERT OR IGNORE INTO images (sha256) VALUES (?1)",
                params![sha256],
            )?;
            let image_id: i64 = tx.query_row(
                "SELECT id FROM images WHERE sha256 = ?1",
                params![sha256],
                |row| row.get(0),
            )?;
            let linked = tx.execute(
                "INSERT OR IGNORE INTO project_images (image_id, project_id, project_image_id, file_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![image_id, project_id, local, path.to_string_lossy()],
            )?;
            if linked == 0 {
                tracing::warn!(
                    project_id,
                    local,
                    image_id,
                    "same image content appears twice in one project, keeping the first"
                );
                summary.duplicate_content += 1;
            } else {
                summary.registered += 1;
            }
        }
        tx.commit()?;

        tracing::info!(
            project_id,
            registered = summary.registered,
            unreadable = summary.unreadable,
            "registered project images"
        );
        Ok(summary)
    }

    /// `(global id, local id)` for every image linked to a project.
    pub fn project_image_ids(&self, project_id: i64) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT image_id, project_image_id FROM project_images
             WHERE project_id = ?1 ORDER BY project_image_id",
        )?;
        let ids = stmt
            .query_map(params![project_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ── Entities ─────────────────────────────────────────────────────

    pub fn add_entity(&self, label: &str) -> Result<Entity> {
        self.conn
            .execute("INSERT INTO entities (label) VALUES (?1)", params![label])?;
        Ok(Entity {
            id: self.conn.last_insert_rowid(),
            label: label.to_string(),
        })
    }

    pub fn get_entity(&self, entity_id: i64) -> Result<Entity> {
        self.conn
            .query_row(
                "SELECT id, label FROM entities WHERE id = ?1",
                params![entity_id],
                |row| {
                    Ok(Entity {
                        id: row.get(0)?,
                        label: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::EntityNotFound(entity_id))
    }

    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, label FROM entities ORDER BY id")?;
        let entities = stmt
            .query_map([], |row| {
                Ok(Entity {
                    id: row.get(0)?,
                    label: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Associate a global image with an entity. Tagging twice is a no-op.
    pub fn tag_image(&self, entity_id: i64, image_id: i64) -> Result<()> {
        self.get_entity(entity_id)?;
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM images WHERE id = ?1",
                params![image_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::ImageNotFound(image_id));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO image_entities (image_id, entity_id) VALUES (?1, ?2)",
            params![image_id, entity_id],
        )?;
        Ok(())
    }

    /// Global ids of the images tagged with an entity.
    pub fn entity_images(&self, entity_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT image_id FROM image_entities WHERE entity_id = ?1 ORDER BY image_id",
        )?;
        let ids = stmt
            .query_map(params![entity_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Tagged images plus every image one match away from them inside each
    /// project they belong to, as one row per project occurrence.
    pub fn related_images(&self, entity_id: i64) -> Result<Vec<RelatedImageRow>> {
        self.get_entity(entity_id)?;
        let tagged = self.entity_images(entity_id)?;
        if tagged.is_empty() {
            return Err(Error::NoRelatedImages(entity_id));
        }

        let mut related: BTreeSet<i64> = tagged.iter().copied().collect();
        let mut stores: HashMap<i64, Option<ProjectStore>> = HashMap::new();

        for &image_id in &tagged {
            for (project_id, local_id) in self.image_occurrences(image_id)? {
                if !stores.contains_key(&project_id) {
                    let project = self.get_project(project_id)?;
                    let store = match ProjectStore::open(&project.db_path) {
                        Ok(store) => Some(store),
                        Err(e @ (Error::SchemaMismatch { .. } | Error::ProjectStoreNotFound(_))) => {
                            tracing::warn!(project_id, error = %e, "cannot expand matches from project");
                            None
                        }
                        Err(e) => return Err(e),
                    };
                    stores.insert(project_id, store);
                }
                let Some(Some(store)) = stores.get(&project_id) else {
                    continue;
                };

                let matched = store.matched_image_ids(local_id)?;
                for other_local in matched {
                    if let Some(global) = self.global_image_id(project_id, other_local)? {
                        related.insert(global);
                    }
                }
            }
            tracing::debug!(image_id, related = related.len(), "expanded related images");
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT image_id, project_id, project_image_id, file_path
             FROM project_images WHERE image_id = ?1",
        )?;
        let mut rows = Vec::new();
        for image_id in related {
            let found = stmt
                .query_map(params![image_id], |row| {
                    Ok(RelatedImageRow {
                        global_image_id: row.get(0)?,
                        project_id: row.get(1)?,
                        project_image_id: row.get(2)?,
                        file_path: PathBuf::from(row.get::<_, String>(3)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.extend(found);
        }
        rows.sort_by_key(|r| (r.project_id, r.global_image_id));
        Ok(rows)
    }

    fn image_occurrences(&self, image_id: i64) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT project_id, project_image_id FROM project_images
             WHERE image_id = ?1 ORDER BY project_id",
        )?;
        let occurrences = stmt
            .query_map(params![image_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(occurrences)
    }

    fn global_image_id(&self, project_id: i64, local_id: i64) -> Result<Option<i64>> {
        let id = self
            .conn
            .prepare_cached(
                "SELECT image_id FROM project_images
                 WHERE project_id = ?1 AND project_image_id = ?2",
            )?
            .query_row(params![project_id, local_id], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    // ── Stats ────────────────────────────────────────────────────────

    pub fn stats(&self) -> Result<CatalogStats> {
        let (projects, images, entities, tagged): (i64, i64, i64, i64) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM projects),
                (SELECT COUNT(*) FROM images),
                (SELECT COUNT(*) FROM entities),
                (SELECT COUNT(DISTINCT image_id) FROM image_entities)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(CatalogStats {
            total_projects: projects as usize,
            total_images: images as usize,
            total_entities: entities as usize,
            tagged_images: tagged as usize,
        })
    }

    // ── Config ───────────────────────────────────────────────────────

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl ImageCatalog for Catalog {
    fn related_images(&self, entity_id: i64) -> Result<Vec<RelatedImageRow>> {
        Catalog::related_images(self, entity_id)
    }

    fn project_location(&self, project_id: i64) -> Result<ProjectLocation> {
        let project = self.get_project(project_id)?;
        Ok(ProjectLocation {
            store_path: project.db_path,
            image_root: project.image_path,
        })
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let created: String = row.get(4)?;
    let created = chrono::DateTime::parse_from_rfc3339(&created)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Project {
        id: row.get(0)?,
        label: row.get(1)?,
        db_path: PathBuf::from(row.get::<_, String>(2)?),
        image_path: PathBuf::from(row.get::<_, String>(3)?),
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::writer::ProjectWriter;
    use crate::test_support::{image_record, pair_record};
    use std::fs;

    /// A project whose store holds images `names` (ids 1..) matched in a chain
    /// 1-2, 2-3, ... and whose image files contain `contents`.
    fn make_project(dir: &Path, names: &[&str], contents: &[&[u8]]) -> (PathBuf, PathBuf) {
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        let writer = ProjectWriter::in_memory().unwrap();
        for (i, (name, content)) in names.iter().zip(contents).enumerate() {
            let id = i as i64 + 1;
            writer.insert_image(&image_record(id, name, id as u8)).unwrap();
            fs::write(images.join(name), content).unwrap();
            if id > 1 {
                writer.insert_pair(&pair_record(id - 1, id, 2)).unwrap();
            }
        }
        let db = dir.join("database.db");
        writer.persist(&db).unwrap();
        (db, images)
    }

    fn global_id(catalog: &Catalog, project_id: i64, local: i64) -> i64 {
        catalog.global_image_id(project_id, local).unwrap().unwrap()
    }

    // ── Project tests ────────────────────────────────────────────

    #[test]
    fn test_add_and_list_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg"], &[b"a"]);
        let catalog = Catalog::open(&tmp.path().join("catalog.db")).unwrap();

        let project = catalog.add_project("north", &db, &images).unwrap();
        assert_eq!(project.db_path, db.canonicalize().unwrap());

        let listed = catalog.list_projects().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "north");
        assert_eq!(listed[0].created.timestamp(), project.created.timestamp());
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg"], &[b"a"]);
        let catalog = Catalog::open_in_memory().unwrap();

        catalog.add_project("one", &db, &images).unwrap();
        let err = catalog.add_project("two", &db, &images).unwrap_err();
        assert!(matches!(err, Error::ProjectAlreadyExists(_)));
    }

    #[test]
    fn test_add_project_missing_store() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog
            .add_project("x", Path::new("/nonexistent/db.db"), Path::new("/nonexistent"))
            .unwrap_err();
        assert!(matches!(err, Error::ProjectStoreNotFound(_)));
    }

    #[test]
    fn test_get_project_not_found() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(matches!(
            catalog.get_project(42).unwrap_err(),
            Error::ProjectNotFound(42)
        ));
    }

    #[test]
    fn test_remove_project_keeps_global_images() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg", "b.jpg"], &[b"a", b"b"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();
        catalog.register_project_images(project.id).unwrap();

        let (removed, links) = catalog.remove_project(project.id).unwrap();
        assert_eq!(removed.id, project.id);
        assert_eq!(links, 2);
        let stats = catalog.stats().unwrap();
        assert_eq!(stats.total_projects, 0);
        assert_eq!(stats.total_images, 2);
    }

    #[test]
    fn test_remove_project_is_atomic() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg", "b.jpg"], &[b"a", b"b"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();
        catalog.register_project_images(project.id).unwrap();

        // Fail the second delete; the first must be rolled back with it
        catalog
            .conn
            .execute_batch(
                "CREATE TRIGGER keep_projects BEFORE DELETE ON projects
                 BEGIN SELECT RAISE(ABORT, 'projects are locked'); END;",
            )
            .unwrap();
        assert!(catalog.remove_project(project.id).is_err());

        assert_eq!(catalog.project_image_ids(project.id).unwrap().len(), 2);
        assert_eq!(catalog.get_project(project.id).unwrap().id, project.id);
    }

    // ── Registration ─────────────────────────────────────────────

    #[test]
    fn test_register_assigns_global_ids_by_content() {
        let tmp = tempfile::tempdir().unwrap();
        let (db_a, img_a) = make_project(&tmp.path().join("a"), &["x.jpg", "y.jpg"], &[b"X", b"Y"]);
        let (db_b, img_b) = make_project(&tmp.path().join("b"), &["y2.jpg", "z.jpg"], &[b"Y", b"Z"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let a = catalog.add_project("a", &db_a, &img_a).unwrap();
        let b = catalog.add_project("b", &db_b, &img_b).unwrap();

        let summary = catalog.register_project_images(a.id).unwrap();
        assert_eq!(summary.registered, 2);
        catalog.register_project_images(b.id).unwrap();

        // "Y" is local #2 in a and local #1 in b
        assert_eq!(global_id(&catalog, a.id, 2), global_id(&catalog, b.id, 1));
        assert_ne!(global_id(&catalog, a.id, 1), global_id(&catalog, b.id, 2));
        assert_eq!(catalog.stats().unwrap().total_images, 3);
    }

    #[test]
    fn test_register_is_incremental() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg", "b.jpg"], &[b"a", b"b"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();

        catalog.register_project_images(project.id).unwrap();
        let again = catalog.register_project_images(project.id).unwrap();
        assert_eq!(again.registered, 0);
        assert_eq!(again.already_registered, 2);
    }

    #[test]
    fn test_register_counts_unreadable_files() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg", "b.jpg"], &[b"a", b"b"]);
        fs::remove_file(images.join("b.jpg")).unwrap();
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();

        let summary = catalog.register_project_images(project.id).unwrap();
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.unreadable, 1);
    }

    #[test]
    fn test_register_same_content_twice_in_project() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg", "copy.jpg"], &[b"same", b"same"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();

        let summary = catalog.register_project_images(project.id).unwrap();
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.duplicate_content, 1);
    }

    // ── Entities ─────────────────────────────────────────────────

    #[test]
    fn test_tag_image_requires_existing_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg"], &[b"a"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();
        catalog.register_project_images(project.id).unwrap();
        let image = global_id(&catalog, project.id, 1);

        assert!(matches!(
            catalog.tag_image(9, image).unwrap_err(),
            Error::EntityNotFound(9)
        ));
        let entity = catalog.add_entity("bridge").unwrap();
        assert!(matches!(
            catalog.tag_image(entity.id, 999).unwrap_err(),
            Error::ImageNotFound(999)
        ));

        catalog.tag_image(entity.id, image).unwrap();
        catalog.tag_image(entity.id, image).unwrap();
        assert_eq!(catalog.entity_images(entity.id).unwrap(), vec![image]);
        assert_eq!(catalog.list_entities().unwrap(), vec![entity]);
    }

    // ── Related images ───────────────────────────────────────────

    #[test]
    fn test_related_images_one_hop_only() {
        let tmp = tempfile::tempdir().unwrap();
        // chain 1-2-3-4: tagging image 1 reaches 2, not 3 or 4
        let (db, images) = make_project(
            tmp.path(),
            &["1.jpg", "2.jpg", "3.jpg", "4.jpg"],
            &[b"1", b"2", b"3", b"4"],
        );
        let mut catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();
        catalog.register_project_images(project.id).unwrap();
        let entity = catalog.add_entity("e").unwrap();
        catalog
            .tag_image(entity.id, global_id(&catalog, project.id, 1))
            .unwrap();

        let related = catalog.related_images(entity.id).unwrap();
        let locals: Vec<i64> = related.iter().map(|r| r.project_image_id).collect();
        assert_eq!(locals, vec![1, 2]);
        assert_eq!(related[1].file_path, images.canonicalize().unwrap().join("2.jpg"));
    }

    #[test]
    fn test_related_images_span_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let (db_a, img_a) = make_project(&tmp.path().join("a"), &["x.jpg", "y.jpg"], &[b"X", b"Y"]);
        let (db_b, img_b) = make_project(&tmp.path().join("b"), &["x.jpg", "w.jpg"], &[b"X", b"W"]);
        let mut catalog = Catalog::open_in_memory().unwrap();
        let a = catalog.add_project("a", &db_a, &img_a).unwrap();
        let b = catalog.add_project("b", &db_b, &img_b).unwrap();
        catalog.register_project_images(a.id).unwrap();
        catalog.register_project_images(b.id).unwrap();

        let entity = catalog.add_entity("e").unwrap();
        let shared = global_id(&catalog, a.id, 1);
        catalog.tag_image(entity.id, shared).unwrap();

        let related = catalog.related_images(entity.id).unwrap();
        let occurrences: Vec<(i64, i64)> = related
            .iter()
            .map(|r| (r.project_id, r.project_image_id))
            .collect();
        assert_eq!(occurrences, vec![(a.id, 1), (a.id, 2), (b.id, 1), (b.id, 2)]);
    }

    #[test]
    fn test_related_images_errors() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(matches!(
            catalog.related_images(1).unwrap_err(),
            Error::EntityNotFound(1)
        ));
        let entity = catalog.add_entity("empty").unwrap();
        assert!(matches!(
            catalog.related_images(entity.id).unwrap_err(),
            Error::NoRelatedImages(_)
        ));
    }

    #[test]
    fn test_project_location() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, images) = make_project(tmp.path(), &["a.jpg"], &[b"a"]);
        let catalog = Catalog::open_in_memory().unwrap();
        let project = catalog.add_project("p", &db, &images).unwrap();

        let location = ImageCatalog::project_location(&catalog, project.id).unwrap();
        assert_eq!(location.store_path, project.db_path);
        assert_eq!(location.image_root, project.image_path);
    }

    // ── Config ───────────────────────────────────────────────────

    #[test]
    fn test_config_round_trip() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.get_config("output_root").unwrap(), None);
        catalog.set_config("output_root", "/tmp/a").unwrap();
        catalog.set_config("output_root", "/tmp/b").unwrap();
        assert_eq!(
            catalog.get_config("output_root").unwrap().as_deref(),
            Some("/tmp/b")
        );
    }

    #[test]
    fn test_schema_tables() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut stmt = catalog
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            tables,
            vec!["config", "entities", "image_entities", "images", "project_images", "projects"]
        );
    }
}
