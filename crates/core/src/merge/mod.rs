//! Cross-project merge of the images related to one entity.
//!
//! Every `(global image, project)` occurrence is either given a fresh
//! canonical id, redirected to another occurrence carrying byte-identical
//! descriptors, or skipped because its descriptors disagree with another
//! project's. Pairs are then remapped through that resolution.

pub mod writer;

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::colmap::project_ini::ProjectPaths;
use crate::colmap::{ImageSetData, PairRecord, ProjectStore};
use crate::error::{Error, Result};
use writer::{InsertOutcome, ProjectWriter};

/// File name of the synthesized database inside the output directory.
pub const OUTPUT_DB_NAME: &str = "main.db";

/// One occurrence of a global image inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedImageRow {
    pub global_image_id: i64,
    pub project_id: i64,
    pub project_image_id: i64,
    pub file_path: PathBuf,
}

/// Where a project's store and images live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocation {
    pub store_path: PathBuf,
    pub image_root: PathBuf,
}

/// The catalog queries a merge depends on.
pub trait ImageCatalog {
    fn related_images(&self, entity_id: i64) -> Result<Vec<RelatedImageRow>>;
    fn project_location(&self, project_id: i64) -> Result<ProjectLocation>;
}

/// In-memory data of one contributing project.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub project_id: i64,
    pub image_root: PathBuf,
    pub images: ImageSetData,
    pub pairs: Vec<PairRecord>,
}

/// A global image whose occurrences carry different descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorConflict {
    pub global_image_id: i64,
    pub project_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
struct ProjectState {
    /// local id → canonical id
    canonical: BTreeMap<i64, i64>,
    /// local id → (project id, local id) of the occurrence that represents it
    excluded: BTreeMap<i64, (i64, i64)>,
    skip: BTreeSet<i64>,
}

/// Canonical re-indexing of every occurrence taking part in a merge.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    states: BTreeMap<i64, ProjectState>,
    /// `(project id, local id, canonical id)` in assignment order.
    accepted: Vec<(i64, i64, i64)>,
    /// Project ids in the order they were visited.
    order: Vec<i64>,
    conflicts: Vec<DescriptorConflict>,
}

impl Resolution {
    pub fn accepted(&self) -> &[(i64, i64, i64)] {
        &self.accepted
    }

    pub fn project_order(&self) -> &[i64] {
        &self.order
    }

    pub fn conflicts(&self) -> &[DescriptorConflict] {
        &self.conflicts
    }

    /// Number of occurrences folded into another project's copy.
    pub fn excluded_count(&self) -> usize {
        self.states.values().map(|s| s.excluded.len()).sum()
    }

    /// Canonical id of a project-local image. `Ok(None)` when the occurrence
    /// was skipped; an error when it was never resolved at all.
    pub fn canonical_id(&self, project_id: i64, local_id: i64) -> Result<Option<i64>> {
        let missing = Error::MissingCanonicalId {
            project_id,
            image_id: local_id,
        };
        let Some(state) = self.states.get(&project_id) else {
            return Err(missing);
        };
        if state.skip.contains(&local_id) {
            return Ok(None);
        }
        let (target_project, target_local) = state
            .excluded
            .get(&local_id)
            .copied()
            .unwrap_or((project_id, local_id));
        self.states
            .get(&target_project)
            .and_then(|s| s.canonical.get(&target_local))
            .map(|&id| Some(id))
            .ok_or(missing)
    }
}

/// Assign canonical ids to the occurrences in `related`.
///
/// Rows whose project is absent from `snapshots`, or whose image has no
/// loaded data, are ignored. Projects contributing more images are visited
/// first (ties by project id), so their copy of a shared image wins.
pub fn resolve(related: &[RelatedImageRow], snapshots: &BTreeMap<i64, ProjectSnapshot>) -> Resolution {
    let mut membership: BTreeMap<i64, BTreeMap<i64, i64>> = BTreeMap::new();
    let mut occurrences: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for row in related {
        let loaded = snapshots
            .get(&row.project_id)
            .is_some_and(|s| s.images.images.contains_key(&row.project_image_id));
        if !loaded {
            continue;
        }
        membership
            .entry(row.project_id)
            .or_default()
            .insert(row.global_image_id, row.project_image_id);
        occurrences
            .entry(row.global_image_id)
            .or_default()
            .insert(row.project_id);
    }

    let mut order: Vec<i64> = membership.keys().copied().collect();
    order.sort_by_key(|p| (Reverse(membership[p].len()), *p));

    let mut resolution = Resolution {
        states: order.iter().map(|&p| (p, ProjectState::default())).collect(),
        order: order.clone(),
        ..Resolution::default()
    };

    let mut next_id = 0i64;
    for &project_id in &order {
        for (&global_id, &local_id) in &membership[&project_id] {
            let state = &resolution.states[&project_id];
            if state.excluded.contains_key(&local_id) || state.skip.contains(&local_id) {
                continue;
            }

            let projects = &occurrences[&global_id];
            if projects.len() > 1 {
                // (project, local) of every occurrence of this image
                let copies: Vec<(i64, i64)> = projects
                    .iter()
                    .map(|&p| (p, membership[&p][&global_id]))
                    .collect();
                let reference = descriptor_bytes(snapshots, project_id, local_id);
                let identical = copies
                    .iter()
                    .all(|&(p, l)| descriptor_bytes(snapshots, p, l) == reference);

                if identical {
                    for &(p, l) in copies.iter().filter(|&&(p, _)| p != project_id) {
                        if let Some(other) = resolution.states.get_mut(&p) {
                            other.excluded.insert(l, (project_id, local_id));
                        }
                    }
                    tracing::debug!(global_id, project_id, "duplicate image folded into one");
                } else {
                    let project_ids: Vec<i64> = projects.iter().copied().collect();
                    tracing::warn!(
                        global_id,
                        projects = ?project_ids,
                        "descriptor conflict, skipping every occurrence"
                    );
                    for &(p, l) in &copies {
                        if let Some(other) = resolution.states.get_mut(&p) {
                            other.skip.insert(l);
                        }
                    }
                    resolution.conflicts.push(DescriptorConflict {
                        global_image_id: global_id,
                        project_ids,
                    });
                    continue;
                }
            }

            next_id += 1;
            if let Some(state) = resolution.states.get_mut(&project_id) {
                state.canonical.insert(local_id, next_id);
            }
            resolution.accepted.push((project_id, local_id, next_id));
        }
    }

    resolution
}

fn descriptor_bytes(
    snapshots: &BTreeMap<i64, ProjectSnapshot>,
    project_id: i64,
    local_id: i64,
) -> Option<&[u8]> {
    snapshots
        .get(&project_id)
        .and_then(|s| s.images.images.get(&local_id))
        .map(|r| r.descriptors.as_slice())
}

/// Longest shared leading run of path components.
pub fn common_root<'a>(paths: impl IntoIterator<Item = &'a Path>) -> PathBuf {
    let mut iter = paths.into_iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut root: Vec<_> = first.components().collect();
    for path in iter {
        let shared = root
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        root.truncate(shared);
    }
    root.iter().collect()
}

/// Rewrite an image name so it stays unique under the merged image root.
fn prefixed_name(offset: &Path, name: &str) -> String {
    let mut parts: Vec<String> = offset
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.push(name.to_string());
    parts.join("/")
}

/// Progress events emitted while synthesizing a project.
pub enum SynthProgress {
    /// A project's images and pairs were loaded.
    ProjectLoaded {
        project_id: i64,
        images: usize,
        pairs: usize,
    },
    /// A project could not be used and was left out.
    ProjectSkipped { project_id: i64, reason: String },
    /// Starting to write image rows.
    ImagesStart { total: usize },
    ImageWritten,
    /// Starting to write pair rows.
    PairsStart { total: usize },
    PairWritten,
    /// The store was written to disk.
    Complete { output_dir: PathBuf },
}

/// Summary of one synthesis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub entity_id: i64,
    pub output_dir: PathBuf,
    pub image_root: PathBuf,
    pub projects_used: Vec<i64>,
    pub projects_skipped: Vec<i64>,
    pub images_written: usize,
    pub duplicates_merged: usize,
    pub conflicts: Vec<DescriptorConflict>,
    /// Image rows rejected by a uniqueness constraint.
    pub images_rejected: usize,
    pub pairs_written: usize,
    /// Pairs left out because an endpoint was skipped or rejected.
    pub pairs_dropped: usize,
    /// Pair rows rejected by a uniqueness constraint.
    pub pairs_rejected: usize,
}

/// Build `output_root/<entity_id>/main.db` from every project holding images
/// related to the entity.
///
/// Refuses to run when the output directory already exists. Projects whose
/// store is missing or incompatible are left out; descriptor conflicts and
/// duplicate rows are skipped and counted in the report.
pub fn synthesize_entity_project(
    catalog: &dyn ImageCatalog,
    entity_id: i64,
    output_root: &Path,
    mut progress_cb: Option<&mut dyn FnMut(SynthProgress)>,
) -> Result<MergeReport> {
    let output_dir = output_root.join(entity_id.to_string());
    if output_dir.exists() {
        return Err(Error::OutputDirectoryExists(output_dir));
    }

    let related = catalog.related_images(entity_id)?;
    if related.is_empty() {
        return Err(Error::NoRelatedImages(entity_id));
    }

    let mut wanted: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for row in &related {
        wanted
            .entry(row.project_id)
            .or_default()
            .insert(row.project_image_id);
    }
    let mut load_order: Vec<i64> = wanted.keys().copied().collect();
    load_order.sort_by_key(|p| (Reverse(wanted[p].len()), *p));

    let mut report = MergeReport {
        entity_id,
        output_dir: output_dir.clone(),
        ..MergeReport::default()
    };

    // Sequential on purpose: load order feeds canonical id assignment.
    let mut snapshots: BTreeMap<i64, ProjectSnapshot> = BTreeMap::new();
    for project_id in load_order {
        let location = catalog.project_location(project_id)?;
        let store = match ProjectStore::open(&location.store_path) {
            Ok(store) => store,
            Err(e @ (Error::SchemaMismatch { .. } | Error::ProjectStoreNotFound(_))) => {
                tracing::warn!(project_id, error = %e, "project left out of merge");
                report.projects_skipped.push(project_id);
                if let Some(ref mut cb) = progress_cb {
                    cb(SynthProgress::ProjectSkipped {
                        project_id,
                        reason: e.to_string(),
                    });
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        let ids = &wanted[&project_id];
        let images = store.read_images(ids)?;
        let pairs = store.read_pairs(ids)?;
        tracing::info!(
            project_id,
            images = images.images.len(),
            pairs = pairs.len(),
            "loaded project"
        );
        if let Some(ref mut cb) = progress_cb {
            cb(SynthProgress::ProjectLoaded {
                project_id,
                images: images.images.len(),
                pairs: pairs.len(),
            });
        }
        snapshots.insert(
            project_id,
            ProjectSnapshot {
                project_id,
                image_root: location.image_root,
                images,
                pairs,
            },
        );
    }

    if snapshots.is_empty() {
        return Err(Error::NoRelatedImages(entity_id));
    }

    let image_root = common_root(snapshots.values().map(|s| s.image_root.as_path()));
    tracing::info!(root = %image_root.display(), "merged image root");

    let resolution = resolve(&related, &snapshots);
    report.projects_used = resolution.project_order().to_vec();
    report.duplicates_merged = resolution.excluded_count();
    report.conflicts = resolution.conflicts().to_vec();

    let writer = ProjectWriter::in_memory()?;

    if let Some(ref mut cb) = progress_cb {
        cb(SynthProgress::ImagesStart {
            total: resolution.accepted().len(),
        });
    }
    let mut rejected: HashSet<i64> = HashSet::new();
    for &(project_id, local_id, canonical_id) in resolution.accepted() {
        let snapshot = &snapshots[&project_id];
        let offset = snapshot
            .image_root
            .strip_prefix(&image_root)
            .unwrap_or(&snapshot.image_root);

        let mut record = snapshot.images.images[&local_id].clone();
        record.image.image_id = canonical_id;
        record.image.camera_id = canonical_id;
        record.camera.camera_id = canonical_id;
        record.image.name = prefixed_name(offset, &record.image.name);

        match writer.insert_image(&record)? {
            InsertOutcome::Inserted => report.images_written += 1,
            InsertOutcome::SkippedDuplicate => {
                tracing::warn!(
                    project_id,
                    local_id,
                    name = %record.image.name,
                    "image rows rejected as duplicate, skipping"
                );
                rejected.insert(canonical_id);
                report.images_rejected += 1;
            }
        }
        if let Some(ref mut cb) = progress_cb {
            cb(SynthProgress::ImageWritten);
        }
    }

    if let Some(ref mut cb) = progress_cb {
        cb(SynthProgress::PairsStart {
            total: resolution
                .project_order()
                .iter()
                .map(|p| snapshots[p].pairs.len())
                .sum(),
        });
    }
    for &project_id in resolution.project_order() {
        let snapshot = &snapshots[&project_id];
        for pair in &snapshot.pairs {
            let loaded = |id: i64| snapshot.images.images.contains_key(&id);
            if !loaded(pair.id1) || !loaded(pair.id2) {
                tracing::debug!(
                    project_id,
                    id1 = pair.id1,
                    id2 = pair.id2,
                    "pair endpoint not loaded, dropping"
                );
                report.pairs_dropped += 1;
                if let Some(ref mut cb) = progress_cb {
                    cb(SynthProgress::PairWritten);
                }
                continue;
            }
            let ids = (
                resolution.canonical_id(project_id, pair.id1)?,
                resolution.canonical_id(project_id, pair.id2)?,
            );
            match ids {
                (Some(a), Some(b)) if a != b && !rejected.contains(&a) && !rejected.contains(&b) => {
                    let remapped = PairRecord {
                        id1: a,
                        id2: b,
                        matches: pair.matches.clone(),
                        geometry: pair.geometry.clone(),
                    };
                    match writer.insert_pair(&remapped)? {
                        InsertOutcome::Inserted => report.pairs_written += 1,
                        InsertOutcome::SkippedDuplicate => {
                            tracing::debug!(project_id, a, b, "pair already present, skipping");
                            report.pairs_rejected += 1;
                        }
                    }
                }
                _ => report.pairs_dropped += 1,
            }
            if let Some(ref mut cb) = progress_cb {
                cb(SynthProgress::PairWritten);
            }
        }
    }

    if report.images_rejected > 0 || report.pairs_rejected > 0 {
        tracing::warn!(
            images = report.images_rejected,
            pairs = report.pairs_rejected,
            "rows skipped on duplicate keys"
        );
    }

    fs::create_dir_all(&output_dir)?;
    let db_path = output_dir.join(OUTPUT_DB_NAME);
    writer.persist(&db_path)?;
    ProjectPaths {
        database_path: db_path,
        image_path: image_root.clone(),
    }
    .write(&output_dir.join("project.ini"))?;
    report.image_root = image_root;

    tracing::info!(
        output = %output_dir.display(),
        images = report.images_written,
        pairs = report.pairs_written,
        duplicates = report.duplicates_merged,
        conflicts = report.conflicts.len(),
        "synthesized entity project"
    );
    if let Some(ref mut cb) = progress_cb {
        cb(SynthProgress::Complete {
            output_dir: output_dir.clone(),
        });
    }

    Ok(report)
}
