use std::path::PathBuf;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use synthmap_core::{MergeReport, Synthmap, SynthProgress};

fn active_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {bar:30.cyan/blue} {spinner:.green} {pos:>5}/{len:<5} {prefix:.dim} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━╸─")
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("  {bar:30.green} {prefix:.green} {msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn start_bar(mp: &MultiProgress, len: usize, prefix: &'static str) -> ProgressBar {
    let pb = mp.add(ProgressBar::new(len as u64));
    pb.set_style(active_style());
    pb.set_prefix(prefix);
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

fn finish_bar(pb: ProgressBar, message: String) {
    pb.set_style(done_style());
    pb.set_prefix("done");
    pb.finish_with_message(message);
}

pub fn run(app: &Synthmap, entity_id: i64, output: Option<PathBuf>) -> Result<()> {
    let mp = MultiProgress::new();
    let mut active_pb: Option<ProgressBar> = None;
    let mut current_len = 0usize;

    let report = app.synthesize_entity_project(
        entity_id,
        output.as_deref(),
        Some(&mut |progress| match progress {
            SynthProgress::ProjectLoaded {
                project_id,
                images,
                pairs,
            } => {
                mp.println(format!(
                    "  Loaded project #{project_id} ({images} images, {pairs} pairs)"
                ))
                .ok();
            }
            SynthProgress::ProjectSkipped { project_id, reason } => {
                mp.println(format!("  Skipped project #{project_id}: {reason}"))
                    .ok();
            }
            SynthProgress::ImagesStart { total } => {
                current_len = total;
                active_pb = Some(start_bar(&mp, total, "Images"));
            }
            SynthProgress::ImageWritten | SynthProgress::PairWritten => {
                if let Some(ref pb) = active_pb {
                    pb.inc(1);
                }
            }
            SynthProgress::PairsStart { total } => {
                if let Some(pb) = active_pb.take() {
                    finish_bar(pb, format!("Wrote {current_len} images"));
                }
                current_len = total;
                active_pb = Some(start_bar(&mp, total, "Pairs"));
            }
            SynthProgress::Complete { .. } => {
                if let Some(pb) = active_pb.take() {
                    finish_bar(pb, format!("Processed {current_len} pairs"));
                }
            }
        }),
    )?;

    println!();
    for line in report_lines(&report) {
        println!("  {line}");
    }
    println!();
    Ok(())
}

/// Human-readable summary of a finished run.
pub(crate) fn report_lines(report: &MergeReport) -> Vec<String> {
    let mut lines = vec![
        format!("Synthesized entity #{} into {}", report.entity_id, report.output_dir.display()),
        format!("Image root: {}", report.image_root.display()),
        format!(
            "Images: {} written, {} merged duplicates, {} rejected",
            report.images_written, report.duplicates_merged, report.images_rejected
        ),
        format!(
            "Pairs:  {} written, {} dropped, {} rejected",
            report.pairs_written, report.pairs_dropped, report.pairs_rejected
        ),
    ];
    if !report.conflicts.is_empty() {
        let ids: Vec<String> = report
            .conflicts
            .iter()
            .map(|c| c.global_image_id.to_string())
            .collect();
        lines.push(format!(
            "Descriptor conflicts (skipped): {}",
            ids.join(", ")
        ));
    }
    if !report.projects_skipped.is_empty() {
        let ids: Vec<String> = report
            .projects_skipped
            .iter()
            .map(|p| format!("#{p}"))
            .collect();
        lines.push(format!("Projects skipped: {}", ids.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthmap_core::merge::DescriptorConflict;

    #[test]
    fn test_report_lines_clean_run() {
        let report = MergeReport {
            entity_id: 3,
            output_dir: PathBuf::from("/out/3"),
            image_root: PathBuf::from("/data"),
            images_written: 10,
            pairs_written: 40,
            ..MergeReport::default()
        };
        let lines = report_lines(&report);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Synthesized entity #3 into /out/3");
        assert_eq!(lines[2], "Images: 10 written, 0 merged duplicates, 0 rejected");
    }

    #[test]
    fn test_report_lines_lists_conflicts_and_skips() {
        let report = MergeReport {
            conflicts: vec![
                DescriptorConflict {
                    global_image_id: 7,
                    project_ids: vec![1, 2],
                },
                DescriptorConflict {
                    global_image_id: 9,
                    project_ids: vec![2, 3],
                },
            ],
            projects_skipped: vec![4],
            ..MergeReport::default()
        };
        let lines = report_lines(&report);
        assert_eq!(lines[4], "Descriptor conflicts (skipped): 7, 9");
        assert_eq!(lines[5], "Projects skipped: #4");
    }
}
