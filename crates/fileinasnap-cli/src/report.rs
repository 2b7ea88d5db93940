use crate::commands::OutputFormat;
use colored::*;
use fileinasnap_core::model::format_bytes;
use fileinasnap_core::{DetectionMethod, DuplicateGroup, ScanResult};
use std::error::Error;
use std::io::Write;

pub fn render(result: &ScanResult, format: OutputFormat) -> Result<String, Box<dyn Error>> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let mut buffer: Vec<u8> = Vec::new();
            write_csv(result, &mut buffer)?;
            Ok(String::from_utf8(buffer)?)
        }
    }
}

pub fn render_text(result: &ScanResult) -> String {
    let mut out = format!(
        "Scanned {} files: {} duplicate groups, {} removable files, {} reclaimable\n",
        result.total_files_scanned,
        format!("{}", result.duplicate_groups_found).red(),
        format!("{}", result.total_duplicate_files).red(),
        format_bytes(result.total_potential_savings_bytes).green(),
    );

    for (idx, group) in result.duplicate_groups.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!(
            "Group {} - {} - {} files - saves {}\n",
            idx + 1,
            describe_method(group).cyan(),
            group.files.len(),
            format_bytes(group.potential_savings_bytes),
        ));

        let keeper = group.keeper_index();
        for (member_idx, file) in group.files.iter().enumerate() {
            let action = if Some(member_idx) == keeper {
                "keep  ".green()
            } else {
                "remove".yellow()
            };
            out.push_str(&format!(
                "  {} {} ({})\n",
                action,
                display_path(&file.path, &file.name),
                format_bytes(file.size),
            ));
        }
    }

    out
}

/// One row per group member.
pub fn write_csv<W: Write>(result: &ScanResult, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "group",
        "detection_method",
        "similarity_score",
        "action",
        "name",
        "path",
        "size_bytes",
        "hash",
    ])?;

    for (idx, group) in result.duplicate_groups.iter().enumerate() {
        let keeper = group.keeper_index();
        let method = match group.detection_method {
            DetectionMethod::ExactHashMatch => "exact_hash_match",
            DetectionMethod::AiContentSimilarity => "ai_content_similarity",
        };
        let score = group
            .similarity_score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_default();

        for (member_idx, file) in group.files.iter().enumerate() {
            let action = if Some(member_idx) == keeper { "keep" } else { "remove" };
            wtr.write_record([
                (idx + 1).to_string().as_str(),
                method,
                score.as_str(),
                action,
                file.name.as_str(),
                file.path.as_str(),
                file.size.to_string().as_str(),
                file.hash.as_str(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn describe_method(group: &DuplicateGroup) -> String {
    match group.detection_method {
        DetectionMethod::ExactHashMatch => "exact hash match".to_string(),
        DetectionMethod::AiContentSimilarity => match group.similarity_score {
            Some(score) => format!("content similarity {:.2}", score),
            None => "content similarity".to_string(),
        },
    }
}

fn display_path<'a>(path: &'a str, name: &'a str) -> &'a str {
    if path.is_empty() {
        name
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileinasnap_core::FileDescriptor;

    fn sample_result() -> ScanResult {
        ScanResult::from_groups(
            5,
            vec![
                DuplicateGroup::new(
                    vec![
                        FileDescriptor::new("a.pdf", 100).with_path("/docs/a.pdf").with_hash("h1"),
                        FileDescriptor::new("b.pdf", 100).with_path("/docs/b.pdf").with_hash("h1"),
                    ],
                    DetectionMethod::ExactHashMatch,
                    Some(1.0),
                ),
                DuplicateGroup::new(
                    vec![
                        FileDescriptor::new("draft.txt", 40),
                        FileDescriptor::new("final.txt", 60),
                    ],
                    DetectionMethod::AiContentSimilarity,
                    Some(0.95),
                ),
            ],
        )
    }

    #[test]
    fn test_render_text() {
        colored::control::set_override(false);
        let text = render_text(&sample_result());

        assert!(text.starts_with(
            "Scanned 5 files: 2 duplicate groups, 2 removable files, 140 B reclaimable"
        ));
        assert!(text.contains("Group 1 - exact hash match - 2 files - saves 100 B"));
        assert!(text.contains("  keep   /docs/a.pdf (100 B)"));
        assert!(text.contains("  remove /docs/b.pdf (100 B)"));
        assert!(text.contains("Group 2 - content similarity 0.95 - 2 files - saves 40 B"));
        assert!(text.contains("  remove draft.txt (40 B)"));
        assert!(text.contains("  keep   final.txt (60 B)"));
    }

    #[test]
    fn test_write_csv() {
        let mut buffer: Vec<u8> = Vec::new();
        write_csv(&sample_result(), &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "group,detection_method,similarity_score,action,name,path,size_bytes,hash"
        );
        assert_eq!(lines[1], "1,exact_hash_match,1.0000,keep,a.pdf,/docs/a.pdf,100,h1");
        assert_eq!(lines[4], "2,ai_content_similarity,0.9500,keep,final.txt,,60,");
    }

    #[test]
    fn test_render_json() {
        let json = render(&sample_result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["duplicateGroupsFound"], 2);
        assert_eq!(value["duplicateGroups"][1]["similarityScore"], 0.95);
    }
}
