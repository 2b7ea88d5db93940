use serde::{Deserialize, Deserializer, Serialize};

/// Number of characters of content handed to a similarity collaborator per file.
pub const DEFAULT_EXCERPT_CHARS: usize = 2000;

const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/x-sh",
];

/// A file submitted for duplicate detection. Immutable for the duration of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default, alias = "mime", deserialize_with = "null_as_default")]
    pub mime_type: String,
    /// Textual content sample, only used for similarity comparison.
    #[serde(default, skip_serializing, deserialize_with = "null_as_default")]
    pub content: String,
    /// Caller supplied content hash.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hash: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    /// Whether this file can take part in content similarity comparison.
    pub fn is_text_like(&self) -> bool {
        !self.content.is_empty() || is_text_mime(&self.mime_type)
    }

    /// The first `limit` characters of the content sample.
    pub fn excerpt(&self, limit: usize) -> &str {
        match self.content.char_indices().nth(limit) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}

pub fn is_text_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || TEXT_MIME_TYPES.contains(&essence.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    ExactHashMatch,
    AiContentSimilarity,
}

/// Files judged to be copies of one another within a single scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub files: Vec<FileDescriptor>,
    pub total_size_bytes: u64,
    pub potential_savings_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    pub detection_method: DetectionMethod,
}

impl DuplicateGroup {
    /// Builds a group, keeping the single largest member and counting the rest as savings.
    pub fn new(
        files: Vec<FileDescriptor>,
        detection_method: DetectionMethod,
        similarity_score: Option<f64>,
    ) -> Self {
        let total_size_bytes = files.iter().fold(0u64, |acc, f| acc.saturating_add(f.size));
        let largest = files.iter().map(|f| f.size).max().unwrap_or(0);

        Self {
            files,
            total_size_bytes,
            potential_savings_bytes: total_size_bytes - largest,
            similarity_score,
            detection_method,
        }
    }

    /// Index of the member that would be kept: the first encountered of the largest files.
    pub fn keeper_index(&self) -> Option<usize> {
        let mut keeper: Option<usize> = None;
        for (idx, file) in self.files.iter().enumerate() {
            match keeper {
                Some(current) if self.files[current].size >= file.size => {}
                _ => keeper = Some(idx),
            }
        }
        keeper
    }

    pub fn keeper(&self) -> Option<&FileDescriptor> {
        self.keeper_index().map(|idx| &self.files[idx])
    }

    /// Every member except the keeper, in encounter order.
    pub fn removable(&self) -> Vec<&FileDescriptor> {
        let keeper = self.keeper_index();
        self.files
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != keeper)
            .map(|(_, file)| file)
            .collect()
    }
}

/// Summary returned by one invocation of the duplicate scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub total_files_scanned: usize,
    pub duplicate_groups_found: usize,
    /// Count of removable files: every group member except the one kept.
    pub total_duplicate_files: usize,
    pub total_potential_savings_bytes: u64,
    pub duplicate_groups: Vec<DuplicateGroup>,
}

impl ScanResult {
    pub fn from_groups(total_files_scanned: usize, duplicate_groups: Vec<DuplicateGroup>) -> Self {
        let total_duplicate_files = duplicate_groups
            .iter()
            .map(|g| g.files.len().saturating_sub(1))
            .sum();
        let total_potential_savings_bytes = duplicate_groups
            .iter()
            .fold(0u64, |acc, g| acc.saturating_add(g.potential_savings_bytes));

        Self {
            total_files_scanned,
            duplicate_groups_found: duplicate_groups.len(),
            total_duplicate_files,
            total_potential_savings_bytes,
            duplicate_groups,
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_savings_keeps_largest() {
        let group = DuplicateGroup::new(
            vec![
                FileDescriptor::new("a.txt", 100),
                FileDescriptor::new("b.txt", 300),
                FileDescriptor::new("c.txt", 50),
            ],
            DetectionMethod::AiContentSimilarity,
            Some(0.93),
        );
        assert_eq!(group.total_size_bytes, 450);
        assert_eq!(group.potential_savings_bytes, 150);
        assert_eq!(group.keeper().unwrap().name, "b.txt");
        let removable: Vec<&str> = group.removable().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(removable, vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn test_keeper_tie_goes_to_first_encountered() {
        let group = DuplicateGroup::new(
            vec![
                FileDescriptor::new("first.pdf", 100),
                FileDescriptor::new("second.pdf", 100),
            ],
            DetectionMethod::ExactHashMatch,
            Some(1.0),
        );
        assert_eq!(group.keeper().unwrap().name, "first.pdf");
        assert_eq!(group.removable()[0].name, "second.pdf");
        assert_eq!(group.potential_savings_bytes, 100);
    }

    #[test]
    fn test_removable_with_identical_descriptors() {
        let file = FileDescriptor::new("same.bin", 10).with_hash("h");
        let group = DuplicateGroup::new(
            vec![file.clone(), file],
            DetectionMethod::ExactHashMatch,
            Some(1.0),
        );
        assert_eq!(group.removable().len(), 1);
    }

    #[test]
    fn test_scan_result_counters() {
        let groups = vec![
            DuplicateGroup::new(
                vec![FileDescriptor::new("a", 10), FileDescriptor::new("b", 10)],
                DetectionMethod::ExactHashMatch,
                Some(1.0),
            ),
            DuplicateGroup::new(
                vec![
                    FileDescriptor::new("c", 5),
                    FileDescriptor::new("d", 7),
                    FileDescriptor::new("e", 1),
                ],
                DetectionMethod::AiContentSimilarity,
                Some(0.91),
            ),
        ];
        let result = ScanResult::from_groups(9, groups);
        assert_eq!(result.total_files_scanned, 9);
        assert_eq!(result.duplicate_groups_found, 2);
        assert_eq!(result.total_duplicate_files, 3);
        assert_eq!(result.total_potential_savings_bytes, 10 + 6);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let file = FileDescriptor::new("notes.md", 12).with_content("héllo wörld");
        assert_eq!(file.excerpt(2), "hé");
        assert_eq!(file.excerpt(100), "héllo wörld");
        assert_eq!(file.excerpt(0), "");
    }

    #[test]
    fn test_is_text_like() {
        assert!(FileDescriptor::new("a", 1).with_content("x").is_text_like());
        assert!(FileDescriptor::new("a", 1).with_mime_type("text/plain").is_text_like());
        assert!(FileDescriptor::new("a", 1)
            .with_mime_type("application/ld+json; charset=utf-8")
            .is_text_like());
        assert!(!FileDescriptor::new("a", 1).with_mime_type("image/png").is_text_like());
        assert!(!FileDescriptor::new("a", 1).is_text_like());
    }

    #[test]
    fn test_descriptor_deserialize_defaults() {
        let json = r#"[
            {"name": "a.pdf", "size": 100, "mime": "application/pdf", "hash": "h1"},
            {"name": "b.txt", "path": null, "content": "hello"}
        ]"#;
        let files: Vec<FileDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(files[0].mime_type, "application/pdf");
        assert_eq!(files[0].hash, "h1");
        assert_eq!(files[1].size, 0);
        assert_eq!(files[1].path, "");
        assert_eq!(files[1].content, "hello");
    }

    #[test]
    fn test_descriptor_requires_name() {
        let result: Result<FileDescriptor, _> = serde_json::from_str(r#"{"size": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ScanResult::from_groups(
            2,
            vec![DuplicateGroup::new(
                vec![
                    FileDescriptor::new("a", 1).with_content("secret"),
                    FileDescriptor::new("b", 1),
                ],
                DetectionMethod::ExactHashMatch,
                Some(1.0),
            )],
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalFilesScanned"], 2);
        assert_eq!(value["duplicateGroups"][0]["detectionMethod"], "exact_hash_match");
        assert_eq!(value["duplicateGroups"][0]["potentialSavingsBytes"], 1);
        assert!(value["duplicateGroups"][0]["files"][0].get("content").is_none());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
