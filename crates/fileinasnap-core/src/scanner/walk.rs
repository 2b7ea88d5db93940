use crate::error::Error;
use crate::hasher::digest;
use crate::model::FileDescriptor;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub ignore_patterns: Vec<String>,
    pub max_file_size_bytes: u64,
    pub content_sample_bytes: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            max_file_size_bytes: 100 * 1024 * 1024,
            content_sample_bytes: 30_000,
        }
    }
}

/// Walks `root` and describes every regular file below it, in path order.
///
/// Skips symlinks, 0-byte files, files over the size limit and anything matching an
/// ignore glob (directories matching a glob are not descended into). Files that cannot
/// be read are logged and left out.
pub fn collect_descriptors(root: &Path, options: &WalkOptions) -> Result<Vec<FileDescriptor>, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }

    let ignore_patterns = compile_patterns(&options.ignore_patterns);

    let mut paths: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry, &ignore_patterns));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => error!("Error walking {}: {}", root.display(), err),
        }
    }

    debug!("Found {} candidate files under {}", paths.len(), root.display());

    let descriptors: Vec<FileDescriptor> = paths
        .par_iter()
        .filter_map(|path| match describe_file(path, options) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                error!("Error processing file '{}': {}", path.display(), e);
                None
            }
        })
        .collect();

    Ok(descriptors)
}

/// Builds the descriptor for one file: name, size, guessed mime type, blake3 digest of the
/// whole file, and a content sample when the file looks like text.
///
/// Returns `Ok(None)` for files the walk skips (empty or over the size limit).
pub fn describe_file(path: &Path, options: &WalkOptions) -> Result<Option<FileDescriptor>, Error> {
    let metadata = fs::metadata(path)?;
    let size = metadata.len();

    if size == 0 {
        return Ok(None);
    }
    if size > options.max_file_size_bytes {
        debug!(
            "Skipping {} ({} bytes exceeds limit of {})",
            path.display(),
            size,
            options.max_file_size_bytes
        );
        return Ok(None);
    }

    let name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let mut descriptor = FileDescriptor::new(name, size)
        .with_path(path.to_string_lossy().into_owned())
        .with_mime_type(mime_type)
        .with_hash(digest::digest_file(path)?);

    if descriptor.is_text_like() {
        descriptor.content = digest::read_sample(path, options.content_sample_bytes)?;
    }

    Ok(Some(descriptor))
}

fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_ignored(entry: &DirEntry, ignore_patterns: &[Pattern]) -> bool {
    // The root itself is always walked.
    entry.depth() > 0
        && ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
}
