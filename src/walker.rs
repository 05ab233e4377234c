//! Directory walker: deterministic enumeration of indexable files.
//!
//! Traversal order is fixed (entries sorted by name within each
//! directory) so that identical trees always produce identical
//! indexes. Per-entry I/O errors are logged and skipped; the walk
//! never aborts on them.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::types::{DocId, DocType};

/// Directories that are never descended into.
const SKIPPED_DIRS: [&str; 3] = [".git", "node_modules", "vendor"];

/// Extensions classified as source code.
const CODE_EXTENSIONS: [&str; 15] = [
    "go", "py", "js", "ts", "c", "cpp", "h", "hpp", "java", "rs", "md", "txt", "json", "yaml",
    "yml",
];

/// One file emitted by the walker, in traversal order.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Identifier assigned in emission order, starting at 1.
    pub doc_id: DocId,
    pub doc_type: DocType,
    pub path: PathBuf,
}

fn should_descend(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    match entry.file_name().to_str() {
        Some(name) => !SKIPPED_DIRS.contains(&name),
        None => true,
    }
}

/// Classify a path by its case-insensitive extension.
fn classify(path: &Path) -> Option<DocType> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext == "log" {
        Some(DocType::Log)
    } else if CODE_EXTENSIONS.contains(&ext.as_str()) {
        Some(DocType::Code)
    } else {
        None
    }
}

/// Lazily yield `(doc_id, doc_type, path)` for every indexable file
/// under `root`.
pub fn walk(root: &Path) -> impl Iterator<Item = WalkedFile> {
    let mut next_id: DocId = 1;

    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(should_descend)
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("walk error: {e}");
                    return None;
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let doc_type = classify(entry.path())?;

            let doc_id = next_id;
            next_id += 1;
            Some(WalkedFile {
                doc_id,
                doc_type,
                path: entry.into_path(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_files(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for file in files {
            let path = temp_dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, "content").unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_walk_classifies_by_extension() {
        let tmp = create_test_files(&["main.go", "app.log", "notes.MD", "binary.exe"]);

        let files: Vec<WalkedFile> = walk(tmp.path()).collect();
        assert_eq!(files.len(), 3);

        let log = files
            .iter()
            .find(|f| f.path.ends_with("app.log"))
            .unwrap();
        assert_eq!(log.doc_type, DocType::Log);

        // Extension matching is case-insensitive.
        let md = files
            .iter()
            .find(|f| f.path.ends_with("notes.MD"))
            .unwrap();
        assert_eq!(md.doc_type, DocType::Code);
    }

    #[test]
    fn test_walk_skips_vendored_dirs() {
        let tmp = create_test_files(&[
            "src/lib.rs",
            ".git/config.yaml",
            "node_modules/pkg/index.js",
            "vendor/dep/dep.go",
        ]);

        let files: Vec<WalkedFile> = walk(tmp.path()).collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("src/lib.rs"));
    }

    #[test]
    fn test_walk_assigns_ids_in_sorted_order() {
        let tmp = create_test_files(&["b.rs", "a.rs", "c.rs"]);

        let files: Vec<WalkedFile> = walk(tmp.path()).collect();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.rs", "b.rs", "c.rs"]);
        assert_eq!(
            files.iter().map(|f| f.doc_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_walk_is_deterministic() {
        let tmp = create_test_files(&["z.rs", "m/inner.py", "a.log", "m/other.go"]);

        let first: Vec<PathBuf> = walk(tmp.path()).map(|f| f.path).collect();
        let second: Vec<PathBuf> = walk(tmp.path()).map(|f| f.path).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(walk(tmp.path()).count(), 0);
    }

    #[test]
    fn test_file_without_extension_ignored() {
        let tmp = create_test_files(&["Makefile", "README"]);
        assert_eq!(walk(tmp.path()).count(), 0);
    }
}
