//! Facilities for discovering input files and loading text corpora.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{BpeError, Result};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Directories are traversed recursively by default; set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level.  Files found inside a directory are returned in
/// lexicographic order so corpora load deterministically.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(BpeError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let mut found = Vec::new();
            if cfg.recursive {
                let walker = WalkDir::new(path).follow_links(cfg.follow_symlinks);
                for entry in walker {
                    let entry = entry.map_err(|err| BpeError::Internal(err.to_string()))?;
                    if entry.file_type().is_file() {
                        found.push(entry.path().to_path_buf());
                    }
                }
            } else {
                for entry in
                    fs::read_dir(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?
                {
                    let entry = entry.map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file() {
                        found.push(entry_path);
                    }
                }
            }
            found.sort();
            files.extend(found);
        } else if metadata.is_file() || path.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(BpeError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads every discovered file as one UTF-8 document.
///
/// Files that are empty or whitespace-only are skipped.  A file that is not valid UTF-8 fails
/// the whole load.
pub fn load_text_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<String>> {
    let file_paths = collect_paths(inputs, cfg)?;
    let mut documents = Vec::with_capacity(file_paths.len());
    for file_path in file_paths {
        let text = fs::read_to_string(&file_path)
            .map_err(|err| BpeError::io(err, Some(file_path.clone())))?;
        if !text.trim().is_empty() {
            documents.push(text);
        }
    }
    if documents.is_empty() {
        return Err(BpeError::InvalidInput(
            "no text could be loaded from inputs".into(),
        ));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(&file_b, "beta").expect("write b");

        let cfg = IngestConfig {
            recursive: true,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![file_a.clone(), file_b]);

        let shallow = IngestConfig {
            recursive: false,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &shallow).expect("collect shallow paths");
        assert_eq!(paths, vec![file_a]);
    }

    #[test]
    fn collect_paths_rejects_missing_inputs() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.txt");
        let err = collect_paths(&[missing], &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn load_text_corpus_skips_blank_documents() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.txt"), "hello world").expect("write a");
        fs::write(dir.path().join("b.txt"), " \n ").expect("write b");
        let documents =
            load_text_corpus(&[dir.path()], &IngestConfig::default()).expect("load corpus");
        assert_eq!(documents, vec!["hello world".to_string()]);
    }

    #[test]
    fn load_text_corpus_rejects_invalid_utf8() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("data.bin");
        fs::write(&file, [0xFFu8, 0xFE, 0x00]).expect("write data");
        let err = load_text_corpus(&[file], &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, BpeError::Io { .. }));
    }
}
