use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "pdf"];

/// Enumerates loadable source files under a directory
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    recursive: bool,
    extensions: Vec<String>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    /// Matching files sorted by path. Unreadable entries are skipped.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(&self.root).follow_links(false);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::debug!("scan: skipping entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| has_supported_extension(path, &self.extensions))
            .collect();
        files.sort();
        files
    }
}

/// Case-insensitive extension check against a lowercase allow-list.
pub fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}
