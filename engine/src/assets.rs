//! Game asset access.
//!
//! Paths use the game's backslash-separated form (`art\cuts\intro.mve`).
//! [`FsAssets`] maps them onto a directory tree; [`MemoryAssets`] serves
//! preloaded blobs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

pub trait AssetSource {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;

    fn exists(&self, path: &str) -> bool {
        self.open(path).is_ok()
    }
}

/// Normalise a game path: backslashes become `/`, empty segments are dropped
pub fn normalize_path(path: &str) -> String {
    path.split(['\\', '/'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Assets read from a directory on disk
#[derive(Debug, Clone)]
pub struct FsAssets {
    root: PathBuf,
}

impl FsAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        for segment in normalize_path(path).split('/') {
            if segment == ".." {
                continue;
            }
            resolved.push(segment);
        }
        resolved
    }
}

impl AssetSource for FsAssets {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        let resolved = self.resolve(path);
        log::trace!("Opening asset {} -> {}", path, resolved.display());
        let file = File::open(&resolved)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Assets held in memory, keyed case-insensitively by normalised path
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(Self::key(path), data.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(&Self::key(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn key(path: &str) -> String {
        normalize_path(path).to_ascii_lowercase()
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        match self.files.get(&Self::key(path)) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such asset: {}", path),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("art\\cuts\\intro.mve"), "art/cuts/intro.mve");
        assert_eq!(normalize_path("\\text\\\\english/cuts"), "text/english/cuts");
    }

    #[test]
    fn test_memory_assets_case_insensitive() {
        let mut assets = MemoryAssets::new();
        assets.insert("art\\cuts\\INTRO.MVE", b"data".to_vec());

        let mut contents = Vec::new();
        assets
            .open("art/cuts/intro.mve")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"data");

        let err = assets.open("art\\cuts\\missing.mve").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_fs_assets_resolve() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("art/cuts")).unwrap();
        std::fs::write(dir.path().join("art/cuts/intro.mve"), b"mve").unwrap();

        let assets = FsAssets::new(dir.path());
        assert!(assets.exists("art\\cuts\\intro.mve"));
        assert!(!assets.exists("art\\cuts\\outro.mve"));
        assert_eq!(
            assets.resolve("..\\secret"),
            dir.path().join("secret")
        );
    }
}
