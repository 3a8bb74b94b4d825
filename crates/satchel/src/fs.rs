//! Filesystem access used by the bundler
//!
//! All disk I/O goes through [`FileSystem`] so the graph builder and the
//! orchestrator can run against an in-memory tree in tests and benchmarks.

use std::{
    cell::{Cell, RefCell},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

/// Filesystem operations the bundler depends on
pub trait FileSystem: std::fmt::Debug {
    /// Read a UTF-8 source file
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Whether a file or directory exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and all missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write `contents` to `path`, replacing any existing file
    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    /// Writes through a temporary file in the target directory and renames it
    /// into place, so readers never observe a partially written bundle.
    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.flush()?;
        staged.persist(path).map_err(|err| err.error)?;
        trace!("Persisted {} bytes to {}", contents.len(), path.display());
        Ok(())
    }
}

/// A simple in-memory filesystem for tests and benchmarks
///
/// Directories are tracked explicitly: writing a file whose parent directory
/// was never created fails with `NotFound`, like it would on disk.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<FxHashMap<PathBuf, String>>,
    dirs: RefCell<FxHashSet<PathBuf>>,
    reads: Cell<usize>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filesystem from `(path, contents)` pairs; parent directories are
    /// created implicitly
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<PathBuf>,
        C: Into<String>,
    {
        let fs = Self::new();
        for (path, contents) in files {
            fs.insert(path, contents);
        }
        fs
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dirs(parent);
        }
        self.files.borrow_mut().insert(path, contents.into());
    }

    /// Contents of a file, if present
    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    /// Number of successful and failed `read_file` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    fn add_dirs(&self, dir: &Path) {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.reads.set(self.reads.get() + 1);
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path) || self.dirs.borrow().contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.files.borrow().contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("a file exists at {}", path.display()),
            ));
        }
        self.add_dirs(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !self.dirs.borrow().contains(parent) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory does not exist: {}", parent.display()),
                ));
            }
            _ => {}
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_owned());
        Ok(())
    }
}
