use crate::errors::CrvError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

/// Size and modification time of a file, compared to detect rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: SystemTime,
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, CrvError>;
    fn stat(&self, path: &Path) -> Result<FileStamp, CrvError>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, CrvError> {
        std::fs::read_to_string(path)
            .map_err(|e| CrvError::Io(format!("{}: {e}", path.display())))
    }

    fn stat(&self, path: &Path) -> Result<FileStamp, CrvError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| CrvError::Io(format!("{}: {e}", path.display())))?;
        let modified = metadata
            .modified()
            .map_err(|e| CrvError::Io(format!("{}: {e}", path.display())))?;
        Ok(FileStamp {
            size: metadata.len(),
            modified,
        })
    }
}

#[derive(Debug, Clone)]
struct FakeFile {
    contents: String,
    modified: SystemTime,
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, FakeFile>>>,
    fail_next: Arc<Mutex<Option<CrvError>>>,
    reads: Arc<Mutex<Vec<PathBuf>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.write(path, contents);
        fs
    }

    /// Writes `contents` and advances the file's modification time by one second.
    pub fn write(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        let mut files = lock(&self.files);
        let modified = files
            .get(&path)
            .map(|file| file.modified + std::time::Duration::from_secs(1))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.insert(
            path,
            FakeFile {
                contents: contents.into(),
                modified,
            },
        );
    }

    pub fn remove(&self, path: &Path) {
        lock(&self.files).remove(path);
    }

    pub fn set_fail_next(&self, error: CrvError) {
        *lock(&self.fail_next) = Some(error);
    }

    pub fn reads(&self) -> Vec<PathBuf> {
        lock(&self.reads).clone()
    }

    fn maybe_fail(&self) -> Result<(), CrvError> {
        if let Some(err) = lock(&self.fail_next).take() {
            return Err(err);
        }
        Ok(())
    }

    fn get(&self, path: &Path) -> Result<FakeFile, CrvError> {
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| CrvError::Io(format!("missing file {}", path.display())))
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, CrvError> {
        self.maybe_fail()?;
        lock(&self.reads).push(path.to_path_buf());
        self.get(path).map(|file| file.contents)
    }

    fn stat(&self, path: &Path) -> Result<FileStamp, CrvError> {
        self.maybe_fail()?;
        let file = self.get(path)?;
        Ok(FileStamp {
            size: file.contents.len() as u64,
            modified: file.modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FakeFileSystem, FileSystem};
    use crate::errors::CrvError;
    use std::path::Path;

    #[test]
    fn fake_rewrites_advance_the_stamp() {
        let fs = FakeFileSystem::with_file("/r/lcov.info", "SF:a");
        let before = fs.stat(Path::new("/r/lcov.info")).expect("stat");
        fs.write("/r/lcov.info", "SF:a");
        let after = fs.stat(Path::new("/r/lcov.info")).expect("stat");
        assert_eq!(before.size, after.size);
        assert!(after.modified > before.modified);
    }

    #[test]
    fn fake_fail_next_is_consumed_once() {
        let fs = FakeFileSystem::with_file("/r/lcov.info", "x");
        fs.set_fail_next(CrvError::Io("boom".to_string()));
        assert!(fs.read_to_string(Path::new("/r/lcov.info")).is_err());
        assert_eq!(
            fs.read_to_string(Path::new("/r/lcov.info")).expect("read"),
            "x"
        );
        assert_eq!(fs.reads().len(), 1);
    }
}
