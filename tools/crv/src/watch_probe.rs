use crate::errors::CrvError;
use crate::runtime::{FileStamp, FileSystem};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Reports whether the watched sources changed since the previous call.
pub trait ChangeProbe: Send + Sync {
    fn has_changed(&self) -> Result<bool, CrvError>;
}

/// Size + modification time signature per report path. The baseline is
/// captured at construction, so the first probe of untouched files is `false`.
pub struct ReportUpdateProbe {
    paths: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    last: Mutex<HashMap<PathBuf, FileStamp>>,
}

impl ReportUpdateProbe {
    pub fn new(paths: Vec<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self, CrvError> {
        let mut last = HashMap::with_capacity(paths.len());
        for path in &paths {
            last.insert(path.clone(), fs.stat(path)?);
        }
        Ok(Self {
            paths,
            fs,
            last: Mutex::new(last),
        })
    }
}

impl ChangeProbe for ReportUpdateProbe {
    fn has_changed(&self) -> Result<bool, CrvError> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| CrvError::Io("probe state lock poisoned".to_string()))?;
        for path in &self.paths {
            let current = self.fs.stat(path)?;
            if last.get(path) != Some(&current) {
                last.insert(path.clone(), current);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeProbe, ReportUpdateProbe};
    use crate::runtime::FakeFileSystem;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[test]
    fn first_probe_establishes_baseline_then_detects_rewrite() {
        let fs = FakeFileSystem::with_file("/r/lcov.info", "SF:a");
        let probe = ReportUpdateProbe::new(vec![PathBuf::from("/r/lcov.info")], Arc::new(fs.clone()))
            .expect("probe");
        assert!(!probe.has_changed().expect("first"));

        fs.write("/r/lcov.info", "SF:b");
        assert!(probe.has_changed().expect("after rewrite"));
        assert!(!probe.has_changed().expect("stable again"));
    }

    #[test]
    fn missing_file_fails_construction_and_later_probes() {
        let fs = FakeFileSystem::default();
        assert!(ReportUpdateProbe::new(vec![PathBuf::from("/r/none")], Arc::new(fs)).is_err());

        let fs = FakeFileSystem::with_file("/r/lcov.info", "SF:a");
        let probe = ReportUpdateProbe::new(vec![PathBuf::from("/r/lcov.info")], Arc::new(fs.clone()))
            .expect("probe");
        fs.remove(Path::new("/r/lcov.info"));
        assert!(probe.has_changed().is_err());
    }
}
