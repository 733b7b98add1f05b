// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pseudo-file helpers shared by the readers in this crate.

use crate::AcquisitionError;
use std::path::Path;

/// Default root of the per-CPU sysfs tree.
pub const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Default procfs mount point.
pub const PROC_ROOT: &str = "/proc";

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_trimmed(path: &Path) -> Result<String, AcquisitionError> {
    if !path.exists() {
        return Err(AcquisitionError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| AcquisitionError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads a file holding a single unsigned integer (e.g. `scaling_cur_freq`).
pub(crate) fn read_u64(path: &Path) -> Result<u64, AcquisitionError> {
    let content = read_trimmed(path)?;
    content.parse::<u64>().map_err(|_| AcquisitionError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected unsigned integer, got '{content}'"),
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    /// Creates a fresh, empty fixture directory under the system temp dir.
    pub fn fixture_dir(label: &str) -> PathBuf {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "coregov_monitor_{label}_{}_{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Writes `content` at `root/rel`, creating parent directories.
    pub fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{content}").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn test_read_trimmed() {
        let dir = fixture_dir("trim");
        write_file(&dir, "value", "  1\n");
        assert_eq!(read_trimmed(&dir.join("value")).unwrap(), "1");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file() {
        let result = read_trimmed(Path::new("/nonexistent/cpu/online"));
        assert!(matches!(result, Err(AcquisitionError::NotAvailable { .. })));
    }

    #[test]
    fn test_read_u64_invalid() {
        let dir = fixture_dir("u64");
        write_file(&dir, "freq", "fast");
        let result = read_u64(&dir.join("freq"));
        assert!(matches!(result, Err(AcquisitionError::ParseError { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
