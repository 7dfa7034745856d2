//! On-disk layout of the embedded interpreter environment.

use std::path::{Path, PathBuf};

/// Paths inside one embedded environment root (a venv).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    root: PathBuf,
}

impl EnvLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The interpreter inside the environment, if one exists on disk.
    /// Both venv layouts are checked regardless of the host platform.
    pub fn interpreter(&self) -> Option<PathBuf> {
        if !self.root.is_dir() {
            return None;
        }
        [
            self.root.join("bin").join("python"),
            self.root.join("bin").join("python3"),
            self.root.join("Scripts").join("python.exe"),
        ]
        .into_iter()
        .find(|p| p.exists())
    }

    /// Where the builder will place the interpreter on this platform.
    pub fn expected_interpreter(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts").join("python.exe")
        } else {
            self.root.join("bin").join("python")
        }
    }

    /// Directory holding the environment's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.interpreter()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| {
                if cfg!(windows) {
                    self.root.join("Scripts")
                } else {
                    self.root.join("bin")
                }
            })
    }

    pub fn package_manager(&self) -> PathBuf {
        let bin = self.bin_dir();
        if cfg!(windows) {
            bin.join("pip.exe")
        } else {
            bin.join("pip")
        }
    }

    /// `site-packages` directories: `lib/python*/site-packages` (unix) and `Lib/site-packages` (windows).
    pub fn site_packages(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.root.join("lib")) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if name.to_string_lossy().starts_with("python") {
                    let sp = entry.path().join("site-packages");
                    if sp.is_dir() {
                        dirs.push(sp);
                    }
                }
            }
        }
        let win = self.root.join("Lib").join("site-packages");
        if win.is_dir() {
            dirs.push(win);
        }
        dirs.sort();
        dirs
    }

    /// Installed distribution names, read from `*.dist-info` directories.
    /// Pure filesystem scan, no process is started.
    pub fn installed_packages(&self) -> Vec<String> {
        let mut names = Vec::new();
        for sp in self.site_packages() {
            let Ok(entries) = std::fs::read_dir(&sp) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name().to_string_lossy().to_string();
                if let Some(stem) = file_name.strip_suffix(".dist-info") {
                    let name = stem.split('-').next().unwrap_or(stem);
                    if !name.is_empty() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort_by_key(|n| n.to_lowercase());
        names.dedup();
        names
    }

    /// Total size of the environment on disk, in bytes.
    pub fn disk_usage(&self) -> u64 {
        dir_size(&self.root)
    }

    /// Delete the environment root. Missing roots are not an error.
    pub fn discard(&self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

fn dir_size(path: &Path) -> u64 {
    let mut total: u64 = 0;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => total += dir_size(&p),
                Ok(_) => total += entry.metadata().map(|m| m.len()).unwrap_or(0),
                Err(_) => {}
            }
        }
    }
    total
}
