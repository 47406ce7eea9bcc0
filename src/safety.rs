use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories under the root that are never patched.
const FORBIDDEN_DIRS: &[&str] = &[".git", "node_modules"];

/// Keeps patch targets and outputs inside a project root.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical project root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to resolve path {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root`, which must exist.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let forbidden_paths = FORBIDDEN_DIRS
            .iter()
            .filter_map(|dir| workspace_root.join(dir).canonicalize().ok())
            .collect();

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Resolve an existing file and check it is inside the root.
    ///
    /// Relative paths are taken relative to the root, and symlinks are
    /// followed before the check.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = canonicalize(&self.absolute(path.as_ref()))?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Like [`validate_path`](Self::validate_path), but the file itself may
    /// not exist yet. Its parent directory must.
    pub fn validate_output(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        if absolute.exists() {
            return self.validate_path(&absolute);
        }

        let (parent, name) = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => {
                return Err(SafetyError::OutsideWorkspace {
                    path: absolute.clone(),
                    workspace: self.workspace_root.clone(),
                })
            }
        };

        let canonical = canonicalize(parent)?.join(name);
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_validate_path_inside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let guard = WorkspaceGuard::new(workspace).unwrap();

        let file = workspace.join("app/move-wt/page.tsx");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        let result = guard.validate_path(&file);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let guard = WorkspaceGuard::new(workspace).unwrap();
        fs::write(workspace.join("page.tsx"), b"").unwrap();

        let resolved = guard.validate_path("page.tsx").unwrap();
        assert_eq!(resolved, guard.workspace_root().join("page.tsx"));
    }

    #[test]
    fn test_validate_path_outside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        let guard = WorkspaceGuard::new(&workspace).unwrap();

        let outside = temp_dir.path().join("outside.tsx");
        fs::write(&outside, b"").unwrap();

        let result = guard.validate_path(&outside);
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn test_validate_path_dot_dot_escape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        fs::write(temp_dir.path().join("outside.tsx"), b"").unwrap();
        let guard = WorkspaceGuard::new(&workspace).unwrap();

        let result = guard.validate_path("../outside.tsx");
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn test_validate_path_forbidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let vendored = workspace.join("node_modules/pkg/index.js");
        fs::create_dir_all(vendored.parent().unwrap()).unwrap();
        fs::write(&vendored, b"").unwrap();

        let guard = WorkspaceGuard::new(workspace).unwrap();
        let result = guard.validate_path(&vendored);
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn test_validate_output_new_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(temp_dir.path()).unwrap();

        let resolved = guard.validate_output("patched.tsx").unwrap();
        assert_eq!(resolved, guard.workspace_root().join("patched.tsx"));
    }

    #[test]
    fn test_validate_output_missing_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(temp_dir.path()).unwrap();

        let result = guard.validate_output("missing/dir/out.tsx");
        assert!(matches!(result, Err(SafetyError::Canonicalize { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let outside = temp_dir.path().join("outside.tsx");
        fs::write(&outside, b"").unwrap();

        let link = workspace.join("escape.tsx");
        symlink(&outside, &link).unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let result = guard.validate_path(&link);

        // Should reject because canonical path is outside workspace
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }
}
