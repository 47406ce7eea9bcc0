use crate::safety::SafetyError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal errors while patching a file. None of them are retried.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("File is not valid UTF-8: {path} (first invalid byte at offset {offset})")]
    Encoding { path: PathBuf, offset: usize },

    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("{} rule(s) matched nothing: {}", .ids.len(), .ids.join(", "))]
    UnmatchedRules { ids: Vec<String> },
}

impl PatchError {
    /// Map an I/O failure on `path` onto the error taxonomy.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => PatchError::FileNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => PatchError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::InvalidData => PatchError::Encoding {
                path: path.to_path_buf(),
                offset: 0,
            },
            _ => PatchError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Read the whole file as UTF-8 text.
pub fn read_source(path: impl AsRef<Path>) -> Result<String, PatchError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| PatchError::from_io(path, e))?;

    String::from_utf8(bytes).map_err(|e| PatchError::Encoding {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })
}

/// Replace the contents of `path` with `content`.
///
/// The write is atomic (tempfile in the same directory, fsync, rename) but
/// otherwise unconditional: an existing file is overwritten without a backup.
/// A symlinked `path` is written through to the file it points at. Permissions
/// of an existing file are carried over; a read-only file is refused.
pub fn write_output(path: impl AsRef<Path>, content: &str) -> Result<(), PatchError> {
    let path = path.as_ref();
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(PatchError::from_io(path, e)),
    };

    atomic_write(&target, content.as_bytes()).map_err(|e| PatchError::from_io(path, e))
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let permissions = match fs::metadata(path) {
        Ok(existing) if existing.permissions().readonly() => {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "target file is read-only",
            ));
        }
        Ok(existing) => Some(existing.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_file_permissions(),
        Err(e) => return Err(e),
    };

    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;

    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Mode for a freshly created output; tempfiles start out owner-only.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
