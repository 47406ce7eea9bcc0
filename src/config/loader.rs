use crate::config::schema::{RuleSet, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    Discover {
        path: PathBuf,
        source: walkdir::Error,
    },
    UnknownBuiltin {
        name: String,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule set from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule set TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule set TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule set ({}): {}", path.display(), source),
                None => write!(f, "invalid rule set: {}", source),
            },
            ConfigError::Discover { path, source } => {
                write!(
                    f,
                    "failed to list rule sets in {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::UnknownBuiltin { name } => {
                write!(
                    f,
                    "unknown built-in rule set '{}' (available: {})",
                    name,
                    crate::builtin::names().join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Discover { source, .. } => Some(source),
            ConfigError::UnknownBuiltin { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RuleSet, ConfigError> {
    let rule_set: RuleSet = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    rule_set
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(rule_set)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// List the `*.toml` files directly inside `dir`, sorted by path.
pub fn discover_rule_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Discover {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
[meta]
name = "basic"
target = "src/page.tsx"

[[rules]]
id = "first"
find = "old"
replace = "new"

[[rules]]
id = "second"
find = '''
line one
line two'''
"#;

    #[test]
    fn test_load_from_str_basic() {
        let set = load_from_str(BASIC).unwrap();
        assert_eq!(set.meta.name, "basic");
        assert_eq!(set.meta.target.as_deref(), Some("src/page.tsx"));
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[1].find, "line one\nline two");
        assert_eq!(set.rules[1].replace, "");
        assert!(!set.rules[0].skip_if_applied);
    }

    #[test]
    fn test_load_from_str_rejects_bad_toml() {
        let err = load_from_str("[[rules]\nid = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "[meta]\nname = \"empty\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        match &err {
            ConfigError::Validation { path: Some(p), .. } => assert_eq!(p, &path),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(err.to_string().contains("rule set contains no rules"));
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let err = load_from_path("/nonexistent/rules.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_discover_rule_files_sorted_and_shallow() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), BASIC).unwrap();
        fs::write(dir.path().join("a.toml"), BASIC).unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.toml"), BASIC).unwrap();

        let files = discover_rule_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }
}
