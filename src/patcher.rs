//! Read → substitute → write.

use crate::config::ReplacementRule;
use crate::edit::{read_source, write_output, PatchError};
use crate::engine::{apply_rules, RuleOutcome};
use crate::safety::{SafetyError, WorkspaceGuard};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Applies an ordered rule list to one file.
///
/// The output defaults to the input path. Writing is unconditional unless
/// `dry_run` is set; there is no backup of the original.
#[derive(Debug, Clone)]
#[must_use = "Patcher does nothing until run() is called"]
pub struct Patcher {
    input: PathBuf,
    output: Option<PathBuf>,
    rules: Vec<ReplacementRule>,
    dry_run: bool,
    strict: bool,
    guard: Option<WorkspaceGuard>,
}

/// What a [`Patcher`] run did.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcomes: Vec<RuleOutcome>,
    /// Patched text differs from the source
    pub changed: bool,
    /// Output file was written
    pub written: bool,
    #[serde(skip)]
    pub before: String,
    #[serde(skip)]
    pub after: String,
}

impl PatchReport {
    pub fn unmatched(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.is_unmatched())
    }
}

impl Patcher {
    pub fn new(input: impl Into<PathBuf>, rules: Vec<ReplacementRule>) -> Self {
        Self {
            input: input.into(),
            output: None,
            rules,
            dry_run: false,
            strict: false,
            guard: None,
        }
    }

    /// Write the result here instead of over the input.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Compute and report without writing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fail before writing if any rule matches nothing.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Require input and output to resolve inside the guard's root.
    pub fn guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn run(&self) -> Result<PatchReport, PatchError> {
        let (input, output) = self.resolve_paths()?;

        let before = read_source(&input)?;
        info!(path = %input.display(), bytes = before.len(), "read source");

        let patched = apply_rules(&before, &self.rules);

        if self.strict {
            let ids: Vec<String> = patched.unmatched().map(|o| o.rule_id.clone()).collect();
            if !ids.is_empty() {
                return Err(PatchError::UnmatchedRules { ids });
            }
        }

        let changed = patched.text != before;
        let written = if self.dry_run {
            debug!(path = %output.display(), "dry run, not writing");
            false
        } else {
            write_output(&output, &patched.text)?;
            info!(path = %output.display(), bytes = patched.text.len(), changed, "wrote output");
            true
        };

        Ok(PatchReport {
            input,
            output,
            outcomes: patched.outcomes,
            changed,
            written,
            before,
            after: patched.text,
        })
    }

    fn resolve_paths(&self) -> Result<(PathBuf, PathBuf), PatchError> {
        let output = self.output.as_ref().unwrap_or(&self.input);

        match &self.guard {
            None => Ok((self.input.clone(), output.clone())),
            Some(guard) => {
                let input = guard.validate_path(&self.input).map_err(resolve_error)?;
                let output = if self.output.is_some() {
                    guard.validate_output(output).map_err(resolve_error)?
                } else {
                    input.clone()
                };
                Ok((input, output))
            }
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }
}

/// A path that cannot be resolved is reported like a failed read.
fn resolve_error(err: SafetyError) -> PatchError {
    match err {
        SafetyError::Canonicalize { path, source } => PatchError::from_io(&path, source),
        other => PatchError::Safety(other),
    }
}
