//! Literal Patcher: literal find-and-replace patching for source files
//!
//! Rule sets are ordered lists of `(find, replace)` pairs, matched as exact
//! substrings. They are declared in TOML or bundled with the binary.
//!
//! # Architecture
//!
//! The transformation is a pure function, [`apply_rules`], from text and
//! rules to patched text plus a per-rule report. [`Patcher`] is the thin I/O
//! shell around it: one read, one atomic write.
//!
//! # Semantics
//!
//! - Rules apply in order, each to the output of the previous one
//! - Every non-overlapping occurrence is replaced, left to right
//! - A rule that matches nothing is a warning, not an error (unless strict)
//! - The output is overwritten unconditionally, without a backup
//!
//! # Example
//!
//! ```no_run
//! use literal_patcher::{Patcher, ReplacementRule};
//!
//! let rules = vec![ReplacementRule::new("b2", "B", "B\nB2")];
//!
//! match Patcher::new("page.tsx", rules).run() {
//!     Ok(report) => println!("changed: {}", report.changed),
//!     Err(e) => eprintln!("patch failed: {}", e),
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod edit;
pub mod engine;
pub mod patcher;
pub mod safety;

// Re-exports
pub use config::{
    discover_rule_files, load_from_path, load_from_str, ConfigError, ReplacementRule, RuleSet,
};
pub use edit::{read_source, write_output, PatchError};
pub use engine::{apply_rules, count_matches, NearMiss, Patched, RuleOutcome, RuleStatus};
pub use patcher::{PatchReport, Patcher};
pub use safety::{SafetyError, WorkspaceGuard};
