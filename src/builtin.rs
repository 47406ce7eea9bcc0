//! Rule sets compiled into the binary.

use crate::config::{load_from_str, ConfigError, RuleSet};

/// Stores Places Autocomplete instances in refs so re-initialisation clears
/// the old `place_changed` listeners instead of stacking new ones.
const PLACES_AUTOCOMPLETE_CLEANUP: &str =
    include_str!("../rulesets/places-autocomplete-cleanup.toml");

const BUILTINS: &[(&str, &str)] = &[(
    "places-autocomplete-cleanup",
    PLACES_AUTOCOMPLETE_CLEANUP,
)];

/// Names of all bundled rule sets.
pub fn names() -> Vec<&'static str> {
    BUILTINS.iter().map(|(name, _)| *name).collect()
}

/// Raw TOML of a bundled rule set.
pub fn source(name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, toml)| *toml)
}

pub fn load(name: &str) -> Result<RuleSet, ConfigError> {
    let toml = source(name).ok_or_else(|| ConfigError::UnknownBuiltin {
        name: name.to_string(),
    })?;
    load_from_str(toml)
}
