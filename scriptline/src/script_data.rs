//! Values stored under the well-known configuration keys.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::span::Location;

/// What the compiled script is expected to be.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptSignature {
    /// Name of the base type the instantiated script must report.
    pub base_type: String,
    pub provided: ProvidedDeclarations,
}

impl ScriptSignature {
    pub fn new(base_type: impl Into<String>) -> Self {
        Self {
            base_type: base_type.into(),
            provided: ProvidedDeclarations::default(),
        }
    }
}

/// Declarations the host makes visible to the script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProvidedDeclarations {
    /// Implicit receivers, e.g. previously evaluated scripts.
    pub implicit_receivers: Vec<String>,
    /// External variables by name, with their type names.
    pub context_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionRule {
    pub allow: bool,
    /// Dotted name pattern; a trailing `*` matches any suffix.
    pub pattern: String,
}

impl RestrictionRule {
    pub fn allow(pattern: impl Into<String>) -> Self {
        Self {
            allow: true,
            pattern: pattern.into(),
        }
    }

    pub fn deny(pattern: impl Into<String>) -> Self {
        Self {
            allow: false,
            pattern: pattern.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == self.pattern,
        }
    }
}

/// Which names a script may resolve. The last matching rule wins; a
/// name no rule matches is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvingRestrictions {
    pub rules: Vec<RestrictionRule>,
}

impl ResolvingRestrictions {
    pub fn new(rules: Vec<RestrictionRule>) -> Self {
        Self { rules }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(name))
            .is_none_or(|rule| rule.allow)
    }
}

/// An external dependency: classpath entries made visible to the
/// compiler and to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptDependency {
    pub classpath: Vec<PathBuf>,
}

impl ScriptDependency {
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        Self { classpath }
    }
}

/// Flatten the classpath of a dependency list, in order.
pub fn flatten_classpath(dependencies: &[ScriptDependency]) -> Vec<PathBuf> {
    dependencies
        .iter()
        .flat_map(|dependency| dependency.classpath.iter().cloned())
        .collect()
}

/// A file annotation found in a script, e.g. `@depends_on("lib")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub name: String,
    pub arguments: Vec<String>,
    pub location: Option<Location>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            location: None,
        }
    }
}
