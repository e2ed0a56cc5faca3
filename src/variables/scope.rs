//! Variable scopes and their precedence.
//!
//! A scope is an ordered list of `{name, value}` pairs. Writes update the
//! first entry with a matching name in place or append a new one; lookups
//! return the first match. A `null` value is treated as undefined.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The six variable scopes a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Set by scripts during the current run.
    Runtime,
    /// Defined on the request.
    Request,
    /// Defined on the enclosing folder.
    Folder,
    /// Active environment.
    Environment,
    /// Collection-wide variables, including `process.env.*` entries.
    Collection,
    /// Global environment shared across collections.
    GlobalEnvironment,
}

/// Lookup order used by interpolation and the generic resolution chain,
/// highest precedence first.
///
/// The global environment is deliberately absent: it is only reachable
/// through its dedicated accessors.
pub const INTERPOLATION_ORDER: [ScopeKind; 5] = [
    ScopeKind::Runtime,
    ScopeKind::Request,
    ScopeKind::Folder,
    ScopeKind::Environment,
    ScopeKind::Collection,
];

impl ScopeKind {
    /// Every scope, in declaration order.
    pub const ALL: [ScopeKind; 6] = [
        ScopeKind::Runtime,
        ScopeKind::Request,
        ScopeKind::Folder,
        ScopeKind::Environment,
        ScopeKind::Collection,
        ScopeKind::GlobalEnvironment,
    ];

    /// Field name used for this scope in input and output records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Runtime => "runtimeVars",
            ScopeKind::Request => "requestVars",
            ScopeKind::Folder => "folderVars",
            ScopeKind::Environment => "envVars",
            ScopeKind::Collection => "collectionVars",
            ScopeKind::GlobalEnvironment => "globalEnvVars",
        }
    }

    /// Scopes scripts may write to.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            ScopeKind::Runtime | ScopeKind::Environment | ScopeKind::GlobalEnvironment
        )
    }

    /// Only runtime state is ephemeral enough to delete from.
    pub fn supports_delete(&self) -> bool {
        matches!(self, ScopeKind::Runtime)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named variable.
///
/// Fields other than `name` and `value` (e.g. `enabled`, `uid`) are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Variable {
    /// Creates a variable without extra metadata.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// A source of variable values that takes part in precedence resolution.
pub trait ScopeProvider {
    /// Which scope this provider represents.
    fn kind(&self) -> ScopeKind;

    /// Returns the value bound to `name`, or `None` when undefined.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

/// Ordered collection of variables for one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableScope {
    kind: ScopeKind,
    vars: Vec<Variable>,
}

impl VariableScope {
    /// Creates an empty scope.
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            vars: Vec::new(),
        }
    }

    /// Creates a scope seeded with `vars`.
    pub fn with_vars(kind: ScopeKind, vars: Vec<Variable>) -> Self {
        Self { kind, vars }
    }

    /// Value of the first entry named `name`; `null` counts as undefined.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars
            .iter()
            .find(|var| var.name == name)
            .map(|var| &var.value)
            .filter(|value| !value.is_null())
    }

    /// Updates the first entry named `name` in place, or appends one.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.vars.iter_mut().find(|var| var.name == name) {
            Some(var) => var.value = value,
            None => self.vars.push(Variable::new(name, value)),
        }
    }

    /// Removes every entry named `name` and returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.vars.len();
        self.vars.retain(|var| var.name != name);
        before - self.vars.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` when the scope has no entries.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Entries in insertion order.
    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }
}

impl ScopeProvider for VariableScope {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}
