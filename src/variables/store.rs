//! The variable store behind the `bru` facade.
//!
//! Holds the six scopes of one execution and implements scoped access,
//! precedence resolution, and interpolation.

use super::mock::MockDataProvider;
use super::scope::{ScopeKind, ScopeProvider, Variable, VariableScope, INTERPOLATION_ORDER};
use super::substitution::substitute_variables;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Prefix under which process environment entries live in the collection scope.
pub const PROCESS_ENV_PREFIX: &str = "process.env.";

/// Errors raised by scoped variable access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    /// A write targeted a scope that is read-only to scripts.
    #[error("variable scope '{0}' is read-only")]
    ReadOnlyScope(ScopeKind),
    /// A delete targeted a scope other than runtime.
    #[error("variables cannot be deleted from scope '{0}'")]
    DeleteUnsupported(ScopeKind),
}

/// Initial contents of every scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSeed {
    #[serde(default)]
    pub runtime_vars: Vec<Variable>,
    #[serde(default)]
    pub request_vars: Vec<Variable>,
    #[serde(default)]
    pub folder_vars: Vec<Variable>,
    #[serde(default)]
    pub env_vars: Vec<Variable>,
    #[serde(default)]
    pub collection_vars: Vec<Variable>,
    #[serde(default)]
    pub global_env_vars: Vec<Variable>,
}

/// The writable scopes, in their fixed serialization order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSnapshot {
    pub runtime_vars: Vec<Variable>,
    pub env_vars: Vec<Variable>,
    pub global_env_vars: Vec<Variable>,
}

/// Scoped variable storage for one execution.
#[derive(Debug, Clone)]
pub struct VariableStore {
    runtime: VariableScope,
    request: VariableScope,
    folder: VariableScope,
    environment: VariableScope,
    collection: VariableScope,
    global_environment: VariableScope,
    precedence: Vec<ScopeKind>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new(VariableSeed::default())
    }
}

impl VariableStore {
    /// Creates a store from its initial scope contents.
    pub fn new(seed: VariableSeed) -> Self {
        Self {
            runtime: VariableScope::with_vars(ScopeKind::Runtime, seed.runtime_vars),
            request: VariableScope::with_vars(ScopeKind::Request, seed.request_vars),
            folder: VariableScope::with_vars(ScopeKind::Folder, seed.folder_vars),
            environment: VariableScope::with_vars(ScopeKind::Environment, seed.env_vars),
            collection: VariableScope::with_vars(ScopeKind::Collection, seed.collection_vars),
            global_environment: VariableScope::with_vars(
                ScopeKind::GlobalEnvironment,
                seed.global_env_vars,
            ),
            precedence: INTERPOLATION_ORDER.to_vec(),
        }
    }

    /// Replaces the resolution order used by [`resolve`](Self::resolve) and
    /// interpolation.
    pub fn with_precedence(mut self, precedence: Vec<ScopeKind>) -> Self {
        self.precedence = precedence;
        self
    }

    /// Current resolution order, highest precedence first.
    pub fn precedence(&self) -> &[ScopeKind] {
        &self.precedence
    }

    /// Read access to a scope.
    pub fn scope(&self, kind: ScopeKind) -> &VariableScope {
        match kind {
            ScopeKind::Runtime => &self.runtime,
            ScopeKind::Request => &self.request,
            ScopeKind::Folder => &self.folder,
            ScopeKind::Environment => &self.environment,
            ScopeKind::Collection => &self.collection,
            ScopeKind::GlobalEnvironment => &self.global_environment,
        }
    }

    fn scope_mut(&mut self, kind: ScopeKind) -> &mut VariableScope {
        match kind {
            ScopeKind::Runtime => &mut self.runtime,
            ScopeKind::Request => &mut self.request,
            ScopeKind::Folder => &mut self.folder,
            ScopeKind::Environment => &mut self.environment,
            ScopeKind::Collection => &mut self.collection,
            ScopeKind::GlobalEnvironment => &mut self.global_environment,
        }
    }

    /// Looks `name` up in a single scope.
    pub fn get(&self, kind: ScopeKind, name: &str) -> Option<&Value> {
        self.scope(kind).lookup(name)
    }

    /// Writes `name` into a writable scope.
    pub fn set(&mut self, kind: ScopeKind, name: &str, value: Value) -> Result<(), VarError> {
        if !kind.is_writable() {
            return Err(VarError::ReadOnlyScope(kind));
        }
        self.scope_mut(kind).set(name, value);
        Ok(())
    }

    /// Removes every entry named `name` from a scope that supports deletion.
    pub fn delete(&mut self, kind: ScopeKind, name: &str) -> Result<(), VarError> {
        if !kind.supports_delete() {
            return Err(VarError::DeleteUnsupported(kind));
        }
        self.scope_mut(kind).remove(name);
        Ok(())
    }

    /// Walks the precedence order and returns the first defined value.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.precedence
            .iter()
            .find_map(|kind| self.scope(*kind).lookup(name))
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        self.runtime.set(name, value);
    }

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.runtime.get(name)
    }

    pub fn delete_var(&mut self, name: &str) {
        self.runtime.remove(name);
    }

    pub fn set_env_var(&mut self, name: &str, value: Value) {
        self.environment.set(name, value);
    }

    pub fn get_env_var(&self, name: &str) -> Option<&Value> {
        self.environment.get(name)
    }

    pub fn set_global_env_var(&mut self, name: &str, value: Value) {
        self.global_environment.set(name, value);
    }

    pub fn get_global_env_var(&self, name: &str) -> Option<&Value> {
        self.global_environment.get(name)
    }

    pub fn get_request_var(&self, name: &str) -> Option<&Value> {
        self.request.get(name)
    }

    pub fn get_folder_var(&self, name: &str) -> Option<&Value> {
        self.folder.get(name)
    }

    pub fn get_collection_var(&self, name: &str) -> Option<&Value> {
        self.collection.get(name)
    }

    /// Process environment lookup.
    ///
    /// Process variables are ordinary collection entries named
    /// `process.env.<name>`; the real process environment is never consulted.
    pub fn get_process_env(&self, name: &str) -> Option<&Value> {
        self.collection.get(&format!("{}{}", PROCESS_ENV_PREFIX, name))
    }

    /// Interpolates a value.
    ///
    /// Non-string values are returned unchanged.
    pub fn interpolate(&self, value: &Value, mock: &dyn MockDataProvider) -> Value {
        match value {
            Value::String(text) => Value::String(self.interpolate_str(text, mock)),
            other => other.clone(),
        }
    }

    /// Substitutes `{{name}}` placeholders in `text` using the precedence order.
    pub fn interpolate_str(&self, text: &str, mock: &dyn MockDataProvider) -> String {
        substitute_variables(text, |name| self.resolve(name).cloned(), mock)
    }

    /// Exports the writable scopes.
    pub fn to_map(&self) -> VariableSnapshot {
        VariableSnapshot {
            runtime_vars: self.runtime.vars().to_vec(),
            env_vars: self.environment.vars().to_vec(),
            global_env_vars: self.global_environment.vars().to_vec(),
        }
    }
}
