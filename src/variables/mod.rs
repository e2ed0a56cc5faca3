//! Scoped variables and `{{variable}}` interpolation.
//!
//! Six scopes (runtime, request, folder, environment, collection, global
//! environment) live in a [`VariableStore`]. Interpolation walks the scopes
//! in precedence order and hands `{{$name}}` placeholders to a
//! [`MockDataProvider`].

pub mod mock;
pub mod scope;
pub mod store;
pub mod substitution;

pub use mock::{FakeData, MockDataProvider};
pub use scope::{ScopeKind, ScopeProvider, Variable, VariableScope, INTERPOLATION_ORDER};
pub use store::{VarError, VariableSeed, VariableSnapshot, VariableStore, PROCESS_ENV_PREFIX};
pub use substitution::substitute_variables;
