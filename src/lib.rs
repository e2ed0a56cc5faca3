//! Sandboxed scripting for collection-based HTTP clients
//!
//! Runs user-authored pre-request and post-response scripts against the
//! request being sent, the response that came back, and the collection's
//! variables. Scripts are written in Rhai and evaluated in an isolated
//! engine that exposes only an explicit set of capabilities.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **models**: The request (`req`) and response (`res`) models
//! - **variables**: Six variable scopes, precedence lookup and `{{var}}` interpolation
//! - **bru**: The `bru` facade over the variable store and outbound HTTP
//! - **transport**: The HTTP collaborator used by `runRequest` / `sendRequest`
//! - **sandbox**: Engine construction, module resolution, limits and the executor
//! - **driver**: Input/output records and the two entry points
//! - **config**: Sandbox settings with a process-wide singleton
//!
//! # Execution flow
//!
//! 1. The driver parses a [`driver::ScriptInput`] and validates it
//! 2. It builds the models, the variable store and a [`sandbox::ScriptContext`]
//! 3. [`sandbox::SandboxExecutor`] runs the script within its time budget
//! 4. The mutated state is snapshotted into a [`driver::ScriptOutput`]
//!
//! # Example
//!
//! ```no_run
//! use bru_script::driver::{run_script, ScriptInput};
//!
//! # async fn example() -> Result<(), bru_script::Error> {
//! let input = ScriptInput::from_json(
//!     r#"{"request":{"method":"GET","url":"http://host/{{base}}"},"requestMap":{},
//!         "vars":{"runtimeVars":[{"name":"base","value":"v1"}]}}"#,
//! )?;
//! let output = run_script(input, r#"bru.setVar("x", bru.interpolate("{{base}}") + "-done");"#).await?;
//! println!("{}", output.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod bru;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod sandbox;
pub mod transport;
pub mod variables;

pub use error::{Error, Result};
