//! Script sandbox.
//!
//! Runs one user script against a [`ScriptContext`] inside an isolated
//! engine. The script can reach only the capability surface in the context
//! scope (`req`, `res`, `bru`, `console`, `fs`, `path`, `process`) plus the
//! modules its `import` statements resolve to.
//!
//! Evaluation happens on a blocking thread. The run's [`Budget`] is checked
//! by the engine's progress hook and by every blocking host call, and the
//! async side additionally stops waiting once the deadline (plus a short
//! grace period) has passed. A thread stuck in native code past that point
//! is abandoned; its result is discarded.

pub mod bindings;
pub mod cancellation;
pub mod context;
pub mod convert;
pub mod engine;
pub mod error;
pub mod host;
pub mod libraries;
pub mod resolver;

pub use bindings::HostRuntime;
pub use cancellation::{Budget, CancelHandle, Interrupt};
pub use context::{ScriptContext, ScriptRequest, ScriptResponse};
pub use engine::build_engine;
pub use error::{FailureKind, ModuleResolutionError, Result, ScriptError};
pub use resolver::{CollectionModuleResolver, ModuleSource};

use crate::config::SandboxConfig;
use log::debug;
use rhai::Dynamic;
use serde_json::Value;
use std::any::Any;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinError;

/// Time the async side keeps waiting after the budget, giving the engine a
/// chance to report the interrupt itself.
const GRACE_PERIOD: Duration = Duration::from_millis(250);

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    /// Completion value of the script, `null` for `()`.
    pub value: Value,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

/// Executes scripts with the limits of a [`SandboxConfig`].
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    config: SandboxConfig,
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Executes `script` against `context`.
    ///
    /// Mutations the script makes through `req`, `res` and `bru` are visible
    /// on `context` afterwards, also when the script fails part way.
    ///
    /// # Returns
    ///
    /// The script's completion value, or a [`ScriptError`] describing why it
    /// did not complete.
    pub async fn execute(&self, script: &str, context: &ScriptContext) -> Result<ScriptOutcome> {
        self.execute_with_cancel(script, context, CancelHandle::new())
            .await
    }

    /// Executes `script`, stopping early if `cancel` is triggered.
    ///
    /// # Arguments
    ///
    /// * `script` - Script source
    /// * `context` - Capability context
    /// * `cancel` - Handle that may be cancelled from another task
    pub async fn execute_with_cancel(
        &self,
        script: &str,
        context: &ScriptContext,
        cancel: CancelHandle,
    ) -> Result<ScriptOutcome> {
        let started = Instant::now();
        let timeout = self.config.timeout_duration();
        let timeout_ms = self.config.timeout;

        let budget = Budget::new(timeout, cancel.clone());
        let engine = build_engine(
            &self.config,
            context,
            HostRuntime::new(Handle::current(), budget),
        );

        let ast = engine.compile(script).map_err(ScriptError::from)?;
        let mut scope = context.scope();

        let task = tokio::task::spawn_blocking(move || {
            engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
        });

        let joined = tokio::select! {
            joined = task => joined,
            _ = tokio::time::sleep(timeout + GRACE_PERIOD) => {
                debug!("Script exceeded {}ms, abandoning evaluation thread", timeout_ms);
                return Err(ScriptError::Timeout { timeout_ms });
            }
            _ = async {
                cancel.cancelled().await;
                tokio::time::sleep(GRACE_PERIOD).await;
            } => {
                debug!("Script cancelled, abandoning evaluation thread");
                return Err(ScriptError::Cancelled);
            }
        };

        let value = joined
            .map_err(panic_error)?
            .map_err(|err| ScriptError::classify(&err, timeout_ms))?;

        let elapsed = started.elapsed();
        debug!("Script completed in {:?}", elapsed);

        Ok(ScriptOutcome {
            value: convert::from_dynamic(&value),
            elapsed,
        })
    }
}

fn panic_error(err: JoinError) -> ScriptError {
    if !err.is_panic() {
        return ScriptError::Panic {
            message: err.to_string(),
        };
    }
    ScriptError::Panic {
        message: panic_message(err.into_panic()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluation thread panicked".to_string()
    }
}
