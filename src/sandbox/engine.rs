//! Engine construction.
//!
//! Every execution builds its own [`Engine`]: limits from the configuration,
//! a progress hook tied to the run's budget, the capability types, and a
//! module resolver anchored at the collection root. Nothing is shared
//! between runs.

use super::bindings::{self, HostRuntime};
use super::context::ScriptContext;
use super::host;
use super::resolver::CollectionModuleResolver;
use crate::config::SandboxConfig;
use log::{debug, info};
use rhai::{Dynamic, Engine};

/// Builds the engine for one run.
///
/// # Arguments
///
/// * `config` - Limits and resolution settings
/// * `context` - Capability context; imported modules see the same one
/// * `runtime` - Runtime bridge carrying the run's budget
pub fn build_engine(config: &SandboxConfig, context: &ScriptContext, runtime: HostRuntime) -> Engine {
    let mut engine = Engine::new();

    // No dynamic code evaluation from inside a script.
    engine.disable_symbol("eval");

    if config.max_operations > 0 {
        engine.set_max_operations(config.max_operations);
    }
    engine.set_max_call_levels(config.max_call_levels);
    if config.max_string_size > 0 {
        engine.set_max_string_size(config.max_string_size);
    }

    let budget = runtime.budget().clone();
    engine.on_progress(move |_ops| {
        budget
            .check()
            .map(|interrupt| Dynamic::from(interrupt.token().to_string()))
    });

    engine.on_print(|text| info!(target: "script", "{}", text));
    engine.on_debug(|text, source, pos| match source {
        Some(source) => debug!(target: "script", "{} @ {:?}: {}", source, pos, text),
        None => debug!(target: "script", "{:?}: {}", pos, text),
    });

    host::register(&mut engine);
    bindings::register(&mut engine, context.res.clone(), runtime);

    engine.set_module_resolver(CollectionModuleResolver::new(
        context.clone(),
        &config.packages_dir,
        &config.script_extension,
    ));

    engine
}
