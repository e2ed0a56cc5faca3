//! Script-facing methods of `req`, `res` and `bru`.
//!
//! Host calls that wait on I/O (`runRequest`, `sendRequest`, `sleep`) block
//! the evaluation thread on the captured runtime handle. Each wait races the
//! run's [`Budget`], so a timeout or cancellation interrupts it just like a
//! busy loop.

use super::cancellation::{Budget, Interrupt};
use super::context::{ScriptRequest, ScriptResponse};
use super::convert::{from_dynamic, map_into, opt_to_dynamic, raw_flag, to_dynamic, to_text};
use crate::bru::Bru;
use crate::models::BodyOptions;
use crate::transport::RequestSpec;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, Map, NativeCallContext, Position, INT};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;

type FnResult<T> = Result<T, Box<EvalAltResult>>;

/// Bridge from the synchronous engine thread back into the async runtime.
#[derive(Debug, Clone)]
pub struct HostRuntime {
    handle: Handle,
    budget: Budget,
}

impl HostRuntime {
    pub fn new(handle: Handle, budget: Budget) -> Self {
        Self { handle, budget }
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Drives `fut` to completion unless the budget runs out first.
    ///
    /// Must be called from a thread that is not itself driving the runtime
    /// (the executor evaluates scripts on a blocking thread).
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        if let Some(interrupt) = self.budget.check() {
            return Err(interrupt);
        }

        let budget = self.budget.clone();
        self.handle.block_on(async move {
            tokio::select! {
                out = fut => Ok(out),
                _ = tokio::time::sleep(budget.remaining()) => Err(Interrupt::Timeout),
                _ = budget.cancel_handle().cancelled() => Err(Interrupt::Cancelled),
            }
        })
    }

    /// Suspends the script for `ms` milliseconds.
    pub fn sleep(&self, ms: u64) -> Result<(), Interrupt> {
        let duration = Duration::from_millis(ms);
        // The timer must be created inside the runtime.
        self.block_on(async move { tokio::time::sleep(duration).await })
    }
}

/// Registers the `Request`, `Response` and `Bru` types.
///
/// # Arguments
///
/// * `engine` - Engine to register on
/// * `response` - Response backing the global `res(path)` shorthand
/// * `runtime` - Runtime used by blocking host calls
pub fn register(engine: &mut Engine, response: Option<ScriptResponse>, runtime: HostRuntime) {
    register_request(engine);
    register_response(engine, response);
    register_bru(engine, runtime);
}

fn string_map(headers: &BTreeMap<String, String>) -> Map {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().into(), Dynamic::from(value.clone())))
        .collect()
}

fn value_map(headers: &BTreeMap<String, Value>) -> Map {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().into(), to_dynamic(value)))
        .collect()
}

fn opt_string(value: &Option<String>) -> Dynamic {
    value.clone().map(Dynamic::from).unwrap_or(Dynamic::UNIT)
}

fn body_options(options: &Map) -> BodyOptions {
    BodyOptions {
        raw: raw_flag(options),
    }
}

fn register_request(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptRequest>("Request");

    engine.register_fn("getUrl", |req: &mut ScriptRequest| req.read().url.clone());
    engine.register_fn("getMethod", |req: &mut ScriptRequest| req.read().method.clone());
    engine.register_fn("getName", |req: &mut ScriptRequest| opt_string(&req.read().name));
    engine.register_fn("getAuthMode", |req: &mut ScriptRequest| {
        opt_string(&req.read().auth_mode)
    });
    engine.register_fn("getHeaders", |req: &mut ScriptRequest| string_map(&req.read().headers));
    engine.register_fn("getHeader", |req: &mut ScriptRequest, name: &str| {
        req.read()
            .get_header(name)
            .map(|value| Dynamic::from(value.to_string()))
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("getBody", |req: &mut ScriptRequest| {
        to_dynamic(&req.read().get_body(&BodyOptions::default()))
    });
    engine.register_fn("getBody", |req: &mut ScriptRequest, options: Map| {
        to_dynamic(&req.read().get_body(&body_options(&options)))
    });
    engine.register_fn("getTimeout", |req: &mut ScriptRequest| {
        req.read().timeout.map(Dynamic::from).unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("getExecutionMode", |req: &mut ScriptRequest| {
        req.read().execution_mode.as_str().to_string()
    });
    engine.register_fn("getExecutionPlatform", |req: &mut ScriptRequest| {
        req.read().execution_platform.as_str().to_string()
    });

    engine.register_fn("setUrl", |req: &mut ScriptRequest, url: &str| {
        req.write().url = url.to_string();
    });
    engine.register_fn("setMethod", |req: &mut ScriptRequest, method: &str| {
        req.write().method = method.to_string();
    });
    engine.register_fn("setHeader", |req: &mut ScriptRequest, name: &str, value: Dynamic| {
        req.write().set_header(name, to_text(&value));
    });
    engine.register_fn("setHeaders", |req: &mut ScriptRequest, headers: Map| {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), to_text(value)))
            .collect();
        req.write().set_headers(headers);
    });
    engine.register_fn("setTimeout", |req: &mut ScriptRequest, timeout: INT| {
        req.write().timeout = Some(timeout);
    });
    engine.register_fn("setBody", |req: &mut ScriptRequest, data: Dynamic| {
        req.write().set_body(from_dynamic(&data), &BodyOptions::default());
    });
    engine.register_fn("setBody", |req: &mut ScriptRequest, data: Dynamic, options: Map| {
        req.write().set_body(from_dynamic(&data), &body_options(&options));
    });
    engine.register_fn("setMaxRedirects", |req: &mut ScriptRequest, max: INT| {
        req.write().set_max_redirects(max);
    });
    engine.register_fn("onFail", |req: &mut ScriptRequest, _handler: FnPtr| {
        req.read().on_fail();
    });

    engine.register_get("url", |req: &mut ScriptRequest| req.read().url.clone());
    engine.register_get("method", |req: &mut ScriptRequest| req.read().method.clone());
    engine.register_get("headers", |req: &mut ScriptRequest| string_map(&req.read().headers));
    engine.register_get("body", |req: &mut ScriptRequest| {
        to_dynamic(&req.read().get_body(&BodyOptions::default()))
    });
}

fn register_response(engine: &mut Engine, response: Option<ScriptResponse>) {
    engine.register_type_with_name::<ScriptResponse>("Response");

    engine.register_fn("getStatus", |res: &mut ScriptResponse| res.read().status as INT);
    engine.register_fn("getStatusText", |res: &mut ScriptResponse| {
        opt_string(&res.read().status_text)
    });
    engine.register_fn("getHeaders", |res: &mut ScriptResponse| value_map(&res.read().headers));
    engine.register_fn("getHeader", |res: &mut ScriptResponse, name: &str| {
        res.read()
            .get_header(name)
            .map(to_dynamic)
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("getBody", |res: &mut ScriptResponse| {
        to_dynamic(&res.read().get_body(&BodyOptions::default()))
    });
    engine.register_fn("getBody", |res: &mut ScriptResponse, options: Map| {
        to_dynamic(&res.read().get_body(&body_options(&options)))
    });
    engine.register_fn("getUrl", |res: &mut ScriptResponse| opt_string(&res.read().url));
    engine.register_fn("getSize", |res: &mut ScriptResponse| {
        res.read().size.map(|size| size as INT).map(Dynamic::from).unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("getResponseTime", |res: &mut ScriptResponse| {
        res.read()
            .response_time
            .map(|ms| ms as INT)
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("setBody", |res: &mut ScriptResponse, data: Dynamic| {
        res.write().set_body(from_dynamic(&data));
    });
    engine.register_fn("query", |res: &mut ScriptResponse, path: &str| {
        opt_to_dynamic(res.read().query(path))
    });

    engine.register_get("status", |res: &mut ScriptResponse| res.read().status as INT);
    engine.register_get("statusText", |res: &mut ScriptResponse| {
        opt_string(&res.read().status_text)
    });
    engine.register_get("headers", |res: &mut ScriptResponse| value_map(&res.read().headers));
    engine.register_get("body", |res: &mut ScriptResponse| {
        to_dynamic(&res.read().get_body(&BodyOptions::default()))
    });
    engine.register_get("url", |res: &mut ScriptResponse| opt_string(&res.read().url));

    engine.register_fn("res", move |path: &str| -> FnResult<Dynamic> {
        match &response {
            Some(res) => Ok(opt_to_dynamic(res.read().query(path))),
            None => Err("res() is only available in post-response scripts".into()),
        }
    });
}

fn interrupted(interrupt: Interrupt, pos: Position) -> Box<EvalAltResult> {
    interrupt.into_eval_error(pos)
}

fn register_bru(engine: &mut Engine, runtime: HostRuntime) {
    engine.register_type_with_name::<Bru>("Bru");

    engine.register_fn("setVar", |bru: &mut Bru, name: &str, value: Dynamic| {
        bru.set_var(name, from_dynamic(&value));
    });
    engine.register_fn("getVar", |bru: &mut Bru, name: &str| opt_to_dynamic(bru.get_var(name)));
    engine.register_fn("deleteVar", |bru: &mut Bru, name: &str| bru.delete_var(name));
    engine.register_fn("setEnvVar", |bru: &mut Bru, name: &str, value: Dynamic| {
        bru.set_env_var(name, from_dynamic(&value));
    });
    engine.register_fn("getEnvVar", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_env_var(name))
    });
    engine.register_fn("setGlobalEnvVar", |bru: &mut Bru, name: &str, value: Dynamic| {
        bru.set_global_env_var(name, from_dynamic(&value));
    });
    engine.register_fn("getGlobalEnvVar", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_global_env_var(name))
    });
    engine.register_fn("getRequestVar", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_request_var(name))
    });
    engine.register_fn("getFolderVar", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_folder_var(name))
    });
    engine.register_fn("getCollectionVar", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_collection_var(name))
    });
    engine.register_fn("getProcessEnv", |bru: &mut Bru, name: &str| {
        opt_to_dynamic(bru.get_process_env(name))
    });
    engine.register_fn("interpolate", |bru: &mut Bru, value: Dynamic| {
        if value.is_string() {
            Dynamic::from(bru.interpolate_str(&to_text(&value)))
        } else {
            value
        }
    });

    let rt = runtime.clone();
    engine.register_fn(
        "runRequest",
        move |ctx: NativeCallContext, bru: &mut Bru, path: &str| -> FnResult<ScriptResponse> {
            let outcome = rt
                .block_on(bru.run_request(path))
                .map_err(|interrupt| interrupted(interrupt, ctx.position()))?;
            outcome
                .map(ScriptResponse::new)
                .map_err(|err| err.to_string().into())
        },
    );

    let rt = runtime.clone();
    engine.register_fn(
        "sendRequest",
        move |ctx: NativeCallContext, bru: &mut Bru, config: Map| -> FnResult<ScriptResponse> {
            let spec: RequestSpec = map_into(config)?;
            let outcome = rt
                .block_on(bru.send(&spec))
                .map_err(|interrupt| interrupted(interrupt, ctx.position()))?;
            match outcome.error {
                Some(err) => Err(err.to_string().into()),
                None => Ok(ScriptResponse::new(outcome.response)),
            }
        },
    );

    let rt = runtime.clone();
    engine.register_fn(
        "sendRequest",
        move |ctx: NativeCallContext,
              bru: &mut Bru,
              config: Map,
              callback: FnPtr|
              -> FnResult<Dynamic> {
            let spec: RequestSpec = map_into(config)?;
            let outcome = rt
                .block_on(bru.send(&spec))
                .map_err(|interrupt| interrupted(interrupt, ctx.position()))?;
            let err = outcome
                .error
                .map(|err| Dynamic::from(err.to_string()))
                .unwrap_or(Dynamic::UNIT);
            let res = Dynamic::from(ScriptResponse::new(outcome.response));
            callback.call_within_context::<Dynamic>(&ctx, (err, res))
        },
    );

    engine.register_fn(
        "sleep",
        move |ctx: NativeCallContext, _bru: &mut Bru, ms: INT| -> FnResult<()> {
            let ms = u64::try_from(ms).unwrap_or(0);
            runtime
                .sleep(ms)
                .map_err(|interrupt| interrupted(interrupt, ctx.position()))
        },
    );
}
