//! The capability context a script runs against.
//!
//! A [`ScriptContext`] owns shared handles to the request, the optional
//! response and the `bru` facade. Cloning it is cheap and every clone sees
//! the same state, which is how mutations made by the script (or by modules
//! it imports) become visible to the driver afterwards.

use super::host::{Console, FsService, PathService, ProcessService};
use crate::bru::Bru;
use crate::models::{HttpRequest, HttpResponse};
use rhai::{Dynamic, Scope};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to the request, registered in scripts as `Request`.
#[derive(Debug, Clone)]
pub struct ScriptRequest(Arc<RwLock<HttpRequest>>);

impl ScriptRequest {
    pub fn new(request: HttpRequest) -> Self {
        Self(Arc::new(RwLock::new(request)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HttpRequest> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HttpRequest> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> HttpRequest {
        self.read().clone()
    }
}

/// Shared handle to the response, registered in scripts as `Response`.
#[derive(Debug, Clone)]
pub struct ScriptResponse(Arc<RwLock<HttpResponse>>);

impl ScriptResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self(Arc::new(RwLock::new(response)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HttpResponse> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HttpResponse> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> HttpResponse {
        self.read().clone()
    }
}

/// Everything a script can reach.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    /// The in-flight request (`req`).
    pub req: ScriptRequest,
    /// The response (`res`), absent for pre-request scripts.
    pub res: Option<ScriptResponse>,
    /// Variables and outbound HTTP (`bru`).
    pub bru: Bru,
    /// Directory that collection modules and packages resolve against.
    pub collection_root: PathBuf,
}

impl ScriptContext {
    /// Creates a context.
    ///
    /// # Arguments
    ///
    /// * `request` - The request the script operates on
    /// * `response` - The response, for post-response scripts
    /// * `bru` - Variable store facade
    /// * `collection_root` - Root directory of the collection
    pub fn new(
        request: HttpRequest,
        response: Option<HttpResponse>,
        bru: Bru,
        collection_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            req: ScriptRequest::new(request),
            res: response.map(ScriptResponse::new),
            bru,
            collection_root: collection_root.into(),
        }
    }

    pub fn collection_root(&self) -> &Path {
        &self.collection_root
    }

    /// Builds a fresh scope holding the capability surface.
    ///
    /// Used for the top-level script and for every imported collection
    /// module, so both see the same objects.
    pub fn scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push("req", self.req.clone());
        match &self.res {
            Some(res) => scope.push("res", res.clone()),
            None => scope.push("res", Dynamic::UNIT),
        };
        scope.push("bru", self.bru.clone());
        scope.push("console", Console);
        scope.push("fs", FsService::new(self.collection_root.clone()));
        scope.push("path", PathService);
        scope.push("process", ProcessService::new(self.bru.clone(), self.collection_root.clone()));
        scope
    }
}
