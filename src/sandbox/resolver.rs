//! Module resolution for `import` statements.
//!
//! Resolution order for an id:
//!
//! 1. An allow-listed library is returned directly.
//! 2. A relative id (`./x`, `../x`) is a collection file, resolved against
//!    the collection root no matter which file issued the import.
//! 3. Anything else is a collection package under `<root>/<packages dir>`.
//!
//! For files and packages the candidates are the exact path, the path with
//! the script extension appended, and `index.<ext>` inside the path. Loaded
//! modules run with the same capability scope as the top-level script plus
//! `__filename` and `__dirname`, and are cached for the rest of the run.

use super::context::ScriptContext;
use super::error::ModuleResolutionError;
use super::libraries;
use log::debug;
use rhai::{Engine, EvalAltResult, Module, ModuleResolver, Position, Shared};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Where an import id points.
#[derive(Debug, Clone)]
pub enum ModuleSource {
    /// An allow-listed native library.
    Library(Shared<Module>),
    /// A collection-relative file; the path is the un-extended base.
    CollectionFile(PathBuf),
    /// A collection-local package; the path is the un-extended base.
    CollectionPackage(PathBuf),
}

/// Resolver installed on every sandbox engine.
#[derive(Debug)]
pub struct CollectionModuleResolver {
    root: PathBuf,
    packages_dir: PathBuf,
    extension: String,
    context: ScriptContext,
    cache: Mutex<HashMap<PathBuf, Shared<Module>>>,
    loading: Mutex<HashSet<PathBuf>>,
}

fn is_relative_id(id: &str) -> bool {
    id.starts_with("./") || id.starts_with("../")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CollectionModuleResolver {
    /// Creates a resolver for one execution.
    ///
    /// # Arguments
    ///
    /// * `context` - Capability context handed to loaded modules; its
    ///   collection root anchors resolution
    /// * `packages_dir` - Package directory name under the root
    /// * `extension` - Script file extension, without the dot
    pub fn new(context: ScriptContext, packages_dir: &str, extension: &str) -> Self {
        let root = context.collection_root().to_path_buf();
        Self {
            packages_dir: root.join(packages_dir),
            root,
            extension: extension.trim_start_matches('.').to_string(),
            context,
            cache: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
        }
    }

    /// Decides which strategy handles `id`.
    pub fn classify(&self, id: &str) -> ModuleSource {
        if let Some(module) = libraries::library(id) {
            ModuleSource::Library(module)
        } else if is_relative_id(id) {
            ModuleSource::CollectionFile(self.root.join(id))
        } else {
            ModuleSource::CollectionPackage(self.packages_dir.join(id))
        }
    }

    /// Candidate files for a base path, in lookup order.
    pub fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let mut extended = OsString::from(base.as_os_str());
        extended.push(".");
        extended.push(&self.extension);

        vec![
            base.to_path_buf(),
            PathBuf::from(extended),
            base.join(format!("index.{}", self.extension)),
        ]
    }

    fn locate(&self, id: &str, base: &Path) -> Result<PathBuf, ModuleResolutionError> {
        let attempted = self.candidates(base);
        match attempted.iter().find(|candidate| candidate.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(ModuleResolutionError::NotFound {
                id: id.to_string(),
                attempted,
            }),
        }
    }

    fn load(
        &self,
        engine: &Engine,
        id: &str,
        file: &Path,
        pos: Position,
    ) -> Result<Module, Box<EvalAltResult>> {
        let source = fs::read_to_string(file).map_err(|e| ModuleResolutionError::Read {
            id: id.to_string(),
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut ast = engine
            .compile(&source)
            .map_err(|e| ModuleResolutionError::Parse {
                id: id.to_string(),
                path: file.to_path_buf(),
                message: e.to_string(),
            })?;
        ast.set_source(file.to_string_lossy().into_owned());

        let dirname = file
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut scope = self.context.scope();
        scope.push_constant("__filename", file.to_string_lossy().into_owned());
        scope.push_constant("__dirname", dirname);

        let mut module = Module::eval_ast_as_new(scope, &ast, engine)
            .map_err(|err| EvalAltResult::ErrorInModule(id.to_string(), err, pos))?;
        module.set_id(id);
        module.build_index();
        Ok(module)
    }
}

impl ModuleResolver for CollectionModuleResolver {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> Result<Shared<Module>, Box<EvalAltResult>> {
        let base = match self.classify(path) {
            ModuleSource::Library(module) => {
                debug!("import '{}' -> allow-listed library", path);
                return Ok(module);
            }
            ModuleSource::CollectionFile(base) | ModuleSource::CollectionPackage(base) => base,
        };

        let file = self.locate(path, &base)?;

        if let Some(module) = lock(&self.cache).get(&file) {
            return Ok(module.clone());
        }

        if !lock(&self.loading).insert(file.clone()) {
            return Err(ModuleResolutionError::Circular {
                id: path.to_string(),
                path: file,
            }
            .into());
        }

        debug!("import '{}' -> {}", path, file.display());
        let loaded = self.load(engine, path, &file, pos);
        lock(&self.loading).remove(&file);

        let module = Shared::new(loaded?);
        lock(&self.cache).insert(file, module.clone());
        Ok(module)
    }
}
