//! Host services exposed to scripts: `console`, `fs`, `path` and `process`.
//!
//! File system access is not confined to the collection: relative paths are
//! resolved against the collection root, absolute paths are used as given.
//! Scripts are treated as semi-trusted.

use super::convert::to_text;
use crate::bru::Bru;
use log::{error, info, warn};
use rhai::{Dynamic, Engine, EvalAltResult};
use std::fs;
use std::path::{Path, PathBuf};

/// `console` object. Output goes to the process logger, never to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

/// `fs` object.
#[derive(Debug, Clone)]
pub struct FsService {
    root: PathBuf,
}

impl FsService {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Reads a UTF-8 file.
    pub fn read_file(&self, path: &str) -> Result<String, std::io::Error> {
        fs::read_to_string(self.resolve(path))
    }

    /// Writes a file, creating parent directories as needed.
    pub fn write_file(&self, path: &str, contents: &str) -> Result<(), std::io::Error> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }
}

/// `path` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathService;

impl PathService {
    pub fn join(parts: &[&str]) -> String {
        let mut joined = PathBuf::new();
        for part in parts {
            joined.push(part);
        }
        joined.to_string_lossy().into_owned()
    }

    pub fn dirname(path: &str) -> String {
        Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn basename(path: &str) -> String {
        Path::new(path)
            .file_name()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, or `""`.
    pub fn extname(path: &str) -> String {
        Path::new(path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// `process` object.
///
/// `env(name)` reads `process.env.<name>` collection variables, the same
/// lookup as `bru.getProcessEnv`; the real process environment is not
/// exposed.
#[derive(Debug, Clone)]
pub struct ProcessService {
    bru: Bru,
    cwd: PathBuf,
}

impl ProcessService {
    pub fn new(bru: Bru, cwd: PathBuf) -> Self {
        Self { bru, cwd }
    }
}

fn join_args(args: &[&Dynamic]) -> String {
    args.iter()
        .map(|arg| to_text(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn io_error(action: &str, path: &str, err: std::io::Error) -> Box<EvalAltResult> {
    format!("{} '{}' failed: {}", action, path, err).into()
}

/// Registers the host service types and their methods.
pub fn register(engine: &mut Engine) {
    engine.register_type_with_name::<Console>("Console");
    for (name, level) in [
        ("log", log::Level::Info),
        ("info", log::Level::Info),
        ("warn", log::Level::Warn),
        ("error", log::Level::Error),
    ] {
        engine.register_fn(name, move |_: &mut Console, a: Dynamic| {
            emit(level, &join_args(&[&a]));
        });
        engine.register_fn(name, move |_: &mut Console, a: Dynamic, b: Dynamic| {
            emit(level, &join_args(&[&a, &b]));
        });
        engine.register_fn(
            name,
            move |_: &mut Console, a: Dynamic, b: Dynamic, c: Dynamic| {
                emit(level, &join_args(&[&a, &b, &c]));
            },
        );
    }

    engine.register_type_with_name::<FsService>("Fs");
    engine.register_fn(
        "readFile",
        |fs: &mut FsService, path: &str| -> Result<String, Box<EvalAltResult>> {
            fs.read_file(path).map_err(|e| io_error("readFile", path, e))
        },
    );
    engine.register_fn(
        "writeFile",
        |fs: &mut FsService, path: &str, contents: Dynamic| -> Result<(), Box<EvalAltResult>> {
            fs.write_file(path, &to_text(&contents))
                .map_err(|e| io_error("writeFile", path, e))
        },
    );
    engine.register_fn("exists", |fs: &mut FsService, path: &str| fs.exists(path));

    engine.register_type_with_name::<PathService>("Path");
    engine.register_fn("join", |_: &mut PathService, a: &str, b: &str| {
        PathService::join(&[a, b])
    });
    engine.register_fn("join", |_: &mut PathService, a: &str, b: &str, c: &str| {
        PathService::join(&[a, b, c])
    });
    engine.register_fn("dirname", |_: &mut PathService, p: &str| PathService::dirname(p));
    engine.register_fn("basename", |_: &mut PathService, p: &str| PathService::basename(p));
    engine.register_fn("extname", |_: &mut PathService, p: &str| PathService::extname(p));

    engine.register_type_with_name::<ProcessService>("Process");
    engine.register_fn("env", |process: &mut ProcessService, name: &str| {
        super::convert::opt_to_dynamic(process.bru.get_process_env(name))
    });
    engine.register_fn("cwd", |process: &mut ProcessService| {
        process.cwd.to_string_lossy().into_owned()
    });
    engine.register_fn("platform", |_: &mut ProcessService| std::env::consts::OS.to_string());
}

fn emit(level: log::Level, message: &str) {
    match level {
        log::Level::Error => error!(target: "script", "{}", message),
        log::Level::Warn => warn!(target: "script", "{}", message),
        _ => info!(target: "script", "{}", message),
    }
}
