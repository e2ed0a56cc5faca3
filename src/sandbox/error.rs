//! Script execution error types

use rhai::{EvalAltResult, ParseError, Position};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Script execution result type
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Token carried by `ErrorTerminated` when the time budget ran out.
pub const TIMEOUT_TOKEN: &str = "timeout";

/// Token carried by `ErrorTerminated` when the run was cancelled.
pub const CANCEL_TOKEN: &str = "cancelled";

/// A module import that could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResolutionError {
    /// No candidate file exists.
    NotFound { id: String, attempted: Vec<PathBuf> },
    /// The file exists but could not be read.
    Read {
        id: String,
        path: PathBuf,
        message: String,
    },
    /// The file does not compile.
    Parse {
        id: String,
        path: PathBuf,
        message: String,
    },
    /// The module is already being loaded further up the import chain.
    Circular { id: String, path: PathBuf },
}

impl ModuleResolutionError {
    /// The id the script asked for.
    pub fn id(&self) -> &str {
        match self {
            Self::NotFound { id, .. }
            | Self::Read { id, .. }
            | Self::Parse { id, .. }
            | Self::Circular { id, .. } => id,
        }
    }
}

impl fmt::Display for ModuleResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id, attempted } => {
                write!(f, "Cannot find module '{}'", id)?;
                if !attempted.is_empty() {
                    let paths: Vec<String> =
                        attempted.iter().map(|p| p.display().to_string()).collect();
                    write!(f, " (tried: {})", paths.join(", "))?;
                }
                Ok(())
            }
            Self::Read { id, path, message } => write!(
                f,
                "Cannot read module '{}' at {}: {}",
                id,
                path.display(),
                message
            ),
            Self::Parse { id, path, message } => write!(
                f,
                "Cannot parse module '{}' at {}: {}",
                id,
                path.display(),
                message
            ),
            Self::Circular { id, path } => write!(
                f,
                "Circular import of module '{}' at {}",
                id,
                path.display()
            ),
        }
    }
}

impl std::error::Error for ModuleResolutionError {}

impl From<ModuleResolutionError> for Box<EvalAltResult> {
    fn from(err: ModuleResolutionError) -> Self {
        EvalAltResult::ErrorSystem(err.to_string(), Box::new(err)).into()
    }
}

/// Failure category reported in output records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    InputValidation,
    Compilation,
    Runtime,
    Timeout,
    Cancelled,
    ModuleResolution,
    Panic,
}

/// Script execution error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Script compilation/parsing error
    #[error("Script compilation error: {message}{}", format_position(.line, .column))]
    Compilation {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// Uncaught error raised while the script ran
    #[error("Script runtime error: {message}{}", format_position(.line, &None))]
    Runtime { message: String, line: Option<usize> },

    /// The time budget was exhausted
    #[error("Script timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The run was cancelled through its [`CancelHandle`](super::CancelHandle)
    #[error("Script execution cancelled")]
    Cancelled,

    #[error(transparent)]
    ModuleResolution(#[from] ModuleResolutionError),

    /// The evaluation thread panicked
    #[error("Script panic: {message}")]
    Panic { message: String },
}

fn format_position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {}, column {}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

impl ScriptError {
    /// Create a runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
            line: None,
        }
    }

    /// Category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Compilation { .. } => FailureKind::Compilation,
            Self::Runtime { .. } => FailureKind::Runtime,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Cancelled => FailureKind::Cancelled,
            Self::ModuleResolution(_) => FailureKind::ModuleResolution,
            Self::Panic { .. } => FailureKind::Panic,
        }
    }

    /// Maps an engine error onto the failure taxonomy.
    ///
    /// Errors raised inside imported modules or function calls are unwrapped
    /// so that a timeout or resolution failure deep in the import chain keeps
    /// its kind.
    pub fn classify(err: &EvalAltResult, timeout_ms: u64) -> Self {
        match err {
            EvalAltResult::ErrorInModule(_, inner, _)
            | EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => {
                match Self::classify(inner, timeout_ms) {
                    Self::Runtime { .. } => Self::from_eval(err),
                    other => other,
                }
            }
            EvalAltResult::ErrorTerminated(token, _) => {
                if token.to_string() == CANCEL_TOKEN {
                    Self::Cancelled
                } else {
                    Self::Timeout { timeout_ms }
                }
            }
            EvalAltResult::ErrorSystem(_, source) => {
                match source.downcast_ref::<ModuleResolutionError>() {
                    Some(resolution) => Self::ModuleResolution(resolution.clone()),
                    None => Self::from_eval(err),
                }
            }
            EvalAltResult::ErrorModuleNotFound(id, _) => {
                Self::ModuleResolution(ModuleResolutionError::NotFound {
                    id: id.clone(),
                    attempted: Vec::new(),
                })
            }
            _ => Self::from_eval(err),
        }
    }

    fn from_eval(err: &EvalAltResult) -> Self {
        Self::Runtime {
            message: err.to_string(),
            line: line_of(err.position()),
        }
    }
}

fn line_of(pos: Position) -> Option<usize> {
    if pos.is_none() {
        None
    } else {
        pos.line()
    }
}

impl From<ParseError> for ScriptError {
    fn from(err: ParseError) -> Self {
        let pos = err.position();
        Self::Compilation {
            message: err.err_type().to_string(),
            line: line_of(pos),
            column: if pos.is_none() { None } else { pos.position() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Dynamic;

    #[test]
    fn test_error_display() {
        let err = ScriptError::Compilation {
            message: "Expecting ';'".to_string(),
            line: Some(3),
            column: Some(7),
        };
        assert_eq!(
            err.to_string(),
            "Script compilation error: Expecting ';' at line 3, column 7"
        );
        assert_eq!(
            ScriptError::Timeout { timeout_ms: 100 }.to_string(),
            "Script timeout after 100ms"
        );
        assert_eq!(
            ScriptError::runtime("boom").to_string(),
            "Script runtime error: boom"
        );
    }

    #[test]
    fn test_resolution_display_lists_attempts() {
        let err = ModuleResolutionError::NotFound {
            id: "./util".to_string(),
            attempted: vec![PathBuf::from("/c/util"), PathBuf::from("/c/util.rhai")],
        };
        assert_eq!(
            err.to_string(),
            "Cannot find module './util' (tried: /c/util, /c/util.rhai)"
        );
        assert_eq!(ScriptError::from(err).kind(), FailureKind::ModuleResolution);
    }

    #[test]
    fn test_classify_terminated() {
        let timeout = EvalAltResult::ErrorTerminated(
            Dynamic::from(TIMEOUT_TOKEN.to_string()),
            Position::NONE,
        );
        assert_eq!(
            ScriptError::classify(&timeout, 250),
            ScriptError::Timeout { timeout_ms: 250 }
        );

        let cancelled = EvalAltResult::ErrorTerminated(
            Dynamic::from(CANCEL_TOKEN.to_string()),
            Position::NONE,
        );
        assert_eq!(ScriptError::classify(&cancelled, 250), ScriptError::Cancelled);
    }

    #[test]
    fn test_classify_unwraps_module_errors() {
        let resolution = ModuleResolutionError::Circular {
            id: "./a".to_string(),
            path: PathBuf::from("/c/a.rhai"),
        };
        let system: Box<EvalAltResult> = resolution.clone().into();
        let wrapped = EvalAltResult::ErrorInModule("./b".to_string(), system, Position::NONE);

        assert_eq!(
            ScriptError::classify(&wrapped, 1),
            ScriptError::ModuleResolution(resolution)
        );
    }

    #[test]
    fn test_classify_runtime() {
        let thrown = EvalAltResult::ErrorRuntime(Dynamic::from("bad".to_string()), Position::NONE);
        let err = ScriptError::classify(&thrown, 1);
        assert_eq!(err.kind(), FailureKind::Runtime);
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_failure_kind_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(FailureKind::ModuleResolution).unwrap(),
            serde_json::json!("moduleResolution")
        );
    }
}
