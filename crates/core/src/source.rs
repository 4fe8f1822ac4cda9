//! Where scripts come from: bundled JSON or files on disk.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::VnError;
use crate::resource::ResourceLimiter;
use crate::script::ScriptRaw;

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("script source '{name}' is unavailable: {reason}")]
    #[diagnostic(code(source::unavailable))]
    Unavailable { name: String, reason: String },

    #[error("script source '{name}' is invalid")]
    #[diagnostic(code(source::invalid))]
    Invalid {
        name: String,
        #[source]
        #[diagnostic_source]
        error: VnError,
    },

    #[error("no script source succeeded")]
    #[diagnostic(
        code(source::exhausted),
        help("check the earlier warnings for each source")
    )]
    Exhausted,
}

/// Produces a raw script; the caller picks the fallback policy.
pub trait ScriptSource {
    fn name(&self) -> String;
    fn load(&self) -> Result<ScriptRaw, SourceError>;
}

/// Script compiled into the binary with `include_str!`.
#[derive(Clone, Debug)]
pub struct EmbeddedScript {
    name: &'static str,
    json: &'static str,
    limits: ResourceLimiter,
}

impl EmbeddedScript {
    pub fn new(name: &'static str, json: &'static str) -> Self {
        Self {
            name,
            json,
            limits: ResourceLimiter::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimiter) -> Self {
        self.limits = limits;
        self
    }
}

impl ScriptSource for EmbeddedScript {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn load(&self) -> Result<ScriptRaw, SourceError> {
        ScriptRaw::from_json_with_limits(self.json, self.limits).map_err(|error| {
            SourceError::Invalid {
                name: self.name(),
                error,
            }
        })
    }
}

/// Script read from a JSON file.
#[derive(Clone, Debug)]
pub struct FileScriptSource {
    path: PathBuf,
    limits: ResourceLimiter,
}

impl FileScriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limits: ResourceLimiter::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimiter) -> Self {
        self.limits = limits;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptSource for FileScriptSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<ScriptRaw, SourceError> {
        let json = std::fs::read_to_string(&self.path).map_err(|err| SourceError::Unavailable {
            name: self.name(),
            reason: err.to_string(),
        })?;
        ScriptRaw::from_json_with_limits(&json, self.limits).map_err(|error| {
            SourceError::Invalid {
                name: self.name(),
                error,
            }
        })
    }
}

/// Tries each source in order and returns the first script that loads.
pub fn load_first_available(sources: &[&dyn ScriptSource]) -> Result<ScriptRaw, SourceError> {
    for source in sources {
        match source.load() {
            Ok(script) => {
                debug!(source = %source.name(), events = script.events.len(), "script loaded");
                return Ok(script);
            }
            Err(err) => warn!(source = %source.name(), error = %err, "script source failed"),
        }
    }
    Err(SourceError::Exhausted)
}
