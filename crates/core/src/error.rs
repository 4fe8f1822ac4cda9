use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type VnResult<T> = Result<T, VnError>;

#[derive(Debug, Error, Diagnostic)]
pub enum VnError {
    #[error("script validation failed: {0}")]
    #[diagnostic(code("vn.invalid_script"))]
    InvalidScript(String),
    #[error("no such event '{0}'")]
    #[diagnostic(code("vn.unknown_event"))]
    UnknownEvent(String),
    #[error("end of content")]
    #[diagnostic(code("vn.end_of_content"))]
    EndOfContent,
    #[error("choice '{0}' is not offered by the current step")]
    #[diagnostic(code("vn.invalid_choice"))]
    InvalidChoice(String),
    #[error("current step is not a minigame")]
    #[diagnostic(code("vn.not_a_minigame"))]
    NotAMiniGame,
    #[error("current step does not accept a name")]
    #[diagnostic(code("vn.not_a_name_input"))]
    NotANameInput,
    #[error("name cannot be empty")]
    #[diagnostic(
        code("vn.empty_name"),
        help("submit at least one non-whitespace character")
    )]
    EmptyName,
    #[error("saved state does not fit the loaded script: {0}")]
    #[diagnostic(code("vn.state_mismatch"))]
    StateMismatch(String),
    #[error("resource limit exceeded: {0}")]
    #[diagnostic(code("vn.resource_limit"))]
    ResourceLimit(String),
    #[error("content policy violation: {0}")]
    #[diagnostic(code("vn.content_policy"))]
    ContentPolicy(String),
    #[error("serialization error: {message}")]
    #[diagnostic(code("vn.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("binary format error: {0}")]
    #[diagnostic(code("vn.binary_format"))]
    BinaryFormat(String),
}
