//! Headless playback engine for branching visual-novel scenarios.
//!
//! Scripts are loaded as [`ScriptRaw`], compiled into [`ScriptCompiled`] and
//! played by an [`Engine`], which exposes a render-ready [`StepView`] and the
//! mutating entry points a UI calls back into.

mod config;
mod engine;
mod error;
mod event;
mod persist;
mod policy;
mod render;
mod resource;
mod script;
mod source;
mod state;
mod storage;
mod trace;
mod version;
mod visual;

pub use config::{given_name, AssetPaths, ConfigError, EngineConfig, HeroConfig};
pub use engine::{AffectionChange, Advance, BlockReason, Engine, MiniGameScore};
pub use error::{VnError, VnResult};
pub use event::{
    ChannelPatch, CharacterImagesRaw, ChatStyle, ChoiceCompiled, ChoiceRaw, EventCompiled,
    EventRaw, MiniGameCompiled, MiniGameOutcome, MiniGameRaw, ScoreDelta, ScoreDeltaRaw,
    SharedStr, StepCompiled, StepKind, StepRaw, CHARACTER_POSITIONS,
};
pub use persist::{
    MemorySaveBackend, PersistError, ProgressSync, RemoteProgress, SaveBackend,
};
pub use policy::ContentPolicy;
pub use render::{
    ChoiceView, InputMode, MiniGameView, RenderBackend, RenderOutput, StepView, TextRenderer,
};
pub use resource::ResourceLimiter;
pub use script::{IssueKind, ScriptCompiled, ScriptIssue, ScriptRaw};
pub use source::{
    load_first_available, EmbeddedScript, FileScriptSource, ScriptSource, SourceError,
};
pub use state::{
    apply_delta, AffectionMap, ChatLine, Cursor, EngineState, AFFECTION_MAX, AFFECTION_MIN,
};
pub use storage::{
    compute_script_id, script_id_hex, SaveData, SaveError, SaveSlotMetadata, SaveSlotStore,
    SaveStoreError, ScriptId, SlotIndex,
};
pub use trace::{run_headless, PlayTrace, StateDigest, TraceAction, TraceStep, TRACE_HERO_NAME};
pub use version::{
    COMPILED_FORMAT_VERSION, SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION, SCRIPT_BINARY_MAGIC,
    SCRIPT_SCHEMA_VERSION,
};
pub use visual::{merge_channels, CarriedChannels};
