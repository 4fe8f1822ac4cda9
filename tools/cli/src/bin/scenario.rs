use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use scenario_engine::{
    compute_script_id, run_headless, Advance, ContentPolicy, Engine, EngineConfig, InputMode,
    MiniGameOutcome, PlayTrace, RenderBackend, SaveBackend, SaveData, SaveSlotStore,
    ScriptCompiled, ScriptIssue, ScriptRaw, SlotIndex, TextRenderer, SCRIPT_SCHEMA_VERSION,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Scenario engine CLI")]
struct Cli {
    /// Engine config (TOML); defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a script JSON file, or every JSON file under a directory.
    Validate {
        path: PathBuf,
        /// Treat lint issues as errors.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Compile a script JSON file into binary form.
    Compile {
        script: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Produce a headless playthrough trace for a script JSON file.
    Trace {
        script: PathBuf,
        #[arg(long, default_value_t = 500)]
        steps: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the JSON schema of the script format.
    Schema {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Verify a save file against a compiled script.
    VerifySave {
        save: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
    /// Play a script interactively on the terminal.
    Play {
        script: PathBuf,
        /// Directory for save slots.
        #[arg(long, default_value = "saves")]
        saves: PathBuf,
    },
}

#[derive(Serialize)]
struct TraceEnvelope {
    trace_format_version: u16,
    script_schema_version: String,
    trace: PlayTrace,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scenario_engine=info,scenario=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Validate { path, strict } => validate_path(&path, strict, &config),
        Command::Compile { script, output } => compile_script(&script, &output, &config),
        Command::Trace {
            script,
            steps,
            output,
        } => trace_script(&script, steps, &output, config),
        Command::Schema { output } => write_schema(&output),
        Command::VerifySave { save, script } => verify_save(&save, &script),
        Command::Play { script, saves } => play(&script, saves, config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn read_script(path: &Path, config: &EngineConfig) -> Result<ScriptRaw> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let script = ScriptRaw::from_json_with_limits(&raw, config.limits)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(script)
}

/// Validates one script and returns its lint issues.
fn check_script(path: &Path, config: &EngineConfig) -> Result<Vec<ScriptIssue>> {
    let script = read_script(path, config)?;
    ContentPolicy::default().validate_raw(&script, config.limits)?;
    let compiled = script.compile()?;
    Ok(compiled.lint(Some(&config.start_event)))
}

fn validate_path(path: &Path, strict: bool, config: &EngineConfig) -> Result<()> {
    let files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .map(|entry| entry.into_path())
            .filter(|file| file.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect()
    } else {
        vec![path.to_path_buf()]
    };
    if files.is_empty() {
        bail!("no script files found under {}", path.display());
    }

    let mut failures = 0usize;
    for file in &files {
        match check_script(file, config) {
            Ok(issues) if issues.is_empty() => println!("ok    {}", file.display()),
            Ok(issues) => {
                let label = if strict { "fail" } else { "warn" };
                println!("{label}  {} ({} issues)", file.display(), issues.len());
                for issue in &issues {
                    println!("      {issue}");
                }
                if strict {
                    failures += 1;
                }
            }
            Err(err) => {
                println!("fail  {}: {err:#}", file.display());
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} scripts failed validation", files.len());
    }
    Ok(())
}

fn compile_script(path: &Path, output: &Path, config: &EngineConfig) -> Result<()> {
    let script = read_script(path, config)?;
    ContentPolicy::default().validate_raw(&script, config.limits)?;
    let compiled = script.compile()?;
    let bytes = compiled.to_binary()?;
    write_output(output, &bytes)?;
    info!(
        events = compiled.events.len(),
        bytes = bytes.len(),
        output = %output.display(),
        "script compiled"
    );
    Ok(())
}

fn trace_script(path: &Path, steps: usize, output: &Path, config: EngineConfig) -> Result<()> {
    let script = read_script(path, &config)?;
    let mut engine = Engine::new(script, config)?;
    let trace = run_headless(&mut engine, steps);
    if !trace.finished {
        warn!(steps, "trace stopped before the end of content");
    }
    let envelope = TraceEnvelope {
        trace_format_version: 1,
        script_schema_version: SCRIPT_SCHEMA_VERSION.to_string(),
        trace,
    };
    let yaml = serde_yaml::to_string(&envelope)?;
    write_output(output, yaml.as_bytes())
}

fn write_schema(output: &Path) -> Result<()> {
    let schema = serde_json::to_string_pretty(&ScriptRaw::json_schema())?;
    write_output(output, schema.as_bytes())
}

fn verify_save(save_path: &Path, script_path: &Path) -> Result<()> {
    let save_bytes =
        fs::read(save_path).with_context(|| format!("read {}", save_path.display()))?;
    let save = SaveData::from_binary(&save_bytes)?;
    let script_bytes =
        fs::read(script_path).with_context(|| format!("read {}", script_path.display()))?;
    let compiled = ScriptCompiled::from_binary(&script_bytes)?;
    let script_id = compute_script_id(&compiled.to_binary()?);
    save.validate_script_id(&script_id)?;
    let cursor = &save.state.cursor;
    if compiled
        .step(&cursor.event_id, cursor.step_index as usize)
        .is_none()
    {
        bail!(
            "save points at {}/{} which the script does not contain",
            cursor.event_id,
            cursor.step_index
        );
    }
    println!(
        "ok    {} ({}/{}: {})",
        save_path.display(),
        cursor.event_id,
        cursor.step_index,
        save.preview
    );
    Ok(())
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, bytes).with_context(|| format!("write {}", output.display()))
}

const PLAY_HELP: &str = "\
commands:
  <enter>            advance
  <number>           pick a choice
  name <text>        commit the hero's name
  win [score]        win the minigame
  lose [score]       lose the minigame
  save <slot>        save to slot 0-9
  load <slot>        load from slot 0-9
  delete <slot>      delete a slot
  slots              list saved slots
  reset              start a new game
  quit               leave";

async fn play(path: &Path, saves: PathBuf, config: EngineConfig) -> Result<()> {
    let script = read_script(path, &config)?;
    let mut engine = Engine::new(script, config)?;
    let store = SaveSlotStore::new(saves);
    let renderer = TextRenderer;

    println!("{PLAY_HELP}\n");
    show(&engine, &renderer);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        let (command, argument) = match line.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };
        let result = match command {
            "quit" | "q" => break,
            "help" | "?" => {
                println!("{PLAY_HELP}");
                continue;
            }
            "" | "n" => Ok(report(engine.advance())),
            "name" => engine
                .commit_name(argument)
                .map(|()| report(engine.advance()))
                .map_err(anyhow::Error::from),
            "win" | "lose" => {
                let outcome = if command == "win" {
                    MiniGameOutcome::Win
                } else {
                    MiniGameOutcome::Lose
                };
                parse_score(argument).and_then(|score| {
                    Ok(report(engine.resolve_minigame(outcome, score)?))
                })
            }
            "save" => match parse_slot(argument) {
                Ok(slot) => engine
                    .save(&store, slot)
                    .await
                    .map(|meta| println!("saved to slot {}: {}", meta.slot, meta.preview))
                    .map_err(anyhow::Error::from),
                Err(err) => Err(err),
            },
            "load" => match parse_slot(argument) {
                Ok(slot) => engine
                    .load(&store, slot)
                    .await
                    .map_err(anyhow::Error::from),
                Err(err) => Err(err),
            },
            "delete" => match parse_slot(argument) {
                Ok(slot) => store.delete_slot(slot).await.map_err(anyhow::Error::from),
                Err(err) => Err(err),
            },
            "slots" => SaveBackend::list_slots(&store)
                .await
                .map(|slots| {
                    if slots.is_empty() {
                        println!("no saves");
                    }
                    for meta in slots {
                        println!(
                            "slot {}  {}/{}  {}",
                            meta.slot, meta.event_id, meta.step_index, meta.preview
                        );
                    }
                })
                .map_err(anyhow::Error::from),
            "reset" => {
                engine.reset();
                Ok(())
            }
            choice => match choice.parse::<usize>() {
                Ok(number) => pick_choice(&mut engine, number),
                Err(_) => Err(anyhow!("unknown command '{choice}', type 'help'")),
            },
        };
        match result {
            Ok(()) => show(&engine, &renderer),
            Err(err) => println!("! {err:#}"),
        }
        if engine.is_finished() {
            println!("-- the end --");
            break;
        }
    }
    Ok(())
}

fn pick_choice(engine: &mut Engine, number: usize) -> Result<()> {
    let view = engine.view().ok_or_else(|| anyhow!("nothing to choose from"))?;
    if view.input != InputMode::Choice {
        bail!("the current step offers no choices");
    }
    let choice = number
        .checked_sub(1)
        .and_then(|idx| view.choices.get(idx))
        .ok_or_else(|| anyhow!("pick a number between 1 and {}", view.choices.len()))?;
    report(engine.select_choice(&choice.id)?);
    Ok(())
}

fn parse_slot(argument: &str) -> Result<SlotIndex> {
    let index: u8 = argument
        .parse()
        .with_context(|| format!("'{argument}' is not a slot number"))?;
    Ok(SlotIndex::new(index)?)
}

fn parse_score(argument: &str) -> Result<Option<u32>> {
    if argument.is_empty() {
        return Ok(None);
    }
    let score = argument
        .parse()
        .with_context(|| format!("'{argument}' is not a score"))?;
    Ok(Some(score))
}

fn report(outcome: Advance) {
    match outcome {
        Advance::Blocked(reason) => println!("(waiting: {reason:?})"),
        Advance::EnteredEvent(event) => println!("-- {event} --"),
        Advance::Moved | Advance::EndOfContent => {}
    }
}

fn show(engine: &Engine, renderer: &impl RenderBackend) {
    if let Some(output) = engine.render_current(renderer) {
        println!("\n{}", output.text);
    }
}
