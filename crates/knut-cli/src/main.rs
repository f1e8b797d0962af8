//! Knut entrypoint (§6 External Interfaces). The GUI shell and the
//! JS/QML script runtime are out of scope for this core; this binary wires
//! Settings, Project, and the Script Manager together for the headless
//! `--run`/`--test`/`--json-list`/`--json-settings` entry points a real
//! shell would otherwise provide interactively.

use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};
use clap::Parser;
use knut_document::AlwaysOverwrite;
use knut_project::Project;
use knut_script::ScriptManager;
use knut_settings::{Mode, Settings};
use serde_json::{json, Value};

/// Knut: a scriptable automation engine for large-scale C/C++ source
/// transformation.
#[derive(Parser, Debug)]
#[command(name = "knut", version, about = "Knut automation engine")]
struct Args {
    /// Project root directory.
    project: PathBuf,

    /// Run a script and exit with its integer result.
    #[arg(short = 'r', long = "run", value_name = "FILE")]
    run: Option<PathBuf>,

    /// Same as --run, but does not auto-quit on window close.
    #[arg(short = 't', long = "test", value_name = "FILE")]
    test: Option<PathBuf>,

    /// Open a file at startup.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Initial cursor line.
    #[arg(short = 'l', long = "line")]
    line: Option<u32>,

    /// Initial cursor column.
    #[arg(short = 'c', long = "column")]
    column: Option<u32>,

    /// JSON blob passed to the script.
    #[arg(short = 'd', long = "data", value_name = "JSON")]
    data: Option<String>,

    /// Dump available scripts as a JSON array `[{name,description,path}]`.
    #[arg(long = "json-list")]
    json_list: bool,

    /// Dump the merged settings as JSON.
    #[arg(long = "json-settings")]
    json_settings: bool,
}

fn configure_logging(settings: &Settings) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if !settings.value_or("/logs/saveToFile", true) {
        return None;
    }
    let log_path = settings.log_file_path();
    let dir = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let _ = std::fs::create_dir_all(dir);
    let appender = match tracing_appender::rolling::Builder::new().filename_prefix("knut.log").max_log_files(5).build(dir) {
        Ok(appender) => appender,
        Err(err) => {
            eprintln!("failed to create log appender: {err}");
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    match tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_writer(writer).try_init() {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn script_directories(settings: &Settings, project_root: &std::path::Path) -> Vec<PathBuf> {
    settings
        .value_or::<Vec<String>>("/script_paths", Vec::new())
        .into_iter()
        .map(PathBuf::from)
        .map(|p| if p.is_relative() { project_root.join(p) } else { p })
        .collect()
}

fn exit_code_for(result: &Value) -> i32 {
    match result {
        Value::Number(n) => n.as_i64().unwrap_or(0) as i32,
        _ => 0,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    install_panic_hook();

    let settings = Settings::load(Some(args.project.clone()), Mode::Cli);
    let _log_guard = configure_logging(&settings);
    tracing::info!(target: "runtime", project = %args.project.display(), "startup");

    if args.json_settings {
        println!("{}", serde_json::to_string_pretty(settings.merged())?);
        return Ok(());
    }

    let script_manager = ScriptManager::with_noop_runtime(script_directories(&settings, &args.project));

    if args.json_list {
        let list: Vec<Value> = script_manager.scripts().into_iter().map(|s| json!({ "name": s.name, "description": s.description, "path": s.path })).collect();
        println!("{}", serde_json::to_string_pretty(&Value::Array(list))?);
        return Ok(());
    }

    let mut project = Project::new(&args.project);

    if let Some(input) = &args.input {
        project.open(input).with_context(|| format!("failed to open {}", input.display()))?;
    }

    let mut data = match &args.data {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
        None => json!({}),
    };
    if let (Some(obj), Some(line)) = (data.as_object_mut(), args.line) {
        obj.insert("cursorLine".to_string(), json!(line));
    }
    if let (Some(obj), Some(column)) = (data.as_object_mut(), args.column) {
        obj.insert("cursorColumn".to_string(), json!(column));
    }

    let script_path = args.run.as_ref().or(args.test.as_ref());
    let exit_code = match script_path {
        Some(path) => {
            let result = script_manager.run_script(path, Some(data), false, true)?;
            exit_code_for(&result)
        }
        None => 0,
    };

    if let Some(doc) = project.current_mut() {
        if doc.is_dirty() {
            doc.save(&AlwaysOverwrite)?;
        }
    }

    std::process::exit(exit_code);
}
