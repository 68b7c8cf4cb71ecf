//! `visor`: a terminal front-end for the editing core.
//!
//! Wires the std file adapter, the crossterm terminal, configuration and
//! logging to one `core_model::Editor`, then reads keys until `q`.

mod keys;
mod session;

use anyhow::Result;
use clap::Parser;
use core_io::StdFiles;
use core_model::Editor;
use core_terminal::{CrosstermTerminal, RawMode, Terminal};
use core_text::alloc::system;
use crossterm::event::{self, Event, KeyEventKind};
use keys::KeyTranslator;
use session::{Flow, Session};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "visor.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "visor", version, about = "Visor modal editor")]
struct Args {
    /// Files to open, one buffer each. An empty buffer when omitted.
    paths: Vec<PathBuf>,
    /// Configuration file (overrides discovery of `visor.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();

    let mut config = core_config::load_from(args.config.clone())?;
    let files = StdFiles::new();
    let mut editor = Editor::with_tuning(system(), Box::new(files), config.tuning());

    let terminal = CrosstermTerminal::stdout()?;
    let (_, term_rows) = terminal.size();
    let text_rows = config.view_rows().unwrap_or(term_rows.saturating_sub(1));
    editor.set_view_rows(config.view_rows().map_or(0, usize::from));
    editor.set_scroll_margin(usize::from(config.apply_view_height(text_rows)));
    editor.set_terminal(Box::new(terminal));

    // Open failures are already on the status line.
    for path in &args.paths {
        let _ = editor.new_buf(Some(path));
    }
    if editor.buf_count() == 0 {
        editor.new_buf(None)?;
    }
    info!(
        target: "runtime.startup",
        buffers = editor.buf_count(),
        config_override = args.config.is_some(),
        scroll_margin = config.effective_scroll_margin,
        "bootstrap_complete"
    );

    let mut raw = RawMode::enter()?;
    let result = run(Session::new(editor), &mut config);
    raw.leave()?;
    info!(target: "runtime", "shutdown");
    result
}

fn run(mut session: Session, config: &mut core_config::Config) -> Result<()> {
    let mut keys = KeyTranslator::new();
    session.editor.render()?;
    loop {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                let Some(command) = keys.translate(&key) else {
                    continue;
                };
                if session.apply(command) == Flow::Quit {
                    return Ok(());
                }
                keys.sync_insert(session.editor.in_insert());
            }
            Event::Resize(cols, rows) => {
                session.editor.resize(cols, rows);
                if config.view_rows().is_none() {
                    if let Some(margin) = config.recompute_after_resize(rows.saturating_sub(1)) {
                        session.editor.set_scroll_margin(usize::from(margin));
                    }
                }
            }
            _ => continue,
        }
        session.editor.render()?;
    }
}
