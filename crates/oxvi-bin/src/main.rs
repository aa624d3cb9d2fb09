//! oxvi: drive the text-buffer engine from the command line.
//!
//! Each subcommand opens a file into a fresh editing session, runs one
//! engine operation and prints the outcome. Logs go to `oxvi.log` in the
//! working directory, filtered by `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use core_events::InputEvent;
use core_input::InputStatus;
use core_model::{Editor, InputCommand, ScreenId, SearchMove};
use core_search::Direction;
use core_state::{CutFlags, EditFile};
use core_text::Position;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "oxvi.log";

#[derive(Parser, Debug)]
#[command(name = "oxvi", version, about = "vi text-buffer engine")]
struct Args {
    /// Explicit config file path (overrides discovery of oxvi.toml).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search FILE with a vi search command such as `/re/+1` or `?re?`.
    Search {
        path: PathBuf,
        pattern: String,
        #[arg(long, default_value_t = 1)]
        line: usize,
        #[arg(long, default_value_t = 0)]
        column: usize,
    },
    /// Find the line a ctags search command names.
    Tag { path: PathBuf, tag: String },
    /// Yank lines FROM..=TO and put them after line AT.
    Put {
        path: PathBuf,
        from: usize,
        to: usize,
        at: usize,
        /// Put before line AT instead of after it.
        #[arg(long)]
        before: bool,
        /// Cut buffer to use.
        #[arg(long)]
        buffer: Option<char>,
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// Type KEYS into FILE. `\e`, `\r`, `\n`, `\t`, `\b` and `\\` are escapes.
    Input {
        path: PathBuf,
        keys: String,
        #[arg(long, value_enum, default_value_t = Mode::Insert)]
        mode: Mode,
        #[arg(long, default_value_t = 1)]
        line: usize,
        #[arg(long, default_value_t = 0)]
        column: usize,
        #[arg(long)]
        count: Option<usize>,
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// Print FILE with line numbers.
    Dump { path: PathBuf },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Insert,
    Append,
    Open,
    OpenAbove,
    Replace,
}

impl From<Mode> for InputCommand {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Insert => InputCommand::Insert,
            Mode::Append => InputCommand::Append,
            Mode::Open => InputCommand::Open { above: false },
            Mode::OpenAbove => InputCommand::Open { above: true },
            Mode::Replace => InputCommand::Replace,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let config = core_config::load_from(args.config.clone())?;
    let mut ed = Editor::new(config.options());
    let stdout = io::stdout();
    let res = run(&mut ed, args.command, &mut stdout.lock());
    if let Err(e) = &res {
        error!(target: "runtime", error = %e, "command_failed");
    }
    info!(target: "runtime", "shutdown");
    res
}

/// Install the file subscriber. `None` when one is already installed.
fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
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

fn run(ed: &mut Editor, cmd: Command, out: &mut dyn Write) -> Result<()> {
    match cmd {
        Command::Search {
            path,
            pattern,
            line,
            column,
        } => {
            let id = ed.open(load(&path)?);
            ed.screen_mut(id)?.cursor = Position::new(line, column);
            let dir = if pattern.starts_with('?') {
                Direction::Backward
            } else {
                Direction::Forward
            };
            let res = ed.search(id, dir, &pattern);
            flush_messages(ed, id);
            print_move(out, &res?)?;
        }
        Command::Tag { path, tag } => {
            let id = ed.open(load(&path)?);
            let res = ed.tag_search(id, &tag);
            flush_messages(ed, id);
            print_move(out, &res?)?;
        }
        Command::Put {
            path,
            from,
            to,
            at,
            before,
            buffer,
            write,
        } => {
            let id = ed.open(load(&path)?);
            let res = ed
                .cut(
                    id,
                    buffer,
                    Position::new(from, 0),
                    Position::new(to, 0),
                    CutFlags::LINE_MODE,
                )
                .and_then(|()| {
                    ed.screen_mut(id)?.cursor = Position::new(at, 0);
                    ed.put(id, buffer, !before)
                });
            flush_messages(ed, id);
            let placed = res?;
            if let Some(report) = ed.screen(id)?.status.report {
                writeln!(out, "{report}")?;
            }
            info!(target: "runtime", lines = placed.lines, cursor = %placed.cursor, "put_done");
            finish(ed, id, write.as_deref(), out)?;
        }
        Command::Input {
            path,
            keys,
            mode,
            line,
            column,
            count,
            write,
        } => {
            let id = ed.open(load_or_empty(&path)?);
            ed.screen_mut(id)?.cursor = Position::new(line, column);
            let mut status = ed.begin_input(id, mode.into(), count)?;
            for ev in decode_keys(&keys) {
                if status != InputStatus::Continue {
                    break;
                }
                status = ed.input_event(id, ev)?;
            }
            // Keys ran out before an escape: end the input the way ^C would.
            if status == InputStatus::Continue {
                ed.input_event(id, InputEvent::Interrupt)?;
            }
            flush_messages(ed, id);
            let cursor = ed.screen(id)?.cursor;
            writeln!(out, "cursor {cursor}")?;
            finish(ed, id, write.as_deref(), out)?;
        }
        Command::Dump { path } => {
            let id = ed.open(load(&path)?);
            dump(ed, id, out)?;
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<EditFile> {
    EditFile::open(path).with_context(|| format!("opening {}", path.display()))
}

fn load_or_empty(path: &Path) -> Result<EditFile> {
    if path.exists() {
        load(path)
    } else {
        Ok(EditFile::from_lines(path.display().to_string(), &[] as &[&str]))
    }
}

fn print_move(out: &mut dyn Write, mv: &SearchMove) -> Result<()> {
    let note = if mv.wrapped { " (wrapped)" } else { "" };
    writeln!(out, "{}{note}", mv.pos)?;
    Ok(())
}

fn flush_messages(ed: &mut Editor, id: ScreenId) {
    if let Ok(scr) = ed.screen_mut(id) {
        for m in scr.status.messages.drain() {
            eprintln!("{}", m.text);
        }
    }
}

fn finish(ed: &Editor, id: ScreenId, write: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    match write {
        Some(dest) => {
            let scr = ed.screen(id)?;
            scr.file_mut()
                .write(dest)
                .with_context(|| format!("writing {}", dest.display()))?;
            info!(target: "runtime", file = %dest.display(), "file_written");
            Ok(())
        }
        None => dump(ed, id, out),
    }
}

fn dump(ed: &Editor, id: ScreenId, out: &mut dyn Write) -> Result<()> {
    let lines = ed.screen(id)?.file_mut().contents()?;
    for (i, l) in lines.iter().enumerate() {
        writeln!(out, "{:>6}  {l}", i + 1)?;
    }
    Ok(())
}

/// Turn a key string with backslash escapes into input events.
fn decode_keys(keys: &str) -> Vec<InputEvent> {
    let mut decoded = String::with_capacity(keys.len());
    let mut chars = keys.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        decoded.push(match chars.next() {
            Some('e') => '\x1b',
            Some('r') => '\r',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('b') => '\x08',
            Some(other) => other,
            None => '\\',
        });
    }
    InputEvent::from_str_chars(&decoded)
}
