use std::fmt::Display;
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;

use derived_pass_client::{user_message, DerivedPassError};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn init(json: bool) {
    let _ = JSON_MODE.set(json);
}

pub fn is_json() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

/// Human-readable rendering of a command result.
pub trait Render {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()>;
}

pub fn print<T: Serialize + Render>(value: &T) -> anyhow::Result<()> {
    if is_json() {
        let s = serde_json::to_string_pretty(value)?;
        println!("{s}");
        return Ok(());
    }
    let mut out = stdout();
    value.render(&mut out)?;
    out.reset()?;
    Ok(())
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

/// `label  value`, label in bold.
pub fn field(out: &mut dyn WriteColor, label: &str, value: impl Display) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{label:>16}")?;
    out.reset()?;
    writeln!(out, "  {value}")
}

pub fn colored(out: &mut dyn WriteColor, color: Color, text: impl Display) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{text}")?;
    out.reset()
}

/// Spinner on stderr while a request is in flight. Hidden in JSON mode.
pub fn spinner(message: &'static str) -> ProgressBar {
    if is_json() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(message);
    pb
}

/// A failure that the command already printed as part of its output.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Message shown for a failed command: the program's own message when the
/// failure came from the chain, otherwise the full error chain.
pub fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<DerivedPassError>() {
        Some(err) => user_message(err),
        None => format!("{err:#}"),
    }
}

pub fn report(err: &anyhow::Error) {
    if err.is::<Reported>() {
        return;
    }
    let message = error_message(err);
    if is_json() {
        println!("{}", json!({ "error": message }));
        return;
    }
    let mut out = StandardStream::stderr(ColorChoice::Auto);
    let _ = colored(&mut out, Color::Red, "error:");
    let _ = writeln!(out, " {message}");
}
