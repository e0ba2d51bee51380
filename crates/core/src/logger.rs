use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::style::{Color, Stylize};

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    echo: bool,
    prefixes: HashMap<String, Color>,
}

pub const COLOR_GRAY: Color = Color::DarkGrey;
pub const COLOR_RED: Color = Color::Red;
pub const COLOR_BLUE: Color = Color::Blue;

/// Initialize the global logger. Clears `app.log` in `log_dir`.
/// With `echo`, every line is also printed to the console.
pub fn init(log_dir: &Path, echo: bool) -> Result<()> {
    fs::create_dir_all(log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    LOGGER
        .set(Mutex::new(Logger { file, echo, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

/// Register a prefix with a console color.
pub fn register_prefix(prefix: &str, color: Color) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut l) = logger.lock() {
            l.prefixes.insert(prefix.to_string(), color);
        }
    }
}

fn file_line(ts: &str, level: &str, prefix: &str, msg: &str) -> String {
    if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    }
}

fn echo_line(ts: &str, level: &str, prefix: &str, color: Color, msg: &str) {
    let mut line = format!("{} ", ts.dark_grey());
    match level {
        "ERROR" => line.push_str(&format!("{}", "error ".red())),
        "WARN" => line.push_str(&format!("{}", "warn ".yellow())),
        _ => {}
    }
    if !prefix.is_empty() {
        line.push_str(&format!("{} ", prefix.with(color).bold()));
    }
    line.push_str(msg);
    println!("{}", line);
}

fn write_log(level: &str, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S").to_string();

    let Some(logger) = LOGGER.get() else { return };
    let Ok(mut l) = logger.lock() else { return };
    writeln!(l.file, "{}", file_line(&ts, level, prefix, msg)).ok();
    if l.echo {
        let color = l.prefixes.get(prefix).copied().unwrap_or(Color::White);
        echo_line(&ts, level, prefix, color, msg);
    }
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

/// Log with a registered prefix.
pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}
