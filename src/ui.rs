// UI module for consistent terminal output with progress bars and styling
//
// Every user-facing print goes through here; the rest of the crate logs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::models::UpdateVerdict;
use console::{Term, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Check if stderr is a TTY (for interactive output)
fn is_tty() -> bool {
    Term::stderr().is_term()
}

/// Whether we can prompt the user
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && Term::stdout().is_term()
}

/// Progress bar for the per-package scan
pub fn scan_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if !is_tty() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Checking [{bar:25.cyan/dim}] {pos}/{len} {msg}")
            .unwrap()
            .tick_chars(SPINNER_CHARS)
            .progress_chars("━━╺"),
    );
    if is_tty() {
        pb.enable_steady_tick(Duration::from_millis(80));
    }
    pb
}

/// Create a progress bar for downloads with size
pub fn download_bar(total_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    if !is_tty() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.cyan} {msg} [{bar:25.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap()
            .tick_chars(SPINNER_CHARS)
            .progress_chars("━━╺"),
    );
    pb
}

/// Create an indeterminate progress bar (when size is unknown)
pub fn download_bar_indeterminate() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if !is_tty() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars(SPINNER_CHARS)
            .template("{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})")
            .unwrap(),
    );
    if is_tty() {
        pb.enable_steady_tick(Duration::from_millis(80));
    }
    pb
}

/// Print a success message with checkmark
pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print an info/action message with arrow
pub fn action(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red(), message);
}

/// Print a header/section message
pub fn header(message: &str) {
    println!("{}", style(message).bold());
}

/// Print a dimmed/secondary message
pub fn dim(message: &str) {
    println!("{}", style(message).dim());
}

/// Print a status message (for dry-run, etc.)
pub fn status(prefix: &str, message: &str) {
    println!("{} {}", style(prefix).cyan().bold(), message);
}

/// Finish a download bar with success
pub fn finish_download_success(pb: &ProgressBar, name: &str, verified: bool) {
    let note = if verified { "verified" } else { "downloaded" };
    let msg = format!("{} {} {}", style("✓").green(), name, style(note).dim());
    if is_tty() {
        pb.set_style(ProgressStyle::default_spinner().template("{msg}").unwrap());
        pb.finish_with_message(msg);
    } else {
        pb.finish_and_clear();
        println!("{}", msg);
    }
}

/// Clear a progress bar without leaving a message
pub fn clear_bar(pb: &ProgressBar) {
    pb.finish_and_clear();
}

/// One line per update: `1. Sodium [0.5.3 → 0.5.8] (modrinth)`
pub fn print_updates(updates: &[UpdateVerdict]) {
    for (i, update) in updates.iter().enumerate() {
        println!(
            "  {}. {} [{} → {}] {}",
            i + 1,
            update.mod_name,
            style(&update.current_version).dim(),
            style(&update.latest_version).green(),
            style(format!("({})", update.provider)).dim()
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    All,
    Nothing,
    Select,
}

pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim().to_lowercase().as_str() {
        "a" => Some(MenuChoice::All),
        "n" => Some(MenuChoice::Nothing),
        "s" => Some(MenuChoice::Select),
        _ => None,
    }
}

/// Parse comma-separated 1-based numbers into zero-based indices.
///
/// Blank input selects nothing. Duplicates are dropped.
pub fn parse_selection(input: &str, count: usize) -> anyhow::Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let number: usize = part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid selection: {}", part))?;
        if number == 0 || number > count {
            anyhow::bail!("Invalid selection: {}", number);
        }
        if !indices.contains(&(number - 1)) {
            indices.push(number - 1);
        }
    }
    Ok(indices)
}

fn prompt(term: &Term, message: &str) -> Option<String> {
    if term.write_str(message).is_err() {
        return None;
    }
    term.read_line().ok()
}

/// Ask which updates to download.
///
/// Returns nothing when stdin is not a terminal or input ends.
pub fn select_updates(updates: &[UpdateVerdict]) -> Vec<UpdateVerdict> {
    if updates.is_empty() {
        return Vec::new();
    }
    if !is_interactive() {
        warning("Not running in a terminal, skipping downloads");
        return Vec::new();
    }

    let term = Term::stdout();
    println!();
    header("Options:");
    println!("  a - Download all updates");
    println!("  n - Download none");
    println!("  s - Select specific updates (comma-separated numbers)");

    loop {
        let Some(choice) = prompt(&term, "\nEnter your choice: ") else {
            return Vec::new();
        };

        match parse_choice(&choice) {
            Some(MenuChoice::All) => {
                action(&format!("Selected all {} updates for download", updates.len()));
                return updates.to_vec();
            }
            Some(MenuChoice::Nothing) => {
                dim("No updates selected");
                return Vec::new();
            }
            Some(MenuChoice::Select) => loop {
                let Some(input) = prompt(&term, "Enter update numbers (comma-separated): ") else {
                    return Vec::new();
                };
                match parse_selection(&input, updates.len()) {
                    Ok(indices) if indices.is_empty() => {
                        dim("No updates selected");
                        return Vec::new();
                    }
                    Ok(indices) => {
                        action(&format!("Selected {} updates for download", indices.len()));
                        return indices.into_iter().map(|i| updates[i].clone()).collect();
                    }
                    Err(e) => error(&format!("{}. Please try again.", e)),
                }
            },
            None => error("Invalid choice. Please enter 'a', 'n', or 's'."),
        }
    }
}
