//! CLI output formatting utilities.
//!
//! Colored status lines and human-readable durations. Colors are only used
//! when the stream supports them.

use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const BUILT: &str = "+";
  pub const SKIPPED: &str = "=";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// A target whose action ran, with the reason it was stale.
pub fn print_built(name: &str, reason: &str, elapsed: Duration) {
  println!(
    "{} {} {}",
    symbols::BUILT.if_supports_color(Stream::Stdout, |s| s.green()),
    name,
    format!("({reason}, {})", format_duration(elapsed)).if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

pub fn print_skipped(name: &str) {
  println!(
    "{} {} {}",
    symbols::SKIPPED.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    name,
    "(up to date)".if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// A declared target and the targets it depends on.
pub fn print_target(name: &str, dependencies: &[String]) {
  if dependencies.is_empty() {
    println!("{name}");
  } else {
    println!(
      "{} {} {}",
      name,
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      dependencies.join(", ")
    );
  }
}
