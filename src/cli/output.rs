//! Terminal output for the `init` and `config` commands.
//!
//! Every line is built by a `*_line` function so the plain-text form can be
//! checked without a terminal; the printing methods only add colour and
//! pick the stream. Failures go to stderr, everything else to stdout.

use owo_colors::{OwoColorize, Style};

/// Outcome shown in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Warn,
    Fail,
}

impl Status {
    fn marker(self, colored: bool) -> &'static str {
        match (self, colored) {
            (Status::Done, true) => "✓",
            (Status::Warn, true) => "!",
            (Status::Fail, true) => "✗",
            (Status::Done, false) => "[ok]",
            (Status::Warn, false) => "[warn]",
            (Status::Fail, false) => "[error]",
        }
    }

    fn style(self) -> Style {
        match self {
            Status::Done => Style::new().green().bold(),
            Status::Warn => Style::new().yellow().bold(),
            Status::Fail => Style::new().red().bold(),
        }
    }
}

/// Width of the key column in `field` lines
const KEY_WIDTH: usize = 18;

#[derive(Debug, Clone)]
pub struct Output {
    colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.colored {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "\n  {} {}\n  {}\n",
            self.paint("GRASP", Style::new().bright_cyan().bold()),
            self.paint(&version, Style::new().dimmed()),
            "Timestamp-aware chat for YouTube videos"
        );
    }

    pub fn section_line(&self, title: &str) -> String {
        format!("\n{}", self.paint(title, Style::new().bold().underline()))
    }

    /// Top-level heading
    pub fn section(&self, title: &str) {
        println!("{}", self.section_line(title));
    }

    /// Heading of a group of lines inside a section
    pub fn group(&self, title: &str) {
        println!("\n  {}", self.paint(title, Style::new().cyan().bold()));
    }

    pub fn status_line(&self, status: Status, message: &str) -> String {
        format!(
            "  {} {}",
            self.paint(status.marker(self.colored), status.style()),
            message
        )
    }

    pub fn status(&self, status: Status, message: &str) {
        let line = self.status_line(status, message);
        match status {
            Status::Fail => eprintln!("{}", line),
            Status::Done | Status::Warn => println!("{}", line),
        }
    }

    /// Indented plain text
    pub fn text(&self, message: &str) {
        println!("  {}", message);
    }

    pub fn field_line(&self, key: &str, value: &str) -> String {
        let padded = format!("{:<width$}", format!("{}:", key), width = KEY_WIDTH);
        format!("    {}{}", self.paint(&padded, Style::new().dimmed()), value)
    }

    /// `key: value` with the values lined up
    pub fn field(&self, key: &str, value: &str) {
        println!("{}", self.field_line(key, value));
    }

    pub fn item(&self, text: &str) {
        println!("    - {}", text);
    }

    pub fn file_line(&self, path: &str, kept_because: Option<&str>) -> String {
        match kept_because {
            None => format!("    {} {}", self.paint("+", Style::new().green()), path),
            Some(reason) => format!(
                "    {} {} {}",
                self.paint("=", Style::new().yellow()),
                path,
                self.paint(&format!("({})", reason), Style::new().dimmed())
            ),
        }
    }

    /// A file or directory that was written
    pub fn wrote(&self, path: &str) {
        println!("{}", self.file_line(path, None));
    }

    /// A file or directory left as it was
    pub fn kept(&self, path: &str, reason: &str) {
        println!("{}", self.file_line(path, Some(reason)));
    }

    /// A shell command for the user to run
    pub fn command(&self, command: &str) {
        println!("    {} {}", self.paint("$", Style::new().dimmed()), command);
    }

    pub fn hint(&self, message: &str) {
        println!("  {}", self.paint(&format!("hint: {}", message), Style::new().dimmed()));
    }

    pub fn blank(&self) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_status_lines() {
        let output = Output::no_color();
        assert_eq!(
            output.status_line(Status::Done, "Configuration is valid"),
            "  [ok] Configuration is valid"
        );
        assert_eq!(
            output.status_line(Status::Warn, "grasp.toml already exists"),
            "  [warn] grasp.toml already exists"
        );
        assert!(output.status_line(Status::Fail, "boom").starts_with("  [error]"));
    }

    #[test]
    fn test_colored_lines_carry_escape_codes() {
        let output = Output::new();
        assert!(output.is_colored());
        let line = output.status_line(Status::Done, "ok");
        assert!(line.contains('\u{1b}'));
        assert!(line.contains("✓"));
        assert!(!Output::no_color().section_line("Next").contains('\u{1b}'));
    }

    #[test]
    fn test_field_values_line_up() {
        let output = Output::no_color();
        let short = output.field_line("bind", "127.0.0.1:8000");
        let long = output.field_line("default provider", "openai");
        assert_eq!(short.find("127.0.0.1"), long.find("openai"));
    }

    #[test]
    fn test_file_lines() {
        let output = Output::no_color();
        assert_eq!(output.file_line("grasp.toml", None), "    + grasp.toml");
        assert_eq!(
            output.file_line("data/", Some("already exists")),
            "    = data/ (already exists)"
        );
    }
}
