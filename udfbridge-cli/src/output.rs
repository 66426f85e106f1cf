//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! This keeps format-specific logic out of command handlers entirely.

use std::io::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use udfbridge_core::WarningLevel;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to an arbitrary writer.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => payload.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Warning level label colored by severity.
pub(crate) fn level_label(level: WarningLevel) -> ColoredString {
    match level {
        WarningLevel::Info => "INFO ".cyan(),
        WarningLevel::Minor => "MINOR".yellow(),
        WarningLevel::Major => "MAJOR".red().bold(),
    }
}

/// Confidence score colored against the acceptance floor.
pub(crate) fn score_label(score: f64, floor: f64) -> ColoredString {
    let text = format!("{score:.3}");
    if score >= floor {
        text.green()
    } else {
        text.red()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestPayload {
        field1: String,
        field2: u32,
    }

    impl Render for TestPayload {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "Field1: {}", self.field1)?;
            writeln!(w, "Field2: {}", self.field2)?;
            Ok(())
        }
    }

    fn payload() -> TestPayload {
        TestPayload {
            field1: "test value".to_owned(),
            field2: 42,
        }
    }

    #[test]
    fn test_render_to_text_format() {
        let writer = OutputWriter::new(OutputFormat::Text);

        let mut buffer = Vec::new();
        writer
            .render_to(&payload(), &mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Field1: test value"), "should render field1");
        assert!(output.contains("Field2: 42"), "should render field2");
    }

    #[test]
    fn test_render_to_json_format() {
        let writer = OutputWriter::new(OutputFormat::Json);

        let mut buffer = Vec::new();
        writer
            .render_to(&payload(), &mut buffer)
            .expect("json rendering should succeed");

        let parsed: serde_json::Value =
            serde_json::from_slice(&buffer).expect("output should be valid JSON");
        assert_eq!(parsed["field1"].as_str(), Some("test value"));
        assert_eq!(parsed["field2"].as_u64(), Some(42));
        assert!(buffer.ends_with(b"\n"), "JSON output ends with newline");
    }

    #[test]
    fn test_score_label_text() {
        colored::control::set_override(false);
        assert_eq!(score_label(0.9971, 0.99).to_string(), "0.997");
        assert_eq!(level_label(WarningLevel::Major).to_string(), "MAJOR");
    }
}
