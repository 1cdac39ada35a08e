//! Human-readable run output.
//!
//! Probe results go to stdout through [`Report`], separate from the
//! `tracing` diagnostics. Tests capture the lines instead of printing them.

/// Collects the report lines of a run.
#[derive(Debug, Default)]
pub struct Report {
    lines: Vec<String>,
    echo: bool,
}

impl Report {
    /// A report that prints every line to stdout as it is written.
    pub fn stdout() -> Self {
        Self {
            lines: Vec::new(),
            echo: true,
        }
    }

    /// A report that only records lines.
    pub fn captured() -> Self {
        Self::default()
    }

    /// Write one line.
    pub fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{}", line);
        }
        self.lines.push(line);
    }

    /// Start a new section with a blank line and a heading.
    pub fn section(&mut self, heading: impl Into<String>) {
        self.line("");
        self.line(heading);
    }

    /// All lines written so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}
