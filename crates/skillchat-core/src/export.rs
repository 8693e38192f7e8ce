//! Markdown transcript export.
//!
//! Layout: a title block with the export time, then one section per turn
//! (role heading, timestamp, content), each closed by a `---` delimiter.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Turn;

/// Document title.
const TITLE: &str = "# Claude Skills Chat Export";

/// Section delimiter.
pub const DELIMITER: &str = "---";

/// Rendered transcript plus the suggested filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub markdown: String,
    pub filename: String,
}

impl TranscriptExport {
    /// Render `turns` as of `exported_at`.
    pub fn render(turns: &[Turn], exported_at: DateTime<Utc>) -> Self {
        Self {
            markdown: render_markdown(turns, exported_at),
            filename: export_filename(exported_at),
        }
    }

    /// Write the document into `dir` under its suggested filename.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(self.markdown.as_bytes())?;
        writer.flush()?;
        Ok(path)
    }
}

/// Render turns in insertion order.
pub fn render_markdown(turns: &[Turn], exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{TITLE}\n\n**Exported:** {}\n\n{DELIMITER}\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    );

    for turn in turns {
        let _ = write!(
            out,
            "### **{}**\n*{}*\n\n{}\n\n{DELIMITER}\n\n",
            turn.role.label(),
            turn.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            turn.content
        );
    }

    out
}

/// Filename derived from the export time only, never from session content.
pub fn export_filename(exported_at: DateTime<Utc>) -> String {
    format!("chat_export_{}.md", exported_at.format("%y.%m.%d.%H.%M.%S"))
}
