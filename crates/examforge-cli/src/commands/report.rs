//! The `examforge report` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::report::ExamReport;
use examforge_report::{write_html_report, write_text_report};

pub fn execute(input: PathBuf, format: String, output: Option<PathBuf>) -> Result<()> {
    let report = ExamReport::load_json(&input)?;

    let (extension, write): (&str, fn(&ExamReport, &std::path::Path) -> Result<()>) =
        match format.as_str() {
            "html" => ("html", write_html_report),
            "text" | "txt" => ("txt", write_text_report),
            other => anyhow::bail!("unknown format: {other} (expected html or text)"),
        };

    let path = output.unwrap_or_else(|| input.with_extension(extension));
    write(&report, &path)?;
    println!("Report written to {}", path.display());
    Ok(())
}
