//! The `examforge history` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_agents::load_config_from;
use examforge_core::history::{HistoryLog, JsonFileStore, ScoreBand};

pub fn execute(format: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let log = HistoryLog::load(JsonFileStore::new(&config.history_path))?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(log.all())?);
        }
        "table" => print_table(&log),
        other => anyhow::bail!("unknown format: {other} (expected table or json)"),
    }

    Ok(())
}

fn print_table(log: &HistoryLog<JsonFileStore>) {
    use comfy_table::{Cell, Color, Table};

    if log.is_empty() {
        println!("No exams taken yet. Run `examforge take --exam <file>` to get started.");
        return;
    }

    let summary = log.summary();
    println!("Exams taken:   {}", summary.exams_taken);
    println!("Average score: {:.1}", summary.average_score);
    println!("Best score:    {:.1}%", summary.best_percentage);

    let mut table = Table::new();
    table.set_header(vec!["Date", "Topic", "Score", "Percentage"]);
    for entry in log.all() {
        let color = match entry.band() {
            ScoreBand::Good => Color::Green,
            ScoreBand::Fair => Color::Yellow,
            ScoreBand::Poor => Color::Red,
        };
        table.add_row(vec![
            Cell::new(&entry.date),
            Cell::new(&entry.topic),
            Cell::new(format!("{}/{}", entry.score, entry.total_marks)),
            Cell::new(format!("{:.0}%", entry.percentage())).fg(color),
        ]);
    }
    println!("\n{table}");
}
