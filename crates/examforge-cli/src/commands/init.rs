//! The `examforge init` command.

use std::path::Path;

use anyhow::Result;

use examforge_agents::config::SAMPLE_CONFIG;

pub fn execute() -> Result<()> {
    if Path::new("examforge.toml").exists() {
        println!("examforge.toml already exists, skipping.");
    } else {
        std::fs::write("examforge.toml", SAMPLE_CONFIG)?;
        println!("Created examforge.toml");
    }

    std::fs::create_dir_all("exams")?;
    let sample_path = Path::new("exams/sample.json");
    if sample_path.exists() {
        println!("exams/sample.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_EXAM)?;
        println!("Created exams/sample.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit examforge.toml with your agent service URL and key");
    println!("  2. Run: examforge validate --exam exams/sample.json");
    println!("  3. Run: examforge take --exam exams/sample.json");
    println!("  4. Or generate your own: examforge generate --topic Biology --notes notes.txt");

    Ok(())
}

const SAMPLE_EXAM: &str = include_str!("../../../../exams/sample.json");
