//! The `examforge generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use examforge_agents::{create_agent, load_config_from};
use examforge_core::generation::{generate_exam, Difficulty, GenerationRequest};
use examforge_core::parser::save_exam;

pub struct GenerateArgs {
    pub topic: String,
    pub notes: Option<PathBuf>,
    pub text: Option<String>,
    pub mcq: Option<u32>,
    pub fill_blank: Option<u32>,
    pub short_answer: Option<u32>,
    pub difficulty: Option<String>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let content = match (&args.notes, args.text) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read notes: {}", path.display()))?,
        (None, Some(text)) => text,
        (None, None) => String::new(),
    };

    let mut blueprint = config.blueprint.clone();
    if let Some(n) = args.mcq {
        blueprint.mcq_count = n;
    }
    if let Some(n) = args.fill_blank {
        blueprint.fill_blank_count = n;
    }
    if let Some(n) = args.short_answer {
        blueprint.short_answer_count = n;
    }
    if let Some(d) = &args.difficulty {
        blueprint.difficulty = d.parse::<Difficulty>().map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    let request = GenerationRequest {
        topic: args.topic,
        content,
        blueprint,
    };
    request.validate()?;

    let agent = create_agent(&config.agent)?;
    eprintln!("Generating exam on {}...", request.topic.trim());
    let exam = generate_exam(
        agent.as_ref(),
        &config.agent.generation_agent_id,
        &request,
        &config.retry_policy(),
    )
    .await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from("exams").join(format!("{}.json", slug(&request.topic))));
    save_exam(&exam, &output)?;

    println!(
        "Generated \"{}\": {} questions, {} marks, {} min",
        exam.exam_title,
        exam.question_count(),
        exam.total_marks,
        exam.time_suggested_minutes
    );
    println!("Saved to {}", output.display());
    println!("\nTake it with: examforge take --exam {}", output.display());

    Ok(())
}

/// File-name friendly form of a topic.
fn slug(topic: &str) -> String {
    let mut out = String::new();
    for c in topic.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "exam".to_string()
    } else {
        trimmed.to_string()
    }
}
