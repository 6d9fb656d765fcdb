//! examforge CLI — generate exams from study notes, take them in the
//! terminal, and keep a graded history.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examforge", version, about = "AI-generated, AI-graded practice exams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and a sample exam
    Init,

    /// Generate an exam from study notes
    Generate {
        /// Exam topic
        #[arg(long)]
        topic: String,

        /// File containing the study notes
        #[arg(long, conflicts_with = "text")]
        notes: Option<PathBuf>,

        /// Study notes given inline
        #[arg(long)]
        text: Option<String>,

        /// Number of multiple choice questions (5-20)
        #[arg(long)]
        mcq: Option<u32>,

        /// Number of fill in the blank questions (3-10)
        #[arg(long)]
        fill_blank: Option<u32>,

        /// Number of short answer questions (2-5)
        #[arg(long)]
        short_answer: Option<u32>,

        /// Difficulty: easy, medium, hard, mixed
        #[arg(long)]
        difficulty: Option<String>,

        /// Where to write the exam JSON
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check an exam file for problems
    Validate {
        /// Path to the exam JSON
        #[arg(long)]
        exam: PathBuf,
    },

    /// Take an exam interactively
    Take {
        /// Path to the exam JSON
        #[arg(long)]
        exam: PathBuf,

        /// Topic recorded in history (defaults to the exam title)
        #[arg(long)]
        topic: Option<String>,

        /// Output directory for graded reports
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show past exam scores
    History {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a saved report as HTML or text
    Report {
        /// Report JSON written by `take`
        #[arg(long)]
        input: PathBuf,

        /// Output format: html, text
        #[arg(long, default_value = "html")]
        format: String,

        /// Output path (defaults to the input with a new extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "examforge=info".parse::<tracing_subscriber::filter::Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Generate {
            topic,
            notes,
            text,
            mcq,
            fill_blank,
            short_answer,
            difficulty,
            output,
            config,
        } => {
            commands::generate::execute(commands::generate::GenerateArgs {
                topic,
                notes,
                text,
                mcq,
                fill_blank,
                short_answer,
                difficulty,
                output,
                config,
            })
            .await
        }
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Take {
            exam,
            topic,
            output,
            config,
        } => commands::take::execute(exam, topic, output, config).await,
        Commands::History { format, config } => commands::history::execute(format, config),
        Commands::Report {
            input,
            format,
            output,
        } => commands::report::execute(input, format, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
