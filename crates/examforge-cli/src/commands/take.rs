//! The `examforge take` command: an interactive exam in the terminal.
//!
//! One cooperative loop multiplexes typed commands, the one-second ticker and
//! at most one in-flight grading call.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use examforge_agents::{create_agent, load_config_from};
use examforge_core::answers::AnswerValue;
use examforge_core::error::SessionError;
use examforge_core::grading;
use examforge_core::history::{HistoryEntry, HistoryLog, JsonFileStore};
use examforge_core::model::SectionKind;
use examforge_core::parser;
use examforge_core::report::ExamReport;
use examforge_core::result::ExamResult;
use examforge_core::session::{Confirmation, ExamSession, SessionPhase};
use examforge_core::timer::{self, format_time, Tick};
use examforge_core::traits::ExamAgent;
use examforge_report::write_html_report;

type GradingFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<ExamResult>> + 'a>>;

pub async fn execute(
    exam_path: PathBuf,
    topic: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let exam = parser::load_exam(&exam_path)?;
    for w in parser::validate_exam(&exam) {
        tracing::warn!("{}", w.message);
    }
    let topic = topic.unwrap_or_else(|| exam.exam_title.clone());
    let agent = create_agent(&config.agent)?;
    let mut history = HistoryLog::load(JsonFileStore::new(&config.history_path))?;

    let mut session = ExamSession::new();
    session.on_time_expired(|| {
        println!("\nTime's up! You can keep answering and submit when ready.");
    });
    session.load(exam, topic)?;

    print_intro(&session);
    show_question(&session);

    run(&mut session, agent.as_ref(), &config.agent.grading_agent_id).await?;

    let (Some(exam), Some(answers), Some(result)) = (
        session.exam(),
        session.submitted_answers(),
        session.result(),
    ) else {
        session.abandon();
        println!("Exam abandoned. Nothing was recorded.");
        return Ok(());
    };

    print_result(result);

    history.append(HistoryEntry::from_result(
        session.topic(),
        result,
        chrono::Local::now(),
    ))?;

    let report = ExamReport::new(session.topic(), exam, answers, result);
    let dir = output.unwrap_or(config.output_dir);
    let json_path = dir.join(format!("{}.json", report.file_stem()));
    let html_path = dir.join(format!("{}.html", report.file_stem()));
    report.save_json(&json_path)?;
    write_html_report(&report, &html_path)?;
    println!("\nReport saved to {}", json_path.display());
    println!("HTML report: {}", html_path.display());

    Ok(())
}

/// Drive the session until it is reviewed, quit, or input runs out.
async fn run(session: &mut ExamSession, agent: &dyn ExamAgent, grading_agent_id: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = timer::ticker();
    let mut grading: Option<GradingFuture<'_>> = None;
    let mut confirming = false;
    let mut input_open = true;

    loop {
        if session.phase() == SessionPhase::Reviewed {
            break;
        }
        if !input_open && grading.is_none() {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    if grading.is_some() {
                        println!("Waiting for grading to finish...");
                    }
                    continue;
                };

                if confirming {
                    confirming = false;
                    let confirmation = match line.trim().to_lowercase().as_str() {
                        "y" | "yes" => Confirmation::Confirmed,
                        _ => Confirmation::Cancelled,
                    };
                    match session.begin_submit(confirmation) {
                        Ok(Some(submission)) => {
                            println!("Submitting for grading...");
                            let agent_id = grading_agent_id.to_string();
                            grading = Some(Box::pin(async move {
                                grading::grade(agent, &agent_id, &submission).await
                            }));
                        }
                        Ok(None) => println!("Submission cancelled."),
                        Err(e) => println!("{e}"),
                    }
                    continue;
                }

                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if handle(session, command) == Flow::Confirm {
                            confirming = true;
                            println!("Submit exam? This cannot be undone. [y/N]");
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            _ = ticker.tick(), if session.timer().is_running() => {
                if let Tick::Running(remaining) = session.tick() {
                    if remaining == 300 || remaining == 60 {
                        println!("{} remaining.", format_time(remaining));
                    }
                }
            }
            outcome = poll_grading(&mut grading), if grading.is_some() => {
                grading = None;
                if let Err(e) = session.finish_submit(outcome) {
                    println!("{e}");
                    println!("Type `submit` to try again.");
                }
            }
        }
    }

    Ok(())
}

async fn poll_grading(grading: &mut Option<GradingFuture<'_>>) -> anyhow::Result<ExamResult> {
    match grading {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

/// A typed command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show,
    Next,
    Previous,
    /// 1-based question position.
    GoTo(usize),
    Answer(String),
    Status,
    Time,
    Submit,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "" | "show" => Ok(Command::Show),
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" | "previous" => Ok(Command::Previous),
        "g" | "goto" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Command::GoTo(n)),
            _ => Err("usage: goto <question number>".to_string()),
        },
        "a" | "answer" => {
            if rest.is_empty() {
                Err("usage: answer <text>".to_string())
            } else {
                Ok(Command::Answer(rest.to_string()))
            }
        }
        "s" | "status" => Ok(Command::Status),
        "t" | "time" => Ok(Command::Time),
        "submit" => Ok(Command::Submit),
        "h" | "help" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other} (type `help`)")),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Confirm,
}

fn handle(session: &mut ExamSession, command: Command) -> Flow {
    match command {
        Command::Show => show_question(session),
        Command::Next => {
            session.next();
            show_question(session);
        }
        Command::Previous => {
            session.previous();
            show_question(session);
        }
        Command::GoTo(n) => {
            session.go_to(n - 1);
            show_question(session);
        }
        Command::Answer(text) => {
            let Some(kind) = session.current().map(|q| q.kind) else {
                println!("This exam has no questions.");
                return Flow::Continue;
            };
            let recorded = AnswerValue::parse(kind, &text)
                .map_err(|e| e.to_string())
                .and_then(|value| session.record_answer(value).map_err(|e| e.to_string()));
            match recorded {
                Ok(()) => {
                    if let Some(answer) = session.current_answer() {
                        println!("Answer saved: {answer}");
                    }
                }
                Err(message) => println!("{message}"),
            }
        }
        Command::Status => print_status(session),
        Command::Time => {
            if session.time_expired() {
                println!("Time is up.");
            } else {
                println!("{} remaining.", format_time(session.remaining_seconds()));
            }
        }
        Command::Submit => {
            if session.phase() == SessionPhase::Submitting {
                println!("{}", SessionError::SubmissionInFlight);
            } else if !session.is_complete() {
                println!(
                    "{}",
                    SessionError::NotAtLastQuestion {
                        index: session.current_index() + 1,
                        len: session.len(),
                    }
                );
            } else {
                return Flow::Confirm;
            }
        }
        Command::Help => print_help(),
        Command::Quit => {}
    }
    Flow::Continue
}

fn print_intro(session: &ExamSession) {
    if let Some(exam) = session.exam() {
        println!("{}", exam.exam_title);
        println!(
            "{} questions | {} marks | {} | {} min",
            session.len(),
            exam.total_marks,
            exam.difficulty_level,
            exam.time_suggested_minutes
        );
        if exam.sections.get(SectionKind::Matching).is_some() {
            println!("(The matching section is shown in the report only.)");
        }
        println!("Type `help` for commands.\n");
    }
}

fn show_question(session: &ExamSession) {
    let Some(question) = session.current() else {
        println!("This exam has no questions.");
        return;
    };

    println!(
        "\nQuestion {} of {} | {} | {:.0}% | {}",
        session.current_index() + 1,
        session.len(),
        question.section_title,
        session.progress(),
        session.timer().display()
    );
    println!("{}", question.question.text());

    match question.kind {
        SectionKind::Mcq => {
            for (key, text) in question.question.options() {
                println!("  {key}) {text}");
            }
            println!("  (answer A-D)");
        }
        SectionKind::TrueFalse => println!("  (answer true or false)"),
        SectionKind::FillBlank => println!("  (answer <word or phrase>)"),
        SectionKind::ShortAnswer => match &question.question.expected_length {
            Some(length) => println!("  (answer <text>, {length})"),
            None => println!("  (answer <text>)"),
        },
        SectionKind::Matching => {}
    }

    if let Some(answer) = session.current_answer() {
        println!("Your answer: {answer}");
    }
    if session.is_complete() {
        println!("Last question. Type `submit` when you are done.");
    }
}

fn print_status(session: &ExamSession) {
    let status = session.status();
    let answered = status.iter().filter(|s| s.answered).count();
    let cells: Vec<String> = status
        .iter()
        .map(|s| {
            let mark = if s.answered { "x" } else { " " };
            if s.current {
                format!(">{}[{mark}]", s.position + 1)
            } else {
                format!("{}[{mark}]", s.position + 1)
            }
        })
        .collect();
    println!("{}", cells.join(" "));
    println!(
        "{answered} of {} answered | {} | {}",
        status.len(),
        session.phase(),
        session.timer().display()
    );
}

fn print_help() {
    println!("Commands:");
    println!("  next, n            next question");
    println!("  prev, p            previous question");
    println!("  goto N, g N        jump to question N");
    println!("  answer X, a X      answer the current question");
    println!("  show               show the current question again");
    println!("  status, s          which questions are answered");
    println!("  time, t            time remaining");
    println!("  submit             submit for grading (last question only)");
    println!("  quit, q            abandon the exam");
}

fn print_result(result: &ExamResult) {
    use comfy_table::{Cell, Table};

    let summary = &result.score_summary;
    println!("\nScore: {:.1}%", summary.percentage);
    if !summary.grade_description.is_empty() {
        println!("{}", summary.grade_description);
    }
    println!(
        "{} / {} marks",
        summary.total_marks_obtained, summary.total_marks_possible
    );

    let stats = &result.statistics;
    println!(
        "Correct: {}  Incorrect: {}  Unanswered: {}",
        stats.correct_answers, stats.incorrect_answers, stats.questions_unanswered
    );

    if !result.section_scores.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Section", "Marks", "Percentage"]);
        for (section, score) in &result.section_scores {
            let marks = match (score.marks_obtained, score.marks_possible) {
                (Some(got), Some(of)) => format!("{got}/{of}"),
                _ => "-".to_string(),
            };
            table.add_row(vec![
                Cell::new(section.replace('_', " ")),
                Cell::new(marks),
                Cell::new(
                    score
                        .percentage
                        .map(|p| format!("{p:.1}%"))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        println!("\n{table}");
    }

    let analysis = &result.performance_analysis;
    if !analysis.overall_assessment.is_empty() {
        println!("\n{}", analysis.overall_assessment);
    }
    for suggestion in &analysis.improvement_suggestions {
        println!("  - {suggestion}");
    }
    if !analysis.encouragement.is_empty() {
        println!("{}", analysis.encouragement);
    }
}
