use anyhow::{Context, Result};
use clap::Parser;
use retrieval::{Corpus, Document};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

mod docs;
mod llm;
mod prompt;
mod slurm;

#[derive(Parser)]
#[command(name = "agent")]
#[command(about = "Answer questions over a local docs directory via an OpenAI-compatible endpoint", long_about = None)]
struct Cli {
    /// Path to the docs directory (.md/.txt files)
    #[arg(long, default_value = "./docs")]
    docs: PathBuf,
    /// OpenAI-compatible base URL
    #[arg(long, default_value = "http://127.0.0.1:8000/v1")]
    base_url: String,
    /// Model id override (falls back to MODEL env var, then endpoint discovery)
    #[arg(long)]
    model: Option<String>,
    /// Number of documents to retrieve per question
    #[arg(long, default_value_t = 3)]
    top_k: usize,
    /// Single question to answer
    #[arg(long)]
    question: Option<String>,
    /// File with one question per line (# lines are comments)
    #[arg(long)]
    question_file: Option<PathBuf>,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let corpus = match docs::load_docs(&args.docs).and_then(|inputs| {
        Corpus::build(inputs).context("building corpus")
    }) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(docs = corpus.len(), terms = corpus.num_terms(), "corpus ready");

    let client = match llm::LlmClient::new(&args.base_url, Duration::from_secs(args.timeout_secs)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(3);
        }
    };

    let model = args
        .model
        .clone()
        .or_else(|| std::env::var("MODEL").ok());
    let model = match model {
        Some(m) => m,
        None => match client.default_model().await {
            Ok(m) => m,
            Err(e) => {
                eprintln!("Error: failed to get model id from {}: {e}", args.base_url);
                return ExitCode::from(3);
            }
        },
    };
    println!("Using model: {model}");

    if let Some(path) = &args.question_file {
        let questions = match read_questions(path) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(4);
            }
        };
        if questions.is_empty() {
            eprintln!("Error: no questions found in question file");
            return ExitCode::from(4);
        }
        for q in &questions {
            if let Err(e) = run_question(q, &corpus, &client, &model, args.top_k).await {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Some(q) = &args.question {
        return match run_question(q, &corpus, &client, &model, args.top_k).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    repl(&corpus, &client, &model, args.top_k).await;
    ExitCode::SUCCESS
}

/// Retrieve context, detect tool output, ask the model, print the answer.
async fn run_question(
    question: &str,
    corpus: &Corpus,
    client: &llm::LlmClient,
    model: &str,
    top_k: usize,
) -> Result<()> {
    let hits = corpus.retrieve(question, top_k);
    let retrieved: Vec<&Document> = hits.iter().filter_map(|h| corpus.get(&h.id)).collect();
    let tool_output = slurm::detect_tool_output(question);

    println!("\n=== Question ===");
    println!("{question}");
    let names: Vec<&str> = retrieved.iter().map(|d| d.name.as_str()).collect();
    println!(
        "\nRetrieved docs: {}",
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        }
    );

    let messages = prompt::build_prompt(question, &retrieved, &tool_output);
    let answer = client.chat(model, &messages, 0.2, 512).await?;

    if !tool_output.is_empty() {
        println!("\n--- Tool Output (Slurm Template) ---");
        println!("{tool_output}");
    }
    println!("\n--- Answer ---");
    println!("{answer}");
    Ok(())
}

async fn repl(corpus: &Corpus, client: &llm::LlmClient, model: &str, top_k: usize) {
    println!("Enter questions (type 'exit' to quit).");
    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if let Err(e) = run_question(question, corpus, client, model, top_k).await {
            eprintln!("Error: {e}");
        }
    }
}

fn read_questions(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading question file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
