use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};

lazy_static! {
    static ref SUMMARY_NAME_RE: Regex =
        Regex::new(r"summary_r(\d+)_c(\d+)_t(\d+)\.json$").expect("valid regex");
}

#[derive(Parser)]
#[command(name = "bench")]
#[command(about = "Benchmark an OpenAI-compatible chat endpoint and summarize result files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire concurrent chat completions and record latency/token metrics
    Run {
        /// OpenAI-compatible base URL
        #[arg(long, default_value = "http://127.0.0.1:8000/v1")]
        base_url: String,
        /// Model id; defaults to the first model advertised by the endpoint
        #[arg(long)]
        model: Option<String>,
        /// Prompts file, one per line (# lines are comments)
        #[arg(long, default_value = "./prompts.txt")]
        prompts_file: PathBuf,
        /// Total number of requests
        #[arg(long, default_value_t = 40)]
        requests: usize,
        /// Concurrent workers
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long, default_value_t = 128)]
        max_tokens: u32,
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
        /// Summary output path
        #[arg(long, default_value = "./results/latest_summary.json")]
        output_json: PathBuf,
        /// Per-request output path
        #[arg(long, default_value = "./results/latest_raw.json")]
        output_raw_json: PathBuf,
    },
    /// Aggregate summary_*.json files from a results directory into a CSV table
    Summarize {
        /// Directory containing summary_*.json files
        #[arg(long)]
        results_dir: PathBuf,
        /// Metric to sort by
        #[arg(long, default_value = "ctok_s", value_parser = ["ctok_s", "tok_s", "req_s", "p95"])]
        sort_by: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct RequestResult {
    request_id: usize,
    ok: bool,
    latency_s: f64,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Debug, Serialize)]
struct Summary {
    requests_total: usize,
    requests_ok: usize,
    requests_failed: usize,
    concurrency: usize,
    elapsed_s: f64,
    throughput_req_s: f64,
    latency_p50_s: f64,
    latency_p95_s: f64,
    latency_p99_s: f64,
    latency_mean_s: f64,
    tokens_prompt_total: u64,
    tokens_completion_total: u64,
    tokens_total: u64,
    throughput_tokens_s: f64,
    throughput_completion_tokens_s: f64,
    sample_errors: Vec<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    created_at: String,
}

// Only the fields the summarizer reads; unknown files stay parseable.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryFile {
    requests_total: u64,
    requests_ok: u64,
    requests_failed: u64,
    concurrency: u64,
    max_tokens: u64,
    latency_p50_s: f64,
    latency_p95_s: f64,
    throughput_req_s: f64,
    throughput_tokens_s: f64,
    throughput_completion_tokens_s: f64,
}

#[derive(Debug)]
struct SummaryRow {
    file: String,
    requests: u64,
    concurrency: u64,
    max_tokens: u64,
    ok: u64,
    failed: u64,
    p50: f64,
    p95: f64,
    req_s: f64,
    tok_s: f64,
    ctok_s: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OutMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OutMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            base_url,
            model,
            prompts_file,
            requests,
            concurrency,
            max_tokens,
            temperature,
            timeout_secs,
            output_json,
            output_raw_json,
        } => {
            if requests == 0 {
                bail!("--requests must be > 0");
            }
            if concurrency == 0 {
                bail!("--concurrency must be > 0");
            }
            run_bench(
                base_url,
                model,
                &prompts_file,
                requests,
                concurrency,
                max_tokens,
                temperature,
                timeout_secs,
                &output_json,
                &output_raw_json,
            )
            .await
        }
        Commands::Summarize {
            results_dir,
            sort_by,
        } => summarize_dir(&results_dir, &sort_by),
    }
}

async fn run_bench(
    base_url: String,
    model: Option<String>,
    prompts_file: &Path,
    requests: usize,
    concurrency: usize,
    max_tokens: u32,
    temperature: f32,
    timeout_secs: u64,
    output_json: &Path,
    output_raw_json: &Path,
) -> Result<ExitCode> {
    let prompts = Arc::new(load_prompts(prompts_file)?);
    let base_url = base_url.trim_end_matches('/').to_string();

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    let model = match model {
        Some(m) => m,
        None => default_model(&client, &base_url).await?,
    };

    println!("Benchmark model: {model}");
    println!("Base URL: {base_url}");
    println!(
        "Requests: {requests}, Concurrency: {concurrency}, Max tokens: {max_tokens}, Temperature: {temperature}"
    );

    let start_all = Instant::now();
    let next = Arc::new(AtomicUsize::new(0));
    let mut workers = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let client = client.clone();
        let prompts = prompts.clone();
        let base_url = base_url.clone();
        let model = model.clone();
        let next = next.clone();
        workers.push(tokio::spawn(async move {
            let mut out = Vec::new();
            loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= requests {
                    break;
                }
                // deterministic round-robin prompt selection
                let prompt = prompts[i % prompts.len()].clone();
                out.push(
                    run_one(&client, &base_url, &model, i, prompt, max_tokens, temperature).await,
                );
            }
            out
        }));
    }

    let mut results: Vec<RequestResult> = Vec::with_capacity(requests);
    for worker in workers {
        results.extend(worker.await?);
    }
    results.sort_by_key(|r| r.request_id);
    let elapsed = start_all.elapsed().as_secs_f64();
    tracing::info!(requests, concurrency, elapsed_s = elapsed, "benchmark complete");

    let summary = summarize(
        &results,
        elapsed,
        concurrency,
        model,
        base_url,
        max_tokens,
        temperature,
    );

    write_json(output_json, &summary)?;
    write_json(output_raw_json, &results)?;

    println!("\n=== Summary ===");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("\nWrote summary: {}", output_json.display());
    println!("Wrote raw results: {}", output_raw_json.display());

    Ok(if summary.requests_failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_one(
    client: &Client,
    base_url: &str,
    model: &str,
    request_id: usize,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
) -> RequestResult {
    let url = format!("{base_url}/chat/completions");
    let payload = ChatRequest {
        model,
        messages: vec![OutMessage {
            role: "user",
            content: &prompt,
        }],
        max_tokens,
        temperature,
    };

    let start = Instant::now();
    let outcome = async {
        let resp: ChatResponse = client
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok::<Usage, reqwest::Error>(resp.usage)
    }
    .await;
    let latency_s = start.elapsed().as_secs_f64();

    match outcome {
        Ok(usage) => RequestResult {
            request_id,
            ok: true,
            latency_s,
            prompt,
            error: None,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
        Err(e) => RequestResult {
            request_id,
            ok: false,
            latency_s,
            prompt,
            error: Some(e.to_string()),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        },
    }
}

async fn default_model(client: &Client, base_url: &str) -> Result<String> {
    let url = format!("{base_url}/models");
    let resp: ModelsResponse = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?
        .json()
        .await
        .context("decoding /models response")?;
    resp.data
        .into_iter()
        .next()
        .map(|m| m.id)
        .ok_or_else(|| anyhow!("no models returned from {url}"))
}

fn load_prompts(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading prompts file {}", path.display()))?;
    let prompts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    if prompts.is_empty() {
        bail!("no prompts found in {}", path.display());
    }
    Ok(prompts)
}

fn summarize(
    results: &[RequestResult],
    elapsed_s: f64,
    concurrency: usize,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
) -> Summary {
    let ok: Vec<&RequestResult> = results.iter().filter(|r| r.ok).collect();
    let failed: Vec<&RequestResult> = results.iter().filter(|r| !r.ok).collect();
    let latencies: Vec<f64> = ok.iter().map(|r| r.latency_s).collect();
    let tokens_prompt_total: u64 = ok.iter().map(|r| r.prompt_tokens).sum();
    let tokens_completion_total: u64 = ok.iter().map(|r| r.completion_tokens).sum();
    let tokens_total: u64 = ok.iter().map(|r| r.total_tokens).sum();
    let per_second = |v: f64| if elapsed_s > 0.0 { v / elapsed_s } else { 0.0 };

    Summary {
        requests_total: results.len(),
        requests_ok: ok.len(),
        requests_failed: failed.len(),
        concurrency,
        elapsed_s,
        throughput_req_s: per_second(ok.len() as f64),
        latency_p50_s: percentile(&latencies, 50.0),
        latency_p95_s: percentile(&latencies, 95.0),
        latency_p99_s: percentile(&latencies, 99.0),
        latency_mean_s: if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        },
        tokens_prompt_total,
        tokens_completion_total,
        tokens_total,
        throughput_tokens_s: per_second(tokens_total as f64),
        throughput_completion_tokens_s: per_second(tokens_completion_total as f64),
        sample_errors: failed
            .iter()
            .take(5)
            .filter_map(|r| r.error.clone())
            .collect(),
        model,
        base_url,
        max_tokens,
        temperature,
        created_at: time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    }
}

/// Nearest-rank percentile over unsorted samples.
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.len() == 1 {
        return values[0];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn summarize_dir(results_dir: &Path, sort_by: &str) -> Result<ExitCode> {
    let mut rows = load_rows(results_dir)?;
    if rows.is_empty() {
        eprintln!("No summary_*.json files found in {}", results_dir.display());
        return Ok(ExitCode::from(2));
    }

    sort_rows(&mut rows, sort_by);
    print_table(&rows);

    match rows.iter().find(|r| r.failed == 0) {
        Some(best) => {
            println!("\nBest (0 failures):");
            println!(
                "file={} concurrency={} max_tokens={} p95={:.3}s throughput_completion_tokens_s={:.3}",
                best.file, best.concurrency, best.max_tokens, best.p95, best.ctok_s
            );
        }
        None => println!("\nNo zero-failure run found."),
    }
    Ok(ExitCode::SUCCESS)
}

fn load_rows(dir: &Path) -> Result<Vec<SummaryRow>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("summary_") && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut rows = Vec::with_capacity(paths.len());
    for path in paths {
        let file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let data: SummaryFile = serde_json::from_str(
            &fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
        )
        .with_context(|| format!("parsing {}", path.display()))?;

        // prefer the r/c/t encoded in the file name, fall back to the fields
        let (requests, concurrency, max_tokens) = parse_summary_name(&file)
            .unwrap_or((data.requests_total, data.concurrency, data.max_tokens));

        rows.push(SummaryRow {
            file,
            requests,
            concurrency,
            max_tokens,
            ok: data.requests_ok,
            failed: data.requests_failed,
            p50: data.latency_p50_s,
            p95: data.latency_p95_s,
            req_s: data.throughput_req_s,
            tok_s: data.throughput_tokens_s,
            ctok_s: data.throughput_completion_tokens_s,
        });
    }
    Ok(rows)
}

fn parse_summary_name(name: &str) -> Option<(u64, u64, u64)> {
    let caps = SUMMARY_NAME_RE.captures(name)?;
    let requests = caps[1].parse().ok()?;
    let concurrency = caps[2].parse().ok()?;
    let max_tokens = caps[3].parse().ok()?;
    Some((requests, concurrency, max_tokens))
}

fn sort_rows(rows: &mut [SummaryRow], sort_by: &str) {
    let key = |r: &SummaryRow| match sort_by {
        "tok_s" => r.tok_s,
        "req_s" => r.req_s,
        "p95" => r.p95,
        _ => r.ctok_s,
    };
    // latency sorts ascending, throughput metrics descending
    if sort_by == "p95" {
        rows.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));
    } else {
        rows.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal));
    }
}

fn print_table(rows: &[SummaryRow]) {
    println!(
        "file,requests,concurrency,max_tokens,ok,failed,p50_s,p95_s,throughput_req_s,throughput_tokens_s,throughput_completion_tokens_s"
    );
    for r in rows {
        println!(
            "{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{:.3}",
            r.file, r.requests, r.concurrency, r.max_tokens, r.ok, r.failed, r.p50, r.p95,
            r.req_s, r.tok_s, r.ctok_s
        );
    }
}
