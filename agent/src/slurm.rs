const TOOL_KEYWORDS: &[&str] = &["sbatch", "slurm", "job script", "batch script", "gpu job"];

/// Render an sbatch script for a single-node GPU job.
pub fn slurm_template(account: &str, partition: &str, gpus: u32, hours: u32) -> String {
    format!(
        "#!/bin/bash
#SBATCH --job-name=llm-demo
#SBATCH --account={account}
#SBATCH --partition={partition}
#SBATCH --nodes=1
#SBATCH --ntasks=1
#SBATCH --gpus-per-node={gpus}
#SBATCH --time={hours:02}:00:00
#SBATCH --output=demo-%j.out
#SBATCH --error=demo-%j.err

# Load modules / set env as needed
# module load ...

srun ./agent"
    )
}

/// Return a Slurm template when the question looks like a batch-job request,
/// otherwise an empty string. Template parameters come from the environment
/// (ACCOUNT, PARTITION, GPUS, HOURS) with placeholder defaults.
pub fn detect_tool_output(question: &str) -> String {
    let q = question.to_lowercase();
    if !TOOL_KEYWORDS.iter().any(|kw| q.contains(kw)) {
        return String::new();
    }
    let account = std::env::var("ACCOUNT").unwrap_or_else(|_| "YOUR_ACCOUNT".into());
    let partition = std::env::var("PARTITION").unwrap_or_else(|_| "standard-g".into());
    let gpus = env_u32("GPUS", 1);
    let hours = env_u32("HOURS", 1);
    slurm_template(&account, &partition, gpus, hours)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
