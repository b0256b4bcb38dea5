use anyhow::{bail, Context, Result};
use retrieval::DocInput;
use std::path::Path;
use walkdir::WalkDir;

/// Load `.md` and `.txt` files (case-insensitive extension match) from the
/// top level of `dir`, in file-name order. The path is the stable id and
/// the file name is the display name.
pub fn load_docs(dir: &Path) -> Result<Vec<DocInput>> {
    if !dir.is_dir() {
        bail!("docs directory not found: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
            if matches!(ext.to_ascii_lowercase().as_str(), "md" | "txt") {
                paths.push(p.to_path_buf());
            }
        }
    }
    paths.sort();

    if paths.is_empty() {
        bail!("no .md or .txt files found in {}", dir.display());
    }

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        docs.push(DocInput {
            id: path.to_string_lossy().into_owned(),
            name,
            text,
        });
    }

    tracing::info!(count = docs.len(), dir = %dir.display(), "loaded documents");
    Ok(docs)
}
