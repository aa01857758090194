//! `docqa inspect`: summary of a persisted index.
//!
//! Loads and validates the index file, then prints what it contains and how
//! it was built. Makes no network calls and needs no credential.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::index::{self, Index};

pub fn run_inspect(config: &Config) -> Result<()> {
    let path = &config.index.path;
    let index = index::load_index(path)?;
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    println!("{}", format_report(path, size, &index));
    Ok(())
}

pub fn format_report(path: &Path, size: u64, index: &Index) -> String {
    let mut out = String::new();
    out.push_str("docqa index\n");
    out.push_str("===========\n\n");
    out.push_str(&format!("  Path:        {}\n", path.display()));
    out.push_str(&format!("  Size:        {}\n", format_bytes(size)));
    out.push_str(&format!("  Version:     {}\n", index.version));
    out.push_str(&format!(
        "  Model:       {}\n",
        index.model.as_deref().unwrap_or("(unrecorded)")
    ));
    out.push_str(&format!(
        "  Dimensions:  {}\n",
        index.vector_dims().unwrap_or(0)
    ));
    out.push_str(&format!("  Chunks:      {}\n", index.len()));

    let total_chars: usize = index.chunks.iter().map(|c| c.chars().count()).sum();
    let avg = if index.is_empty() {
        0
    } else {
        total_chars / index.len()
    };
    out.push_str(&format!("  Avg chars:   {}\n", avg));
    out.push_str(&format!(
        "  Source hash: {}\n",
        index.source_sha256.as_deref().unwrap_or("(unrecorded)")
    ));
    out.push_str(&format!(
        "  Created:     {}",
        index.created_at.as_deref().unwrap_or("(unrecorded)")
    ));
    out
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
