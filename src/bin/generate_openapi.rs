//! Writes the service's OpenAPI document as pretty JSON.
//!
//! Usage:
//!   cargo run --bin generate_openapi > openapi.json
//!   cargo run --bin generate_openapi -- --output openapi.json

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use incubator_monitor::api::handlers::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("failed to serialise OpenAPI document")?;

    let args: Vec<String> = env::args().collect();
    match output_path(&args) {
        Some(path) => {
            fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
        None => io::stdout()
            .write_all(json.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

/// Value following `--output`, if any.
fn output_path(args: &[String]) -> Option<PathBuf> {
    args.windows(2)
        .find(|w| w[0] == "--output")
        .map(|w| PathBuf::from(&w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn output_flag_is_parsed() {
        let a = args(&["generate_openapi", "--output", "api.json"]);
        assert_eq!(output_path(&a), Some(PathBuf::from("api.json")));
    }

    #[test]
    fn missing_flag_means_stdout() {
        assert_eq!(output_path(&args(&["generate_openapi"])), None);
        assert_eq!(output_path(&args(&["generate_openapi", "--output"])), None);
    }

    #[test]
    fn document_lists_every_tag() {
        let doc = ApiDoc::openapi();
        let tags: Vec<_> = doc
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        for t in ["users", "components", "alerts", "dashboard", "ingest", "system"] {
            assert!(tags.iter().any(|n| n == t), "missing tag {t}");
        }
    }
}
