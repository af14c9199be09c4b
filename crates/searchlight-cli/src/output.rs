//! Rendering of search results for terminal or machine consumption.

use searchlight::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a result in the requested format. JSON output is the serialized
/// `SearchResult` itself so scripts get the full contract.
pub fn render(
    result: &SearchResult,
    format: OutputFormat,
    show_sources: bool,
    max_sources: usize,
) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
        OutputFormat::Text => render_text(result, show_sources, max_sources),
    }
}

fn render_text(result: &SearchResult, show_sources: bool, max_sources: usize) -> String {
    if !result.ok {
        let error = result.error.as_deref().unwrap_or("unknown error");
        let mut out = format!("search failed: {error}");
        if !result.raw.is_empty() {
            out.push('\n');
            out.push_str(&result.raw);
        }
        return out;
    }

    let mut lines = vec![result.content.clone()];

    if show_sources && !result.sources.is_empty() {
        let shown = if max_sources > 0 {
            &result.sources[..result.sources.len().min(max_sources)]
        } else {
            &result.sources[..]
        };
        lines.push("\nSources:".to_string());
        for (i, source) in shown.iter().enumerate() {
            if source.title.is_empty() {
                lines.push(format!("  {}. {}", i + 1, source.url));
            } else {
                lines.push(format!("  {}. {}\n     {}", i + 1, source.title, source.url));
            }
        }
    }

    lines.push(format!("\n(elapsed: {}ms)", result.elapsed_ms));
    lines.join("\n")
}
