//! Formatting of durations and build summaries.

use std::time::Duration;

use assetpipe_core::Manifest;
use console::Term;
use owo_colors::OwoColorize;

use super::colors_enabled;

/// Format a duration: `50ms`, `1.50s` or `1m 30s`.
///
/// ```
/// use std::time::Duration;
/// use assetpipe_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn summary_lines(manifest: &Manifest) -> Vec<(String, String)> {
    manifest
        .iter()
        .map(|(name, entries)| {
            let urls = entries
                .iter()
                .map(|entry| entry.url())
                .collect::<Vec<_>>()
                .join(", ");
            (name.to_string(), urls)
        })
        .collect()
}

/// Print the written mapping to stderr, one logical name per line.
pub fn print_mapping_summary(manifest: &Manifest, duration: Duration) {
    let width = (Term::stderr().size().1 as usize).min(80);

    let colors = colors_enabled();
    let lines = summary_lines(manifest);
    let name_width = lines.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let count = manifest.len().to_string();
    let elapsed = format_duration(duration);

    if colors {
        eprintln!("\n{}", "Assets".bold().underline());
    } else {
        eprintln!("\nAssets");
    }
    eprintln!("{}", "─".repeat(width));

    for (name, urls) in &lines {
        let name = format!("{:<width$}", name, width = name_width);
        if colors {
            eprintln!("  {}  {}", name.cyan(), urls.dimmed());
        } else {
            eprintln!("  {}  {}", name, urls);
        }
    }

    eprintln!("{}", "─".repeat(width));
    if colors {
        eprintln!("  {} assets mapped in {}\n", count.bold(), elapsed.green());
    } else {
        eprintln!("  {} assets mapped in {}\n", count, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetpipe_core::ManifestEntry;

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_summary_lines() {
        let mut manifest = Manifest::new();
        manifest.push("app.js", ManifestEntry::with_modifier("/static/dist/app-1.js", "import"));
        manifest.push("app.js", "/static/dist/app-1.css".into());

        assert_eq!(
            summary_lines(&manifest),
            vec![(
                "app.js".to_string(),
                "/static/dist/app-1.js, /static/dist/app-1.css".to_string()
            )]
        );
    }
}
