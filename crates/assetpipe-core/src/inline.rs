//! Extraction of `<script bundle>` and `<style bundle>` blocks from templates.
//!
//! ```html
//! <script bundle="@admin">
//!   import "./admin.js";
//! </script>
//! ```
//!
//! Each block is moved to its own file and replaced by an `include_asset`
//! call for the bundle it joins.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

struct InlineKind {
    tag: &'static str,
    ext: &'static str,
    open: Regex,
    close: Regex,
}

impl InlineKind {
    fn new(tag: &'static str, ext: &'static str) -> Self {
        let open = Regex::new(&format!(r#"<\s*{}\s+bundle(="([^"]+)")?\s*>"#, tag))
            .expect("inline open tag regex is valid");
        let close =
            Regex::new(&format!(r"</\s*{}\s*>", tag)).expect("inline close tag regex is valid");
        Self {
            tag,
            ext,
            open,
            close,
        }
    }
}

static KINDS: LazyLock<[InlineKind; 2]> =
    LazyLock::new(|| [InlineKind::new("script", "js"), InlineKind::new("style", "css")]);

/// A block extracted from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    /// Bundle named in the `bundle="..."` attribute
    pub bundle: Option<String>,
    /// File written under the assets folder, `{template stem}.js|css` by default
    pub filename: String,
    pub content: String,
}

impl InlineAsset {
    /// Name the template includes: the bundle, else the file.
    pub fn reference(&self) -> &str {
        self.bundle.as_deref().unwrap_or(&self.filename)
    }
}

/// Template source with its inline blocks replaced.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub source: String,
    pub assets: Vec<InlineAsset>,
}

/// Whether a source contains any inline block.
pub fn has_inline_assets(source: &str) -> bool {
    KINDS.iter().any(|kind| kind.open.is_match(source))
}

/// Extract every inline block of a template.
pub fn extract_inline_assets(template_name: &str, source: &str) -> Result<Extracted> {
    let stem = template_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(template_name);

    let mut extracted = Extracted {
        source: source.to_string(),
        assets: Vec::new(),
    };

    for kind in KINDS.iter() {
        let mut output = String::with_capacity(extracted.source.len());
        let mut rest = extracted.source.as_str();

        while let Some(open) = kind.open.captures(rest) {
            let whole = open.get(0).map(|m| m.range()).unwrap_or_default();
            let after_open = &rest[whole.end..];
            let close = kind
                .close
                .find(after_open)
                .ok_or_else(|| Error::UnclosedInlineTag {
                    tag: kind.tag.to_string(),
                    template: template_name.to_string(),
                })?;

            let asset = InlineAsset {
                bundle: open.get(2).map(|m| m.as_str().to_string()),
                filename: format!("{}.{}", stem, kind.ext),
                content: after_open[..close.start()].to_string(),
            };

            output.push_str(&rest[..whole.start]);
            output.push_str(&include_call(asset.reference()));
            extracted.assets.push(asset);
            rest = &after_open[close.end()..];
        }

        output.push_str(rest);
        extracted.source = output;
    }

    Ok(extracted)
}

fn include_call(reference: &str) -> String {
    let literal = serde_json::to_string(reference).unwrap_or_else(|_| format!("\"{}\"", reference));
    format!("{{{{ include_asset({}) }}}}", literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_script_and_style() {
        let source = r#"<h1>Home</h1>
<script bundle>
  console.log("home");
</script>
<style bundle="@theme">
  body { color: red; }
</style>
<p>after</p>"#;

        let extracted = extract_inline_assets("pages/home.html", source).unwrap();
        assert_eq!(extracted.assets.len(), 2);

        let script = &extracted.assets[0];
        assert_eq!(script.bundle, None);
        assert_eq!(script.filename, "pages/home.js");
        assert_eq!(script.content, "\n  console.log(\"home\");\n");

        let style = &extracted.assets[1];
        assert_eq!(style.bundle.as_deref(), Some("@theme"));
        assert_eq!(style.filename, "pages/home.css");
        assert_eq!(style.reference(), "@theme");

        assert_eq!(
            extracted.source,
            "<h1>Home</h1>\n{{ include_asset(\"pages/home.js\") }}\n{{ include_asset(\"@theme\") }}\n<p>after</p>"
        );
    }

    #[test]
    fn test_plain_script_tags_untouched() {
        let source = "<script src=\"/x.js\"></script><script>inline()</script>";
        let extracted = extract_inline_assets("base.html", source).unwrap();
        assert!(extracted.assets.is_empty());
        assert_eq!(extracted.source, source);
        assert!(!has_inline_assets(source));
    }

    #[test]
    fn test_unclosed_tag_is_an_error() {
        let err = extract_inline_assets("broken.html", "<style bundle>body{}").unwrap_err();
        assert!(matches!(
            err,
            Error::UnclosedInlineTag { ref tag, ref template } if tag == "style" && template == "broken.html"
        ));
    }

    #[test]
    fn test_multiple_blocks() {
        let source = "<script bundle=\"a\">1</script>x<script bundle=\"b\">2</script>";
        let extracted = extract_inline_assets("t.html", source).unwrap();
        let refs: Vec<_> = extracted.assets.iter().map(InlineAsset::reference).collect();
        assert_eq!(refs, vec!["a", "b"]);
        assert_eq!(
            extracted.source,
            "{{ include_asset(\"a\") }}x{{ include_asset(\"b\") }}"
        );
    }
}
