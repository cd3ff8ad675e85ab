//! HTML sanitization for user-authored block content.
//!
//! Provides:
//! - `sanitize_html`: allow-list sanitization via ammonia, followed by an
//!   explicit anchor rewrite that forces `target="_blank"` and
//!   `rel="noopener noreferrer"` on every surviving link
//! - `sanitize_formatted_text`: `**bold**`, `*italic*` and `[text](url)`
//!   translation, piped through `sanitize_html` without images
//! - `strip_tags`: the degraded plain-text fallback
//! - `has_unsafe_content`: authoring-time advisory for HTML blocks
//!
//! Sanitization never fails from the caller's point of view. If ammonia
//! panics the raw input is reduced to escaped plain text. If its output
//! trips the output check, the cleaned output is reduced instead, so text
//! ammonia already dropped (script bodies, for one) never comes back.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Tags that survive regardless of options.
const STRUCTURAL_TAGS: &[&str] = &["p", "br", "div", "span"];

/// Tags controlled by `allow_basic_formatting`.
const FORMATTING_TAGS: &[&str] = &[
    "strong",
    "b",
    "em",
    "i",
    "u",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "pre",
    "code",
];

/// Attributes allowed on every surviving tag.
const GENERIC_ATTRIBUTES: &[&str] = &["class", "style", "id"];

const LINK_ATTRIBUTES: &[&str] = &["href", "title", "target"];

const IMAGE_ATTRIBUTES: &[&str] = &["src", "alt", "width", "height", "loading"];

/// Attributes whose value is loaded or navigated to by the browser.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href", "poster"];

/// Attributes forced onto every anchor in sanitized output.
const FORCED_LINK_ATTRIBUTES: &str = r#" target="_blank" rel="noopener noreferrer""#;

/// Compile a pattern that is fixed at build time.
#[allow(clippy::expect_used)]
fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static sanitizer pattern must compile")
}

/// A serialized tag: optional `/`, name, then double-quoted attributes.
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r#"<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:\s+[^\s"'>/=]+(?:="[^"]*")?)*)\s*/?>"#,
    )
});
static HTML_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r#"([^\s"'>/=]+)(?:="([^"]*)")?"#));
static TARGET_OR_REL_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r#"\s+(?:target|rel)="[^"]*""#));

static ADVISORY_SCRIPT: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)<script"));
static ADVISORY_EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)on\w+\s*="));
static ADVISORY_JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)javascript:"));

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| static_regex(r"<[^>]*>"));
static SCRIPT_OR_STYLE_BODY: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?is)<script\b.*?(?:</script\s*>|\z)|<style\b.*?(?:</style\s*>|\z)")
});

static MARKDOWN_BOLD: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\*\*(.+?)\*\*"));
static MARKDOWN_ITALIC: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\*(.+?)\*"));
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\[([^\]]+)\]\(([^)\s]+)\)"));

/// Options for [`sanitize_html`]. Every option defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Keep `<a>` with `href`, `title` and `target`.
    pub allow_links: bool,
    /// Keep `<img>` with `src`, `alt`, `width`, `height` and `loading`.
    pub allow_images: bool,
    /// Keep inline formatting, headings, lists, quotes and code.
    pub allow_basic_formatting: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            allow_links: true,
            allow_images: true,
            allow_basic_formatting: true,
        }
    }
}

impl SanitizeOptions {
    /// Options used for formatted text: everything except images.
    pub fn without_images() -> Self {
        Self {
            allow_images: false,
            ..Self::default()
        }
    }
}

/// Sanitize an HTML string for direct insertion into a page.
///
/// Tags outside the allow-list are removed but their text is kept, except
/// for `<script>` and `<style>` whose contents are dropped entirely.
pub fn sanitize_html(input: &str, options: &SanitizeOptions) -> String {
    sanitize_with(input, |html| build_cleaner(options).clean(html).to_string())
}

/// Run `clean` over `input` and enforce the output rules on the result.
fn sanitize_with(input: &str, clean: impl FnOnce(&str) -> String) -> String {
    let Ok(cleaned) = panic::catch_unwind(AssertUnwindSafe(|| clean(input))) else {
        tracing::warn!("html sanitizer panicked, falling back to plain text");
        return strip_tags(input);
    };

    let output = force_link_attributes(&cleaned);
    if !is_safe_output(&output) {
        tracing::warn!("sanitized html failed the output check, falling back to plain text");
        return strip_tags(&decode_entities(&cleaned));
    }

    output
}

/// Translate the constrained markdown subset into HTML and sanitize it.
///
/// Substitution is a single pass per marker in the order bold, italic,
/// link. Nested or overlapping markers produce whatever that order yields.
pub fn sanitize_formatted_text(input: &str) -> String {
    let html = MARKDOWN_BOLD.replace_all(input, "<strong>${1}</strong>");
    let html = MARKDOWN_ITALIC.replace_all(&html, "<em>${1}</em>");
    let html = MARKDOWN_LINK.replace_all(&html, r#"<a href="${2}">${1}</a>"#);
    sanitize_html(&html, &SanitizeOptions::without_images())
}

/// Drop `<script>` and `<style>` bodies, remove every remaining tag with a
/// naive pass and escape what is left.
pub fn strip_tags(input: &str) -> String {
    let without_bodies = SCRIPT_OR_STYLE_BODY.replace_all(input, "");
    html_escape(&ANY_TAG.replace_all(&without_bodies, ""))
}

/// Check sanitized output against the hard safety rules.
///
/// The output is read as serialized tags and text. It fails on a `script`
/// tag, an attribute named `on*`, a URL attribute with an unsafe scheme, or
/// a stray `<` outside a well-formed tag. Attribute values are data, so
/// `title="javascript: basics"` passes.
pub fn is_safe_output(html: &str) -> bool {
    let mut text_start = 0;
    for caps in HTML_TAG.captures_iter(html) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        if html[text_start..tag.start()].contains('<') {
            return false;
        }
        text_start = tag.end();

        let name = caps.get(2).map_or("", |m| m.as_str());
        if name.eq_ignore_ascii_case("script") {
            return false;
        }
        let attributes = caps.get(3).map_or("", |m| m.as_str());
        if !attributes_are_safe(attributes) {
            return false;
        }
    }
    !html[text_start..].contains('<')
}

fn attributes_are_safe(attributes: &str) -> bool {
    HTML_ATTRIBUTE.captures_iter(attributes).all(|caps| {
        let name = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let value = decode_entities(caps.get(2).map_or("", |m| m.as_str()));
        if name.starts_with("on") {
            false
        } else if URL_ATTRIBUTES.contains(&name.as_str()) {
            is_safe_url(&value)
        } else if name == "style" {
            !value.to_ascii_lowercase().contains("javascript:")
        } else {
            true
        }
    })
}

/// Undo the entity escapes an HTML serializer emits.
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Authoring-time check for raw HTML that the sanitizer will rewrite.
///
/// This only flags content for a warning; enforcement happens in
/// [`sanitize_html`] at render time regardless of the result.
pub fn has_unsafe_content(input: &str) -> bool {
    ADVISORY_SCRIPT.is_match(input)
        || ADVISORY_EVENT_HANDLER.is_match(input)
        || ADVISORY_JAVASCRIPT_URI.is_match(input)
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Check whether a URL is safe to place in `href` or `src`.
///
/// Relative URLs pass. Absolute URLs must use http, https, mailto or tel.
/// Whitespace and control characters are ignored the way browsers ignore
/// them when reading a scheme.
pub fn is_safe_url(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let Some(colon) = normalized.find(':') else {
        return true;
    };

    let scheme = &normalized[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }

    matches!(scheme, "http" | "https" | "mailto" | "tel")
}

/// Build a fresh ammonia cleaner for one call.
fn build_cleaner(options: &SanitizeOptions) -> ammonia::Builder<'static> {
    let mut tags: HashSet<&'static str> = STRUCTURAL_TAGS.iter().copied().collect();
    let mut tag_attributes: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();

    if options.allow_basic_formatting {
        tags.extend(FORMATTING_TAGS.iter().copied());
    }
    if options.allow_links {
        tags.insert("a");
        tag_attributes.insert("a", LINK_ATTRIBUTES.iter().copied().collect());
    }
    if options.allow_images {
        tags.insert("img");
        tag_attributes.insert("img", IMAGE_ATTRIBUTES.iter().copied().collect());
    }

    let mut builder = ammonia::Builder::default();
    builder
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(GENERIC_ATTRIBUTES.iter().copied().collect())
        .link_rel(None)
        .attribute_filter(filter_attribute);
    builder
}

/// Drop inline styles that could smuggle script or remote loads.
fn filter_attribute<'u>(_element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    if attribute == "style" {
        let lowered = value.to_ascii_lowercase();
        if lowered.contains("javascript:")
            || lowered.contains("expression(")
            || lowered.contains("url(")
        {
            return None;
        }
    }
    Some(Cow::Borrowed(value))
}

/// Rewrite every anchor so it opens in a new tab without an opener.
fn force_link_attributes(html: &str) -> String {
    HTML_TAG
        .replace_all(html, |caps: &Captures<'_>| {
            let closing = caps.get(1).is_some_and(|m| !m.is_empty());
            let name = caps.get(2).map_or("", |m| m.as_str());
            if closing || !name.eq_ignore_ascii_case("a") {
                return caps.get(0).map_or("", |m| m.as_str()).to_string();
            }
            let attributes = caps.get(3).map_or("", |m| m.as_str());
            let attributes = TARGET_OR_REL_ATTRIBUTE.replace_all(attributes, "");
            format!("<a{attributes}{FORCED_LINK_ATTRIBUTES}>")
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn clean(input: &str) -> String {
        sanitize_html(input, &SanitizeOptions::default())
    }

    #[test]
    fn script_tags_are_removed() {
        let output = clean("<p>Hello</p><script>alert('xss')</script>");
        assert!(!output.contains("<script"), "got: {output}");
        assert!(output.contains("<p>Hello</p>"));
    }

    #[test]
    fn safe_markup_is_preserved() {
        let input = "<p>Hello <strong>world</strong></p>";
        assert_eq!(clean(input), input);
    }

    #[test]
    fn disallowed_tags_keep_their_text() {
        let output = clean("<section><marquee>still here</marquee></section>");
        assert!(!output.contains("marquee"));
        assert!(!output.contains("section"));
        assert!(output.contains("still here"));
    }

    #[test]
    fn event_handlers_are_removed() {
        let output = clean(r#"<div onclick="alert(1)" class="note">hi</div>"#);
        assert!(!output.contains("onclick"));
        assert_eq!(output, r#"<div class="note">hi</div>"#);
    }

    #[test]
    fn anchors_are_forced_to_new_tab() {
        let output = clean(r#"<a href="https://example.com">Example</a>"#);
        assert_eq!(
            output,
            r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer">Example</a>"#
        );
    }

    #[test]
    fn author_target_is_overridden() {
        let output = clean(r#"<a href="/jobs" target="_self" title="Jobs">Jobs</a>"#);
        assert!(!output.contains("_self"));
        assert_eq!(output.matches("target=").count(), 1);
        assert!(output.contains(r#"target="_blank""#));
        assert!(output.contains(r#"rel="noopener noreferrer""#));
        assert!(output.contains(r#"title="Jobs""#));
    }

    #[test]
    fn every_anchor_gets_forced_attributes() {
        let output = clean(r#"<p><a href="/a">A</a> and <a href="/b">B</a></p>"#);
        assert_eq!(output.matches(r#"target="_blank""#).count(), 2);
        assert_eq!(output.matches(r#"rel="noopener noreferrer""#).count(), 2);
    }

    #[test]
    fn javascript_href_is_dropped() {
        let output = clean(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!output.to_lowercase().contains("javascript:"));
        assert!(output.contains("click"));
    }

    #[test]
    fn links_disallowed_keeps_text() {
        let options = SanitizeOptions {
            allow_links: false,
            ..SanitizeOptions::default()
        };
        let output = sanitize_html(r#"<a href="https://example.com">visit</a>"#, &options);
        assert_eq!(output, "visit");
    }

    #[test]
    fn images_respect_option() {
        let input = r#"<img src="https://example.com/a.png" alt="A" onerror="x()">"#;
        let with_images = clean(input);
        assert!(with_images.contains("<img"));
        assert!(with_images.contains(r#"alt="A""#));
        assert!(!with_images.contains("onerror"));

        let without = sanitize_html(input, &SanitizeOptions::without_images());
        assert!(!without.contains("<img"));
    }

    #[test]
    fn formatting_can_be_disabled() {
        let options = SanitizeOptions {
            allow_basic_formatting: false,
            ..SanitizeOptions::default()
        };
        let output = sanitize_html("<p><strong>Bold</strong> text</p>", &options);
        assert_eq!(output, "<p>Bold text</p>");
    }

    #[test]
    fn style_with_script_url_is_dropped() {
        let output = clean(r#"<span style="background: url(javascript:alert(1))">x</span>"#);
        assert!(!output.contains("style"));
        assert!(output.contains('x'));

        let kept = clean(r#"<span style="color: red">x</span>"#);
        assert!(kept.contains(r#"style="color: red""#));
    }

    #[test]
    fn formatted_text_translates_markers() {
        let output = sanitize_formatted_text("**bold** and *italic* and [link](https://x.com)");
        assert!(output.contains("<strong>bold</strong>"), "got: {output}");
        assert!(output.contains("<em>italic</em>"), "got: {output}");
        assert!(output.contains(r#"href="https://x.com""#), "got: {output}");
        assert!(output.contains(r#"target="_blank""#), "got: {output}");
        assert!(output.contains(r#"rel="noopener noreferrer""#), "got: {output}");
    }

    #[test]
    fn formatted_text_drops_images() {
        let output = sanitize_formatted_text(r#"Look <img src="/a.png"> here"#);
        assert!(!output.contains("<img"));
        assert!(output.contains("Look"));
    }

    #[test]
    fn formatted_text_with_triple_markers_does_not_panic() {
        let output = sanitize_formatted_text("***text***");
        assert!(output.contains("text"));
        assert!(is_safe_output(&output));
    }

    #[test]
    fn formatted_text_rejects_javascript_links() {
        let output = sanitize_formatted_text("[click](javascript:alert(1))");
        assert!(!output.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn strip_tags_escapes_remainder() {
        assert_eq!(strip_tags("<b>a</b> & <i>b</i>"), "a &amp; b");
        assert_eq!(strip_tags("<script>x</script>"), "");
        assert_eq!(strip_tags("a<style>p { color: red }</style>b"), "ab");
        assert_eq!(strip_tags("keep<SCRIPT src=x>never closed"), "keep");
    }

    #[test]
    fn output_check_detects_violations() {
        assert!(is_safe_output("<p>fine</p>"));
        assert!(is_safe_output("<p>talking about javascript: in prose is fine</p>"));
        assert!(!is_safe_output("<script>x</script>"));
        assert!(!is_safe_output(r#"<div onclick="x">a</div>"#));
        assert!(!is_safe_output(r#"<a href="JavaScript:x">a</a>"#));
        assert!(!is_safe_output(r#"<img src="data:text/html;base64,AAAA">"#));
        assert!(!is_safe_output("<p>broken <div</p>"));
    }

    #[test]
    fn output_check_reads_attribute_values_as_data() {
        assert!(is_safe_output(r#"<a href="/tips" title="javascript: basics">tips</a>"#));
        assert!(is_safe_output(r#"<div class="x onclick=y">hi</div>"#));
        assert!(is_safe_output(r#"<span title="<script>">x</span>"#));
        assert!(is_safe_output(r#"<a href="/jobs?a=1&amp;b=2">jobs</a>"#));
    }

    #[test]
    fn harmless_attribute_values_keep_markup() {
        let output = clean(
            r#"<a href="/tips" title="javascript: basics"><strong>Hiring tips</strong></a><script>steal()</script>"#,
        );
        assert!(output.contains("<strong>Hiring tips</strong>"), "got: {output}");
        assert!(output.contains(r#"title="javascript: basics""#), "got: {output}");
        assert!(output.contains(r#"target="_blank""#), "got: {output}");
        assert!(!output.contains("steal"), "got: {output}");

        let output = clean(r#"<div class="x onclick=y">hi</div>"#);
        assert_eq!(output, r#"<div class="x onclick=y">hi</div>"#);
    }

    #[test]
    fn panicking_cleaner_falls_back_without_script_text() {
        let output = sanitize_with("<p>Hiring <b>tips</b></p><script>steal()</script>", |_| {
            panic!("cleaner failure")
        });
        assert_eq!(output, "Hiring tips");
    }

    #[test]
    fn unsafe_cleaned_output_falls_back_to_its_own_text() {
        let output = sanitize_with("<p>Hiring tips</p><script>steal()</script>", |_| {
            r#"<p onclick="x">Hiring &amp; tips</p>"#.to_string()
        });
        assert_eq!(output, "Hiring &amp; tips");
        assert!(!output.contains("steal"));
    }

    #[test]
    fn advisory_flags_unsafe_patterns() {
        assert!(has_unsafe_content("<script>alert(1)</script>"));
        assert!(has_unsafe_content("<div onclick='x'>hi</div>"));
        assert!(has_unsafe_content("<a href=\"javascript:void(0)\">x</a>"));
        assert!(has_unsafe_content("<img onerror = 'x'>"));
        assert!(!has_unsafe_content("<p>Hello <strong>nurses</strong></p>"));
    }

    #[test]
    fn safe_url_schemes() {
        assert!(is_safe_url("https://example.com"));
        assert!(is_safe_url("http://example.com"));
        assert!(is_safe_url("/careers"));
        assert!(is_safe_url("#apply"));
        assert!(is_safe_url("mailto:jobs@example.com"));
        assert!(is_safe_url("jobs/nurse?ref=a:b"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url(" JavaScript:alert(1)"));
        assert!(!is_safe_url("java\tscript:alert(1)"));
        assert!(!is_safe_url("data:text/html;base64,AAAA"));
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(html_escape("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
    }
}
