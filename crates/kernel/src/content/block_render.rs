//! Server-side block rendering.
//!
//! `render_block` is a pure function of a single block and is shared by the
//! editor preview and the public document page; only the surrounding chrome
//! differs. Unknown block types render a visible placeholder instead of
//! failing.

use crate::content::block::{
    Alignment, Block, BlockContent, ButtonContent, DividerContent, HeadingContent, HtmlContent,
    ImageContent, Size, SpacerContent, TextContent, sort_blocks,
};
use crate::content::sanitize::{
    SanitizeOptions, has_unsafe_content, html_escape, is_safe_url, sanitize_formatted_text,
    sanitize_html,
};

/// Heading font-size scale, indexed by `level - 1`.
const HEADING_SIZES: [&str; 6] = [
    "text-4xl",
    "text-3xl",
    "text-2xl",
    "text-xl",
    "text-lg",
    "text-base",
];

/// Render one block to HTML.
pub fn render_block(block: &Block) -> String {
    match block.resolved_content() {
        BlockContent::Heading(heading) => render_heading(&heading),
        BlockContent::Text(text) => render_text(&text),
        BlockContent::Image(image) => render_image(&image),
        BlockContent::Button(button) => render_button(&button),
        BlockContent::Divider(divider) => render_divider(&divider),
        BlockContent::Spacer(spacer) => render_spacer(&spacer),
        BlockContent::Html(html) => render_html(&html),
        BlockContent::Unknown { type_name } => render_unknown(&type_name),
    }
}

/// Render a document's blocks in document order and concatenate the results.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut ordered = blocks.to_vec();
    sort_blocks(&mut ordered);
    ordered.iter().map(render_block).collect()
}

/// Render a block inside the editor's preview chrome.
///
/// HTML blocks whose raw markup trips [`has_unsafe_content`] get a warning
/// banner. The preview itself is still the sanitized rendering.
pub fn render_editor_preview(block: &Block) -> String {
    let mut html = format!(
        "<div class=\"editor-block editor-block--{kind}\" data-block-id=\"{id}\" \
         data-block-type=\"{kind}\" data-position=\"{position}\">",
        kind = html_escape(block.block_type.as_str()),
        id = block.id,
        position = block.position,
    );

    if let BlockContent::Html(content) = block.resolved_content()
        && has_unsafe_content(&content.html)
    {
        html.push_str(
            "<div class=\"editor-block__warning\" role=\"alert\">\
             This HTML contains scripts, event handlers or javascript: links. \
             They will be removed when the block is displayed.</div>",
        );
    }

    html.push_str(&render_block(block));
    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Individual block renderers
// ---------------------------------------------------------------------------

fn align_class(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "text-left",
        Alignment::Center => "text-center",
        Alignment::Right => "text-right",
    }
}

fn text_size_class(size: Size) -> &'static str {
    match size {
        Size::Small => "text-sm",
        Size::Medium => "text-base",
        Size::Large => "text-lg",
    }
}

fn render_heading(heading: &HeadingContent) -> String {
    let level = heading.level.clamp(1, 6);
    let size = HEADING_SIZES[usize::from(level - 1)];
    format!(
        "<h{level} class=\"block-heading {size} {align}\">{text}</h{level}>",
        align = align_class(heading.alignment),
        text = html_escape(&heading.text),
    )
}

/// Text goes through formatted-text sanitization; alignment and size are
/// class-level only.
fn render_text(text: &TextContent) -> String {
    format!(
        "<div class=\"block-text {align} {size}\">{body}</div>",
        align = align_class(text.alignment),
        size = text_size_class(text.font_size),
        body = sanitize_formatted_text(&text.text),
    )
}

/// Render an image, or a placeholder when there is nothing safe to show.
fn render_image(image: &ImageContent) -> String {
    if image.src.is_empty() || !is_safe_url(&image.src) {
        return format!(
            "<div class=\"block-image block-image--empty {align}\">\
             <span class=\"block-image__icon\" aria-hidden=\"true\">&#128247;</span>\
             <p>No image selected</p></div>",
            align = align_class(image.alignment),
        );
    }

    let mut html = format!(
        "<figure class=\"block-image {align}\">\
         <img src=\"{src}\" alt=\"{alt}\" loading=\"lazy\" style=\"width: {width}\">",
        align = align_class(image.alignment),
        src = html_escape(&image.src),
        alt = html_escape(&image.alt),
        width = image.width.css(),
    );
    if !image.caption.is_empty() {
        html.push_str(&format!(
            "<figcaption>{}</figcaption>",
            html_escape(&image.caption)
        ));
    }
    html.push_str("</figure>");
    html
}

/// Render a button as a styled anchor. Absolute targets open in a new tab.
fn render_button(button: &ButtonContent) -> String {
    let href = if is_safe_url(&button.url) {
        button.url.as_str()
    } else {
        "#"
    };
    let size = match button.size {
        Size::Small => "btn-sm",
        Size::Medium => "btn-md",
        Size::Large => "btn-lg",
    };
    let target = if button.is_external() {
        " target=\"_blank\" rel=\"noopener noreferrer\""
    } else {
        ""
    };

    format!(
        "<div class=\"block-button {align}\">\
         <a href=\"{href}\" class=\"btn btn-{style} {size}\"{target}>{text}</a></div>",
        align = align_class(button.alignment),
        href = html_escape(href),
        style = button.style.as_str(),
        text = html_escape(&button.text),
    )
}

fn render_divider(divider: &DividerContent) -> String {
    let margin = match divider.alignment {
        Alignment::Left => "margin-left: 0; margin-right: auto",
        Alignment::Center => "margin-left: auto; margin-right: auto",
        Alignment::Right => "margin-left: auto; margin-right: 0",
    };
    format!(
        "<div class=\"block-divider {align}\"><hr style=\"border: none; \
         border-top: {thickness}px {style} {color}; width: {width}; {margin}\"></div>",
        align = align_class(divider.alignment),
        thickness = divider.thickness,
        style = divider.style.as_str(),
        color = divider.color,
        width = divider.width.css(),
    )
}

fn render_spacer(spacer: &SpacerContent) -> String {
    format!(
        "<div class=\"block-spacer\" style=\"height: {}px\" aria-hidden=\"true\"></div>",
        spacer.height
    )
}

fn render_html(content: &HtmlContent) -> String {
    format!(
        "<div class=\"block-html\">{}</div>",
        sanitize_html(&content.html, &SanitizeOptions::default())
    )
}

fn render_unknown(type_name: &str) -> String {
    format!(
        "<div class=\"block-unknown\" role=\"note\">\
         <strong>Unknown Block Type</strong>: {}</div>",
        html_escape(type_name)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
