//! Block schema: the closed set of block types, the stored block record, and
//! typed views over the untyped content payload.
//!
//! Content is stored as a JSON object and interpreted per type only when a
//! block is rendered or edited. Missing or out-of-range fields fall back to a
//! type default or are clamped; they are never rejected.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Untyped block content payload.
pub type Content = Map<String, Value>;

/// Spacer height bounds in pixels.
pub const SPACER_MIN_HEIGHT: i64 = 8;
pub const SPACER_MAX_HEIGHT: i64 = 200;
pub const SPACER_DEFAULT_HEIGHT: i64 = 32;

pub const DEFAULT_HEADING_TEXT: &str = "New Heading";
pub const DEFAULT_TEXT_PLACEHOLDER: &str = "Start writing your content here...";
pub const DEFAULT_BUTTON_TEXT: &str = "Click Here";
pub const DEFAULT_BUTTON_URL: &str = "#";
pub const DEFAULT_DIVIDER_COLOR: &str = "#e2e8f0";

/// Block type discriminant.
///
/// Unrecognized type names are kept as [`BlockKind::Unknown`] so stored
/// blocks of a retired or future type still load and render a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Heading,
    Text,
    Image,
    Button,
    Divider,
    Spacer,
    Html,
    Unknown(String),
}

impl BlockKind {
    /// Every type the editor can create, in palette order.
    pub const STANDARD: &'static [BlockKind] = &[
        BlockKind::Heading,
        BlockKind::Text,
        BlockKind::Image,
        BlockKind::Button,
        BlockKind::Divider,
        BlockKind::Spacer,
        BlockKind::Html,
    ];

    /// Parse a type name. Never fails.
    pub fn parse(name: &str) -> Self {
        match name {
            "heading" => Self::Heading,
            "text" => Self::Text,
            "image" => Self::Image,
            "button" => Self::Button,
            "divider" => Self::Divider,
            "spacer" => Self::Spacer,
            "html" => Self::Html,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Machine name as stored.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heading => "heading",
            Self::Text => "text",
            Self::Image => "image",
            Self::Button => "button",
            Self::Divider => "divider",
            Self::Spacer => "spacer",
            Self::Html => "html",
            Self::Unknown(name) => name,
        }
    }

    /// Human-readable label for the editor palette.
    pub fn label(&self) -> &str {
        match self {
            Self::Heading => "Heading",
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Button => "Button",
            Self::Divider => "Divider",
            Self::Spacer => "Spacer",
            Self::Html => "HTML",
            Self::Unknown(_) => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for BlockKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique identifier (UUIDv7), stable across reorders.
    #[serde(default)]
    pub id: Uuid,

    /// Owning document.
    #[serde(default)]
    pub document_id: Uuid,

    /// Block type.
    #[serde(rename = "type")]
    pub block_type: BlockKind,

    /// Type-specific payload; `{}` when absent.
    #[serde(default)]
    pub content: Content,

    /// Render order among siblings. Gaps are allowed.
    #[serde(default)]
    pub position: i32,

    /// Reserved grouping reference. Not read by any render path.
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Store-assigned insertion sequence, the tie-breaker for equal positions.
    #[serde(default)]
    pub seq: i64,

    /// Unix timestamp when created.
    #[serde(default)]
    pub created: i64,

    /// Unix timestamp when last changed.
    #[serde(default)]
    pub changed: i64,
}

impl Block {
    /// Build a detached block, e.g. for previews that never touch a store.
    pub fn new(block_type: BlockKind, content: Content) -> Self {
        Self {
            id: Uuid::nil(),
            document_id: Uuid::nil(),
            block_type,
            content,
            position: 0,
            parent_id: None,
            seq: 0,
            created: 0,
            changed: 0,
        }
    }

    /// Typed view of this block's content with defaults applied.
    pub fn resolved_content(&self) -> BlockContent {
        BlockContent::resolve(&self.block_type, &self.content)
    }

    /// Document order: position, then insertion sequence.
    pub fn document_order(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Sort blocks into document order.
pub fn sort_blocks(blocks: &mut [Block]) {
    blocks.sort_by(Block::document_order);
}

/// Default content payload for a newly created block.
pub fn default_content(kind: &BlockKind) -> Content {
    let value = match kind {
        BlockKind::Heading => json!({
            "text": DEFAULT_HEADING_TEXT,
            "level": 2,
            "alignment": "left",
        }),
        BlockKind::Text => json!({
            "text": DEFAULT_TEXT_PLACEHOLDER,
            "alignment": "left",
            "fontSize": "medium",
        }),
        BlockKind::Image => json!({
            "src": "",
            "alt": "",
            "caption": "",
            "alignment": "center",
            "width": "full",
        }),
        BlockKind::Button => json!({
            "text": DEFAULT_BUTTON_TEXT,
            "url": DEFAULT_BUTTON_URL,
            "alignment": "left",
            "style": "primary",
            "size": "medium",
        }),
        BlockKind::Divider => json!({
            "style": "solid",
            "thickness": 1,
            "color": DEFAULT_DIVIDER_COLOR,
            "width": "full",
            "alignment": "center",
        }),
        BlockKind::Spacer => json!({ "height": SPACER_DEFAULT_HEIGHT }),
        BlockKind::Html => json!({ "html": "" }),
        BlockKind::Unknown(_) => json!({}),
    };

    match value {
        Value::Object(map) => map,
        _ => Content::new(),
    }
}

/// Shallow-merge `patch` into `content`.
///
/// Top-level keys in `patch` overwrite; other keys are preserved. Nested
/// objects are replaced wholesale, never merged recursively.
pub fn merge_content(content: &mut Content, patch: Content) {
    for (key, value) in patch {
        content.insert(key, value);
    }
}

/// Describe values that will be clamped or defaulted when the block renders.
///
/// The notices are advisory; nothing here rejects a payload.
pub fn validate_content(kind: &BlockKind, content: &Content) -> Vec<String> {
    let mut notices = Vec::new();

    match kind {
        BlockKind::Heading => {
            if let Some(level) = int_field(content, "level")
                && !(1..=6).contains(&level)
            {
                notices.push(format!(
                    "heading: level {level} is outside 1-6 and will be clamped"
                ));
            }
            check_enum::<Alignment>(content, "alignment", "heading", &mut notices);
        }
        BlockKind::Text => {
            check_enum::<Alignment>(content, "alignment", "text", &mut notices);
            check_enum::<Size>(content, "fontSize", "text", &mut notices);
        }
        BlockKind::Image => {
            check_enum::<Alignment>(content, "alignment", "image", &mut notices);
            check_enum::<Width>(content, "width", "image", &mut notices);
        }
        BlockKind::Button => {
            check_enum::<Alignment>(content, "alignment", "button", &mut notices);
            check_enum::<ButtonStyle>(content, "style", "button", &mut notices);
            check_enum::<Size>(content, "size", "button", &mut notices);
        }
        BlockKind::Divider => {
            check_enum::<DividerStyle>(content, "style", "divider", &mut notices);
            check_enum::<Width>(content, "width", "divider", &mut notices);
            check_enum::<Alignment>(content, "alignment", "divider", &mut notices);
            if let Some(thickness) = int_field(content, "thickness")
                && !(1..=4).contains(&thickness)
            {
                notices.push(format!(
                    "divider: thickness {thickness} is outside 1-4 and will be clamped"
                ));
            }
            if let Some(color) = str_field(content, "color")
                && !is_safe_css_color(color.trim())
            {
                notices.push(format!(
                    "divider: color '{color}' is not a plain CSS color, using {DEFAULT_DIVIDER_COLOR}"
                ));
            }
        }
        BlockKind::Spacer => {
            if let Some(height) = int_field(content, "height")
                && !(SPACER_MIN_HEIGHT..=SPACER_MAX_HEIGHT).contains(&height)
            {
                notices.push(format!(
                    "spacer: height {height} is outside {SPACER_MIN_HEIGHT}-{SPACER_MAX_HEIGHT} and will be clamped"
                ));
            }
        }
        BlockKind::Html | BlockKind::Unknown(_) => {}
    }

    notices
}

fn check_enum<T: ContentEnum>(
    content: &Content,
    field: &str,
    block_type: &str,
    notices: &mut Vec<String>,
) {
    if let Some(value) = str_field(content, field)
        && T::parse(value).is_none()
    {
        notices.push(format!(
            "{block_type}: unknown {field} '{value}', using '{}'",
            T::default().as_str()
        ));
    }
}

// ---------------------------------------------------------------------------
// Field accessors
// ---------------------------------------------------------------------------

fn str_field<'a>(content: &'a Content, field: &str) -> Option<&'a str> {
    content.get(field).and_then(Value::as_str)
}

fn string_or(content: &Content, field: &str, default: &str) -> String {
    str_field(content, field).unwrap_or(default).to_string()
}

/// Read an integer that may arrive as a JSON number or a numeric string.
fn int_field(content: &Content, field: &str) -> Option<i64> {
    match content.get(field)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn enum_field<T: ContentEnum>(content: &Content, field: &str, default: T) -> T {
    str_field(content, field)
        .and_then(T::parse)
        .unwrap_or(default)
}

const MAX_COLOR_LENGTH: usize = 64;

/// Hex, named and functional colors (`#e2e8f0`, `navy`, `rgb(0, 0, 0)`).
///
/// The value is written into a `style` attribute, so nothing that could end
/// the declaration or load a resource gets through.
fn is_safe_css_color(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    !value.is_empty()
        && value.len() <= MAX_COLOR_LENGTH
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ')
        })
        && !lowered.contains("url(")
        && !lowered.contains("expression(")
}

// ---------------------------------------------------------------------------
// Content enums
// ---------------------------------------------------------------------------

/// A closed set of string options inside a content payload.
trait ContentEnum: Sized + Default {
    fn parse(value: &str) -> Option<Self>;
    fn as_str(&self) -> &'static str;
}

macro_rules! content_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl ContentEnum for $name {
            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                ContentEnum::as_str(self)
            }
        }
    };
}

content_enum!(Alignment { Left => "left", Center => "center", Right => "right" } default Left);
content_enum!(Size { Small => "small", Medium => "medium", Large => "large" } default Medium);
content_enum!(ButtonStyle { Primary => "primary", Secondary => "secondary", Outline => "outline" } default Primary);
content_enum!(DividerStyle { Solid => "solid", Dashed => "dashed", Dotted => "dotted" } default Solid);
content_enum!(Width { Full => "full", Large => "large", Medium => "medium", Small => "small" } default Full);

impl Width {
    /// CSS width for this option.
    pub fn css(&self) -> &'static str {
        match self {
            Self::Full => "100%",
            Self::Large => "75%",
            Self::Medium => "50%",
            Self::Small => "25%",
        }
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

/// Content payload interpreted for its block type.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Heading(HeadingContent),
    Text(TextContent),
    Image(ImageContent),
    Button(ButtonContent),
    Divider(DividerContent),
    Spacer(SpacerContent),
    Html(HtmlContent),
    Unknown { type_name: String },
}

impl BlockContent {
    /// Interpret `content` for `kind`, applying defaults and clamps.
    pub fn resolve(kind: &BlockKind, content: &Content) -> Self {
        match kind {
            BlockKind::Heading => Self::Heading(HeadingContent::from_content(content)),
            BlockKind::Text => Self::Text(TextContent::from_content(content)),
            BlockKind::Image => Self::Image(ImageContent::from_content(content)),
            BlockKind::Button => Self::Button(ButtonContent::from_content(content)),
            BlockKind::Divider => Self::Divider(DividerContent::from_content(content)),
            BlockKind::Spacer => Self::Spacer(SpacerContent::from_content(content)),
            BlockKind::Html => Self::Html(HtmlContent::from_content(content)),
            BlockKind::Unknown(name) => Self::Unknown {
                type_name: name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingContent {
    pub text: String,
    /// Always within 1..=6.
    pub level: u8,
    pub alignment: Alignment,
}

impl HeadingContent {
    fn from_content(content: &Content) -> Self {
        let level = int_field(content, "level").unwrap_or(2).clamp(1, 6);
        Self {
            text: string_or(content, "text", DEFAULT_HEADING_TEXT),
            level: u8::try_from(level).unwrap_or(2),
            alignment: enum_field(content, "alignment", Alignment::Left),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub text: String,
    pub alignment: Alignment,
    pub font_size: Size,
}

impl TextContent {
    fn from_content(content: &Content) -> Self {
        Self {
            text: string_or(content, "text", DEFAULT_TEXT_PLACEHOLDER),
            alignment: enum_field(content, "alignment", Alignment::Left),
            font_size: enum_field(content, "fontSize", Size::Medium),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageContent {
    /// Opaque URL of an externally uploaded asset. Empty when unset.
    pub src: String,
    pub alt: String,
    pub caption: String,
    pub alignment: Alignment,
    pub width: Width,
}

impl ImageContent {
    fn from_content(content: &Content) -> Self {
        Self {
            src: string_or(content, "src", "").trim().to_string(),
            alt: string_or(content, "alt", ""),
            caption: string_or(content, "caption", ""),
            alignment: enum_field(content, "alignment", Alignment::Center),
            width: enum_field(content, "width", Width::Full),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonContent {
    pub text: String,
    pub url: String,
    pub alignment: Alignment,
    pub style: ButtonStyle,
    pub size: Size,
}

impl ButtonContent {
    fn from_content(content: &Content) -> Self {
        let url = str_field(content, "url")
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_BUTTON_URL);
        Self {
            text: string_or(content, "text", DEFAULT_BUTTON_TEXT),
            url: url.to_string(),
            alignment: enum_field(content, "alignment", Alignment::Left),
            style: enum_field(content, "style", ButtonStyle::Primary),
            size: enum_field(content, "size", Size::Medium),
        }
    }

    /// Absolute targets open in a new tab.
    pub fn is_external(&self) -> bool {
        self.url.starts_with("http")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividerContent {
    pub style: DividerStyle,
    /// Always within 1..=4.
    pub thickness: u8,
    /// Always passes the CSS color character check.
    pub color: String,
    pub width: Width,
    pub alignment: Alignment,
}

impl DividerContent {
    fn from_content(content: &Content) -> Self {
        let thickness = int_field(content, "thickness").unwrap_or(1).clamp(1, 4);
        let color = str_field(content, "color")
            .map(str::trim)
            .filter(|c| is_safe_css_color(c))
            .unwrap_or(DEFAULT_DIVIDER_COLOR);
        Self {
            style: enum_field(content, "style", DividerStyle::Solid),
            thickness: u8::try_from(thickness).unwrap_or(1),
            color: color.to_string(),
            width: enum_field(content, "width", Width::Full),
            alignment: enum_field(content, "alignment", Alignment::Center),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpacerContent {
    /// Pixels, always within the spacer bounds.
    pub height: u16,
}

impl SpacerContent {
    fn from_content(content: &Content) -> Self {
        let height = int_field(content, "height")
            .unwrap_or(SPACER_DEFAULT_HEIGHT)
            .clamp(SPACER_MIN_HEIGHT, SPACER_MAX_HEIGHT);
        Self {
            height: u16::try_from(height).unwrap_or(32),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlContent {
    /// Raw, unsanitized markup.
    pub html: String,
}

impl HtmlContent {
    fn from_content(content: &Content) -> Self {
        Self {
            html: string_or(content, "html", ""),
        }
    }
}
