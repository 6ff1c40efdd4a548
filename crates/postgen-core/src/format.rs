//! Post formats and the static slide table each one resolves to.
//!
//! Every format is a closed variant carrying its own ordered slide list, so
//! callers never branch on format names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::CANVAS_HEIGHT;
use crate::error::PostError;

/// A named layout variant selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatId {
    /// One headline slide.
    Simple,
    /// Two-slide carousel: headline, then body text.
    Double,
    /// Breaking-news headline on the EXN template.
    BreakingExn,
    /// Breaking-news headline on the EXD template.
    BreakingExd,
}

impl FormatId {
    pub const ALL: [FormatId; 4] = [
        FormatId::Simple,
        FormatId::Double,
        FormatId::BreakingExn,
        FormatId::BreakingExd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::Simple => "simple",
            FormatId::Double => "double",
            FormatId::BreakingExn => "breaking_exn",
            FormatId::BreakingExd => "breaking_exd",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormatId::Simple => "Simple (1 slide)",
            FormatId::Double => "Double (2 slides)",
            FormatId::BreakingExn => "Breaking news EXN",
            FormatId::BreakingExd => "Breaking news EXD",
        }
    }

    /// Ordered slide descriptors for this format.
    pub fn slides(&self) -> &'static [SlideDescriptor] {
        match self {
            FormatId::Simple => &SIMPLE,
            FormatId::Double => &DOUBLE,
            FormatId::BreakingExn => &BREAKING_EXN,
            FormatId::BreakingExd => &BREAKING_EXD,
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "simple" => Ok(FormatId::Simple),
            "double" => Ok(FormatId::Double),
            "breaking_exn" => Ok(FormatId::BreakingExn),
            "breaking_exd" => Ok(FormatId::BreakingExd),
            _ => Err(PostError::UnknownFormat(s.to_string())),
        }
    }
}

/// Resolve a format to its ordered slide list.
pub fn resolve(format: FormatId) -> &'static [SlideDescriptor] {
    format.slides()
}

/// Parse a format identifier and resolve it. Unknown identifiers are a
/// programming error upstream; they surface as [`PostError::UnknownFormat`].
pub fn resolve_str(id: &str) -> Result<&'static [SlideDescriptor], PostError> {
    Ok(resolve(id.parse()?))
}

/// Which [`crate::RenderInput`] field a slide draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Body,
}

/// How wrapped lines are stacked relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorMode {
    /// First baseline at the anchor; lines grow downward.
    TopDown,
    /// Last baseline pinned at the anchor; lines grow upward.
    BottomUp,
}

/// Where and how large a slide's text block is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextPlacement {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub max_width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub mode: AnchorMode,
}

impl TextPlacement {
    /// Headline block: grows upward from a baseline above the template footer.
    pub const HEADLINE: TextPlacement = TextPlacement {
        anchor_x: 60.0,
        anchor_y: 590.0,
        max_width: 480.0,
        font_size: 48.0,
        line_height: 62.0,
        mode: AnchorMode::BottomUp,
    };

    /// Body block: grows downward from the vertical center.
    pub const BODY: TextPlacement = TextPlacement {
        anchor_x: 60.0,
        anchor_y: (CANVAS_HEIGHT / 2) as f32,
        max_width: 480.0,
        font_size: 30.0,
        line_height: 42.0,
        mode: AnchorMode::TopDown,
    };
}

/// One slide of a format. Overlays are authored at the canonical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideDescriptor {
    /// Template overlay reference, relative to the templates directory.
    pub template: &'static str,
    pub text: Option<TextField>,
    pub placement: TextPlacement,
    /// Appended to the base filename, separator included.
    pub suffix: &'static str,
    /// Drawn instead of a blank field when placeholders are enabled.
    pub placeholder: Option<&'static str>,
}

const SIMPLE: [SlideDescriptor; 1] = [SlideDescriptor {
    template: "template_simple.png",
    text: Some(TextField::Title),
    placement: TextPlacement::HEADLINE,
    suffix: "_simple",
    placeholder: Some("Titular Aquí"),
}];

const DOUBLE: [SlideDescriptor; 2] = [
    SlideDescriptor {
        template: "template_double_1.png",
        text: Some(TextField::Title),
        placement: TextPlacement::HEADLINE,
        suffix: "_pag1",
        placeholder: Some("Titular Aquí"),
    },
    SlideDescriptor {
        template: "template_double_2.png",
        text: Some(TextField::Body),
        placement: TextPlacement::BODY,
        suffix: "_pag2",
        placeholder: Some("Descripción aquí..."),
    },
];

const BREAKING_EXN: [SlideDescriptor; 1] = [SlideDescriptor {
    template: "template_breaking_exn.png",
    text: Some(TextField::Title),
    placement: TextPlacement::HEADLINE,
    suffix: "_exn",
    placeholder: Some("Última Hora EXN"),
}];

const BREAKING_EXD: [SlideDescriptor; 1] = [SlideDescriptor {
    template: "template_breaking_exd.png",
    text: Some(TextField::Title),
    placement: TextPlacement::HEADLINE,
    suffix: "_exd",
    placeholder: Some("Última Hora EXD"),
}];
