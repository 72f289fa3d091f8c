use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideId(pub u32);

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideVariant {
    Metrics,
    Bullets,
    Chart,
    Title,
}

impl fmt::Display for SlideVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlideVariant::Metrics => "metrics",
            SlideVariant::Bullets => "bullets",
            SlideVariant::Chart => "chart",
            SlideVariant::Title => "title",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "▶",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroMetric {
    pub label: String,
    pub value: String,
    pub badge: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsPayload {
    pub kicker: String,
    pub title: String,
    pub category: String,
    pub hero: HeroMetric,
    pub secondary: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletsPayload {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub title: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePayload {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

/// Variant-specific slide payload, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlideContent {
    Metrics(MetricsPayload),
    Bullets(BulletsPayload),
    Chart(ChartPayload),
    Title(TitlePayload),
}

impl SlideContent {
    pub fn variant(&self) -> SlideVariant {
        match self {
            SlideContent::Metrics(_) => SlideVariant::Metrics,
            SlideContent::Bullets(_) => SlideVariant::Bullets,
            SlideContent::Chart(_) => SlideVariant::Chart,
            SlideContent::Title(_) => SlideVariant::Title,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SlideContent::Metrics(p) => &p.title,
            SlideContent::Bullets(p) => &p.title,
            SlideContent::Chart(p) => &p.title,
            SlideContent::Title(p) => &p.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub id: SlideId,
    pub content: SlideContent,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlideValidationError {
    #[error("slide {slide}: title is empty")]
    EmptyTitle { slide: SlideId },

    #[error("slide {slide}: bullet list is empty")]
    EmptyBulletList { slide: SlideId },

    #[error("slide {slide}: bullet {index} is blank")]
    BlankBullet { slide: SlideId, index: usize },

    #[error("slide {slide}: hero metric has no value")]
    MissingHeroValue { slide: SlideId },

    #[error("slide {slide}: metrics slide needs at least one secondary metric")]
    NoSecondaryMetrics { slide: SlideId },

    #[error("slide {slide}: secondary metric {index} needs a label and a value")]
    BlankMetric { slide: SlideId, index: usize },

    #[error("slide {slide}: chart caption is empty")]
    EmptyCaption { slide: SlideId },

    #[error("slide id {slide} appears more than once in the deck")]
    DuplicateId { slide: SlideId },
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl Slide {
    pub fn new(id: u32, content: SlideContent) -> Self {
        Self {
            id: SlideId(id),
            content,
        }
    }

    pub fn variant(&self) -> SlideVariant {
        self.content.variant()
    }

    pub fn title(&self) -> &str {
        self.content.title()
    }

    /// Checks that the payload carries what its variant requires.
    pub fn validate(&self) -> Result<(), SlideValidationError> {
        let slide = self.id;
        if blank(self.title()) {
            return Err(SlideValidationError::EmptyTitle { slide });
        }
        match &self.content {
            SlideContent::Metrics(p) => {
                if blank(&p.hero.value) {
                    return Err(SlideValidationError::MissingHeroValue { slide });
                }
                if p.secondary.is_empty() {
                    return Err(SlideValidationError::NoSecondaryMetrics { slide });
                }
                if let Some(index) = p
                    .secondary
                    .iter()
                    .position(|m| blank(&m.label) || blank(&m.value))
                {
                    return Err(SlideValidationError::BlankMetric { slide, index });
                }
            }
            SlideContent::Bullets(p) => {
                if p.items.is_empty() {
                    return Err(SlideValidationError::EmptyBulletList { slide });
                }
                if let Some(index) = p.items.iter().position(|item| blank(item)) {
                    return Err(SlideValidationError::BlankBullet { slide, index });
                }
            }
            SlideContent::Chart(p) => {
                if blank(&p.caption) {
                    return Err(SlideValidationError::EmptyCaption { slide });
                }
            }
            SlideContent::Title(_) => {}
        }
        Ok(())
    }
}

/// Validates every slide and the uniqueness of ids within the deck.
pub fn validate_deck(slides: &[Slide]) -> Result<(), SlideValidationError> {
    let mut seen = HashSet::with_capacity(slides.len());
    for slide in slides {
        slide.validate()?;
        if !seen.insert(slide.id) {
            return Err(SlideValidationError::DuplicateId { slide: slide.id });
        }
    }
    Ok(())
}
