use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use slide_common::{
    BulletsPayload, ChartPayload, GenerationRequest, HeroMetric, Metric, MetricsPayload,
    OutputMode, Slide, SlideContent, TitlePayload, Trend,
};

use crate::error::GenerationError;

/// Produces the slides for one generation request.
///
/// Implementations should return promptly with `GenerationError::Cancelled`
/// once `cancel` fires. The orchestrator enforces its own timeout on top.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Slide>, GenerationError>;
}

/// Canned backend: waits out a fixed latency, then returns the demo deck.
pub struct DemoBackend {
    latency: Duration,
}

impl DemoBackend {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl GenerationBackend for DemoBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Slide>, GenerationError> {
        tracing::debug!("Demo backend drafting {} for: {}", request.mode, request.prompt);
        tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            _ = tokio::time::sleep(self.latency) => Ok(match request.mode {
                OutputMode::Deck => demo_deck(),
                OutputMode::Poster => demo_poster(),
            }),
        }
    }
}

fn text(s: &str) -> String {
    s.to_string()
}

fn growth_engine() -> MetricsPayload {
    MetricsPayload {
        kicker: text("QBR Q2 2024"),
        title: text("The Growth Engine"),
        category: text("Business Performance"),
        hero: HeroMetric {
            label: text("Revenue Growth (QoQ)"),
            value: text("20%"),
            badge: Some(text("Target Exceeded")),
            description: text(
                "Momentum is accelerating. We've successfully compressed our sales cycle while expanding average deal size, driving our strongest quarter to date.",
            ),
        },
        secondary: vec![
            Metric {
                label: text("Annual Recurring Revenue"),
                value: text("$12.4M"),
                trend: Trend::Up,
                badge: None,
                target: None,
            },
            Metric {
                label: text("Net Revenue Retention"),
                value: text("118%"),
                trend: Trend::Up,
                badge: Some(text("+4% QoQ")),
                target: None,
            },
            Metric {
                label: text("CAC Payback Period"),
                value: text("9 Mo"),
                trend: Trend::Down,
                badge: None,
                target: Some(text("Target: <12mo")),
            },
        ],
    }
}

/// The five-slide quarterly business review.
pub fn demo_deck() -> Vec<Slide> {
    vec![
        Slide::new(1, SlideContent::Metrics(growth_engine())),
        Slide::new(
            2,
            SlideContent::Bullets(BulletsPayload {
                title: text("Strategic Expansion"),
                items: vec![
                    text("Successfully entered 3 new Enterprise markets in EMEA"),
                    text("Partnership signed with Global Tech Solutions for distribution"),
                    text("Customer Acquisition Cost decreased by 15% overall"),
                ],
            }),
        ),
        Slide::new(
            3,
            SlideContent::Chart(ChartPayload {
                title: text("Market Share Projection"),
                caption: text("Projected to reach 25% market share by end of fiscal year."),
            }),
        ),
        Slide::new(
            4,
            SlideContent::Bullets(BulletsPayload {
                title: text("Product Roadmap"),
                items: vec![
                    text("Q3: Multi-region cloud deployment"),
                    text("Q4: AI-driven predictive modeling beta"),
                    text("Q1 2025: Enterprise security suite v2"),
                ],
            }),
        ),
        Slide::new(
            5,
            SlideContent::Title(TitlePayload {
                title: text("Q&A & Next Steps"),
                subtitle: text("Looking ahead to Q3"),
                body: text("Strategic alignment and execution focus."),
            }),
        ),
    ]
}

/// A poster is a single metrics board.
pub fn demo_poster() -> Vec<Slide> {
    vec![Slide::new(1, SlideContent::Metrics(growth_engine()))]
}
