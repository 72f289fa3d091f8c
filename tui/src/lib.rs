pub mod app;
pub mod interactive;
pub mod preview;

use anyhow::Result;

use slide_common::{GenerationRequest, SlideConfig};

pub use app::*;
pub use interactive::*;
pub use preview::*;

/// Run the interactive workspace, optionally submitting `initial` right away.
pub async fn run_interactive(config: &SlideConfig, initial: Option<GenerationRequest>) -> Result<()> {
    let mut app = InteractiveApp::new(config, initial);
    app.run().await
}
