use std::time::{Duration, Instant};

use crate::content_script::ContentScript;
use crate::engine::CharHit;
use crate::geometry::{Rect, Viewport};
use crate::settings::{Settings, YamlSettingsStore};
use crate::sim::{PageModel, SharedPage, SimulatedHost, SimulatedRenderer, simulated_page};

pub type TestContentScript = ContentScript<SimulatedHost, SimulatedRenderer>;

pub const TEST_HOSTNAME: &str = "www.example.jp";

pub fn test_viewport() -> Viewport {
    Viewport::new(1000.0, 800.0)
}

/// A 16x20 glyph box with its top-left corner at (`left`, `top`).
pub fn glyph(ch: char, left: f64, top: f64) -> CharHit {
    CharHit {
        ch,
        anchor: Rect::from_size(left, top, 16.0, 20.0),
    }
}

/// A line of text "日本語です" starting at (300, 300).
pub fn test_page() -> PageModel {
    let mut page = PageModel::new(TEST_HOSTNAME, test_viewport());
    page.glyphs = "日本語です"
        .chars()
        .enumerate()
        .map(|(i, ch)| glyph(ch, 300.0 + 16.0 * i as f64, 300.0))
        .collect();
    page
}

pub fn selection_anchor() -> Rect {
    Rect::from_edges(100.0, 100.0, 160.0, 120.0)
}

/// A content script on `page` with `settings` already attached. The store is
/// returned so tests can change settings after start-up.
pub fn create_test_content_script(
    page: PageModel,
    settings: &Settings,
) -> (TestContentScript, SharedPage, YamlSettingsStore) {
    let (host, renderer, shared) = simulated_page(page);
    let mut store = YamlSettingsStore::in_memory(settings);
    let mut content = ContentScript::with_timing(host, renderer, settings.timing);
    content.attach_settings(&mut store);
    (content, shared, store)
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Fake clock for driving timers deterministically.
pub struct TestClock {
    start: Instant,
    now: Instant,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        let start = Instant::now();
        Self { start, now: start }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn elapsed(&self) -> Duration {
        self.now - self.start
    }

    /// Move time forward, firing every timer that comes due on the way.
    pub fn advance(&mut self, content: &mut TestContentScript, by: Duration) {
        let target = self.now + by;
        while let Some(deadline) = content.next_deadline() {
            if deadline > target {
                break;
            }
            self.now = self.now.max(deadline);
            content.tick(self.now);
        }
        self.now = target;
    }
}
