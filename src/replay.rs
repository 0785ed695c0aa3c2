//! Scripted replays of page interaction.
//!
//! A script describes a page (hostname, viewport, glyph boxes), the stored
//! settings, and a sequence of user actions. [`run_script`] plays it against
//! a [`ContentScript`] on a simulated clock and returns every mount and
//! unmount with the time it happened.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::content_script::{ContentScript, DomEvent};
use crate::engine::{CharHit, Selection, SurfaceKind};
use crate::geometry::{Point, Rect, Viewport};
use crate::settings::{SettingKey, Settings, YamlSettingsStore};
use crate::sim::{
    PAGE_NODE, PageModel, RenderCall, SharedPage, SimulatedHost, SimulatedRenderer,
    simulated_page,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub glyphs: Vec<CharHit>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_viewport() -> Viewport {
    Viewport::new(1280.0, 800.0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Drag-select `text`: mousedown on the page, then mouseup.
    Select { text: String, anchor: Rect },
    /// Click on empty page space, collapsing the selection.
    ClearSelection,
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        buttons: u16,
    },
    Leave { x: f64, y: f64 },
    /// Mousedown on a mounted surface, or on the page when `on` is absent.
    Press {
        #[serde(default)]
        on: Option<SurfaceKind>,
    },
    ClickButton,
    Key { key: String },
    Wait { ms: u64 },
    Set { key: SettingKey, value: serde_yaml::Value },
    Resize { width: f64, height: f64 },
    Message { data: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCall {
    pub at_ms: u64,
    #[serde(flatten)]
    pub call: RenderCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub calls: Vec<TimedCall>,
    pub final_surfaces: Vec<SurfaceKind>,
}

pub fn load_script(path: &Path) -> Result<Script> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Failed to parse script {}", path.display()))
}

pub fn parse_script(content: &str) -> Result<Script> {
    Ok(serde_yaml::from_str(content)?)
}

struct Replay {
    content: ContentScript<SimulatedHost, SimulatedRenderer>,
    page: SharedPage,
    store: YamlSettingsStore,
    start: Instant,
    now: Instant,
    calls: Vec<TimedCall>,
}

impl Replay {
    fn elapsed_ms(&self) -> u64 {
        self.now.duration_since(self.start).as_millis() as u64
    }

    fn collect(&mut self) {
        let at_ms = self.elapsed_ms();
        let drained = self.page.borrow_mut().drain_log();
        self.calls
            .extend(drained.into_iter().map(|call| TimedCall { at_ms, call }));
    }

    fn dom(&mut self, event: DomEvent) {
        self.content.handle_event(self.now, event);
        self.collect();
    }

    fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        while let Some(deadline) = self.content.next_deadline() {
            if deadline > target {
                break;
            }
            self.now = self.now.max(deadline);
            self.content.tick(self.now);
            self.collect();
        }
        self.now = target;
    }

    fn play(&mut self, step: ScriptStep) -> Result<()> {
        match step {
            ScriptStep::Select { text, anchor } => {
                self.dom(DomEvent::MouseDown { target: PAGE_NODE });
                self.page.borrow_mut().selection = Some(Selection { text, anchor });
                self.dom(DomEvent::MouseUp { target: PAGE_NODE });
            }
            ScriptStep::ClearSelection => {
                self.dom(DomEvent::MouseDown { target: PAGE_NODE });
                self.page.borrow_mut().selection = None;
                self.dom(DomEvent::MouseUp { target: PAGE_NODE });
            }
            ScriptStep::Move { x, y, buttons } => self.dom(DomEvent::MouseMove {
                point: Point::new(x, y),
                buttons,
            }),
            ScriptStep::Leave { x, y } => self.dom(DomEvent::MouseOut {
                point: Point::new(x, y),
            }),
            ScriptStep::Press { on } => {
                let target = on.map_or(PAGE_NODE, |kind| self.page.borrow().node_of(kind));
                if target == PAGE_NODE {
                    // Pressing on page text collapses the selection.
                    self.page.borrow_mut().selection = None;
                }
                self.dom(DomEvent::MouseDown { target });
            }
            ScriptStep::ClickButton => {
                let target = self.page.borrow().node_of(SurfaceKind::ConfirmButton);
                self.dom(DomEvent::MouseDown { target });
                self.dom(DomEvent::MouseUp { target });
                self.dom(DomEvent::ConfirmButtonClick);
            }
            ScriptStep::Key { key } => self.dom(DomEvent::KeyDown { key }),
            ScriptStep::Wait { ms } => self.advance(Duration::from_millis(ms)),
            ScriptStep::Set { key, value } => {
                self.store
                    .set_item(key, value)
                    .with_context(|| format!("Failed to set {}", key.as_str()))?;
                self.collect();
            }
            ScriptStep::Resize { width, height } => {
                self.page.borrow_mut().viewport = Viewport::new(width, height);
                self.content.tick(self.now);
                self.collect();
            }
            ScriptStep::Message { data } => self.dom(DomEvent::Message { data }),
        }
        Ok(())
    }
}

/// Play `script` from a fresh page load and report what was rendered.
pub fn run_script(script: &Script) -> Result<ReplayReport> {
    let mut model = PageModel::new(script.hostname.clone(), script.viewport);
    model.glyphs = script.glyphs.clone();
    let (host, renderer, page) = simulated_page(model);

    let mut store = YamlSettingsStore::in_memory(&script.settings);
    let mut content = ContentScript::with_timing(host, renderer, store.timing());
    content.attach_settings(&mut store);

    let start = Instant::now();
    let mut replay = Replay {
        content,
        page,
        store,
        start,
        now: start,
        calls: Vec::new(),
    };
    replay.collect();

    for (index, step) in script.steps.iter().cloned().enumerate() {
        replay
            .play(step)
            .with_context(|| format!("Step {} failed", index + 1))?;
    }

    let final_surfaces = replay.page.borrow().mounted_kinds();
    info!(
        "Replay finished after {}ms with {} render calls",
        replay.elapsed_ms(),
        replay.calls.len()
    );
    Ok(ReplayReport {
        calls: replay.calls,
        final_surfaces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUTTON_SCRIPT: &str = r#"
hostname: news.example.jp
viewport: { width: 1000, height: 800 }
settings:
  popupMode: button
  hoverMode: true
glyphs:
  - { ch: "字", anchor: { left: 300, top: 300, right: 316, bottom: 320 } }
steps:
  - action: select
    text: "日本語"
    anchor: { left: 100, top: 100, right: 160, bottom: 120 }
  - action: click_button
  - action: press
  - action: move
    x: 308
    y: 310
  - action: wait
    ms: 350
  - action: set
    key: hoverMode
    value: false
"#;

    fn kinds(report: &ReplayReport) -> Vec<(u64, String)> {
        report
            .calls
            .iter()
            .map(|timed| {
                let label = match &timed.call {
                    RenderCall::Mount(request) => format!("mount {:?}", request.kind),
                    RenderCall::Unmount { kind } => format!("unmount {kind:?}"),
                    RenderCall::MountFailed { kind } => format!("failed {kind:?}"),
                };
                (timed.at_ms, label)
            })
            .collect()
    }

    #[test]
    fn test_button_then_hover_replay() {
        let script = parse_script(BUTTON_SCRIPT).unwrap();
        let report = run_script(&script).unwrap();

        assert_eq!(
            kinds(&report),
            vec![
                (0, "mount ConfirmButton".to_string()),
                (0, "unmount ConfirmButton".to_string()),
                (0, "mount SelectionPopup".to_string()),
                (0, "unmount SelectionPopup".to_string()),
                (300, "mount HoverPopup".to_string()),
                (350, "unmount HoverPopup".to_string()),
            ]
        );
        assert!(report.final_surfaces.is_empty());
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let script = parse_script("steps: []").unwrap();
        assert_eq!(script.hostname, "localhost");
        assert_eq!(script.viewport, Viewport::new(1280.0, 800.0));
        assert_eq!(script.settings, Settings::default());
        let report = run_script(&script).unwrap();
        assert!(report.calls.is_empty());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(parse_script("steps:\n  - action: teleport\n").is_err());
    }
}
