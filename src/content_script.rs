use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::debounce::Debouncer;
use crate::engine::{
    CharHit, Effect, EngineEvent, EngineState, HoverProbe, MountRequest, Selection, SurfaceKind,
    step,
};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Viewport};
use crate::settings::{
    PopupMode, SettingKey, SettingsProxy, Subscription, Timing, parse_blacklist, parse_hover_mode,
    parse_popup_mode,
};
use crate::site_policy::Blacklist;

/// Cross-script message asking the page to start a region capture.
pub const START_SELECTION_MESSAGE: &str = "START_SELECTION";

/// Opaque handle for a DOM node, as reported by event targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Raw DOM events the content script listens to.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    MouseUp { target: NodeId },
    MouseMove { point: Point, buttons: u16 },
    MouseOut { point: Point },
    /// Capture-phase mousedown.
    MouseDown { target: NodeId },
    KeyDown { key: String },
    /// The confirm button's own click handler.
    ConfirmButtonClick,
    Message { data: serde_json::Value },
}

/// Answers "is the pointer over this surface right now".
pub trait PointerInsideRegion {
    fn surface_bounds(&self, kind: SurfaceKind) -> Option<Rect>;

    fn pointer_inside(&self, kind: SurfaceKind, point: Point) -> bool {
        self.surface_bounds(kind)
            .is_some_and(|bounds| bounds.contains(point))
    }
}

/// Read access to the page the content script runs in.
pub trait PageHost: PointerInsideRegion {
    fn hostname(&self) -> String;

    fn viewport(&self) -> Viewport;

    /// The current selection with its text trimmed, or `None` when there is
    /// no range or the text is empty.
    fn selection(&self) -> Option<Selection>;

    /// The character at `point`. `None` when there is none, or when the
    /// browser lacks caret-position APIs.
    fn char_at(&self, point: Point) -> Option<CharHit>;

    /// DOM containment test against the mounted surface containers.
    fn surface_contains(&self, node: NodeId) -> bool;
}

/// Mounts and unmounts the popup bodies. Rendering and dictionary fetches
/// happen behind this trait.
pub trait SurfaceRenderer {
    fn mount(&mut self, request: &MountRequest) -> Result<(), RenderError>;

    fn unmount(&mut self, kind: SurfaceKind);
}

/// Engine state plus everything its effects act on. Shared with the settings
/// watchers so a change is applied the moment it is reported.
struct Core<R: SurfaceRenderer> {
    renderer: R,
    state: EngineState,
    hover_open: Debouncer<Point>,
    hover_close: Debouncer<()>,
    hover_tracking: bool,
}

impl<R: SurfaceRenderer> Core<R> {
    fn dispatch(&mut self, event: EngineEvent) {
        debug!("Engine event {event:?}");
        let (state, effects) = step(std::mem::take(&mut self.state), event);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Mount(request) => {
                if let Err(e) = self.renderer.mount(&request) {
                    error!("Renderer failed: {e}");
                }
            }
            Effect::Unmount(kind) => self.renderer.unmount(kind),
            Effect::CancelHoverTimers => {
                self.hover_open.cancel();
                self.hover_close.cancel();
            }
            Effect::CancelHoverClose => {
                self.hover_close.cancel();
            }
            Effect::SetHoverTracking(enabled) => {
                if self.hover_tracking != enabled {
                    debug!("Hover tracking {}", if enabled { "attached" } else { "detached" });
                }
                self.hover_tracking = enabled;
                if !enabled {
                    self.hover_open.cancel();
                    self.hover_close.cancel();
                }
            }
        }
    }
}

/// Glue between the page and the state machine.
///
/// Owns the engine state and both hover timers, turns DOM events into
/// [`EngineEvent`]s and carries out the resulting effects. Settings changes
/// are applied inside the watch callback, so a blacklist or mode change
/// tears surfaces down before the store call that reported it returns.
pub struct ContentScript<H: PageHost, R: SurfaceRenderer> {
    host: H,
    core: Rc<RefCell<Core<R>>>,
    last_pointer: Option<Point>,
    last_buttons: u16,
    /// Changes reported while the core was busy; applied on the next call in.
    deferred: Rc<RefCell<VecDeque<EngineEvent>>>,
    subscriptions: Vec<Subscription>,
}

impl<H: PageHost, R: SurfaceRenderer> ContentScript<H, R> {
    /// Starts with default settings: `immediate`, hover off, empty blacklist.
    pub fn new(host: H, renderer: R) -> Self {
        Self::with_timing(host, renderer, Timing::default())
    }

    pub fn with_timing(host: H, renderer: R, timing: Timing) -> Self {
        let state = EngineState::new(host.hostname(), host.viewport());
        let core = Core {
            renderer,
            state,
            hover_open: Debouncer::new(timing.hover_open_delay()),
            hover_close: Debouncer::new(timing.hover_close_grace()),
            hover_tracking: false,
        };
        Self {
            host,
            core: Rc::new(RefCell::new(core)),
            last_pointer: None,
            last_buttons: 0,
            deferred: Rc::default(),
            subscriptions: Vec::new(),
        }
    }

    pub fn state(&self) -> Ref<'_, EngineState> {
        Ref::map(self.core.borrow(), |core| &core.state)
    }

    /// Whether pointer-move and pointer-out listeners are wanted.
    pub fn is_tracking_hover(&self) -> bool {
        self.core.borrow().hover_tracking
    }

    /// Read every setting once and subscribe to later changes.
    ///
    /// A key that fails to load, or holds a value of the wrong shape, keeps
    /// its default. Nothing is surfaced to the user.
    pub fn attach_settings(&mut self, proxy: &mut dyn SettingsProxy)
    where
        R: 'static,
    {
        for key in SettingKey::ALL {
            let value = match proxy.get_item(key) {
                Ok(value) => value,
                Err(e) => {
                    error!("Failed to load setting {}: {e}; keeping default", key.as_str());
                    continue;
                }
            };
            if let Some(event) = settings_event(key, value.as_ref()) {
                self.dispatch(event);
            }
        }

        for key in SettingKey::ALL {
            let core = Rc::downgrade(&self.core);
            let deferred = Rc::clone(&self.deferred);
            let subscription = proxy.watch(
                key,
                Box::new(move |new, _old| {
                    let Some(event) = settings_event(key, new) else {
                        return;
                    };
                    let Some(core) = core.upgrade() else {
                        return;
                    };
                    // A renderer that writes settings while mounting re-enters
                    // here with the core borrowed.
                    match core.try_borrow_mut() {
                        Ok(mut core) => core.dispatch(event),
                        Err(_) => deferred.borrow_mut().push_back(event),
                    };
                }),
            );
            self.subscriptions.push(subscription);
        }

        let core = self.core.borrow();
        info!(
            "Settings attached: popup mode {:?}, hover {}, {} blacklist entries",
            core.state.popup_mode(),
            core.state.hover_mode(),
            core.state.blacklist().entries().len()
        );
    }

    /// Drop every settings subscription.
    pub fn detach_settings(&mut self) {
        self.subscriptions.clear();
    }

    pub fn handle_event(&mut self, now: Instant, event: DomEvent) {
        self.sync();

        match event {
            DomEvent::MouseUp { target } => {
                if self.host.surface_contains(target) {
                    return;
                }
                match self.host.selection() {
                    Some(selection) => self.dispatch(EngineEvent::TextSelected(selection)),
                    None => self.dispatch(EngineEvent::SelectionCleared),
                }
            }
            DomEvent::MouseMove { point, buttons } => {
                self.last_pointer = Some(point);
                self.last_buttons = buttons;
                let mut core = self.core.borrow_mut();
                if !core.hover_tracking {
                    return;
                }
                if self.host.pointer_inside(SurfaceKind::HoverPopup, point) {
                    // Back on the popup: keep it, and do not look up its text.
                    core.hover_close.cancel();
                    core.hover_open.cancel();
                    return;
                }
                if core.state.hover_allowed() {
                    core.hover_open.schedule(now, point);
                }
            }
            DomEvent::MouseOut { point } => {
                self.last_pointer = Some(point);
                let mut core = self.core.borrow_mut();
                if core.hover_tracking && core.state.surface().is_hover() {
                    core.hover_close.schedule(now, ());
                }
            }
            DomEvent::MouseDown { target } => {
                let primary = self.state().surface().is_primary();
                if primary && !self.host.surface_contains(target) {
                    self.dispatch(EngineEvent::ClickOutside);
                }
            }
            DomEvent::KeyDown { key } => {
                if key == "Escape" {
                    self.dispatch(EngineEvent::EscapePressed);
                } else {
                    debug!("keydown {key}");
                }
            }
            DomEvent::ConfirmButtonClick => self.dispatch(EngineEvent::ButtonClicked),
            DomEvent::Message { data } => {
                let kind = data.get("type").and_then(serde_json::Value::as_str);
                if kind == Some(START_SELECTION_MESSAGE) {
                    info!("Region capture requested; handled by the capture overlay");
                } else {
                    debug!("Ignoring page message {data}");
                }
            }
        }
    }

    /// Fire any hover timer whose deadline has passed. The host loop calls
    /// this at [`ContentScript::next_deadline`].
    pub fn tick(&mut self, now: Instant) {
        self.sync();

        let settled = self.core.borrow_mut().hover_open.poll(now);
        if let Some(point) = settled {
            if self.state().hover_allowed() {
                let probe = HoverProbe {
                    hit: self.host.char_at(point),
                    selection_active: self.host.selection().is_some(),
                    buttons_pressed: self.last_buttons != 0,
                };
                self.dispatch(EngineEvent::HoverSettled(probe));
            } else {
                debug!("Hover settled while suppressed, skipping lookup");
            }
        }

        let left = self.core.borrow_mut().hover_close.poll(now);
        if left.is_some() {
            let pointer_inside = self
                .last_pointer
                .is_some_and(|point| self.host.pointer_inside(SurfaceKind::HoverPopup, point));
            self.dispatch(EngineEvent::HoverLeft { pointer_inside });
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let core = self.core.borrow();
        match (core.hover_open.next_deadline(), core.hover_close.next_deadline()) {
            (Some(open), Some(close)) => Some(open.min(close)),
            (open, close) => open.or(close),
        }
    }

    /// Apply deferred settings changes and pick up viewport resizes.
    fn sync(&mut self) {
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.dispatch(event);
        }

        let viewport = self.host.viewport();
        if viewport != self.state().viewport() {
            self.dispatch(EngineEvent::ViewportResized(viewport));
        }
    }

    fn dispatch(&mut self, event: EngineEvent) {
        self.core.borrow_mut().dispatch(event);
    }
}

/// Translate a raw settings value into the engine event it implies. Absent
/// keys fall back to their defaults; values of the wrong shape are dropped
/// with a warning.
fn settings_event(key: SettingKey, value: Option<&serde_yaml::Value>) -> Option<EngineEvent> {
    match key {
        SettingKey::PopupMode => {
            let Some(value) = value else {
                return Some(EngineEvent::PopupModeChanged(PopupMode::default()));
            };
            let mode = parse_popup_mode(value);
            if mode.is_none() {
                warn!("Ignoring invalid popupMode {value:?}");
            }
            mode.map(EngineEvent::PopupModeChanged)
        }
        SettingKey::HoverMode => {
            let Some(value) = value else {
                return Some(EngineEvent::HoverModeChanged(false));
            };
            let enabled = parse_hover_mode(value);
            if enabled.is_none() {
                warn!("Ignoring invalid hoverMode {value:?}");
            }
            enabled.map(EngineEvent::HoverModeChanged)
        }
        SettingKey::Blacklist => Some(EngineEvent::BlacklistChanged(Blacklist::new(
            parse_blacklist(value),
        ))),
    }
}
