//! Popup state machine.
//!
//! All decisions about which surface is visible live here, as a pure
//! function from the current [`EngineState`] and one [`EngineEvent`] to the
//! next state plus the [`Effect`]s the page adapter has to carry out. The
//! selection-driven surfaces (confirm button, lookup popup) share a primary
//! slot that always outranks the hover popup.

mod types;

pub use types::*;

use log::debug;

use crate::charset::{contains_japanese, is_kanji};
use crate::geometry::{Anchor, Viewport};
use crate::settings::PopupMode;
use crate::site_policy::Blacklist;

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    popup_mode: PopupMode,
    hover_mode: bool,
    blacklist: Blacklist,
    hostname: String,
    blocked: bool,
    viewport: Viewport,
    surface: ActiveSurface,
}

impl EngineState {
    pub fn new(hostname: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            hostname: hostname.into(),
            viewport,
            ..Self::default()
        }
    }

    pub fn surface(&self) -> &ActiveSurface {
        &self.surface
    }

    pub fn popup_mode(&self) -> PopupMode {
        self.popup_mode
    }

    pub fn hover_mode(&self) -> bool {
        self.hover_mode
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Whether the current page is on the blacklist.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// The single priority guard: hover lookups only run when nothing
    /// selection-driven is up, the page is allowed and hover mode is on.
    pub fn hover_allowed(&self) -> bool {
        !self.surface.is_primary() && !self.blocked && self.hover_mode
    }

    fn apply(&mut self, event: EngineEvent, effects: &mut Vec<Effect>) {
        match event {
            EngineEvent::TextSelected(selection) => self.on_text_selected(selection, effects),
            EngineEvent::SelectionCleared | EngineEvent::ClickOutside => {
                self.teardown_primary(effects);
            }
            EngineEvent::ButtonClicked => {
                if let ActiveSurface::ConfirmButton { anchor, text } = &self.surface {
                    let promoted = ActiveSurface::SelectionPopup {
                        anchor: *anchor,
                        text: text.clone(),
                    };
                    self.show(promoted, effects);
                }
            }
            EngineEvent::HoverSettled(probe) => self.on_hover_settled(probe, effects),
            EngineEvent::HoverLeft { pointer_inside } => {
                if !pointer_inside {
                    self.teardown_hover(effects);
                }
            }
            EngineEvent::EscapePressed => {
                self.teardown_all(effects);
                effects.push(Effect::CancelHoverTimers);
            }
            EngineEvent::PopupModeChanged(mode) => {
                self.popup_mode = mode;
                if mode == PopupMode::Off {
                    self.teardown_primary(effects);
                }
            }
            EngineEvent::HoverModeChanged(enabled) => {
                self.hover_mode = enabled;
                effects.push(Effect::SetHoverTracking(enabled));
                if !enabled {
                    self.teardown_hover(effects);
                    effects.push(Effect::CancelHoverTimers);
                }
            }
            EngineEvent::BlacklistChanged(blacklist) => {
                self.blacklist = blacklist;
                let was_blocked = self.blocked;
                self.blocked = self.blacklist.matches(&self.hostname);
                if self.blocked && !was_blocked {
                    debug!("{} is now blacklisted, clearing surfaces", self.hostname);
                    self.teardown_all(effects);
                    effects.push(Effect::CancelHoverTimers);
                }
            }
            EngineEvent::ViewportResized(viewport) => self.viewport = viewport,
        }
    }

    fn on_text_selected(&mut self, selection: Selection, effects: &mut Vec<Effect>) {
        if self.blocked || self.popup_mode == PopupMode::Off {
            self.teardown_primary(effects);
            return;
        }

        if !contains_japanese(&selection.text) {
            self.teardown_primary(effects);
            return;
        }

        self.teardown_hover(effects);
        effects.push(Effect::CancelHoverTimers);

        let Selection { text, anchor } = selection;
        let surface = match self.popup_mode {
            PopupMode::Button => ActiveSurface::ConfirmButton { anchor, text },
            _ => ActiveSurface::SelectionPopup { anchor, text },
        };
        self.show(surface, effects);
    }

    fn on_hover_settled(&mut self, probe: HoverProbe, effects: &mut Vec<Effect>) {
        if !self.hover_allowed() || probe.selection_active || probe.buttons_pressed {
            return;
        }

        match probe.hit {
            Some(CharHit { ch, anchor }) if is_kanji(ch) => {
                // The pointer is resting on the glyph this popup belongs to,
                // so a close grace armed for an earlier popup no longer applies.
                effects.push(Effect::CancelHoverClose);
                if self.is_showing_hover(ch, &anchor) {
                    return;
                }
                self.show(ActiveSurface::HoverPopup { anchor, ch }, effects);
            }
            _ => self.teardown_hover(effects),
        }
    }

    fn is_showing_hover(&self, ch: char, anchor: &Anchor) -> bool {
        matches!(
            &self.surface,
            ActiveSurface::HoverPopup { ch: shown, anchor: at } if *shown == ch && at == anchor
        )
    }

    /// Replace whatever is mounted with `surface`. The old surface is always
    /// unmounted before the new one is mounted.
    fn show(&mut self, surface: ActiveSurface, effects: &mut Vec<Effect>) {
        self.teardown_all(effects);

        let (Some(kind), Some(anchor), Some(text)) =
            (surface.kind(), surface.anchor().copied(), surface.content())
        else {
            return;
        };

        let position = kind.place(&anchor, self.viewport);
        debug!("Mounting {kind:?} at ({}, {})", position.left, position.top);
        effects.push(Effect::Mount(MountRequest {
            kind,
            text,
            position,
        }));
        self.surface = surface;
    }

    fn teardown_primary(&mut self, effects: &mut Vec<Effect>) {
        if self.surface.is_primary() {
            self.teardown_all(effects);
        }
    }

    fn teardown_hover(&mut self, effects: &mut Vec<Effect>) {
        if self.surface.is_hover() {
            self.teardown_all(effects);
        }
    }

    fn teardown_all(&mut self, effects: &mut Vec<Effect>) {
        if let Some(kind) = std::mem::take(&mut self.surface).kind() {
            debug!("Unmounting {kind:?}");
            effects.push(Effect::Unmount(kind));
        }
    }
}

/// Advance the state machine by one event.
pub fn step(state: EngineState, event: EngineEvent) -> (EngineState, Vec<Effect>) {
    let mut state = state;
    let mut effects = Vec::new();
    state.apply(event, &mut effects);
    (state, effects)
}
