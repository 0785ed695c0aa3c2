use serde::{Deserialize, Serialize};

use crate::geometry::{Anchor, Position, Viewport};
use crate::placement::{
    self, CONFIRM_BUTTON_BUDGET, HOVER_POPUP_BUDGET, PlacementBudget, SELECTION_POPUP_BUDGET,
};
use crate::settings::PopupMode;
use crate::site_policy::Blacklist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    ConfirmButton,
    SelectionPopup,
    HoverPopup,
}

impl SurfaceKind {
    /// Selection-triggered surfaces share the primary slot.
    pub fn is_primary(self) -> bool {
        matches!(self, SurfaceKind::ConfirmButton | SurfaceKind::SelectionPopup)
    }

    pub fn budget(self) -> PlacementBudget {
        match self {
            SurfaceKind::ConfirmButton => CONFIRM_BUTTON_BUDGET,
            SurfaceKind::SelectionPopup => SELECTION_POPUP_BUDGET,
            SurfaceKind::HoverPopup => HOVER_POPUP_BUDGET,
        }
    }

    pub fn place(self, anchor: &Anchor, viewport: Viewport) -> Position {
        match self {
            SurfaceKind::HoverPopup => placement::place_hover(anchor, &self.budget(), viewport),
            _ => placement::place(anchor, &self.budget(), viewport),
        }
    }
}

/// The one surface currently mounted on the page.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveSurface {
    #[default]
    None,
    ConfirmButton {
        anchor: Anchor,
        text: String,
    },
    SelectionPopup {
        anchor: Anchor,
        text: String,
    },
    HoverPopup {
        anchor: Anchor,
        ch: char,
    },
}

impl ActiveSurface {
    pub fn kind(&self) -> Option<SurfaceKind> {
        match self {
            ActiveSurface::None => None,
            ActiveSurface::ConfirmButton { .. } => Some(SurfaceKind::ConfirmButton),
            ActiveSurface::SelectionPopup { .. } => Some(SurfaceKind::SelectionPopup),
            ActiveSurface::HoverPopup { .. } => Some(SurfaceKind::HoverPopup),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ActiveSurface::None)
    }

    pub fn is_primary(&self) -> bool {
        self.kind().is_some_and(SurfaceKind::is_primary)
    }

    pub fn is_hover(&self) -> bool {
        matches!(self, ActiveSurface::HoverPopup { .. })
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        match self {
            ActiveSurface::None => None,
            ActiveSurface::ConfirmButton { anchor, .. }
            | ActiveSurface::SelectionPopup { anchor, .. }
            | ActiveSurface::HoverPopup { anchor, .. } => Some(anchor),
        }
    }

    /// Text handed to the renderer: the selection, or the hovered character.
    pub fn content(&self) -> Option<String> {
        match self {
            ActiveSurface::None => None,
            ActiveSurface::ConfirmButton { text, .. }
            | ActiveSurface::SelectionPopup { text, .. } => Some(text.clone()),
            ActiveSurface::HoverPopup { ch, .. } => Some(ch.to_string()),
        }
    }
}

/// A non-empty text selection and its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub text: String,
    pub anchor: Anchor,
}

/// The character under the pointer and its glyph box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharHit {
    pub ch: char,
    pub anchor: Anchor,
}

/// Page conditions sampled when the hover delay elapses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoverProbe {
    /// `None` when nothing is under the pointer or the caret APIs are missing.
    pub hit: Option<CharHit>,
    pub selection_active: bool,
    pub buttons_pressed: bool,
}

/// Normalized inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TextSelected(Selection),
    SelectionCleared,
    ButtonClicked,
    ClickOutside,
    HoverSettled(HoverProbe),
    /// Close grace elapsed; `pointer_inside` is whether the pointer is over
    /// the hover popup right now.
    HoverLeft { pointer_inside: bool },
    EscapePressed,
    PopupModeChanged(PopupMode),
    HoverModeChanged(bool),
    BlacklistChanged(Blacklist),
    ViewportResized(Viewport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountRequest {
    pub kind: SurfaceKind,
    pub text: String,
    pub position: Position,
}

/// Instructions for the adapter, executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Mount(MountRequest),
    Unmount(SurfaceKind),
    CancelHoverTimers,
    /// Drop a pending close grace; the pending open, if any, is kept.
    CancelHoverClose,
    /// Attach (true) or detach (false) pointer-move and pointer-out tracking.
    SetHoverTracking(bool),
}
