use crate::geometry::{Anchor, Position, Viewport};

/// Size limits and spacing for one kind of surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementBudget {
    pub max_width: f64,
    pub max_height: f64,
    /// Minimum distance kept from every viewport edge.
    pub padding: f64,
    /// Preferred distance from the anchor.
    pub gap: f64,
}

pub const SELECTION_POPUP_BUDGET: PlacementBudget = PlacementBudget {
    max_width: 700.0,
    max_height: 480.0,
    padding: 12.0,
    gap: 8.0,
};

pub const CONFIRM_BUTTON_BUDGET: PlacementBudget = PlacementBudget {
    max_width: 100.0,
    max_height: 40.0,
    padding: 8.0,
    gap: 6.0,
};

pub const HOVER_POPUP_BUDGET: PlacementBudget = PlacementBudget {
    max_width: 360.0,
    max_height: 320.0,
    padding: 12.0,
    gap: 8.0,
};

/// Below this much room under the anchor a popup may flip above it.
pub const FLIP_ABOVE_MAX_SPACE_BELOW: f64 = 100.0;
/// Flipping above only happens with at least this much room over the anchor.
pub const FLIP_ABOVE_MIN_SPACE_ABOVE: f64 = 300.0;

/// Position a selection popup or confirm button next to `anchor`.
///
/// Prefers below the anchor, starting at its left edge. Overflow on the
/// right moves the surface to the anchor's left side when it fits there,
/// otherwise it is pinned against the right edge. Overflow at the bottom
/// flips above the anchor only when the space below is nearly gone and the
/// space above is generous.
pub fn place(anchor: &Anchor, budget: &PlacementBudget, viewport: Viewport) -> Position {
    Position::new(
        place_horizontal(anchor, budget, viewport),
        place_vertical(anchor, budget, viewport),
    )
}

fn place_horizontal(anchor: &Anchor, budget: &PlacementBudget, viewport: Viewport) -> f64 {
    let mut left = anchor.left;

    if left + budget.max_width > viewport.width - budget.padding {
        let flipped = anchor.left - budget.max_width;
        left = if flipped >= budget.padding {
            flipped
        } else {
            viewport.width - budget.max_width - budget.padding
        };
    }

    left.max(budget.padding)
}

fn place_vertical(anchor: &Anchor, budget: &PlacementBudget, viewport: Viewport) -> f64 {
    let mut top = anchor.bottom + budget.gap;

    if top + budget.max_height > viewport.height - budget.padding {
        let space_below = viewport.height - anchor.bottom - budget.padding;
        let space_above = anchor.top - budget.padding;

        top = if space_below < FLIP_ABOVE_MAX_SPACE_BELOW
            && space_above >= FLIP_ABOVE_MIN_SPACE_ABOVE
        {
            anchor.top - budget.max_height.min(space_above) - budget.gap
        } else {
            clamp_lenient(
                top,
                budget.padding,
                viewport.height - budget.max_height - budget.padding,
            )
        };
    }

    top.max(budget.padding)
}

/// Position a hover popup beside a single character.
///
/// Sits to the right of the glyph, aligned with its top. When the right side
/// has no room it moves to the glyph's left side. Both axes are then clamped
/// so the popup stays fully visible.
pub fn place_hover(anchor: &Anchor, budget: &PlacementBudget, viewport: Viewport) -> Position {
    let mut left = anchor.right + budget.gap;
    if left + budget.max_width > viewport.width - budget.padding {
        left = anchor.left - budget.max_width - budget.gap;
    }
    let left = clamp_lenient(
        left,
        budget.padding,
        viewport.width - budget.max_width - budget.padding,
    );

    let top = clamp_lenient(
        anchor.top,
        budget.padding,
        viewport.height - budget.max_height - budget.padding,
    );

    Position::new(left, top)
}

// f64::clamp panics when min > max, which happens on viewports smaller than
// the budget. The lower bound wins in that case.
fn clamp_lenient(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 800.0)
    }

    #[test]
    fn test_prefers_below_left_aligned() {
        let anchor = Rect::from_edges(100.0, 100.0, 200.0, 120.0);
        let pos = place(&anchor, &SELECTION_POPUP_BUDGET, viewport());
        assert_eq!(pos, Position::new(100.0, 128.0));
    }

    #[test]
    fn test_bottom_right_corner_stays_visible() {
        let anchor = Rect::from_edges(950.0, 760.0, 990.0, 780.0);
        let budget = SELECTION_POPUP_BUDGET;
        let pos = place(&anchor, &budget, viewport());

        assert!(pos.left >= 12.0);
        assert!(pos.left + 700.0 <= 988.0);
        assert!(pos.top >= 12.0);
        assert!(pos.top + 480.0 <= 788.0);
        // Flipped to the left of the anchor and above it.
        assert_eq!(pos.left, 250.0);
        assert_eq!(pos.top, 760.0 - 480.0 - 8.0);
    }

    #[test]
    fn test_right_overflow_pins_to_edge_when_left_side_too_narrow() {
        let anchor = Rect::from_edges(500.0, 100.0, 560.0, 120.0);
        let pos = place(&anchor, &SELECTION_POPUP_BUDGET, viewport());
        // 500 - 700 < 12, so pinned at 1000 - 700 - 12.
        assert_eq!(pos.left, 288.0);
    }

    #[test]
    fn test_bottom_overflow_with_little_room_above_clamps_below() {
        // Only 188px above the anchor, so no flip.
        let anchor = Rect::from_edges(100.0, 200.0, 160.0, 700.0);
        let pos = place(&anchor, &SELECTION_POPUP_BUDGET, viewport());
        assert_eq!(pos.top, 800.0 - 480.0 - 12.0);
    }

    #[test]
    fn test_bottom_overflow_with_room_below_clamps_instead_of_flipping() {
        // 150px below the anchor is more than the flip threshold.
        let anchor = Rect::from_edges(100.0, 620.0, 160.0, 638.0);
        let pos = place(&anchor, &SELECTION_POPUP_BUDGET, viewport());
        assert_eq!(pos.top, 308.0);
    }

    #[test]
    fn test_tiny_viewport_never_goes_negative() {
        let anchor = Rect::from_edges(50.0, 50.0, 80.0, 70.0);
        let tiny = Viewport::new(200.0, 150.0);
        let pos = place(&anchor, &SELECTION_POPUP_BUDGET, tiny);
        assert_eq!(pos, Position::new(12.0, 12.0));

        let hover = place_hover(&anchor, &HOVER_POPUP_BUDGET, tiny);
        assert_eq!(hover, Position::new(12.0, 12.0));
    }

    #[test]
    fn test_confirm_button_uses_small_budget() {
        let anchor = Rect::from_edges(950.0, 100.0, 990.0, 120.0);
        let pos = place(&anchor, &CONFIRM_BUTTON_BUDGET, viewport());
        // 950 + 100 overflows, 950 - 100 fits on the left.
        assert_eq!(pos, Position::new(850.0, 126.0));
    }

    #[test]
    fn test_hover_sits_right_of_glyph() {
        let anchor = Rect::from_edges(100.0, 200.0, 116.0, 220.0);
        let pos = place_hover(&anchor, &HOVER_POPUP_BUDGET, viewport());
        assert_eq!(pos, Position::new(124.0, 200.0));
    }

    #[test]
    fn test_hover_falls_back_left_of_glyph() {
        let anchor = Rect::from_edges(800.0, 200.0, 816.0, 220.0);
        let pos = place_hover(&anchor, &HOVER_POPUP_BUDGET, viewport());
        assert_eq!(pos.left, 800.0 - 360.0 - 8.0);
    }

    #[test]
    fn test_hover_clamped_vertically() {
        let anchor = Rect::from_edges(100.0, 700.0, 116.0, 720.0);
        let pos = place_hover(&anchor, &HOVER_POPUP_BUDGET, viewport());
        assert_eq!(pos.top, 800.0 - 320.0 - 12.0);
    }
}
