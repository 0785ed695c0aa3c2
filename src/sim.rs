//! An in-memory page for driving [`ContentScript`](crate::content_script::ContentScript)
//! without a browser. The host half and the renderer half share one
//! [`PageModel`], so surfaces the renderer mounts get real bounds and DOM
//! nodes the host can answer containment and pointer queries about.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;
use serde::Serialize;

use crate::content_script::{NodeId, PageHost, PointerInsideRegion, SurfaceRenderer};
use crate::engine::{CharHit, MountRequest, Selection, SurfaceKind};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Viewport};

/// Node id of the page body; never part of a surface.
pub const PAGE_NODE: NodeId = NodeId(0);

#[derive(Debug, Clone, PartialEq)]
pub struct MountedSurface {
    pub request: MountRequest,
    pub node: NodeId,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RenderCall {
    Mount(MountRequest),
    Unmount { kind: SurfaceKind },
    MountFailed { kind: SurfaceKind },
}

#[derive(Debug, Clone)]
pub struct PageModel {
    pub hostname: String,
    pub viewport: Viewport,
    pub selection: Option<Selection>,
    pub glyphs: Vec<CharHit>,
    /// Without caret-position APIs `char_at` never finds anything.
    pub caret_api_available: bool,
    pub fail_mounts: bool,
    mounted: BTreeMap<SurfaceKind, MountedSurface>,
    log: Vec<RenderCall>,
    next_node: u64,
}

impl PageModel {
    pub fn new(hostname: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            hostname: hostname.into(),
            viewport,
            selection: None,
            glyphs: Vec::new(),
            caret_api_available: true,
            fail_mounts: false,
            mounted: BTreeMap::new(),
            log: Vec::new(),
            next_node: 1,
        }
    }

    pub fn mounted(&self, kind: SurfaceKind) -> Option<&MountedSurface> {
        self.mounted.get(&kind)
    }

    pub fn mounted_kinds(&self) -> Vec<SurfaceKind> {
        self.mounted.keys().copied().collect()
    }

    pub fn log(&self) -> &[RenderCall] {
        &self.log
    }

    /// Remove and return everything rendered since the last drain.
    pub fn drain_log(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.log)
    }

    /// Node of a mounted surface, or the page body when it is not mounted.
    pub fn node_of(&self, kind: SurfaceKind) -> NodeId {
        self.mounted
            .get(&kind)
            .map(|surface| surface.node)
            .unwrap_or(PAGE_NODE)
    }
}

pub type SharedPage = Rc<RefCell<PageModel>>;

/// Split a page model into its host and renderer halves.
pub fn simulated_page(model: PageModel) -> (SimulatedHost, SimulatedRenderer, SharedPage) {
    let page = Rc::new(RefCell::new(model));
    (
        SimulatedHost(Rc::clone(&page)),
        SimulatedRenderer(Rc::clone(&page)),
        page,
    )
}

pub struct SimulatedHost(SharedPage);

impl PointerInsideRegion for SimulatedHost {
    fn surface_bounds(&self, kind: SurfaceKind) -> Option<Rect> {
        self.0.borrow().mounted(kind).map(|surface| surface.bounds)
    }
}

impl PageHost for SimulatedHost {
    fn hostname(&self) -> String {
        self.0.borrow().hostname.clone()
    }

    fn viewport(&self) -> Viewport {
        self.0.borrow().viewport
    }

    fn selection(&self) -> Option<Selection> {
        let page = self.0.borrow();
        let selection = page.selection.as_ref()?;
        let text = selection.text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Selection {
            text: text.to_string(),
            anchor: selection.anchor,
        })
    }

    fn char_at(&self, point: Point) -> Option<CharHit> {
        let page = self.0.borrow();
        if !page.caret_api_available {
            return None;
        }
        page.glyphs
            .iter()
            .find(|glyph| glyph.anchor.contains(point))
            .copied()
    }

    fn surface_contains(&self, node: NodeId) -> bool {
        node != PAGE_NODE
            && self
                .0
                .borrow()
                .mounted
                .values()
                .any(|surface| surface.node == node)
    }
}

pub struct SimulatedRenderer(SharedPage);

impl SurfaceRenderer for SimulatedRenderer {
    fn mount(&mut self, request: &MountRequest) -> Result<(), RenderError> {
        let mut page = self.0.borrow_mut();
        if page.fail_mounts {
            page.log.push(RenderCall::MountFailed { kind: request.kind });
            return Err(RenderError::Mount {
                kind: request.kind,
                reason: "simulated failure".to_string(),
            });
        }

        let budget = request.kind.budget();
        let bounds = Rect::from_size(
            request.position.left,
            request.position.top,
            budget.max_width,
            budget.max_height,
        );
        let node = NodeId(page.next_node);
        page.next_node += 1;

        debug!("Simulated mount of {:?} as {node:?}", request.kind);
        page.mounted.insert(
            request.kind,
            MountedSurface {
                request: request.clone(),
                node,
                bounds,
            },
        );
        page.log.push(RenderCall::Mount(request.clone()));
        Ok(())
    }

    fn unmount(&mut self, kind: SurfaceKind) {
        let mut page = self.0.borrow_mut();
        if page.mounted.remove(&kind).is_some() {
            page.log.push(RenderCall::Unmount { kind });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn request(kind: SurfaceKind) -> MountRequest {
        MountRequest {
            kind,
            text: "字".to_string(),
            position: Position::new(10.0, 20.0),
        }
    }

    #[test]
    fn test_mount_assigns_bounds_and_node() {
        let (host, mut renderer, page) =
            simulated_page(PageModel::new("example.jp", Viewport::new(800.0, 600.0)));

        renderer.mount(&request(SurfaceKind::HoverPopup)).unwrap();

        let node = page.borrow().node_of(SurfaceKind::HoverPopup);
        assert_ne!(node, PAGE_NODE);
        assert!(host.surface_contains(node));
        assert!(!host.surface_contains(PAGE_NODE));
        assert!(host.pointer_inside(SurfaceKind::HoverPopup, Point::new(15.0, 25.0)));
        assert!(!host.pointer_inside(SurfaceKind::HoverPopup, Point::new(5.0, 25.0)));
        assert!(!host.pointer_inside(SurfaceKind::SelectionPopup, Point::new(15.0, 25.0)));
    }

    #[test]
    fn test_unmount_only_logs_mounted_surfaces() {
        let (_host, mut renderer, page) =
            simulated_page(PageModel::new("example.jp", Viewport::new(800.0, 600.0)));

        renderer.unmount(SurfaceKind::ConfirmButton);
        renderer.mount(&request(SurfaceKind::ConfirmButton)).unwrap();
        renderer.unmount(SurfaceKind::ConfirmButton);

        assert_eq!(
            page.borrow_mut().drain_log(),
            vec![
                RenderCall::Mount(request(SurfaceKind::ConfirmButton)),
                RenderCall::Unmount {
                    kind: SurfaceKind::ConfirmButton
                },
            ]
        );
        assert!(page.borrow().log().is_empty());
    }

    #[test]
    fn test_blank_selection_reads_as_none() {
        let mut model = PageModel::new("example.jp", Viewport::new(800.0, 600.0));
        model.selection = Some(Selection {
            text: "   ".to_string(),
            anchor: Rect::default(),
        });
        let (host, _renderer, _page) = simulated_page(model);
        assert_eq!(host.selection(), None);
    }

    #[test]
    fn test_char_at_without_caret_api() {
        let mut model = PageModel::new("example.jp", Viewport::new(800.0, 600.0));
        model.glyphs.push(CharHit {
            ch: '字',
            anchor: Rect::from_edges(0.0, 0.0, 16.0, 20.0),
        });
        let (host, _renderer, page) = simulated_page(model);

        assert_eq!(host.char_at(Point::new(8.0, 10.0)).map(|hit| hit.ch), Some('字'));
        page.borrow_mut().caret_api_available = false;
        assert_eq!(host.char_at(Point::new(8.0, 10.0)), None);
    }
}
