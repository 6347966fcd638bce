//! Scroll target seam.
//!
//! The page driver only ever talks to `ScrollSurface`/`ScrollTarget`; the
//! in-memory `VirtualPage` backs the headless host, the demo and the tests.

/// One element whose vertical scroll offset can be read and written.
pub trait ScrollTarget {
    fn scroll_offset(&self) -> f64;
    fn scroll_extent(&self) -> f64;
    fn viewport_extent(&self) -> f64;
    /// Instant (non-animated) scroll to an absolute offset.
    fn scroll_to(&mut self, offset: f64);

    /// Fraction of the scrollable range already scrolled, or `None` when the
    /// element has nothing to scroll.
    fn scroll_percentage(&self) -> Option<f64> {
        let distance = self.scroll_extent() - self.viewport_extent();
        if distance > 0.0 {
            Some(self.scroll_offset() / distance)
        } else {
            None
        }
    }
}

/// A page's candidate scroll targets, in priority order: document override
/// element, body, root scrolling element.
pub trait ScrollSurface: Send {
    fn targets(&mut self) -> Vec<&mut dyn ScrollTarget>;
    /// The element reported by page-info queries.
    fn primary(&self) -> Option<&dyn ScrollTarget>;
}

/// In-memory scrollable element.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualViewport {
    offset: f64,
    extent: f64,
    viewport: f64,
    locked: bool,
}

impl VirtualViewport {
    pub fn new(extent: f64, viewport: f64) -> Self {
        Self {
            offset: 0.0,
            extent,
            viewport,
            locked: false,
        }
    }

    /// An element that reports geometry but ignores scroll writes, like a body
    /// element in standards mode.
    pub fn locked(extent: f64, viewport: f64) -> Self {
        Self {
            locked: true,
            ..Self::new(extent, viewport)
        }
    }

    pub fn at_offset(mut self, offset: f64) -> Self {
        self.scroll_to(offset);
        self
    }

    fn max_offset(&self) -> f64 {
        (self.extent - self.viewport).max(0.0)
    }
}

impl ScrollTarget for VirtualViewport {
    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn scroll_extent(&self) -> f64 {
        self.extent
    }

    fn viewport_extent(&self) -> f64 {
        self.viewport
    }

    fn scroll_to(&mut self, offset: f64) {
        if self.locked {
            return;
        }
        self.offset = offset.clamp(0.0, self.max_offset());
    }
}

/// In-memory page with up to three candidate targets.
#[derive(Debug, Clone, Default)]
pub struct VirtualPage {
    pub override_element: Option<VirtualViewport>,
    pub body: Option<VirtualViewport>,
    pub root: Option<VirtualViewport>,
}

impl VirtualPage {
    pub fn new(
        override_element: Option<VirtualViewport>,
        body: Option<VirtualViewport>,
        root: Option<VirtualViewport>,
    ) -> Self {
        Self {
            override_element,
            body,
            root,
        }
    }

    /// A typical document: the body mirrors the geometry but only the root
    /// scrolling element actually moves.
    pub fn document(extent: f64, viewport: f64) -> Self {
        Self {
            override_element: None,
            body: Some(VirtualViewport::locked(extent, viewport)),
            root: Some(VirtualViewport::new(extent, viewport)),
        }
    }

    /// A page whose content lives in an embedded editor surface.
    pub fn with_editor(extent: f64, viewport: f64) -> Self {
        Self {
            override_element: Some(VirtualViewport::new(extent, viewport)),
            body: Some(VirtualViewport::new(viewport, viewport)),
            root: Some(VirtualViewport::new(viewport, viewport)),
        }
    }
}

impl ScrollSurface for VirtualPage {
    fn targets(&mut self) -> Vec<&mut dyn ScrollTarget> {
        let mut out: Vec<&mut dyn ScrollTarget> = Vec::with_capacity(3);
        if let Some(el) = self.override_element.as_mut() {
            out.push(el);
        }
        if let Some(el) = self.body.as_mut() {
            out.push(el);
        }
        if let Some(el) = self.root.as_mut() {
            out.push(el);
        }
        out
    }

    fn primary(&self) -> Option<&dyn ScrollTarget> {
        // Page info prefers the root over a locked body so it reflects what moves.
        let body_moves = self.body.as_ref().map(|b| !b.locked).unwrap_or(false);
        if let Some(el) = self.override_element.as_ref() {
            return Some(el);
        }
        if body_moves {
            return self.body.as_ref().map(|el| el as &dyn ScrollTarget);
        }
        self.root
            .as_ref()
            .or(self.body.as_ref())
            .map(|el| el as &dyn ScrollTarget)
    }
}
