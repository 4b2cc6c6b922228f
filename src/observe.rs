use std::collections::BTreeMap;

use crate::core::{ElementId, Rect, Viewport};

/// How a watch measures visibility: which ratio thresholds bucket the
/// emissions, and how far the root is inset from the viewport.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObserverOptions {
    /// Ascending ratio thresholds. An entry is emitted when the measured
    /// ratio moves across one of them.
    pub thresholds: Vec<f64>,
    /// Fraction of viewport height shaved off the top and bottom of the
    /// root before intersecting.
    pub margin_fraction: f64,
}

impl ObserverOptions {
    pub fn new(thresholds: Vec<f64>, margin_fraction: f64) -> Self {
        Self {
            thresholds,
            margin_fraction,
        }
    }

    /// The inset root rect used for intersection.
    pub fn root_rect(&self, viewport: Viewport) -> Rect {
        let v = viewport.rect();
        let inset = self.margin_fraction * v.height();
        let y0 = v.y0 + inset;
        let y1 = (v.y1 - inset).max(y0);
        Rect::new(v.x0, y0, v.x1, y1)
    }
}

/// One visibility measurement for a watched element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    /// Visible fraction of the element's area, in [0, 1].
    pub ratio: f64,
    /// True when the element overlaps the root at all, edges included.
    pub is_intersecting: bool,
}

/// Pull-based stand-in for an intersection observer.
///
/// The engine calls [`IntersectionWatch::measure`] whenever geometry may
/// have moved; an entry comes back only on the first measurement of an
/// element or when its threshold bucket (or overlap flag) changed since the
/// last emission, so a steady scroll position stays quiet.
#[derive(Clone, Debug)]
pub struct IntersectionWatch {
    options: ObserverOptions,
    // last emitted (bucket, overlap) per element; None forces the next
    // measurement to emit.
    watched: BTreeMap<ElementId, Option<(Option<usize>, bool)>>,
}

impl IntersectionWatch {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            watched: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Start watching. Re-observing an already watched element is a no-op.
    pub fn observe(&mut self, element: ElementId) {
        self.watched.entry(element).or_insert(None);
    }

    /// Returns false if the element was not being watched.
    pub fn unobserve(&mut self, element: ElementId) -> bool {
        self.watched.remove(&element).is_some()
    }

    pub fn is_watching(&self, element: ElementId) -> bool {
        self.watched.contains_key(&element)
    }

    /// Watched elements in id order.
    pub fn watched(&self) -> Vec<ElementId> {
        self.watched.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Forget every last emission so the next measurements emit again.
    pub fn mark_all_dirty(&mut self) {
        for state in self.watched.values_mut() {
            *state = None;
        }
    }

    /// Measure one element against the current viewport. `bounds` is `None`
    /// for detached elements, which measure as fully hidden.
    pub fn measure(
        &mut self,
        element: ElementId,
        bounds: Option<Rect>,
        viewport: Viewport,
    ) -> Option<IntersectionEntry> {
        let state = self.watched.get_mut(&element)?;
        let (ratio, is_intersecting) = match bounds {
            Some(b) => intersect(b, self.options.root_rect(viewport)),
            None => (0.0, false),
        };
        let bucket = bucket_of(&self.options.thresholds, ratio, is_intersecting);
        if *state == Some((bucket, is_intersecting)) {
            return None;
        }
        *state = Some((bucket, is_intersecting));
        Some(IntersectionEntry {
            element,
            ratio,
            is_intersecting,
        })
    }
}

/// Highest threshold index the ratio has reached, or None below the first.
fn bucket_of(thresholds: &[f64], ratio: f64, is_intersecting: bool) -> Option<usize> {
    if !is_intersecting {
        return None;
    }
    let mut bucket = None;
    for (i, &t) in thresholds.iter().enumerate() {
        if ratio >= t {
            bucket = Some(i);
        }
    }
    bucket
}

fn intersect(elem: Rect, root: Rect) -> (f64, bool) {
    let ix0 = elem.x0.max(root.x0);
    let iy0 = elem.y0.max(root.y0);
    let ix1 = elem.x1.min(root.x1);
    let iy1 = elem.y1.min(root.y1);
    let is_intersecting = ix1 >= ix0 && iy1 >= iy0;

    let elem_area = elem.width() * elem.height();
    if elem_area <= 0.0 {
        // Zero-area targets report all-or-nothing.
        let ratio = if is_intersecting { 1.0 } else { 0.0 };
        return (ratio, is_intersecting);
    }
    let area = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
    ((area / elem_area).clamp(0.0, 1.0), is_intersecting)
}
