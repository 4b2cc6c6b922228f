pub use kurbo::{Point, Rect, Vec2};

/// Opaque handle to a document element minted by the stage.
///
/// The engine never owns elements; it refers to them through this id and
/// queries geometry/state on demand.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub u64);

/// Virtual time in milliseconds since engine start.
///
/// The library never reads a wall clock; the host advances time explicitly,
/// which keeps every schedule deterministic and testable.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Engine start.
    pub const ZERO: Timestamp = Timestamp(0);

    /// This instant plus `ms`, saturating.
    pub fn plus(self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier` (0 when `earlier` is later).
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Monotonic counter identifying one breathing toggle.
///
/// Delayed per-element apply tasks are keyed by `(ElementId, CycleId)` so
/// overlapping applies from consecutive cycles stay distinguishable.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct CycleId(pub u64);

impl CycleId {
    /// The cycle that follows this one.
    pub fn next(self) -> CycleId {
        CycleId(self.0.wrapping_add(1))
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// The viewport as a rect anchored at the origin.
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.width.max(0.0), self.height.max(0.0))
    }
}
