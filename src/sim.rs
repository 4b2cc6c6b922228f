//! Scripted stand-in for a real host: an in-memory stage, a JSON scene and
//! event script, and a fixed-cadence runner. This is what the tests and the
//! CLI drive the engine with.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::MotionConfig;
use crate::core::{ElementId, Point, Rect, Timestamp, Viewport};
use crate::ease::CubicBezier;
use crate::engine::MotionEngine;
use crate::error::{VetroError, VetroResult};
use crate::registry::RegistrySnapshot;
use crate::sched::FrameRequestId;
use crate::stage::{Capabilities, Stage, StyleProp};
use crate::style;

#[derive(Clone, Copy, Debug)]
struct WidthAnim {
    from: f64,
    to: f64,
    start: Timestamp,
    duration_ms: u64,
    curve: CubicBezier,
}

impl WidthAnim {
    fn eval(&self, at: Timestamp) -> f64 {
        if at <= self.start {
            return self.from;
        }
        let t = at.since(self.start) as f64 / self.duration_ms as f64;
        if t >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.curve.eval(t)
    }

    fn done(&self, at: Timestamp) -> bool {
        at.since(self.start) >= self.duration_ms
    }
}

#[derive(Clone, Debug)]
struct SimNode {
    classes: BTreeSet<String>,
    bounds: Option<Rect>,
    vars: BTreeMap<String, String>,
    styles: HashMap<StyleProp, String>,
    data: BTreeMap<String, String>,
    width_anim: Option<WidthAnim>,
}

impl SimNode {
    fn computed_width_pct(&self, at: Timestamp) -> Option<f64> {
        match &self.width_anim {
            Some(anim) => Some(anim.eval(at)),
            None => self
                .styles
                .get(&StyleProp::Width)
                .and_then(|w| style::parse_percent(w)),
        }
    }
}

/// In-memory stage. Nodes live in document order; geometry and the clock
/// are whatever the test or script says they are.
///
/// Width transitions are played back: when a width change lands while a
/// parseable width transition is armed, the stage records the animation and
/// [`SimStage::width_percent`] reports the eased in-flight value.
#[derive(Clone, Debug)]
pub struct SimStage {
    viewport: Viewport,
    capabilities: Capabilities,
    nodes: Vec<SimNode>,
    now: Timestamp,
}

impl SimStage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport { width, height },
            capabilities: Capabilities::FULL,
            nodes: Vec::new(),
            now: Timestamp::ZERO,
        }
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    /// Append a node in document order. `None` bounds mean detached.
    pub fn add_node(&mut self, classes: &[&str], bounds: Option<Rect>) -> ElementId {
        self.nodes.push(SimNode {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            bounds,
            vars: BTreeMap::new(),
            styles: HashMap::new(),
            data: BTreeMap::new(),
            width_anim: None,
        });
        ElementId(self.nodes.len() as u64)
    }

    /// Id of the `index`-th node, in insertion order.
    pub fn element_by_index(&self, index: usize) -> Option<ElementId> {
        (index < self.nodes.len()).then(|| ElementId(index as u64 + 1))
    }

    fn node(&self, id: ElementId) -> Option<&SimNode> {
        self.nodes.get(id.0.checked_sub(1)? as usize)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut SimNode> {
        self.nodes.get_mut(id.0.checked_sub(1)? as usize)
    }

    pub fn set_now(&mut self, now: Timestamp) {
        self.now = now;
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Viewport { width, height };
    }

    pub fn set_bounds(&mut self, id: ElementId, bounds: Option<Rect>) {
        if let Some(node) = self.node_mut(id) {
            node.bounds = bounds;
        }
    }

    /// Scroll down by `dy`: every attached node slides up.
    pub fn scroll(&mut self, dy: f64) {
        for node in &mut self.nodes {
            if let Some(b) = node.bounds {
                node.bounds = Some(Rect::new(b.x0, b.y0 - dy, b.x1, b.y1 - dy));
            }
        }
    }

    pub fn var_value(&self, id: ElementId, name: &str) -> Option<String> {
        self.node(id)?.vars.get(name).cloned()
    }

    pub fn style_value(&self, id: ElementId, prop: StyleProp) -> Option<String> {
        self.node(id)?.styles.get(&prop).cloned()
    }

    pub fn data_value(&self, id: ElementId, key: &str) -> Option<String> {
        self.node(id)?.data.get(key).cloned()
    }

    pub fn class_list(&self, id: ElementId) -> Vec<String> {
        self.node(id)
            .map(|n| n.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Computed width at the stage clock, as a fraction of the parent.
    pub fn width_percent(&self, id: ElementId) -> Option<f64> {
        self.node(id)?.computed_width_pct(self.now)
    }

    pub fn is_width_animating(&self, id: ElementId) -> bool {
        self.node(id)
            .and_then(|n| n.width_anim.as_ref())
            .is_some_and(|a| !a.done(self.now))
    }

    fn set_width_style(&mut self, id: ElementId, value: &str) {
        let now = self.now;
        let Some(node) = self.node_mut(id) else { return };
        let from = node.computed_width_pct(now);
        let to = style::parse_percent(value);
        let transition = node
            .styles
            .get(&StyleProp::Transition)
            .and_then(|t| style::parse_fill_transition(t));

        node.width_anim = match (from, to, transition) {
            (Some(from), Some(to), Some((duration_ms, curve)))
                if from != to && duration_ms > 0 =>
            {
                Some(WidthAnim {
                    from,
                    to,
                    start: now,
                    duration_ms,
                    curve,
                })
            }
            _ => None,
        };
        node.styles.insert(StyleProp::Width, value.to_string());
    }
}

impl Stage for SimStage {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.classes.contains(class))
            .map(|(i, _)| ElementId(i as u64 + 1))
            .collect()
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.node(id).is_some_and(|n| n.classes.contains(class))
    }

    fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.remove(class);
        }
    }

    fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.node(id)?.bounds
    }

    fn set_var(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.vars.insert(name.to_string(), value.to_string());
        }
    }

    fn set_style(&mut self, id: ElementId, prop: StyleProp, value: &str) {
        match prop {
            StyleProp::Width => self.set_width_style(id, value),
            StyleProp::Transition => {
                if let Some(node) = self.node_mut(id) {
                    // Disarming the transition mid-flight snaps the
                    // width to its target.
                    if style::parse_fill_transition(value).is_none() {
                        node.width_anim = None;
                    }
                    node.styles.insert(prop, value.to_string());
                }
            }
            _ => {
                if let Some(node) = self.node_mut(id) {
                    node.styles.insert(prop, value.to_string());
                }
            }
        }
    }

    fn clear_style(&mut self, id: ElementId, prop: StyleProp) {
        if let Some(node) = self.node_mut(id) {
            if prop == StyleProp::Width {
                node.width_anim = None;
            }
            node.styles.remove(&prop);
        }
    }

    fn inline_style(&self, id: ElementId, prop: StyleProp) -> Option<String> {
        self.style_value(id, prop)
    }

    fn data(&self, id: ElementId, key: &str) -> Option<String> {
        self.data_value(id, key)
    }

    fn set_data(&mut self, id: ElementId, key: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.data.insert(key.to_string(), value.to_string());
        }
    }
}

/// A stage described as data, loadable from JSON.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub viewport: Viewport,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub nodes: Vec<SceneNode>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneNode {
    pub classes: Vec<String>,
    #[serde(default)]
    pub bounds: Option<Rect>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Initial inline styles, keyed by CSS property name.
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
}

impl Scene {
    pub fn validate(&self) -> VetroResult<()> {
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return Err(VetroError::scene("viewport must have positive size"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            for name in node.styles.keys() {
                if style_prop_by_name(name).is_none() {
                    return Err(VetroError::scene(format!(
                        "node {i} has unsupported style property '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Materialize the scene as a stage. Node `i` becomes element `i + 1`.
    pub fn build_stage(&self) -> VetroResult<SimStage> {
        self.validate()?;
        let mut stage = SimStage::new(self.viewport.width, self.viewport.height);
        stage.set_capabilities(self.capabilities);
        for node in &self.nodes {
            let classes: Vec<&str> = node.classes.iter().map(String::as_str).collect();
            let id = stage.add_node(&classes, node.bounds);
            for (key, value) in &node.data {
                stage.set_data(id, key, value);
            }
            for (name, value) in &node.styles {
                if let Some(prop) = style_prop_by_name(name) {
                    stage.set_style(id, prop, value);
                }
            }
        }
        Ok(stage)
    }
}

fn style_prop_by_name(name: &str) -> Option<StyleProp> {
    [
        StyleProp::Transform,
        StyleProp::Opacity,
        StyleProp::Width,
        StyleProp::Transition,
        StyleProp::AnimationPlayState,
    ]
    .into_iter()
    .find(|p| p.name() == name)
}

/// One host event at a virtual instant.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ScriptEvent {
    Scroll { at: u64, dy: f64 },
    PointerMove { at: u64, x: f64, y: f64 },
    PointerLeave { at: u64 },
    Resize { at: u64, width: f64, height: f64 },
    VisibilityChange { at: u64, hidden: bool },
    TriggerBreath { at: u64 },
    Register { at: u64, node: usize },
    Deregister { at: u64, node: usize },
}

impl ScriptEvent {
    pub fn at(&self) -> u64 {
        match *self {
            ScriptEvent::Scroll { at, .. }
            | ScriptEvent::PointerMove { at, .. }
            | ScriptEvent::PointerLeave { at }
            | ScriptEvent::Resize { at, .. }
            | ScriptEvent::VisibilityChange { at, .. }
            | ScriptEvent::TriggerBreath { at }
            | ScriptEvent::Register { at, .. }
            | ScriptEvent::Deregister { at, .. } => at,
        }
    }
}

/// A scene plus a timeline of host events.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Script {
    pub scene: Scene,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    /// Run at least this long, even after the last event.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Script {
    pub fn validate(&self) -> VetroResult<()> {
        self.scene.validate()?;
        for event in &self.events {
            let node = match *event {
                ScriptEvent::Register { node, .. } | ScriptEvent::Deregister { node, .. } => node,
                _ => continue,
            };
            if node >= self.scene.nodes.len() {
                return Err(VetroError::scene(format!(
                    "event references node {node}, but the scene has {}",
                    self.scene.nodes.len()
                )));
            }
        }
        Ok(())
    }

    fn end_time(&self) -> u64 {
        let last_event = self.events.iter().map(ScriptEvent::at).max().unwrap_or(0);
        self.duration_ms.unwrap_or(0).max(last_event)
    }
}

/// Outcome of a scripted run, shaped for JSON output.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunReport {
    pub frames: u64,
    pub final_time_ms: u64,
    pub snapshot: RegistrySnapshot,
    pub nodes: Vec<NodeReport>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct NodeReport {
    pub element: ElementId,
    pub classes: Vec<String>,
    pub styles: BTreeMap<String, String>,
    pub vars: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_percent: Option<f64>,
}

/// Frame cadence of the runner's virtual display.
pub const FRAME_MS: u64 = 16;

/// Run a script to completion on a fresh engine.
///
/// Time advances in fixed frames. Events fire at their exact instants
/// between frames; a frame request armed during one frame's work is
/// delivered at the next frame boundary, like a real display would.
pub fn run_script(script: &Script, config: MotionConfig) -> VetroResult<(MotionEngine, SimStage)> {
    script.validate()?;
    let mut stage = script.scene.build_stage()?;
    let mut engine = MotionEngine::new(config)?;

    let mut events: Vec<ScriptEvent> = script.events.clone();
    events.sort_by_key(ScriptEvent::at);
    let end = script.end_time();

    engine.init(&mut stage, Timestamp::ZERO);

    let mut frame_t = 0u64;
    let mut next_event = 0usize;
    let mut due_frame: Option<FrameRequestId> = None;
    let mut frames = 0u64;
    loop {
        while next_event < events.len() && events[next_event].at() < frame_t {
            let at = Timestamp(events[next_event].at());
            stage.set_now(at);
            engine.advance_to(&mut stage, at);
            apply_event(&mut engine, &mut stage, &events[next_event], at);
            next_event += 1;
        }

        let now = Timestamp(frame_t);
        stage.set_now(now);
        engine.advance_to(&mut stage, now);
        while next_event < events.len() && events[next_event].at() == frame_t {
            apply_event(&mut engine, &mut stage, &events[next_event], now);
            next_event += 1;
        }
        if let Some(id) = due_frame.take() {
            engine.animation_frame(&mut stage, id);
        }
        due_frame = engine.pending_frame();
        frames += 1;

        if frame_t >= end {
            break;
        }
        frame_t += FRAME_MS;
    }

    tracing::debug!(frames, end, "script run complete");
    Ok((engine, stage))
}

/// Run a script and summarize the final stage.
pub fn run_report(script: &Script, config: MotionConfig) -> VetroResult<RunReport> {
    let end = script.end_time();
    let (engine, stage) = run_script(script, config)?;
    let frames = end.div_ceil(FRAME_MS) + 1;

    let nodes = (0..script.scene.nodes.len())
        .filter_map(|i| stage.element_by_index(i))
        .map(|id| NodeReport {
            element: id,
            classes: stage.class_list(id),
            styles: [
                StyleProp::Transform,
                StyleProp::Opacity,
                StyleProp::Width,
                StyleProp::Transition,
                StyleProp::AnimationPlayState,
            ]
            .into_iter()
            .filter_map(|p| stage.style_value(id, p).map(|v| (p.name().to_string(), v)))
            .collect(),
            vars: node_vars(&stage, id),
            data: node_data(&stage, id),
            width_percent: stage.width_percent(id),
        })
        .collect();

    Ok(RunReport {
        frames,
        final_time_ms: stage.now().0,
        snapshot: engine.snapshot(),
        nodes,
    })
}

fn node_vars(stage: &SimStage, id: ElementId) -> BTreeMap<String, String> {
    [
        style::SCROLL_TRANSLATE_VAR,
        style::SCROLL_OPACITY_VAR,
        style::MOUSE_X_VAR,
        style::MOUSE_Y_VAR,
    ]
    .into_iter()
    .filter_map(|name| stage.var_value(id, name).map(|v| (name.to_string(), v)))
    .collect()
}

fn node_data(stage: &SimStage, id: ElementId) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    if let Some(width) = stage.data_value(id, style::WIDTH_DATA_KEY) {
        data.insert(style::WIDTH_DATA_KEY.to_string(), width);
    }
    data
}

fn apply_event(
    engine: &mut MotionEngine,
    stage: &mut SimStage,
    event: &ScriptEvent,
    now: Timestamp,
) {
    match *event {
        ScriptEvent::Scroll { dy, .. } => {
            stage.scroll(dy);
            engine.on_scroll(stage);
        }
        ScriptEvent::PointerMove { x, y, .. } => {
            engine.on_pointer_move(stage, Point::new(x, y), now);
        }
        ScriptEvent::PointerLeave { .. } => engine.on_pointer_leave(stage),
        ScriptEvent::Resize { width, height, .. } => {
            stage.set_viewport(width, height);
            engine.on_resize(now);
        }
        ScriptEvent::VisibilityChange { hidden, .. } => {
            engine.on_visibility_change(stage, hidden);
        }
        ScriptEvent::TriggerBreath { .. } => engine.trigger_breath(stage),
        ScriptEvent::Register { node, .. } => {
            if let Some(id) = stage.element_by_index(node) {
                engine.register(stage, id);
            }
        }
        ScriptEvent::Deregister { node, .. } => {
            if let Some(id) = stage.element_by_index(node) {
                engine.deregister(stage, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_transition_plays_back_eased() {
        let mut stage = SimStage::new(1000.0, 800.0);
        let id = stage.add_node(&["glass-progress-fill"], Some(Rect::new(0.0, 0.0, 100.0, 10.0)));

        stage.set_style(id, StyleProp::Transition, "none");
        stage.set_style(id, StyleProp::Width, "0%");
        stage.set_now(Timestamp(16));
        stage.set_style(
            id,
            StyleProp::Transition,
            "width 2.5s cubic-bezier(0.2, 0.8, 0.2, 1)",
        );
        stage.set_style(id, StyleProp::Width, "80%");

        assert!(stage.is_width_animating(id));
        assert_eq!(stage.width_percent(id), Some(0.0));

        stage.set_now(Timestamp(16 + 1250));
        let mid = stage.width_percent(id).unwrap();
        assert!(mid > 0.0 && mid < 0.8);
        assert!(stage.is_width_animating(id));

        stage.set_now(Timestamp(16 + 2500));
        assert_eq!(stage.width_percent(id), Some(0.8));
        assert!(!stage.is_width_animating(id));
    }

    #[test]
    fn width_set_without_transition_snaps() {
        let mut stage = SimStage::new(1000.0, 800.0);
        let id = stage.add_node(&[], Some(Rect::new(0.0, 0.0, 100.0, 10.0)));
        stage.set_style(id, StyleProp::Width, "40%");
        assert_eq!(stage.width_percent(id), Some(0.4));
        assert!(!stage.is_width_animating(id));
    }

    #[test]
    fn disarming_the_transition_snaps_to_target() {
        let mut stage = SimStage::new(1000.0, 800.0);
        let id = stage.add_node(&[], Some(Rect::new(0.0, 0.0, 100.0, 10.0)));
        stage.set_style(id, StyleProp::Width, "0%");
        stage.set_style(
            id,
            StyleProp::Transition,
            "width 2.5s cubic-bezier(0.2, 0.8, 0.2, 1)",
        );
        stage.set_style(id, StyleProp::Width, "80%");
        assert!(stage.is_width_animating(id));

        stage.set_style(id, StyleProp::Transition, "none");
        assert!(!stage.is_width_animating(id));
        assert_eq!(stage.width_percent(id), Some(0.8));
    }

    #[test]
    fn scroll_slides_attached_nodes_up() {
        let mut stage = SimStage::new(1000.0, 800.0);
        let id = stage.add_node(&[], Some(Rect::new(0.0, 100.0, 50.0, 200.0)));
        let detached = stage.add_node(&[], None);
        stage.scroll(60.0);
        assert_eq!(stage.bounds(id), Some(Rect::new(0.0, 40.0, 50.0, 140.0)));
        assert_eq!(stage.bounds(detached), None);
    }

    #[test]
    fn scene_builds_stage_in_document_order() {
        let scene: Scene = serde_json::from_str(
            r#"{
              "viewport": { "width": 1000.0, "height": 800.0 },
              "nodes": [
                { "classes": ["glass"], "bounds": { "x0": 0.0, "y0": 100.0, "x1": 200.0, "y1": 300.0 } },
                { "classes": ["glass-progress-fill"],
                  "bounds": { "x0": 0.0, "y0": 400.0, "x1": 300.0, "y1": 420.0 },
                  "data": { "width": "80%" },
                  "styles": { "width": "10%" } }
              ]
            }"#,
        )
        .unwrap();

        let stage = scene.build_stage().unwrap();
        let glass = stage.element_by_index(0).unwrap();
        let fill = stage.element_by_index(1).unwrap();
        assert!(stage.has_class(glass, "glass"));
        assert_eq!(stage.data_value(fill, "width").as_deref(), Some("80%"));
        assert_eq!(stage.style_value(fill, StyleProp::Width).as_deref(), Some("10%"));
        assert_eq!(stage.elements_with_class("glass"), vec![glass]);
    }

    #[test]
    fn scene_rejects_unknown_style_names() {
        let scene = Scene {
            viewport: Viewport {
                width: 100.0,
                height: 100.0,
            },
            capabilities: Capabilities::FULL,
            nodes: vec![SceneNode {
                classes: vec![],
                bounds: None,
                data: BTreeMap::new(),
                styles: BTreeMap::from([("colour".to_string(), "red".to_string())]),
            }],
        };
        assert!(scene.validate().is_err());
    }

    #[test]
    fn script_rejects_out_of_range_node_refs() {
        let script = Script {
            scene: Scene {
                viewport: Viewport {
                    width: 100.0,
                    height: 100.0,
                },
                capabilities: Capabilities::FULL,
                nodes: Vec::new(),
            },
            events: vec![ScriptEvent::Register { at: 0, node: 3 }],
            duration_ms: None,
        };
        assert!(script.validate().is_err());
    }

    #[test]
    fn runner_reveals_a_visible_fill() {
        let script = Script {
            scene: Scene {
                viewport: Viewport {
                    width: 1000.0,
                    height: 800.0,
                },
                capabilities: Capabilities::FULL,
                nodes: vec![SceneNode {
                    classes: vec!["glass-progress-fill".to_string()],
                    bounds: Some(Rect::new(0.0, 100.0, 300.0, 120.0)),
                    data: BTreeMap::from([("width".to_string(), "80%".to_string())]),
                    styles: BTreeMap::new(),
                }],
            },
            events: Vec::new(),
            duration_ms: Some(3000),
        };

        let (engine, stage) = run_script(&script, MotionConfig::default()).unwrap();
        let fill = stage.element_by_index(0).unwrap();
        assert_eq!(stage.width_percent(fill), Some(0.8));
        assert!(!stage.is_width_animating(fill));
        // One-shot: the watch no longer tracks the fill.
        assert!(engine.snapshot().progress_watched.is_empty());
    }
}
