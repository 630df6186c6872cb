//! # Root
//!
//! Owns the element tree (and through it the bus) and drives frames:
//!
//! ```text
//! poll events -> route input -> pump bus (throttled) -> update -> render
//! ```
//!
//! The loop keeps going while the root is running or still has children, so
//! nodes always get to react to the shutdown broadcasts before it returns.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use switchboard_bus::{Message, Payload, ResponseKind};

use crate::config::ToolkitConfig;
use crate::element::{ElementBuilder, ElementTree, MessageHandler, NodeId};
use crate::error::UiResult;
use crate::input::{InputEvent, Key};
use crate::render::Renderer;
use crate::style::Value;

/// Frame loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frames run so far.
    pub frame_count: u64,
    /// Rate implied by the last frame delta.
    pub current_fps: f64,
    /// Time accumulated towards the next scheduled pump.
    pub bus_accumulator: Duration,
}

/// State shared between [`Root`] and its message handler.
#[derive(Debug)]
struct RootState {
    running: Cell<bool>,
    stats: Cell<FrameStats>,
    fps: u32,
    pump_interval: Duration,
}

/// Message handler of the root node.
///
/// GET replies carry the frame loop settings and counters on top of the
/// regular metadata. TERMINATE from another node shuts the whole tree down.
#[derive(Debug)]
pub struct RootHandler {
    state: Rc<RootState>,
}

impl MessageHandler for RootHandler {
    fn handle_message(&self, tree: &mut ElementTree, node: NodeId, message: &Message) -> UiResult<()> {
        if tree.is_disposed(node) || tree.address(node) == Some(message.sender()) {
            return Ok(());
        }

        match message.kind() {
            ResponseKind::Get => {
                let Some(mut metadata) = tree.metadata(node) else {
                    return Ok(());
                };
                let stats = self.state.stats.get();
                let extra = &mut metadata.extra;
                extra.insert("fps".into(), Value::Int(i64::from(self.state.fps)));
                extra.insert(
                    "pump_interval".into(),
                    Value::Float(self.state.pump_interval.as_secs_f64()),
                );
                extra.insert("current_fps".into(), Value::Float(stats.current_fps));
                extra.insert(
                    "frame_count".into(),
                    Value::Int(i64::try_from(stats.frame_count).unwrap_or(i64::MAX)),
                );
                tree.post(node, message.sender(), ResponseKind::Data, Some(Payload::new(metadata)), false);
                Ok(())
            }
            ResponseKind::Terminate => {
                shutdown(tree, node, &self.state);
                Ok(())
            }
            _ => tree.handle_default(node, message),
        }
    }
}

/// Broadcasts CLEAR, RESET and TERMINATE with priority, then stops the loop.
///
/// Children that survive the broadcasts (nodes without a handler, or a tree
/// without a bus) are destroyed directly.
fn shutdown(tree: &mut ElementTree, root: NodeId, state: &RootState) {
    tracing::info!("root shutting down");
    for kind in [ResponseKind::Clear, ResponseKind::Reset, ResponseKind::Terminate] {
        tree.broadcast(root, kind, None, true);
    }

    let leftovers = tree.children(root).to_vec();
    if !leftovers.is_empty() {
        tracing::debug!(count = leftovers.len(), "destroying children left after shutdown");
    }
    for child in leftovers {
        tree.destroy(child);
    }
    state.running.set(false);
}

/// Supplies input and frame pacing to [`Root::run`].
pub trait EventSource {
    /// Events that arrived since the last poll.
    ///
    /// # Errors
    ///
    /// Any error ends the frame loop after a shutdown.
    fn poll(&mut self) -> UiResult<Vec<InputEvent>>;

    /// Waits for the next frame at `fps` and returns the elapsed time.
    fn tick(&mut self, fps: u32) -> Duration;
}

/// Headless source replaying a fixed script, one entry per frame.
///
/// Once the script runs out it asks the root to quit.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    frames: VecDeque<Vec<InputEvent>>,
    dt: Duration,
}

impl ScriptedSource {
    /// Creates a source advancing time by `dt` every frame.
    pub fn new(frames: impl IntoIterator<Item = Vec<InputEvent>>, dt: Duration) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            dt,
        }
    }

    /// Frames left in the script.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl EventSource for ScriptedSource {
    fn poll(&mut self) -> UiResult<Vec<InputEvent>> {
        Ok(self.frames.pop_front().unwrap_or_else(|| vec![InputEvent::Quit]))
    }

    fn tick(&mut self, _fps: u32) -> Duration {
        self.dt
    }
}

/// The top-level element: owns the tree and drives the frame loop.
pub struct Root {
    tree: ElementTree,
    state: Rc<RootState>,
}

impl Root {
    /// Creates a root sized and titled after `config.window`.
    #[must_use]
    pub fn new(config: &ToolkitConfig) -> Self {
        let state = Rc::new(RootState {
            running: Cell::new(false),
            stats: Cell::new(FrameStats::default()),
            fps: config.window.fps,
            pump_interval: config.bus.pump_interval(),
        });
        let builder = ElementBuilder::new(config.window.title.clone())
            .kind("Root")
            .rect(0, 0, config.window.width, config.window.height)
            .handler(Rc::new(RootHandler {
                state: Rc::clone(&state),
            }));
        let tree = ElementTree::with_root(config, builder);

        tracing::info!(
            title = %config.window.title,
            width = config.window.width,
            height = config.window.height,
            fps = config.window.fps,
            "root created"
        );
        Self { tree, state }
    }

    /// The element tree.
    #[must_use]
    pub const fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// The element tree, mutably.
    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    /// Id of the root node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.tree.root()
    }

    /// Creates a node and attaches it directly under the root.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::attach`].
    pub fn add(&mut self, builder: ElementBuilder) -> UiResult<NodeId> {
        let id = self.tree.create(builder);
        self.tree.attach(self.id(), id)?;
        Ok(id)
    }

    /// Whether the frame loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// Current frame counters.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.state.stats.get()
    }

    /// Target frames per second.
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.state.fps
    }

    /// Runs one frame and returns how many nodes were drawn.
    ///
    /// A window close or the Escape key triggers [`Root::shutdown`]. The bus
    /// is pumped once the accumulated frame time reaches the pump interval.
    pub fn frame(&mut self, dt: Duration, events: &[InputEvent], renderer: &mut dyn Renderer) -> usize {
        let root = self.id();
        for event in events {
            match event {
                InputEvent::Quit | InputEvent::KeyDown { key: Key::Escape } => self.shutdown(),
                _ => {
                    self.tree.handle_event(root, event);
                }
            }
        }

        let mut stats = self.state.stats.get();
        stats.frame_count += 1;
        stats.current_fps = if dt.is_zero() { 0.0 } else { dt.as_secs_f64().recip() };
        stats.bus_accumulator += dt;
        let pump_due = stats.bus_accumulator >= self.state.pump_interval;
        if pump_due {
            stats.bus_accumulator -= self.state.pump_interval;
        }
        self.state.stats.set(stats);

        if pump_due {
            let delivered = self.tree.pump();
            tracing::trace!(delivered, frame = stats.frame_count, "scheduled pump");
        }

        self.tree.update(root, dt);
        renderer.begin_frame();
        let drawn = self.tree.render(root, renderer);
        renderer.end_frame();
        drawn
    }

    /// Runs frames until the root stops and has no children left.
    ///
    /// # Errors
    ///
    /// Whatever the event source reports; the tree is shut down first.
    pub fn run(&mut self, source: &mut dyn EventSource, renderer: &mut dyn Renderer) -> UiResult<FrameStats> {
        self.state.running.set(true);
        tracing::info!(fps = self.state.fps, "frame loop started");

        let outcome = loop {
            if !self.is_running() && self.tree.children(self.id()).is_empty() {
                break Ok(());
            }
            let events = match source.poll() {
                Ok(events) => events,
                Err(err) => {
                    tracing::error!(error = %err, "event source failed");
                    self.shutdown();
                    break Err(err);
                }
            };
            let dt = source.tick(self.state.fps);
            self.frame(dt, &events, renderer);
        };

        let stats = self.stats();
        tracing::info!(frames = stats.frame_count, "frame loop stopped");
        outcome.map(|()| stats)
    }

    /// Tells every node to clear, reset and terminate, then stops the loop.
    pub fn shutdown(&mut self) {
        let root = self.id();
        shutdown(&mut self.tree, root, &self.state);
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("tree", &self.tree)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}
