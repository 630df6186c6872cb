//! # Switchboard Demo
//!
//! Headless bootstrapper: builds the reference tree, replays a short input
//! script and shuts the root down.
//!
//! ```bash
//! # default settings
//! cargo run -p switchboard
//!
//! # custom settings, verbose bus traffic
//! RUST_LOG=switchboard_bus=debug cargo run -p switchboard -- switchboard.toml
//! ```

use std::process::ExitCode;
use std::time::Duration;

use switchboard_bus::ResponseKind;
use switchboard_ui::{
    CommandRecorder, ElementBuilder, ElementTree, ElementView, FontProvider, InputEvent, Key,
    ListenerKind, NodeId, RenderCommand, Renderer, Root, ScriptedSource, ToolkitConfig, UiResult,
    VisualsProvider,
};
use tracing_subscriber::EnvFilter;

const FONT_FILE: &str = "JetBrainsMono-Bold.ttf";
const FONT_SIZE: u32 = 15;

/// Records commands and logs a summary every frame.
#[derive(Default)]
struct FrameLog {
    recorder: CommandRecorder,
    frames: u64,
}

impl Renderer for FrameLog {
    fn begin_frame(&mut self) {
        self.recorder.begin_frame();
    }

    fn draw(&mut self, view: &ElementView<'_>) {
        self.recorder.draw(view);
    }

    fn end_frame(&mut self) {
        let commands = self.recorder.commands();
        let labels = commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::Label { .. }))
            .count();
        self.frames += 1;
        tracing::debug!(frame = self.frames, commands = commands.len(), labels, "frame recorded");
    }
}

fn window(root: &mut Root, parent: Option<NodeId>, x: i32, y: i32, width: i32, height: i32) -> UiResult<NodeId> {
    let builder = ElementBuilder::new("Window").kind("Window").rect(x, y, width, height);
    let id = match parent {
        Some(parent) => {
            let tree = root.tree_mut();
            let id = tree.create(builder);
            tree.attach(parent, id)?;
            id
        }
        None => root.add(builder)?,
    };

    root.tree_mut().add_listener(id, ListenerKind::Click, |tree: &mut ElementTree, id, _| {
        tree.bring_to_front(id);
    })?;
    root.tree_mut().add_listener(id, ListenerKind::Focus, |tree: &mut ElementTree, id, _| {
        tracing::info!(window = %id, address = ?tree.address(id), "window focused");
    })?;
    Ok(id)
}

fn build(root: &mut Root) -> UiResult<()> {
    let root_id = root.id();
    let fonts = FontProvider::create(root.tree_mut());
    root.tree_mut().attach(root_id, fonts.id())?;
    let visuals = VisualsProvider::create(root.tree_mut());
    root.tree_mut().attach(root_id, visuals.id())?;

    fonts.initialize(root.tree_mut(), FONT_FILE, FONT_SIZE)?;
    visuals.initialize(root.tree_mut())?;

    let win1 = window(root, None, 50, 50, 250, 200)?;
    window(root, Some(win1), 10, 10, 150, 100)?;
    window(root, None, 100, 100, 150, 100)?;

    // Ask the root for its metadata on the first pump.
    if let Some(root_address) = root.tree().address(root.id()) {
        root.tree_mut().post(win1, root_address, ResponseKind::Get, None, false);
    }
    Ok(())
}

fn script(fps: u32) -> ScriptedSource {
    let frames = vec![
        vec![InputEvent::MouseMotion { x: 60, y: 60 }],
        vec![InputEvent::click(60, 60)],
        vec![],
        vec![InputEvent::click(200, 180)],
        vec![InputEvent::KeyDown { key: Key::Char('a') }],
        vec![],
        vec![InputEvent::KeyDown { key: Key::Escape }],
    ];
    ScriptedSource::new(frames, Duration::from_secs(1) / fps.max(1))
}

fn run(config: &ToolkitConfig) -> UiResult<()> {
    let mut root = Root::new(config);
    build(&mut root)?;

    let mut source = script(root.fps());
    let mut renderer = FrameLog::default();
    let stats = root.run(&mut source, &mut renderer)?;

    tracing::info!(
        frames = stats.frame_count,
        bus = ?root.tree().bus().map(|bus| bus.stats()),
        "demo finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ToolkitConfig::load(&path),
        None => Ok(ToolkitConfig::default()),
    };

    match config.and_then(|config| run(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "demo failed");
            ExitCode::FAILURE
        }
    }
}
