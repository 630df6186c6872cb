//! # Switchboard UI
//!
//! Retained-mode element tree driven by the Switchboard address bus:
//! - Generational arena of nodes with lazily cached absolute geometry
//! - Depth-first input routing with sibling-exclusive activation
//! - Default message handling (metadata, assets, reset, terminate)
//! - A root that owns the bus and drives the frame loop
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       FRAME LOOP                         │
//! ├──────────────────────────────────────────────────────────┤
//! │  Input Events → Element Tree → Bus Pump → Update → Draw  │
//! │       ↓              ↓             ↓                ↓    │
//! │  Hit Testing    Activation    Handlers        Renderer   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchboard_ui::{ElementBuilder, Root, ScriptedSource, ToolkitConfig};
//!
//! let mut root = Root::new(&ToolkitConfig::default());
//! let window = root.add(ElementBuilder::new("window").rect(50, 50, 300, 200))?;
//! root.run(&mut source, &mut renderer)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod assets;
pub mod config;
pub mod element;
pub mod error;
pub mod input;
pub mod layout;
pub mod render;
pub mod root;
pub mod style;

pub use assets::{FontProvider, VisualsProvider};
pub use config::{BusConfig, ToolkitConfig, TreeConfig, WindowConfig};
pub use element::{
    DefaultHandler, Element, ElementBuilder, ElementBus, ElementFlags, ElementTree, HandlerRef,
    ListenerId, ListenerKind, MessageHandler, Metadata, NodeId,
};
pub use error::{UiError, UiResult};
pub use input::{InputEvent, Key, MouseButton};
pub use layout::Rect;
pub use render::{CommandRecorder, ElementView, RenderCommand, Renderer};
pub use root::{EventSource, FrameStats, Root, RootHandler, ScriptedSource};
pub use style::{Color, FontFace, LocalStore, Value};
