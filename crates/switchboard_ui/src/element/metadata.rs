//! Metadata snapshots answered to GET and attached to DISPOSED.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use switchboard_bus::Address;

use super::{ElementTree, NodeId};
use crate::style::Value;

/// Plain-data description of one node at one instant.
///
/// The parent is referenced by address only, so a snapshot never holds on to
/// another node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// Display name.
    pub name: String,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Bus address, `None` if never registered.
    pub address: Option<Address>,
    /// Seconds since the Unix epoch when the snapshot was taken.
    pub timestamp: f64,
    /// Local x.
    pub x: i32,
    /// Local y.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
    /// Visibility flag.
    pub visible: bool,
    /// Passthrough flag.
    pub passthrough: bool,
    /// Disposed flag.
    pub disposed: bool,
    /// Number of children.
    pub child_count: usize,
    /// Child addresses, back to front.
    pub children: Vec<Option<Address>>,
    /// Parent address, if attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_address: Option<Address>,
    /// Fields added by specialized nodes.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ElementTree {
    /// Takes a metadata snapshot of `id`.
    #[must_use]
    pub fn metadata(&self, id: NodeId) -> Option<Metadata> {
        let element = self.get(id)?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64());

        Some(Metadata {
            name: element.name.clone(),
            kind: element.kind,
            address: element.address,
            timestamp,
            x: element.rect.x,
            y: element.rect.y,
            width: element.rect.width,
            height: element.rect.height,
            visible: element.is_visible(),
            passthrough: element.is_passthrough(),
            disposed: element.is_disposed(),
            child_count: element.children.len(),
            children: element.children.iter().map(|child| self.address(*child)).collect(),
            parent_address: element.parent.and_then(|parent| self.address(parent)),
            extra: BTreeMap::new(),
        })
    }
}
