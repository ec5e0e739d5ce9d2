//! Capture filter builders.
//!
//! Filters live in the host's [`CapabilityStore`](crate::capability::CapabilityStore)
//! and travel between nodes as pointer handles. Each node keeps the handle it
//! was given on its first pass and replaces the object behind it afterwards,
//! so repeated passes do not grow the store.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::capability::{CapabilityStore, Handle, PacketFilter};
use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

/// Store `filter` under `slot`, reusing the handle when it still refers to a
/// filter.
fn publish(store: &CapabilityStore, slot: &mut Option<Handle>, filter: PacketFilter) -> Handle {
    match *slot {
        Some(handle) if store.get::<PacketFilter>(handle).is_some() => {
            store.replace(handle, filter);
            handle
        }
        _ => {
            let handle = store.insert(filter);
            *slot = Some(handle);
            handle
        }
    }
}

fn default_port() -> u16 {
    80
}

/// Matches traffic on one TCP/UDP port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortFilter {
    #[serde(rename = "data", default = "default_port")]
    port: u16,
    #[serde(skip)]
    handle: Option<Handle>,
}

impl PortFilter {
    pub fn new(port: u16) -> Self {
        Self { port, handle: None }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for PortFilter {
    fn default() -> Self {
        Self::new(default_port())
    }
}

impl Node for PortFilter {
    fn type_name(&self) -> &'static str {
        "filter.port"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Pointer, "filter")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let handle = publish(ctx.capabilities(), &mut self.handle, PacketFilter::port(self.port));
        ctx.set_pointer_on_output(0, handle)
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        let loaded: PortFilter = serde_json::from_value(params)?;
        self.port = loaded.port;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches traffic accepted by either input filter.
#[derive(Debug, Default)]
pub struct FilterOr {
    handle: Option<Handle>,
}

impl Node for FilterOr {
    fn type_name(&self) -> &'static str {
        "filter.or"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Pointer, "a"),
            Port::input(AttributeKind::Pointer, "b"),
            Port::output(AttributeKind::Pointer, "filter"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let mut filters = Vec::with_capacity(2);
        for input in 0..2 {
            let handle = ctx.pointer_on_input(input)?;
            let filter = ctx
                .capabilities()
                .get::<PacketFilter>(handle)
                .ok_or_else(|| ctx.error(format!("Input {} is not a packet filter", input)))?;
            filters.push(PacketFilter::clone(&filter));
        }

        let handle = publish(ctx.capabilities(), &mut self.handle, PacketFilter::Or(filters));
        ctx.set_pointer_on_output(2, handle)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
