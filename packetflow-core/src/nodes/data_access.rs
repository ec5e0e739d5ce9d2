//! Nodes that write into the pass overlay.

use std::any::Any;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

/// Writes `data` to the overlay at `address`.
#[derive(Debug, Default)]
pub struct WriteData;

impl Node for WriteData {
    fn type_name(&self) -> &'static str {
        "data_access.write"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Integer, "address"),
            Port::input(AttributeKind::Buffer, "data"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let address = ctx.integer_on_input(0)?;
        let data = ctx.buffer_on_input(1)?;
        ctx.set_overlay_data(address, &data)
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
