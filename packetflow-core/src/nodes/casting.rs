//! Conversions between integers and buffers. Byte order is little endian.

use std::any::Any;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

/// Encodes an integer as its 8 little-endian bytes.
#[derive(Debug, Default)]
pub struct IntegerToBuffer;

impl Node for IntegerToBuffer {
    fn type_name(&self) -> &'static str {
        "casting.int_to_buffer"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Integer, "int"),
            Port::output(AttributeKind::Buffer, "buffer"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let value = ctx.integer_on_input(0)?;
        ctx.set_buffer_on_output(1, value.to_le_bytes().to_vec())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Decodes a little-endian buffer of 1 to 8 bytes.
#[derive(Debug, Default)]
pub struct BufferToInteger;

impl Node for BufferToInteger {
    fn type_name(&self) -> &'static str {
        "casting.buffer_to_int"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Buffer, "buffer"),
            Port::output(AttributeKind::Integer, "int"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let bytes = ctx.buffer_on_input(0)?;
        if bytes.is_empty() || bytes.len() > 8 {
            return Err(ctx.error("Buffer is empty or bigger than 64 bits"));
        }

        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(&bytes);
        ctx.set_integer_on_output(1, u64::from_le_bytes(raw))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
