//! Buffer construction and slicing.

use std::any::Any;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};
use crate::nodes::BINARY_BUFFER;

/// Largest buffer [`BufferRepeat`] will produce.
pub const MAX_OUTPUT_LEN: usize = 1 << 24;

/// Concatenates `a` and `b`.
#[derive(Debug, Default)]
pub struct BufferCombine;

impl Node for BufferCombine {
    fn type_name(&self) -> &'static str {
        "buffer.combine"
    }

    fn ports(&self) -> &'static [Port] {
        BINARY_BUFFER
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let mut out = ctx.buffer_on_input(0)?;
        out.extend(ctx.buffer_on_input(1)?);
        ctx.set_buffer_on_output(2, out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Copies the half-open range `from..to` out of a buffer.
#[derive(Debug, Default)]
pub struct BufferSlice;

impl Node for BufferSlice {
    fn type_name(&self) -> &'static str {
        "buffer.slice"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Buffer, "buffer"),
            Port::input(AttributeKind::Integer, "from"),
            Port::input(AttributeKind::Integer, "to"),
            Port::output(AttributeKind::Buffer, "out"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let input = ctx.buffer_on_input(0)?;
        let from = ctx.integer_on_input(1)?;
        let to = ctx.integer_on_input(2)?;
        let len = input.len() as u64;

        if from >= len {
            return Err(ctx.error("'from' input out of range"));
        }
        if to > len {
            return Err(ctx.error("'to' input out of range"));
        }
        if to <= from {
            return Err(ctx.error("'to' needs to be greater than 'from'"));
        }

        ctx.set_buffer_on_output(3, input[from as usize..to as usize].to_vec())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Repeats a buffer `count` times.
#[derive(Debug, Default)]
pub struct BufferRepeat;

impl Node for BufferRepeat {
    fn type_name(&self) -> &'static str {
        "buffer.repeat"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Buffer, "buffer"),
            Port::input(AttributeKind::Integer, "count"),
            Port::output(AttributeKind::Buffer, "out"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let input = ctx.buffer_on_input(0)?;
        let count = ctx.integer_on_input(1)?;

        let total = usize::try_from(count)
            .ok()
            .and_then(|count| input.len().checked_mul(count))
            .filter(|total| *total <= MAX_OUTPUT_LEN)
            .ok_or_else(|| ctx.error("Output buffer too large"))?;

        let mut out = Vec::with_capacity(total);
        for _ in 0..count {
            out.extend_from_slice(&input);
        }
        ctx.set_buffer_on_output(2, out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
