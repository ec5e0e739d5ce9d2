//! Byte-wise logic over buffers.

use std::any::Any;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};
use crate::nodes::BINARY_BUFFER;

/// Combine two buffers byte by byte, truncating to the shorter one.
fn zip_with(a: &[u8], b: &[u8], op: impl Fn(u8, u8) -> u8) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| op(*x, *y)).collect()
}

macro_rules! binary_buffer_node {
    ($(#[$meta:meta])* $name:ident, $type_id:literal, $op:expr) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name;

        impl Node for $name {
            fn type_name(&self) -> &'static str {
                $type_id
            }

            fn ports(&self) -> &'static [Port] {
                BINARY_BUFFER
            }

            fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
                let a = ctx.buffer_on_input(0)?;
                let b = ctx.buffer_on_input(1)?;
                ctx.set_buffer_on_output(2, zip_with(&a, &b, $op))
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

binary_buffer_node!(BitwiseAnd, "bitwise.and", |x, y| x & y);
binary_buffer_node!(BitwiseOr, "bitwise.or", |x, y| x | y);
binary_buffer_node!(BitwiseXor, "bitwise.xor", |x, y| x ^ y);

/// Inverts every byte.
#[derive(Debug, Default)]
pub struct BitwiseNot;

impl Node for BitwiseNot {
    fn type_name(&self) -> &'static str {
        "bitwise.not"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Buffer, "a"),
            Port::output(AttributeKind::Buffer, "out"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let mut bytes = ctx.buffer_on_input(0)?;
        for byte in &mut bytes {
            *byte = !*byte;
        }
        ctx.set_buffer_on_output(1, bytes)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
