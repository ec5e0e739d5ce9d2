//! Comparisons, boolean logic and branching.
//!
//! Booleans travel as integers: zero is false, anything else is true, and
//! the nodes here always emit `0` or `1`.

use std::any::Any;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

binary_integer_node!(Equals, "control_flow.equals", |ctx, a, b| u64::from(a == b));
binary_integer_node!(GreaterThan, "control_flow.gt", |ctx, a, b| u64::from(a > b));
binary_integer_node!(LessThan, "control_flow.lt", |ctx, a, b| u64::from(a < b));
binary_integer_node!(BoolAnd, "control_flow.and", |ctx, a, b| u64::from(a != 0 && b != 0));
binary_integer_node!(BoolOr, "control_flow.or", |ctx, a, b| u64::from(a != 0 || b != 0));

/// Logical negation.
#[derive(Debug, Default)]
pub struct Not;

impl Node for Not {
    fn type_name(&self) -> &'static str {
        "control_flow.not"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Integer, "in"),
            Port::output(AttributeKind::Integer, "out"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let value = ctx.integer_on_input(0)?;
        ctx.set_integer_on_output(1, u64::from(value == 0))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Forwards the `true` or the `false` buffer depending on `cond`.
///
/// Both branches are read, so either one being unconnected or failing
/// fails the node.
#[derive(Debug, Default)]
pub struct If;

impl Node for If {
    fn type_name(&self) -> &'static str {
        "control_flow.if"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::input(AttributeKind::Integer, "cond"),
            Port::input(AttributeKind::Buffer, "true"),
            Port::input(AttributeKind::Buffer, "false"),
            Port::output(AttributeKind::Buffer, "out"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let cond = ctx.integer_on_input(0)?;
        let when_true = ctx.buffer_on_input(1)?;
        let when_false = ctx.buffer_on_input(2)?;
        ctx.set_buffer_on_output(3, if cond != 0 { when_true } else { when_false })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
