//! Builtin Nodes
//!
//! The node types shipped with the engine, grouped by catalog category.
//! [`register_builtin`] adds all of them to a [`NodeCatalog`].

use crate::catalog::NodeCatalog;
use crate::graph::{AttributeKind, Port};

/// Ports shared by every `a, b -> out` integer node.
pub(crate) const BINARY_INTEGER: &[Port] = &[
    Port::input(AttributeKind::Integer, "a"),
    Port::input(AttributeKind::Integer, "b"),
    Port::output(AttributeKind::Integer, "out"),
];

/// Ports shared by every `a, b -> out` buffer node.
pub(crate) const BINARY_BUFFER: &[Port] = &[
    Port::input(AttributeKind::Buffer, "a"),
    Port::input(AttributeKind::Buffer, "b"),
    Port::output(AttributeKind::Buffer, "out"),
];

/// Defines a parameterless node reading integers `a` and `b` and writing
/// one integer.
///
/// The body sees the two inputs and the process context under the given
/// names and may return early with an error.
macro_rules! binary_integer_node {
    ($(#[$meta:meta])* $name:ident, $type_id:literal, |$ctx:ident, $a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name;

        impl $crate::graph::Node for $name {
            fn type_name(&self) -> &'static str {
                $type_id
            }

            fn ports(&self) -> &'static [$crate::graph::Port] {
                $crate::nodes::BINARY_INTEGER
            }

            fn process(
                &mut self,
                $ctx: &mut $crate::graph::ProcessContext<'_, '_>,
            ) -> Result<(), $crate::error::NodeError> {
                let $a = $ctx.integer_on_input(0)?;
                let $b = $ctx.integer_on_input(1)?;
                let output: u64 = $body;
                $ctx.set_integer_on_output(2, output)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}

mod arithmetic;
mod bitwise;
mod buffer;
mod casting;
mod constants;
mod control_flow;
mod data_access;
mod display;
mod filter;

pub use arithmetic::{Add, Divide, Modulus, Multiply, Subtract};
pub use bitwise::{BitwiseAnd, BitwiseNot, BitwiseOr, BitwiseXor};
pub use buffer::{BufferCombine, BufferRepeat, BufferSlice};
pub use casting::{BufferToInteger, IntegerToBuffer};
pub use constants::{
    BufferConstant, Comment, FloatConstant, IntegerConstant, NullBuffer, Rgba8Constant,
    StringConstant,
};
pub use control_flow::{BoolAnd, BoolOr, Equals, GreaterThan, If, LessThan, Not};
pub use data_access::WriteData;
pub use display::{
    DisplayBuffer, DisplayFilter, DisplayFloat, DisplayInteger, DisplayStats, DisplayString,
};
pub use filter::{FilterOr, PortFilter};

/// Register every builtin node type.
pub fn register_builtin(catalog: &mut NodeCatalog) {
    catalog.add::<IntegerConstant>("constants");
    catalog.add::<FloatConstant>("constants");
    catalog.add::<NullBuffer>("constants");
    catalog.add::<BufferConstant>("constants");
    catalog.add::<StringConstant>("constants");
    catalog.add::<Rgba8Constant>("constants");
    catalog.add::<Comment>("constants");

    catalog.add::<DisplayInteger>("display");
    catalog.add::<DisplayFloat>("display");
    catalog.add::<DisplayBuffer>("display");
    catalog.add::<DisplayString>("display");
    catalog.add::<DisplayStats>("display");
    catalog.add::<DisplayFilter>("display");

    catalog.add::<IntegerToBuffer>("casting");
    catalog.add::<BufferToInteger>("casting");

    catalog.add::<Add>("arithmetic");
    catalog.add::<Subtract>("arithmetic");
    catalog.add::<Multiply>("arithmetic");
    catalog.add::<Divide>("arithmetic");
    catalog.add::<Modulus>("arithmetic");

    catalog.add::<BufferCombine>("buffer");
    catalog.add::<BufferSlice>("buffer");
    catalog.add::<BufferRepeat>("buffer");

    catalog.add::<If>("control_flow");
    catalog.add::<Equals>("control_flow");
    catalog.add::<Not>("control_flow");
    catalog.add::<GreaterThan>("control_flow");
    catalog.add::<LessThan>("control_flow");
    catalog.add::<BoolAnd>("control_flow");
    catalog.add::<BoolOr>("control_flow");

    catalog.add::<BitwiseAnd>("bitwise");
    catalog.add::<BitwiseOr>("bitwise");
    catalog.add::<BitwiseXor>("bitwise");
    catalog.add::<BitwiseNot>("bitwise");

    catalog.add::<WriteData>("data_access");

    catalog.add::<PortFilter>("filter");
    catalog.add::<FilterOr>("filter");
}
