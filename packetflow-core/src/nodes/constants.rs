//! Constant sources and annotations.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::NodeError;
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

/// Emits a configured unsigned integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegerConstant {
    #[serde(rename = "data")]
    value: u64,
}

impl IntegerConstant {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Node for IntegerConstant {
    fn type_name(&self) -> &'static str {
        "constants.int"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Integer, "value")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        ctx.set_integer_on_output(0, self.value)
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emits a configured float.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloatConstant {
    #[serde(rename = "data")]
    value: f32,
}

impl FloatConstant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Node for FloatConstant {
    fn type_name(&self) -> &'static str {
        "constants.float"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Float, "value")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        ctx.set_float_on_output(0, self.value)
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emits an empty buffer.
#[derive(Debug, Default)]
pub struct NullBuffer;

impl Node for NullBuffer {
    fn type_name(&self) -> &'static str {
        "constants.nullptr"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Buffer, "value")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        ctx.set_buffer_on_output(0, Vec::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emits a fixed-size byte buffer.
///
/// The stored bytes are padded with zeros or truncated to `size` each time
/// the node runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConstant {
    size: u32,
    data: Vec<u8>,
}

impl BufferConstant {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            size: u32::try_from(data.len()).unwrap_or(u32::MAX),
            data,
        }
    }
}

impl Default for BufferConstant {
    fn default() -> Self {
        Self {
            size: 1,
            data: Vec::new(),
        }
    }
}

impl Node for BufferConstant {
    fn type_name(&self) -> &'static str {
        "constants.buffer"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Buffer, "value")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let size = self.size as usize;
        if self.data.len() != size {
            self.data.resize(size, 0x00);
        }
        ctx.set_buffer_on_output(0, self.data.clone())
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emits the UTF-8 bytes of a configured text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringConstant {
    #[serde(rename = "data")]
    value: String,
}

impl StringConstant {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Node for StringConstant {
    fn type_name(&self) -> &'static str {
        "constants.string"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::output(AttributeKind::Buffer, "value")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        ctx.set_buffer_on_output(0, self.value.as_bytes().to_vec())
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Rgba {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

/// Emits the channels of a colour as integers in `0..=255`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rgba8Constant {
    #[serde(rename = "data")]
    color: Rgba,
}

impl Rgba8Constant {
    /// Channels are normalized to `0.0..=1.0`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            color: Rgba { r, g, b, a },
        }
    }
}

impl Default for Rgba8Constant {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

fn channel(value: f32) -> u64 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u64
}

impl Node for Rgba8Constant {
    fn type_name(&self) -> &'static str {
        "constants.rgba8"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[
            Port::output(AttributeKind::Integer, "r"),
            Port::output(AttributeKind::Integer, "g"),
            Port::output(AttributeKind::Integer, "b"),
            Port::output(AttributeKind::Integer, "a"),
        ];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        let Rgba { r, g, b, a } = self.color;
        ctx.set_integer_on_output(0, channel(r))?;
        ctx.set_integer_on_output(1, channel(g))?;
        ctx.set_integer_on_output(2, channel(b))?;
        ctx.set_integer_on_output(3, channel(a))
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Free-form note on the canvas. Has no ports and computes nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    comment: String,
}

impl Comment {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.comment
    }
}

impl Node for Comment {
    fn type_name(&self) -> &'static str {
        "constants.comment"
    }

    fn ports(&self) -> &'static [Port] {
        &[]
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        Ok(())
    }

    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load(&mut self, params: JsonValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
