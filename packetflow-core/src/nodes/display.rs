//! Display nodes.
//!
//! Display nodes end a chain. Each keeps the value it read in the last pass
//! for the UI to render, and renders `???` when its own input is
//! unconnected or its producer left the output empty. Every other error,
//! including a missing input further upstream, still aborts the pass.

use std::any::Any;
use std::fmt::Write as _;

use crate::capability::{PacketFilter, PacketStats};
use crate::error::{optional, NodeError};
use crate::graph::{AttributeKind, Node, Port, ProcessContext};

/// Placeholder rendered when there is no value.
pub const NO_VALUE: &str = "???";

/// Shows an integer in hexadecimal.
#[derive(Debug, Default)]
pub struct DisplayInteger {
    value: Option<u64>,
}

impl DisplayInteger {
    pub fn value(&self) -> Option<u64> {
        self.value
    }

    pub fn render(&self) -> String {
        match self.value {
            Some(v) => format!("0x{:X}", v),
            None => NO_VALUE.to_string(),
        }
    }
}

impl Node for DisplayInteger {
    fn type_name(&self) -> &'static str {
        "display.int"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::Integer, "input")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.value = None;
        self.value = optional(ctx.node_id(), ctx.integer_on_input(0))?;
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shows a float.
#[derive(Debug, Default)]
pub struct DisplayFloat {
    value: Option<f32>,
}

impl DisplayFloat {
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn render(&self) -> String {
        match self.value {
            Some(v) => v.to_string(),
            None => NO_VALUE.to_string(),
        }
    }
}

impl Node for DisplayFloat {
    fn type_name(&self) -> &'static str {
        "display.float"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::Float, "input")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.value = None;
        self.value = optional(ctx.node_id(), ctx.float_on_input(0))?;
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shows a buffer as space-separated hex bytes.
#[derive(Debug, Default)]
pub struct DisplayBuffer {
    value: Option<Vec<u8>>,
}

impl DisplayBuffer {
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn render(&self) -> String {
        let Some(bytes) = &self.value else {
            return NO_VALUE.to_string();
        };
        let mut out = String::with_capacity(bytes.len() * 3);
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{:02X}", byte);
        }
        out
    }
}

impl Node for DisplayBuffer {
    fn type_name(&self) -> &'static str {
        "display.buffer"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::Buffer, "input")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.value = None;
        self.value = optional(ctx.node_id(), ctx.buffer_on_input(0))?;
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shows a string.
#[derive(Debug, Default)]
pub struct DisplayString {
    value: Option<String>,
}

impl DisplayString {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn render(&self) -> String {
        self.value.clone().unwrap_or_else(|| NO_VALUE.to_string())
    }
}

impl Node for DisplayString {
    fn type_name(&self) -> &'static str {
        "display.string"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::String, "input")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.value = None;
        self.value = optional(ctx.node_id(), ctx.string_on_input(0))?;
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shows a summary of the capture statistics behind a pointer.
#[derive(Debug, Default)]
pub struct DisplayStats {
    summary: Option<String>,
}

impl DisplayStats {
    pub fn render(&self) -> String {
        self.summary.clone().unwrap_or_else(|| NO_VALUE.to_string())
    }
}

impl Node for DisplayStats {
    fn type_name(&self) -> &'static str {
        "display.stats"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::Pointer, "stats")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.summary = None;
        let Some(handle) = optional(ctx.node_id(), ctx.pointer_on_input(0))? else {
            return Ok(());
        };
        let stats = ctx
            .capabilities()
            .get::<PacketStats>(handle)
            .ok_or_else(|| ctx.error("Input is not a statistics object"))?;
        self.summary = Some(stats.summary());
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shows the BPF text of the filter behind a pointer.
#[derive(Debug, Default)]
pub struct DisplayFilter {
    expression: Option<String>,
}

impl DisplayFilter {
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn render(&self) -> String {
        self.expression.clone().unwrap_or_else(|| NO_VALUE.to_string())
    }
}

impl Node for DisplayFilter {
    fn type_name(&self) -> &'static str {
        "display.filter"
    }

    fn ports(&self) -> &'static [Port] {
        const PORTS: &[Port] = &[Port::input(AttributeKind::Pointer, "filter")];
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
        self.expression = None;
        let Some(handle) = optional(ctx.node_id(), ctx.pointer_on_input(0))? else {
            return Ok(());
        };
        let filter = ctx
            .capabilities()
            .get::<PacketFilter>(handle)
            .ok_or_else(|| ctx.error("Input is not a packet filter"))?;
        self.expression = Some(filter.to_bpf());
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
