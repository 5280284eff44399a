//! Typed control messages passed from any thread to the render thread.
//!
//! A [`ControlMessage`] is an ordered list of typed fields plus an address.
//! Fields are read back in the order they were written. Reads never panic:
//! a type mismatch or a read past the last field reports failure and yields
//! a default value, which lets a module shrug off a mistyped message on the
//! audio thread.

/*
Wire Layout
===========

The envelope is process-local and never persisted, but it is still stored as
bytes so that a message is a single allocation that can be cloned cheaply and
consumed without further allocation on the audio thread.

Each field is a one byte tag followed by a little-endian payload:

    tag  kind   payload
    ---  -----  ---------------------------------
     1   i32    4 bytes
     2   i64    8 bytes
     3   f32    4 bytes
     4   f64    8 bytes
     5   bool   1 byte (0 or 1)
     6   str    u32 byte length, then UTF-8 bytes
     7   vec2   two f32 (x, then y)

A read first checks the tag under the cursor. On mismatch the cursor stays
put, so the reader may try again with the right type. At the end of the
buffer the cursor is already clamped and every read fails.
*/

pub mod address;

use std::ops::Range;

pub use address::{Address, PATH_SEPARATOR};

/// Two-component float vector (panning targets, positions).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Kind of a single field in a [`ControlMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    I32,
    I64,
    F32,
    F64,
    Bool,
    Str,
    Vec2,
}

impl FieldKind {
    fn tag(self) -> u8 {
        match self {
            FieldKind::I32 => 1,
            FieldKind::I64 => 2,
            FieldKind::F32 => 3,
            FieldKind::F64 => 4,
            FieldKind::Bool => 5,
            FieldKind::Str => 6,
            FieldKind::Vec2 => 7,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => FieldKind::I32,
            2 => FieldKind::I64,
            3 => FieldKind::F32,
            4 => FieldKind::F64,
            5 => FieldKind::Bool,
            6 => FieldKind::Str,
            7 => FieldKind::Vec2,
            _ => return None,
        })
    }
}

/// An addressed, ordered sequence of typed fields.
#[derive(Debug, Clone)]
pub struct ControlMessage {
    address: String,
    bytes: Vec<u8>,
    fields: usize,
    cursor: usize,
    consumed: usize,
    last_ok: bool,
}

impl ControlMessage {
    /// Create an empty message for `address` (`"<path>/<command>"` or a bare
    /// `"<command>"` broadcast).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            bytes: Vec::new(),
            fields: 0,
            cursor: 0,
            consumed: 0,
            last_ok: true,
        }
    }

    /// Create a message addressed to `command` on the item at `path`.
    pub fn to(path: &str, command: &str) -> Self {
        Self::new(format!("{path}/{command}"))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
    }

    /// Move the address out, leaving an empty one. Used by the renderer to
    /// borrow the address and the payload separately.
    pub(crate) fn take_address(&mut self) -> String {
        std::mem::take(&mut self.address)
    }

    /// Split address into target path and command.
    pub fn target(&self) -> Address<'_> {
        Address::parse(&self.address)
    }

    /// Number of fields written.
    pub fn field_count(&self) -> usize {
        self.fields
    }

    /// Number of fields not yet consumed by the reader.
    pub fn remaining(&self) -> usize {
        self.fields - self.consumed
    }

    /// Reset the read cursor to the first field. Written data is kept.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.consumed = 0;
        self.last_ok = true;
    }

    /// Whether the most recent read succeeded.
    pub fn last_read_ok(&self) -> bool {
        self.last_ok
    }

    /// Kind of the field under the read cursor, if any.
    pub fn peek_kind(&self) -> Option<FieldKind> {
        self.bytes.get(self.cursor).copied().and_then(FieldKind::from_tag)
    }

    // ---- writing -------------------------------------------------------

    fn push_field(&mut self, kind: FieldKind, payload: &[u8]) -> &mut Self {
        self.bytes.push(kind.tag());
        self.bytes.extend_from_slice(payload);
        self.fields += 1;
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.push_field(FieldKind::I32, &value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.push_field(FieldKind::I64, &value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.push_field(FieldKind::F32, &value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.push_field(FieldKind::F64, &value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.push_field(FieldKind::Bool, &[value as u8])
    }

    /// Append a string field.
    ///
    /// Strings longer than `u32::MAX` bytes are truncated at a char boundary.
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        let mut end = value.len().min(u32::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let value = &value[..end];

        self.bytes.push(FieldKind::Str.tag());
        self.bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self.fields += 1;
        self
    }

    pub fn write_vec2(&mut self, value: Vec2) -> &mut Self {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&value.x.to_le_bytes());
        payload[4..].copy_from_slice(&value.y.to_le_bytes());
        self.push_field(FieldKind::Vec2, &payload)
    }

    pub fn with_i32(mut self, value: i32) -> Self {
        self.write_i32(value);
        self
    }

    pub fn with_i64(mut self, value: i64) -> Self {
        self.write_i64(value);
        self
    }

    pub fn with_f32(mut self, value: f32) -> Self {
        self.write_f32(value);
        self
    }

    pub fn with_f64(mut self, value: f64) -> Self {
        self.write_f64(value);
        self
    }

    pub fn with_bool(mut self, value: bool) -> Self {
        self.write_bool(value);
        self
    }

    pub fn with_str(mut self, value: &str) -> Self {
        self.write_str(value);
        self
    }

    pub fn with_vec2(mut self, value: Vec2) -> Self {
        self.write_vec2(value);
        self
    }

    // ---- reading -------------------------------------------------------

    /// Byte offset of the payload if the field under the cursor is `kind`.
    fn payload_start(&self, kind: FieldKind) -> Option<usize> {
        let tag = *self.bytes.get(self.cursor)?;
        (tag == kind.tag()).then_some(self.cursor + 1)
    }

    fn advance(&mut self, to: usize) {
        self.cursor = to.min(self.bytes.len());
        self.consumed += 1;
    }

    fn read_fixed<const N: usize>(&mut self, kind: FieldKind) -> Option<[u8; N]> {
        let payload = self.payload_start(kind).and_then(|start| {
            let bytes: [u8; N] = self.bytes.get(start..start + N)?.try_into().ok()?;
            Some((start + N, bytes))
        });
        self.last_ok = payload.is_some();
        let (end, bytes) = payload?;
        self.advance(end);
        Some(bytes)
    }

    pub fn try_read_i32(&mut self) -> Option<i32> {
        self.read_fixed::<4>(FieldKind::I32).map(i32::from_le_bytes)
    }

    pub fn try_read_i64(&mut self) -> Option<i64> {
        self.read_fixed::<8>(FieldKind::I64).map(i64::from_le_bytes)
    }

    pub fn try_read_f32(&mut self) -> Option<f32> {
        self.read_fixed::<4>(FieldKind::F32).map(f32::from_le_bytes)
    }

    pub fn try_read_f64(&mut self) -> Option<f64> {
        self.read_fixed::<8>(FieldKind::F64).map(f64::from_le_bytes)
    }

    pub fn try_read_bool(&mut self) -> Option<bool> {
        self.read_fixed::<1>(FieldKind::Bool).map(|[b]| b != 0)
    }

    pub fn try_read_vec2(&mut self) -> Option<Vec2> {
        self.read_fixed::<8>(FieldKind::Vec2).map(|bytes| {
            let [x0, x1, x2, x3, y0, y1, y2, y3] = bytes;
            Vec2 {
                x: f32::from_le_bytes([x0, x1, x2, x3]),
                y: f32::from_le_bytes([y0, y1, y2, y3]),
            }
        })
    }

    /// Read a string field without allocating.
    pub fn try_read_str(&mut self) -> Option<&str> {
        let span = self.try_read_str_span()?;
        Some(self.str_at(span))
    }

    /// Like [`ControlMessage::try_read_str`] but returns the byte span, so
    /// later fields can be read while the string is still needed.
    pub(crate) fn try_read_str_span(&mut self) -> Option<Range<usize>> {
        let range = self.payload_start(FieldKind::Str).and_then(|start| {
            let len: [u8; 4] = self.bytes.get(start..start + 4)?.try_into().ok()?;
            let begin = start + 4;
            let end = begin.checked_add(u32::from_le_bytes(len) as usize)?;
            (end <= self.bytes.len()).then_some(begin..end)
        });
        let Some(range) = range else {
            self.last_ok = false;
            return None;
        };
        self.advance(range.end);
        self.last_ok = std::str::from_utf8(&self.bytes[range.clone()]).is_ok();
        self.last_ok.then_some(range)
    }

    /// String at a span returned by [`ControlMessage::try_read_str_span`].
    pub(crate) fn str_at(&self, span: Range<usize>) -> &str {
        self.bytes
            .get(span)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or("")
    }

    pub fn read_i32(&mut self) -> i32 {
        self.try_read_i32().unwrap_or_default()
    }

    pub fn read_i64(&mut self) -> i64 {
        self.try_read_i64().unwrap_or_default()
    }

    pub fn read_f32(&mut self) -> f32 {
        self.try_read_f32().unwrap_or_default()
    }

    pub fn read_f64(&mut self) -> f64 {
        self.try_read_f64().unwrap_or_default()
    }

    pub fn read_bool(&mut self) -> bool {
        self.try_read_bool().unwrap_or_default()
    }

    pub fn read_vec2(&mut self) -> Vec2 {
        self.try_read_vec2().unwrap_or_default()
    }

    /// Read a string field; empty on failure.
    pub fn read_str(&mut self) -> &str {
        self.try_read_str().unwrap_or("")
    }

    /// Read a string field into an owned `String`. Allocates; not for use on
    /// the render thread.
    pub fn read_string(&mut self) -> String {
        self.read_str().to_owned()
    }
}
