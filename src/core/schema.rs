//! # Schema Codec
//!
//! Declarative description of the wire layouts and the codec that walks them.
//!
//! A [`Schema`] is an ordered list of [`Field`] descriptors. Field order is
//! the only source of decode and encode order. Each field may carry:
//!
//! - a **presence window**: outside it the field contributes no bytes and
//!   decodes to its zero value;
//! - a **representation override**: inside its window the field is read and
//!   written as a different scalar kind (a `u32` that used to be a `u16`);
//! - a **length**: a literal, the decoded value of an earlier sibling, or the
//!   rest of the buffer;
//! - a list of **length variants**: the first variant whose window contains
//!   the epoch is used, for fields whose size changed across releases.
//!
//! Decoding produces a [`Record`], a tree of named [`Value`]s that keeps a
//! reference to its schema so it can be encoded again. Integers travel
//! little-endian.
//!
//! ## Example
//! ```rust
//! use mononoke::core::epoch::{Epoch, VersionWindow};
//! use mononoke::core::schema::{Field, Length, Record, Scalar, Schema};
//!
//! static GREETING: Schema = Schema::new(
//!     "Greeting",
//!     &[
//!         Field::scalar("id", Scalar::U32)
//!             .represented_as(Scalar::U16, VersionWindow::until(0x01_00_00)),
//!         Field::scalar("size", Scalar::U16),
//!         Field::bytes("body", Length::Field("size")),
//!     ],
//! );
//!
//! let record = Record::new(&GREETING)
//!     .with("id", 7u32)
//!     .with("size", 2u16)
//!     .with("body", vec![1u8, 2]);
//! let old = record.encode(Epoch(0x00_09_00)).unwrap();
//! let new = record.encode(Epoch(0x02_00_00)).unwrap();
//! assert_eq!(old.len() + 2, new.len());
//! assert_eq!(GREETING.decode(&new, Epoch(0x02_00_00)).unwrap(), record);
//! ```

use crate::core::epoch::{Epoch, VersionWindow};
use crate::error::CodecError;
use bytes::{BufMut, BytesMut};

type Result<T> = std::result::Result<T, CodecError>;

/// Fixed-width wire scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Scalar {
    pub const fn width(self) -> usize {
        match self {
            Scalar::Bool | Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::I64 | Scalar::U64 | Scalar::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::I8 => "i8",
            Scalar::I16 => "i16",
            Scalar::I32 => "i32",
            Scalar::I64 => "i64",
            Scalar::U8 => "u8",
            Scalar::U16 => "u16",
            Scalar::U32 => "u32",
            Scalar::U64 => "u64",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
        }
    }

    const fn is_float(self) -> bool {
        matches!(self, Scalar::F32 | Scalar::F64)
    }

    fn zero(self) -> Value {
        match self {
            Scalar::Bool => Value::Bool(false),
            Scalar::I8 | Scalar::I16 | Scalar::I32 | Scalar::I64 => Value::Int(0),
            Scalar::U8 | Scalar::U16 | Scalar::U32 | Scalar::U64 => Value::UInt(0),
            Scalar::F32 | Scalar::F64 => Value::Float(0.0),
        }
    }

    /// Interprets `raw` (exactly `width()` bytes, little-endian).
    fn read(self, raw: &[u8]) -> Value {
        let mut word = [0u8; 8];
        word[..raw.len()].copy_from_slice(raw);
        let bits = u64::from_le_bytes(word);
        match self {
            Scalar::Bool => Value::Bool(bits != 0),
            Scalar::U8 | Scalar::U16 | Scalar::U32 | Scalar::U64 => Value::UInt(bits),
            Scalar::I8 => Value::Int(i64::from(bits as u8 as i8)),
            Scalar::I16 => Value::Int(i64::from(bits as u16 as i16)),
            Scalar::I32 => Value::Int(i64::from(bits as u32 as i32)),
            Scalar::I64 => Value::Int(bits as i64),
            Scalar::F32 => Value::Float(f64::from(f32::from_bits(bits as u32))),
            Scalar::F64 => Value::Float(f64::from_bits(bits)),
        }
    }

    fn write(self, field: &'static str, value: &Value, out: &mut BytesMut) -> Result<()> {
        let bits = match (self, value) {
            (Scalar::F32, value) => u64::from((numeric(field, value)? as f32).to_bits()),
            (Scalar::F64, value) => numeric(field, value)?.to_bits(),
            (_, Value::Bool(flag)) => u64::from(*flag),
            (_, Value::Int(int)) => *int as u64,
            (_, Value::UInt(uint)) => *uint,
            _ => {
                return Err(CodecError::TypeMismatch {
                    field,
                    expected: self.name(),
                })
            }
        };
        out.put_slice(&bits.to_le_bytes()[..self.width()]);
        Ok(())
    }

    /// Brings a value read through an override back into this kind's domain.
    fn coerce(self, value: Value) -> Value {
        let bits = match value {
            Value::Float(float) if self.is_float() => return Value::Float(float),
            Value::Int(int) if self.is_float() => return Value::Float(int as f64),
            Value::UInt(uint) if self.is_float() => return Value::Float(uint as f64),
            Value::Float(float) => float as i64 as u64,
            Value::Bool(flag) => u64::from(flag),
            Value::Int(int) => int as u64,
            Value::UInt(uint) => uint,
            other => return other,
        };
        self.read(&bits.to_le_bytes()[..self.width()])
    }
}

fn numeric(field: &'static str, value: &Value) -> Result<f64> {
    match value {
        Value::Float(float) => Ok(*float),
        Value::Int(int) => Ok(*int as f64),
        Value::UInt(uint) => Ok(*uint as f64),
        _ => Err(CodecError::TypeMismatch {
            field,
            expected: "number",
        }),
    }
}

/// What a field holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Scalar(Scalar),
    /// Raw bytes; fixed-width text fields live here too.
    Bytes,
    /// UTF-8 text of a known byte length.
    Text,
    /// A nested record.
    Record(&'static Schema),
    /// Records packed back to back inside one length span.
    Records(&'static Schema),
}

impl Kind {
    pub const fn name(&self) -> &'static str {
        match self {
            Kind::Scalar(scalar) => scalar.name(),
            Kind::Bytes => "bytes",
            Kind::Text => "text",
            Kind::Record(_) => "record",
            Kind::Records(_) => "records",
        }
    }
}

/// Where a variable-length field gets its size from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Fixed(usize),
    /// The decoded value of an earlier field with this name.
    Field(&'static str),
    /// Everything left in the buffer.
    Remaining,
}

impl Length {
    /// Reads a length tag: a decimal literal, otherwise the name of a sibling.
    pub fn parse(tag: &'static str) -> Self {
        tag.parse().map(Length::Fixed).unwrap_or(Length::Field(tag))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variant {
    pub length: Length,
    pub window: VersionWindow,
}

impl Variant {
    pub const fn new(length: Length, window: VersionWindow) -> Self {
        Self { length, window }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Override {
    pub kind: Kind,
    pub window: VersionWindow,
}

/// One field descriptor. Built with `const` constructors so schemas can be
/// plain statics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub presence: Option<VersionWindow>,
    pub repr: Option<Override>,
    pub length: Option<Length>,
    pub variants: &'static [Variant],
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            presence: None,
            repr: None,
            length: None,
            variants: &[],
        }
    }

    pub const fn scalar(name: &'static str, scalar: Scalar) -> Self {
        Self::new(name, Kind::Scalar(scalar))
    }

    pub const fn bytes(name: &'static str, length: Length) -> Self {
        Self::new(name, Kind::Bytes).sized(length)
    }

    pub const fn text(name: &'static str, length: Length) -> Self {
        Self::new(name, Kind::Text).sized(length)
    }

    pub const fn record(name: &'static str, schema: &'static Schema) -> Self {
        Self::new(name, Kind::Record(schema))
    }

    pub const fn records(name: &'static str, schema: &'static Schema, length: Length) -> Self {
        Self::new(name, Kind::Records(schema)).sized(length)
    }

    pub const fn sized(self, length: Length) -> Self {
        Self {
            length: Some(length),
            ..self
        }
    }

    /// Length variants, checked in order; the first matching window wins.
    pub const fn variants(self, variants: &'static [Variant]) -> Self {
        Self { variants, ..self }
    }

    /// Restricts the field to the epochs inside `window`.
    pub const fn present(self, window: VersionWindow) -> Self {
        Self {
            presence: Some(window),
            ..self
        }
    }

    /// Reads and writes the field as `scalar` while the epoch is in `window`.
    pub const fn represented_as(self, scalar: Scalar, window: VersionWindow) -> Self {
        self.represented_as_kind(Kind::Scalar(scalar), window)
    }

    pub const fn represented_as_kind(self, kind: Kind, window: VersionWindow) -> Self {
        Self {
            repr: Some(Override { kind, window }),
            ..self
        }
    }

    pub fn is_present(&self, epoch: Epoch) -> bool {
        self.presence.map_or(true, |window| window.contains(epoch))
    }

    fn wire_kind(&self, epoch: Epoch) -> Result<Kind> {
        match self.repr {
            Some(repr) if repr.window.contains(epoch) => match (self.kind, repr.kind) {
                (Kind::Scalar(_), Kind::Scalar(_)) => Ok(repr.kind),
                _ => Err(CodecError::UnsupportedRepresentation {
                    field: self.name,
                    kind: repr.kind.name(),
                }),
            },
            _ => Ok(self.kind),
        }
    }

    fn length_at(&self, epoch: Epoch) -> Result<Length> {
        if self.variants.is_empty() {
            return self
                .length
                .ok_or(CodecError::UnsizedField { field: self.name });
        }
        self.variants
            .iter()
            .find(|variant| variant.window.contains(epoch))
            .map(|variant| variant.length)
            .ok_or(CodecError::NoVariant {
                field: self.name,
                version: epoch.get(),
            })
    }

    /// Width the encoder pads or truncates to, if the field has one.
    fn fixed_width(&self) -> Option<usize> {
        match (self.variants.is_empty(), self.length) {
            (true, Some(Length::Fixed(width))) => Some(width),
            _ => None,
        }
    }

    fn zero(&self) -> Value {
        match self.kind {
            Kind::Scalar(scalar) => scalar.zero(),
            Kind::Bytes => Value::Bytes(vec![0; self.fixed_width().unwrap_or(0)]),
            Kind::Text => Value::Text(String::new()),
            Kind::Record(schema) => Value::Record(Record::zeroed(schema)),
            Kind::Records(_) => Value::Records(Vec::new()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Decodes one record from the front of `bytes`. Trailing bytes are ignored.
    pub fn decode(&'static self, bytes: &[u8], epoch: Epoch) -> Result<Record> {
        decode(bytes, self, epoch)
    }

    /// Checks the authoring rules: variable-length fields have a length,
    /// overrides are scalar to scalar, and for every epoch exactly one
    /// length variant applies.
    pub fn verify(&self) -> Result<()> {
        for field in self.fields {
            if let Some(repr) = field.repr {
                if !matches!((field.kind, repr.kind), (Kind::Scalar(_), Kind::Scalar(_))) {
                    return Err(CodecError::UnsupportedRepresentation {
                        field: field.name,
                        kind: repr.kind.name(),
                    });
                }
            }
            if !field.variants.is_empty() {
                verify_variants(field)?;
            } else if !matches!(field.kind, Kind::Scalar(_) | Kind::Record(_))
                && field.length.is_none()
            {
                return Err(CodecError::UnsizedField { field: field.name });
            }
            if let Kind::Record(nested) | Kind::Records(nested) = field.kind {
                nested.verify()?;
            }
        }
        Ok(())
    }
}

// Coverage only changes at a window's first epoch or just past its last one.
fn verify_variants(field: &Field) -> Result<()> {
    let mut probes = vec![0u32];
    for variant in field.variants {
        probes.push(variant.window.min);
        if let Some(after) = variant.window.max.checked_add(1) {
            probes.push(after);
        }
    }
    for version in probes {
        let matches = field
            .variants
            .iter()
            .filter(|variant| variant.window.contains(Epoch(version)))
            .count();
        match matches {
            1 => {}
            0 => {
                return Err(CodecError::VariantGap {
                    field: field.name,
                    version,
                })
            }
            _ => {
                return Err(CodecError::OverlappingVariants {
                    field: field.name,
                    version,
                })
            }
        }
    }
    Ok(())
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Record(Record),
    Records(Vec<Record>),
}

impl Value {
    fn as_length(&self) -> Option<u64> {
        match self {
            Value::UInt(uint) => Some(*uint),
            Value::Int(int) => u64::try_from(*int).ok(),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $conv:expr => $($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant($conv(value))
            }
        })+
    };
}

value_from!(UInt, u64::from => u8, u16, u32, u64);
value_from!(Int, i64::from => i8, i16, i32, i64);
value_from!(Float, f64::from => f32, f64);
value_from!(Bool, std::convert::identity => bool);
value_from!(Bytes, std::convert::identity => Vec<u8>);
value_from!(Text, std::convert::identity => String);
value_from!(Record, std::convert::identity => Record);
value_from!(Records, std::convert::identity => Vec<Record>);

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

/// Named values laid out by a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static Schema,
    values: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: Vec::with_capacity(schema.fields.len()),
        }
    }

    /// A record holding the zero value of every field.
    pub fn zeroed(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: schema
                .fields
                .iter()
                .map(|field| (field.name, field.zero()))
                .collect(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn encode(&self, epoch: Epoch) -> Result<Vec<u8>> {
        encode(self, epoch)
    }

    fn require(&self, name: &'static str) -> Result<&Value> {
        self.get(name).ok_or(CodecError::MissingField {
            schema: self.schema.name,
            field: name,
        })
    }

    pub fn uint(&self, name: &'static str) -> Result<u64> {
        match self.require(name)? {
            Value::UInt(uint) => Ok(*uint),
            Value::Int(int) => Ok(*int as u64),
            Value::Bool(flag) => Ok(u64::from(*flag)),
            _ => Err(mismatch(name, "unsigned integer")),
        }
    }

    pub fn int(&self, name: &'static str) -> Result<i64> {
        match self.require(name)? {
            Value::Int(int) => Ok(*int),
            Value::UInt(uint) => Ok(*uint as i64),
            _ => Err(mismatch(name, "signed integer")),
        }
    }

    pub fn u8(&self, name: &'static str) -> Result<u8> {
        self.uint(name).map(|value| value as u8)
    }

    pub fn u16(&self, name: &'static str) -> Result<u16> {
        self.uint(name).map(|value| value as u16)
    }

    pub fn u32(&self, name: &'static str) -> Result<u32> {
        self.uint(name).map(|value| value as u32)
    }

    pub fn i32(&self, name: &'static str) -> Result<i32> {
        self.int(name).map(|value| value as i32)
    }

    pub fn bytes(&self, name: &'static str) -> Result<&[u8]> {
        match self.require(name)? {
            Value::Bytes(bytes) => Ok(bytes),
            _ => Err(mismatch(name, "bytes")),
        }
    }

    pub fn text(&self, name: &'static str) -> Result<&str> {
        match self.require(name)? {
            Value::Text(text) => Ok(text),
            _ => Err(mismatch(name, "text")),
        }
    }

    pub fn record(&self, name: &'static str) -> Result<&Record> {
        match self.require(name)? {
            Value::Record(record) => Ok(record),
            _ => Err(mismatch(name, "record")),
        }
    }

    pub fn records(&self, name: &'static str) -> Result<&[Record]> {
        match self.require(name)? {
            Value::Records(records) => Ok(records),
            _ => Err(mismatch(name, "records")),
        }
    }
}

fn mismatch(field: &'static str, expected: &'static str) -> CodecError {
    CodecError::TypeMismatch { field, expected }
}

/// Decodes `schema` from `bytes` under `epoch`.
pub fn decode(bytes: &[u8], schema: &'static Schema, epoch: Epoch) -> Result<Record> {
    Decoder {
        input: bytes,
        epoch,
        siblings: Siblings::default(),
    }
    .record(schema)
}

/// Encodes `record` under `epoch`.
///
/// Presence windows and representation overrides are honoured. Length
/// variants are not re-picked: variable fields are written as supplied,
/// fixed-width fields are zero padded or truncated.
pub fn encode(record: &Record, epoch: Epoch) -> Result<Vec<u8>> {
    let mut out = BytesMut::with_capacity(64);
    encode_record(record, epoch, &mut out)?;
    Ok(out.to_vec())
}

/// Integer values decoded so far, most recent last. Length references
/// resolve against the latest entry with a matching name.
#[derive(Debug, Default)]
struct Siblings(Vec<(&'static str, u64)>);

impl Siblings {
    fn remember(&mut self, name: &'static str, value: &Value) {
        if let Some(length) = value.as_length() {
            self.0.push((name, length));
        }
    }

    fn lookup(&self, name: &str) -> Option<u64> {
        self.0
            .iter()
            .rev()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    epoch: Epoch,
    siblings: Siblings,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, field: &'static str, needed: usize) -> Result<&'a [u8]> {
        if self.input.len() < needed {
            return Err(CodecError::UnexpectedEof {
                field,
                needed,
                remaining: self.input.len(),
            });
        }
        let (head, tail) = self.input.split_at(needed);
        self.input = tail;
        Ok(head)
    }

    fn span(&mut self, field: &Field) -> Result<&'a [u8]> {
        match field.length_at(self.epoch)? {
            Length::Fixed(width) => self.take(field.name, width),
            Length::Field(reference) => {
                let width = self
                    .siblings
                    .lookup(reference)
                    .ok_or(CodecError::MissingLength {
                        field: field.name,
                        reference,
                    })?;
                let width = usize::try_from(width).map_err(|_| CodecError::UnexpectedEof {
                    field: field.name,
                    needed: usize::MAX,
                    remaining: self.input.len(),
                })?;
                self.take(field.name, width)
            }
            Length::Remaining => Ok(std::mem::take(&mut self.input)),
        }
    }

    fn record(&mut self, schema: &'static Schema) -> Result<Record> {
        let mut record = Record::new(schema);
        for field in schema.fields {
            let value = if field.is_present(self.epoch) {
                self.field(field)?
            } else {
                field.zero()
            };
            record.values.push((field.name, value));
        }
        Ok(record)
    }

    fn field(&mut self, field: &Field) -> Result<Value> {
        match field.wire_kind(self.epoch)? {
            Kind::Scalar(wire) => {
                let raw = self.take(field.name, wire.width())?;
                let value = match field.kind {
                    Kind::Scalar(declared) if declared != wire => declared.coerce(wire.read(raw)),
                    _ => wire.read(raw),
                };
                self.siblings.remember(field.name, &value);
                Ok(value)
            }
            Kind::Bytes => Ok(Value::Bytes(self.span(field)?.to_vec())),
            Kind::Text => {
                let raw = self.span(field)?;
                String::from_utf8(raw.to_vec())
                    .map(Value::Text)
                    .map_err(|_| CodecError::InvalidText { field: field.name })
            }
            Kind::Record(schema) => Ok(Value::Record(self.record(schema)?)),
            Kind::Records(schema) => {
                let scratch = self.span(field)?;
                let mut nested = Decoder {
                    input: scratch,
                    epoch: self.epoch,
                    siblings: std::mem::take(&mut self.siblings),
                };
                let mut items = Vec::new();
                while !nested.input.is_empty() {
                    let before = nested.input.len();
                    items.push(nested.record(schema)?);
                    if nested.input.len() == before {
                        return Err(CodecError::EmptyElement { field: field.name });
                    }
                }
                self.siblings = nested.siblings;
                Ok(Value::Records(items))
            }
        }
    }
}

fn encode_record(record: &Record, epoch: Epoch, out: &mut BytesMut) -> Result<()> {
    for field in record.schema.fields {
        if field.is_present(epoch) {
            encode_field(field, record.get(field.name), epoch, out)?;
        }
    }
    Ok(())
}

fn encode_field(
    field: &Field,
    value: Option<&Value>,
    epoch: Epoch,
    out: &mut BytesMut,
) -> Result<()> {
    match field.wire_kind(epoch)? {
        Kind::Scalar(wire) => match value {
            Some(value) => wire.write(field.name, value, out),
            None => wire.write(field.name, &wire.zero(), out),
        },
        Kind::Bytes => match value {
            None => put_sized(field, &[], out),
            Some(Value::Bytes(bytes)) => put_sized(field, bytes, out),
            Some(_) => Err(mismatch(field.name, "bytes")),
        },
        Kind::Text => match value {
            None => put_sized(field, &[], out),
            Some(Value::Text(text)) => put_sized(field, text.as_bytes(), out),
            Some(_) => Err(mismatch(field.name, "text")),
        },
        Kind::Record(schema) => match value {
            None => encode_record(&Record::zeroed(schema), epoch, out),
            Some(Value::Record(nested)) if std::ptr::eq(nested.schema, schema) => {
                encode_record(nested, epoch, out)
            }
            Some(_) => Err(mismatch(field.name, schema.name)),
        },
        Kind::Records(schema) => match value {
            None => Ok(()),
            Some(Value::Records(items)) => items.iter().try_for_each(|item| {
                if std::ptr::eq(item.schema, schema) {
                    encode_record(item, epoch, out)
                } else {
                    Err(mismatch(field.name, schema.name))
                }
            }),
            Some(_) => Err(mismatch(field.name, "records")),
        },
    }
}

fn put_sized(field: &Field, data: &[u8], out: &mut BytesMut) -> Result<()> {
    match field.fixed_width() {
        Some(width) => {
            let used = data.len().min(width);
            out.put_slice(&data[..used]);
            out.put_bytes(0, width - used);
        }
        None => out.put_slice(data),
    }
    Ok(())
}
