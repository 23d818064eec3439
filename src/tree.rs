//! Generic record tree shared by both decoders and read by the renderer.

use crate::error::Span;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(u64),
    Flag(bool),
    /// Printed in hex, e.g. labels and packed bytes.
    Hex(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Uint(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Uint(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Uint(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Uint(value as u64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Flag(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

const HEX_PREVIEW: usize = 16;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(value) => write!(f, "{value}"),
            Value::Flag(value) => write!(f, "{}", u8::from(*value)),
            Value::Hex(value) => write!(f, "{value:#04x}"),
            Value::Text(value) => write!(f, "{value:?}"),
            Value::Bytes(bytes) => {
                for byte in bytes.iter().take(HEX_PREVIEW) {
                    write!(f, "{byte:02x}")?;
                }
                if bytes.len() > HEX_PREVIEW {
                    f.write_str("..")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: &'static str,
    pub span: Span,
    pub fields: Vec<Field>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: &'static str, span: Span) -> Self {
        Self {
            kind,
            span,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push(Field {
            name,
            value: value.into(),
        });
        self
    }

    pub fn hex(self, name: &'static str, value: impl Into<u64>) -> Self {
        self.field(name, Value::Hex(value.into()))
    }

    pub fn bytes(self, name: &'static str, bytes: &[u8]) -> Self {
        self.field(name, Value::Bytes(bytes.to_vec()))
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

/// Anything that can describe itself as a [`Node`] for rendering.
pub trait Inspect {
    fn inspect(&self) -> Node;
}
