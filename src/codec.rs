/// Instance codec - serializes an instance to a compact, URL-safe text
/// token per a fixed per-game field layout
///
/// The byte layout is one optional field per step id: a presence byte (0 =
/// null) followed by a fixed payload encoding. The bytes become a token via
/// standard base64 with the two reserved characters and the padding
/// character remapped to URL-safe equivalents ('+' > '-', '/' > '_',
/// '=' > '~').
use crate::engine::Instance;
use crate::value::{StepId, Value};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// The wire kind of one schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Number,
    Item,
    Items,
    Index,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::Item => "item",
            FieldKind::Items => "items",
            FieldKind::Index => "index",
        };
        write!(f, "{}", name)
    }
}

/// Error types for encoding and decoding tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The instance value does not match the field's declared kind
    KindMismatch { step: String, expected: FieldKind },
    /// A string or list is too long for its u16 length prefix
    LengthOverflow { step: String },
    /// The byte stream ended inside a field
    Truncated,
    /// Bytes remained after the last schema field
    TrailingBytes,
    /// The token is not valid under the substituted base64 alphabet
    InvalidToken { message: String },
    /// A decoded string was not valid UTF-8
    InvalidText,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::KindMismatch { step, expected } => {
                write!(f, "Value for step '{}' is not a {}", step, expected)
            }
            CodecError::LengthOverflow { step } => {
                write!(f, "Value for step '{}' exceeds the length prefix", step)
            }
            CodecError::Truncated => write!(f, "Token ended inside a field"),
            CodecError::TrailingBytes => write!(f, "Token has bytes past the last field"),
            CodecError::InvalidToken { message } => write!(f, "Invalid token: {}", message),
            CodecError::InvalidText => write!(f, "Token contains invalid UTF-8 text"),
        }
    }
}

impl std::error::Error for CodecError {}

/// One optional field in a game's binary layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub id: StepId,
    pub kind: FieldKind,
}

/// A game's fixed binary layout: one optional field per possible step id
///
/// Field order is the wire order and must stay stable for tokens to remain
/// decodable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Append a field to the layout
    pub fn field(mut self, id: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(SchemaField {
            id: id.into(),
            kind,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Serialize `instance` to a URL-safe token
    ///
    /// Fields without an instance entry are encoded as null; instance
    /// entries outside the schema are not encoded.
    pub fn encode(&self, instance: &Instance) -> Result<String, CodecError> {
        let mut bytes = Vec::new();
        for field in &self.fields {
            match instance.get(&field.id) {
                None => bytes.push(0),
                Some(value) => {
                    bytes.push(1);
                    write_value(&mut bytes, field, value)?;
                }
            }
        }
        Ok(to_token(&bytes))
    }

    /// Rebuild a partial instance from a token, eliding null fields
    pub fn decode(&self, token: &str) -> Result<Instance, CodecError> {
        let bytes = STANDARD
            .decode(from_token(token))
            .map_err(|error| CodecError::InvalidToken {
                message: error.to_string(),
            })?;

        let mut reader = Reader::new(&bytes);
        let mut instance = Instance::new();
        for field in &self.fields {
            match reader.read_u8()? {
                0 => continue,
                1 => {
                    let value = read_value(&mut reader, field)?;
                    instance.insert(field.id.clone(), value);
                }
                byte => {
                    return Err(CodecError::InvalidToken {
                        message: format!("presence byte {} for step '{}'", byte, field.id),
                    })
                }
            }
        }
        if !reader.at_end() {
            return Err(CodecError::TrailingBytes);
        }
        Ok(instance)
    }
}

fn to_token(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            '=' => '~',
            other => other,
        })
        .collect()
}

fn from_token(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            '~' => '=',
            other => other,
        })
        .collect()
}

fn write_value(bytes: &mut Vec<u8>, field: &SchemaField, value: &Value) -> Result<(), CodecError> {
    match (field.kind, value) {
        (FieldKind::Bool, Value::Bool(flag)) => bytes.push(*flag as u8),
        (FieldKind::Number, Value::Number(number)) => bytes.extend(number.to_le_bytes()),
        (FieldKind::Item, Value::Item(item)) => write_text(bytes, field, item)?,
        (FieldKind::Items, Value::Items(items)) => {
            let count =
                u16::try_from(items.len()).map_err(|_| CodecError::LengthOverflow {
                    step: field.id.clone(),
                })?;
            bytes.extend(count.to_le_bytes());
            for item in items {
                write_text(bytes, field, item)?;
            }
        }
        (FieldKind::Index, Value::Index(index)) => bytes.extend(index.to_le_bytes()),
        _ => {
            return Err(CodecError::KindMismatch {
                step: field.id.clone(),
                expected: field.kind,
            })
        }
    }
    Ok(())
}

fn write_text(bytes: &mut Vec<u8>, field: &SchemaField, text: &str) -> Result<(), CodecError> {
    let length = u16::try_from(text.len()).map_err(|_| CodecError::LengthOverflow {
        step: field.id.clone(),
    })?;
    bytes.extend(length.to_le_bytes());
    bytes.extend(text.as_bytes());
    Ok(())
}

fn read_value(reader: &mut Reader<'_>, field: &SchemaField) -> Result<Value, CodecError> {
    Ok(match field.kind {
        FieldKind::Bool => Value::Bool(reader.read_u8()? != 0),
        FieldKind::Number => {
            let mut buffer = [0u8; 8];
            buffer.copy_from_slice(reader.read_exact(8)?);
            Value::Number(i64::from_le_bytes(buffer))
        }
        FieldKind::Item => Value::Item(reader.read_text()?),
        FieldKind::Items => {
            let count = reader.read_u16()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(reader.read_text()?);
            }
            Value::Items(items)
        }
        FieldKind::Index => {
            let mut buffer = [0u8; 16];
            buffer.copy_from_slice(reader.read_exact(16)?);
            Value::Index(u128::from_le_bytes(buffer))
        }
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, position: 0 }
    }

    fn at_end(&self) -> bool {
        self.position == self.bytes.len()
    }

    fn read_exact(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        let end = self.position.checked_add(count).ok_or(CodecError::Truncated)?;
        if end > self.bytes.len() {
            return Err(CodecError::Truncated);
        }
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let mut buffer = [0u8; 2];
        buffer.copy_from_slice(self.read_exact(2)?);
        Ok(u16::from_le_bytes(buffer))
    }

    fn read_text(&mut self) -> Result<String, CodecError> {
        let length = self.read_u16()? as usize;
        let bytes = self.read_exact(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidText)
    }
}
