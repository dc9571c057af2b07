// Structured API results
//
// Every response body is kept as the `serde_json::Value` it arrived as.
// A `Schema` names the fields a shape cares about; those are decoded on
// first access into nested `ApiResult`s and cached for the life of the
// instance. Anything the schema does not declare is served straight from
// the raw tree, so fields added server-side are never lost.

use std::sync::OnceLock;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{trace, warn};

static NULL: Value = Value::Null;

// ── Field declarations ───────────────────────────────────────────────

/// A declared field: the key it reads, the shape it decodes into, and
/// whether the raw value is a list of that shape.
#[derive(Debug)]
pub struct Field {
    name: &'static str,
    schema: &'static Schema,
    is_list: bool,
}

impl Field {
    /// A single nested object.
    pub const fn one(name: &'static str, schema: &'static Schema) -> Self {
        Self {
            name,
            schema,
            is_list: false,
        }
    }

    /// A list of nested objects.
    pub const fn list(name: &'static str, schema: &'static Schema) -> Self {
        Self {
            name,
            schema,
            is_list: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn is_list(&self) -> bool {
        self.is_list
    }
}

/// The declared fields of one result shape, built once as a `static`.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    fields: &'static [Field],
}

/// Shape with no declared fields: every key passes through raw.
pub static GENERIC: Schema = Schema::new("generic", &[]);

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self { name, fields }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

// ── Decoded values ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Decoded {
    Null,
    One(ApiResult),
    List(Vec<ApiResult>),
}

impl Decoded {
    fn decode(field: &Field, raw: Option<&Value>) -> Self {
        if field.is_list {
            return match raw {
                Some(Value::Array(items)) => Self::List(
                    items
                        .iter()
                        .map(|item| ApiResult::new(field.schema, item.clone()))
                        .collect(),
                ),
                None | Some(Value::Null) => Self::List(Vec::new()),
                Some(other) => {
                    warn!(
                        field = field.name,
                        kind = value_kind(other),
                        "expected a list, treating as empty"
                    );
                    Self::List(Vec::new())
                }
            };
        }

        match raw {
            None | Some(Value::Null) => Self::Null,
            Some(value) => Self::One(ApiResult::new(field.schema, value.clone())),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What a field lookup on an [`ApiResult`] yields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attr<'a> {
    /// An undeclared key, exactly as the server sent it.
    Raw(&'a Value),
    /// A declared single field.
    Object(&'a ApiResult),
    /// A declared list field (empty when missing).
    List(&'a [ApiResult]),
    /// A declared single field that is missing or `null`.
    Null,
}

impl<'a> Attr<'a> {
    pub fn as_object(self) -> Option<&'a ApiResult> {
        match self {
            Self::Object(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_list(self) -> Option<&'a [ApiResult]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_raw(self) -> Option<&'a Value> {
        match self {
            Self::Raw(value) => Some(value),
            _ => None,
        }
    }
}

// ── ApiResult ────────────────────────────────────────────────────────

/// A decoded JSON response with a typed surface for declared fields.
///
/// The raw value is never modified. Declared fields are decoded lazily,
/// once, and later lookups return the very same cached value. Declared
/// names shadow raw keys of the same name.
#[derive(Debug, Clone)]
pub struct ApiResult {
    schema: &'static Schema,
    raw: Value,
    decoded: Box<[OnceLock<Decoded>]>,
}

impl ApiResult {
    pub fn new(schema: &'static Schema, raw: Value) -> Self {
        let decoded = schema.fields.iter().map(|_| OnceLock::new()).collect();
        Self {
            schema,
            raw,
            decoded,
        }
    }

    /// Wrap a value with no declared fields.
    pub fn generic(raw: Value) -> Self {
        Self::new(&GENERIC, raw)
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The underlying JSON, untouched by decoding.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Look up a field by name.
    ///
    /// Declared fields come back decoded (and cached); anything else is the
    /// raw value under that key, or `Value::Null` when absent.
    pub fn attr(&self, name: &str) -> Attr<'_> {
        match self.schema.position(name) {
            Some(index) => match self.materialize(index) {
                Decoded::Null => Attr::Null,
                Decoded::One(result) => Attr::Object(result),
                Decoded::List(items) => Attr::List(items),
            },
            None => Attr::Raw(self.raw.get(name).unwrap_or(&NULL)),
        }
    }

    /// A declared single field, if present and non-null.
    pub fn object(&self, name: &str) -> Option<&ApiResult> {
        self.attr(name).as_object()
    }

    /// A declared list field. Empty when missing or not declared as a list.
    pub fn list(&self, name: &str) -> &[ApiResult] {
        self.attr(name).as_list().unwrap_or_default()
    }

    /// Raw lookup that ignores declarations.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// Raw string scalar under `key`.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    /// Whether a declared field has already been decoded.
    pub fn is_materialized(&self, name: &str) -> bool {
        self.schema
            .position(name)
            .and_then(|index| self.decoded.get(index))
            .is_some_and(|cell| cell.get().is_some())
    }

    fn materialize(&self, index: usize) -> &Decoded {
        let field = &self.schema.fields[index];
        self.decoded[index].get_or_init(|| {
            trace!(shape = self.schema.name, field = field.name, "decoding field");
            Decoded::decode(field, self.raw.get(field.name))
        })
    }
}

impl PartialEq for ApiResult {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.raw == other.raw
    }
}

impl Serialize for ApiResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl From<Value> for ApiResult {
    fn from(raw: Value) -> Self {
        Self::generic(raw)
    }
}
