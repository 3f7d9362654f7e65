//! Parsed argument values.

use std::{
  any::Any,
  collections::HashMap,
  fmt,
  ops,
  sync::Arc,
};

use crate::error::ParamError;

/// A single parsed value.
#[derive(Clone)]
pub enum Value {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  /// The materialized values of a repeated parameter.
  Array(TypedArray),
  /// A value produced by a domain-specific parameter type.
  Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
  pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
    Self::Custom(Arc::new(value))
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Self::Int(n) => Some(*n),
      _ => None,
    }
  }

  /// Integers widen to floats.
  pub fn as_float(&self) -> Option<f64> {
    match self {
      Self::Float(n) => Some(*n),
      Self::Int(n) => Some(*n as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&TypedArray> {
    match self {
      Self::Array(array) => Some(array),
      _ => None,
    }
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    match self {
      Self::Custom(value) => value.downcast_ref(),
      _ => None,
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Bool(_) => "bool",
      Self::Int(_) => "integer",
      Self::Float(_) => "number",
      Self::Str(_) => "string",
      Self::Array(_) => "array",
      Self::Custom(_) => "custom",
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
      Self::Int(n) => f.debug_tuple("Int").field(n).finish(),
      Self::Float(n) => f.debug_tuple("Float").field(n).finish(),
      Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
      Self::Array(array) => f.debug_tuple("Array").field(array).finish(),
      Self::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Bool(a), Self::Bool(b)) => a == b,
      (Self::Int(a), Self::Int(b)) => a == b,
      (Self::Float(a), Self::Float(b)) => a == b,
      (Self::Str(a), Self::Str(b)) => a == b,
      (Self::Array(a), Self::Array(b)) => a == b,
      (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Self::Int(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Self::Float(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::Str(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::Str(value)
  }
}

/// Element storage of a repeated parameter.
///
/// Which element kind a parameter uses is fixed when its schema is built, so
/// a narrow numeric parameter ends up with a narrow vector rather than a list
/// of boxed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
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
  Str,
  /// Anything else, stored as [`Value`]s.
  Value,
}

/// A homogeneous collection of repeated-parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
  Bool(Vec<bool>),
  I8(Vec<i8>),
  I16(Vec<i16>),
  I32(Vec<i32>),
  I64(Vec<i64>),
  U8(Vec<u8>),
  U16(Vec<u16>),
  U32(Vec<u32>),
  U64(Vec<u64>),
  F32(Vec<f32>),
  F64(Vec<f64>),
  Str(Vec<String>),
  Value(Vec<Value>),
}

macro_rules! typed_array_dispatch {
  ($array:expr, $vec:ident => $body:expr) => {
    match $array {
      TypedArray::Bool($vec) => $body,
      TypedArray::I8($vec) => $body,
      TypedArray::I16($vec) => $body,
      TypedArray::I32($vec) => $body,
      TypedArray::I64($vec) => $body,
      TypedArray::U8($vec) => $body,
      TypedArray::U16($vec) => $body,
      TypedArray::U32($vec) => $body,
      TypedArray::U64($vec) => $body,
      TypedArray::F32($vec) => $body,
      TypedArray::F64($vec) => $body,
      TypedArray::Str($vec) => $body,
      TypedArray::Value($vec) => $body,
    }
  };
}

impl TypedArray {
  pub fn len(&self) -> usize {
    typed_array_dispatch!(self, v => v.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn kind(&self) -> ElementKind {
    match self {
      Self::Bool(_) => ElementKind::Bool,
      Self::I8(_) => ElementKind::I8,
      Self::I16(_) => ElementKind::I16,
      Self::I32(_) => ElementKind::I32,
      Self::I64(_) => ElementKind::I64,
      Self::U8(_) => ElementKind::U8,
      Self::U16(_) => ElementKind::U16,
      Self::U32(_) => ElementKind::U32,
      Self::U64(_) => ElementKind::U64,
      Self::F32(_) => ElementKind::F32,
      Self::F64(_) => ElementKind::F64,
      Self::Str(_) => ElementKind::Str,
      Self::Value(_) => ElementKind::Value,
    }
  }

  pub fn as_strs(&self) -> Option<&[String]> {
    match self {
      Self::Str(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_i64s(&self) -> Option<&[i64]> {
    match self {
      Self::I64(v) => Some(v),
      _ => None,
    }
  }

  /// The elements widened back to [`Value`]s.
  pub fn to_values(&self) -> Vec<Value> {
    match self {
      Self::Bool(v) => v.iter().map(|b| Value::Bool(*b)).collect(),
      Self::I8(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::I16(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::I32(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::I64(v) => v.iter().map(|n| Value::Int(*n)).collect(),
      Self::U8(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::U16(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::U32(v) => v.iter().map(|n| Value::Int(i64::from(*n))).collect(),
      Self::U64(v) => {
        v.iter()
          .map(|n| i64::try_from(*n).map_or(Value::Float(*n as f64), Value::Int))
          .collect()
      },
      Self::F32(v) => v.iter().map(|n| Value::Float(f64::from(*n))).collect(),
      Self::F64(v) => v.iter().map(|n| Value::Float(*n)).collect(),
      Self::Str(v) => v.iter().cloned().map(Value::Str).collect(),
      Self::Value(v) => v.clone(),
    }
  }
}

fn expect_int(value: &Value) -> Result<i64, ParamError> {
  value
    .as_int()
    .ok_or_else(|| ParamError::invalid(format!("expected an integer, got {}", value.type_name())))
}

fn narrow<T: TryFrom<i64>>(value: &Value, kind: &str) -> Result<T, ParamError> {
  let n = expect_int(value)?;
  T::try_from(n).map_err(|_| ParamError::invalid(format!("{n} does not fit in {kind}")))
}

impl ElementKind {
  pub fn empty(self) -> TypedArray {
    match self {
      Self::Bool => TypedArray::Bool(Vec::new()),
      Self::I8 => TypedArray::I8(Vec::new()),
      Self::I16 => TypedArray::I16(Vec::new()),
      Self::I32 => TypedArray::I32(Vec::new()),
      Self::I64 => TypedArray::I64(Vec::new()),
      Self::U8 => TypedArray::U8(Vec::new()),
      Self::U16 => TypedArray::U16(Vec::new()),
      Self::U32 => TypedArray::U32(Vec::new()),
      Self::U64 => TypedArray::U64(Vec::new()),
      Self::F32 => TypedArray::F32(Vec::new()),
      Self::F64 => TypedArray::F64(Vec::new()),
      Self::Str => TypedArray::Str(Vec::new()),
      Self::Value => TypedArray::Value(Vec::new()),
    }
  }

  /// Materializes values into this kind's storage.
  ///
  /// Fails on the first value that has the wrong shape or does not fit the
  /// element width.
  #[cfg(test)]
  fn collect(self, values: Vec<Value>) -> Result<TypedArray, ParamError> {
    let mut array = self.empty();
    array.reserve(values.len());
    for value in values {
      array.push(value)?;
    }
    Ok(array)
  }
}

impl TypedArray {
  #[cfg(test)]
  fn reserve(&mut self, additional: usize) {
    typed_array_dispatch!(self, v => v.reserve(additional))
  }

  /// Writes one element, converting it to this array's element kind.
  pub fn push(&mut self, value: Value) -> Result<(), ParamError> {
    match self {
      Self::Bool(v) => {
        let b = value
          .as_bool()
          .ok_or_else(|| ParamError::invalid(format!("expected a bool, got {}", value.type_name())))?;
        v.push(b);
      },
      Self::I8(v) => v.push(narrow(&value, "i8")?),
      Self::I16(v) => v.push(narrow(&value, "i16")?),
      Self::I32(v) => v.push(narrow(&value, "i32")?),
      Self::I64(v) => v.push(expect_int(&value)?),
      Self::U8(v) => v.push(narrow(&value, "u8")?),
      Self::U16(v) => v.push(narrow(&value, "u16")?),
      Self::U32(v) => v.push(narrow(&value, "u32")?),
      Self::U64(v) => v.push(narrow(&value, "u64")?),
      Self::F32(v) => {
        let n = value
          .as_float()
          .ok_or_else(|| ParamError::invalid(format!("expected a number, got {}", value.type_name())))?;
        let narrowed = n as f32;
        if !narrowed.is_finite() && n.is_finite() {
          return Err(ParamError::invalid(format!("{n:e} does not fit in f32")));
        }
        v.push(narrowed);
      },
      Self::F64(v) => {
        let n = value
          .as_float()
          .ok_or_else(|| ParamError::invalid(format!("expected a number, got {}", value.type_name())))?;
        v.push(n);
      },
      Self::Str(v) => {
        match value {
          Value::Str(s) => v.push(s),
          other => {
            return Err(ParamError::invalid(format!(
              "expected a string, got {}",
              other.type_name()
            )));
          },
        }
      },
      Self::Value(v) => v.push(value),
    }
    Ok(())
  }
}

/// The parameter name → value map produced by a parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
  map: HashMap<String, Value>,
}

impl Values {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
    self.map.insert(name.into(), value)
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.map.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.map.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  pub fn get_str(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(Value::as_str)
  }

  pub fn get_int(&self, name: &str) -> Option<i64> {
    self.get(name).and_then(Value::as_int)
  }

  pub fn get_float(&self, name: &str) -> Option<f64> {
    self.get(name).and_then(Value::as_float)
  }

  pub fn get_bool(&self, name: &str) -> Option<bool> {
    self.get(name).and_then(Value::as_bool)
  }

  pub fn get_array(&self, name: &str) -> Option<&TypedArray> {
    self.get(name).and_then(Value::as_array)
  }

  /// Whether a boolean flag such as `-verbose` ended up `true`.
  pub fn has_flag(&self, name: &str) -> bool {
    self.get_bool(name).unwrap_or(false)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.map.iter().map(|(k, v)| (k.as_str(), v))
  }
}

// `values["name"]`
impl ops::Index<&str> for Values {
  type Output = Value;

  fn index(&self, name: &str) -> &Self::Output {
    match self.map.get(name) {
      Some(value) => value,
      None => panic!("no value for parameter '{name}'"),
    }
  }
}
