//! The parameter type abstraction and a handful of primitive types.
//!
//! A [`ParamType`] knows how to read its value out of an [`ArgBuffer`], what
//! to use when the parameter was left out, and what to suggest while the user
//! is still typing. Domain-specific types (looking up a user, a file, ...)
//! implement the same trait outside this crate and usually return
//! [`Value::Custom`].

use std::{
  fmt,
  sync::Arc,
};

use crate::{
  buffer::ArgBuffer,
  command::Invoker,
  error::ParamError,
  param::Parameter,
  value::{
    ElementKind,
    Value,
  },
};

/// How many tokens a type reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
  Exact(usize),
  /// Everything left in the buffer.
  Rest,
}

/// What a type gets to see besides the buffer.
#[derive(Clone, Copy)]
pub struct TypeCx<'a> {
  /// The parameter being parsed, completed or defaulted.
  pub param:   &'a Parameter,
  /// Whoever issued the command line.
  pub invoker: &'a dyn Invoker,
}

pub trait ParamType: fmt::Debug + Send + Sync {
  /// Short description of the expected input, e.g. `integer`. Shown in
  /// errors and usage strings.
  fn name(&self) -> &str;

  /// Reads a value, advancing the buffer past the tokens it used.
  fn parse(&self, buffer: &mut ArgBuffer, cx: &TypeCx<'_>) -> Result<Value, ParamError>;

  /// The value of a parameter the input never touched.
  ///
  /// Types without a sensible default fail with [`ParamError::NoDefault`],
  /// which makes the parameter effectively required.
  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    Err(ParamError::NoDefault)
  }

  /// Suggestions for the input starting at the buffer's cursor, in display
  /// order. The buffer is a throwaway copy.
  fn complete(&self, _buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Vec<String> {
    Vec::new()
  }

  fn arity(&self) -> Arity {
    Arity::Exact(1)
  }

  /// A zero-token version of this type used when it is declared as a flag.
  fn flag_variant(&self) -> Option<Arc<dyn ParamType>> {
    None
  }

  /// Storage used when this type backs a repeated parameter.
  fn element_kind(&self) -> ElementKind {
    ElementKind::Value
  }
}

/// Inclusive numeric bounds, attached to a parameter with
/// [`Parameter::with_config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
  pub min: f64,
  pub max: f64,
}

impl NumberRange {
  pub fn new(min: f64, max: f64) -> Self {
    debug_assert!(min <= max, "empty number range {min}..={max}");
    Self { min, max }
  }

  pub fn contains(&self, n: f64) -> bool {
    self.min <= n && n <= self.max
  }

  /// Like [`Self::contains`] but exact for integers beyond `f64` precision.
  pub fn contains_int(&self, n: i64) -> bool {
    let n = i128::from(n);
    self.min.ceil() as i128 <= n && n <= self.max.floor() as i128
  }

  fn check(&self, n: f64) -> Result<(), ParamError> {
    if self.contains(n) {
      Ok(())
    } else {
      Err(self.outside(n))
    }
  }

  fn check_int(&self, n: i64) -> Result<(), ParamError> {
    if self.contains_int(n) {
      Ok(())
    } else {
      Err(self.outside(n))
    }
  }

  fn outside(&self, n: impl fmt::Display) -> ParamError {
    ParamError::invalid(format!("{n} is outside of {}..={}", self.min, self.max))
  }
}

// Ranges at most this wide have every value suggested.
const ENUMERABLE_RANGE: f64 = 16.0;

/// The token being completed, or `""` at the end of input.
fn partial(buffer: &mut ArgBuffer) -> String {
  buffer.next().unwrap_or_default().to_string()
}

fn filter_prefix<'a>(
  candidates: impl IntoIterator<Item = &'a str>,
  partial: &str,
) -> Vec<String> {
  let partial = partial.to_lowercase();
  candidates
    .into_iter()
    .filter(|candidate| candidate.to_lowercase().starts_with(&partial))
    .map(str::to_string)
    .collect()
}

/// Zero-token flag type. Present means `true`, absent `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceFlag;

impl ParamType for PresenceFlag {
  fn name(&self) -> &str {
    "flag"
  }

  fn parse(&self, _buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    Ok(Value::Bool(true))
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    Ok(Value::Bool(false))
  }

  fn arity(&self) -> Arity {
    Arity::Exact(0)
  }

  fn element_kind(&self) -> ElementKind {
    ElementKind::Bool
  }
}

/// A single token, taken verbatim.
#[derive(Debug, Clone, Default)]
pub struct StringType {
  suggestions: Vec<String>,
  default:     Option<String>,
}

impl StringType {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.suggestions = suggestions.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_default(mut self, default: impl Into<String>) -> Self {
    self.default = Some(default.into());
    self
  }
}

impl ParamType for StringType {
  fn name(&self) -> &str {
    "text"
  }

  fn parse(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    Ok(Value::Str(buffer.require_next()?.to_string()))
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    self
      .default
      .clone()
      .map(Value::Str)
      .ok_or(ParamError::NoDefault)
  }

  fn complete(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Vec<String> {
    let partial = partial(buffer);
    filter_prefix(self.suggestions.iter().map(String::as_str), &partial)
  }

  fn element_kind(&self) -> ElementKind {
    ElementKind::Str
  }
}

/// Every remaining token joined by single spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyStringType;

impl ParamType for GreedyStringType {
  fn name(&self) -> &str {
    "text..."
  }

  fn parse(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    let rest = buffer.rest();
    if rest.is_empty() {
      return Err(ParamError::Missing);
    }
    Ok(Value::Str(rest.join(" ")))
  }

  fn arity(&self) -> Arity {
    Arity::Rest
  }

  fn element_kind(&self) -> ElementKind {
    ElementKind::Str
  }
}

/// A whole number. Honors a [`NumberRange`] config.
#[derive(Debug, Clone)]
pub struct IntegerType {
  default: Option<i64>,
  element: ElementKind,
}

impl Default for IntegerType {
  fn default() -> Self {
    Self {
      default: None,
      element: ElementKind::I64,
    }
  }
}

impl IntegerType {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_default(mut self, default: i64) -> Self {
    self.default = Some(default);
    self
  }

  /// Stores repeated values of this type in a narrower integer vector.
  pub fn stored_as(mut self, element: ElementKind) -> Self {
    debug_assert!(
      matches!(
        element,
        ElementKind::I8
          | ElementKind::I16
          | ElementKind::I32
          | ElementKind::I64
          | ElementKind::U8
          | ElementKind::U16
          | ElementKind::U32
          | ElementKind::U64
      ),
      "{element:?} is not an integer element kind"
    );
    self.element = element;
    self
  }
}

impl ParamType for IntegerType {
  fn name(&self) -> &str {
    "integer"
  }

  fn parse(&self, buffer: &mut ArgBuffer, cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    let token = buffer.require_next()?;
    let n: i64 = token
      .parse()
      .map_err(|_| ParamError::invalid(format!("'{token}' is not a whole number")))?;
    if let Some(range) = cx.param.config::<NumberRange>() {
      range.check_int(n)?;
    }
    Ok(Value::Int(n))
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    self.default.map(Value::Int).ok_or(ParamError::NoDefault)
  }

  fn complete(&self, buffer: &mut ArgBuffer, cx: &TypeCx<'_>) -> Vec<String> {
    let partial = partial(buffer);
    let candidates: Vec<String> = match cx.param.config::<NumberRange>() {
      Some(range) if range.max - range.min <= ENUMERABLE_RANGE => {
        let (min, max) = (range.min.ceil() as i64, range.max.floor() as i64);
        (min..=max).map(|n| n.to_string()).collect()
      },
      _ => self.default.iter().map(i64::to_string).collect(),
    };
    filter_prefix(candidates.iter().map(String::as_str), &partial)
  }

  fn element_kind(&self) -> ElementKind {
    self.element
  }
}

/// A decimal number. Honors a [`NumberRange`] config.
#[derive(Debug, Clone)]
pub struct FloatType {
  default: Option<f64>,
  element: ElementKind,
}

impl Default for FloatType {
  fn default() -> Self {
    Self {
      default: None,
      element: ElementKind::F64,
    }
  }
}

impl FloatType {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_default(mut self, default: f64) -> Self {
    self.default = Some(default);
    self
  }

  /// Stores repeated values of this type as `f32`.
  pub fn single_precision(mut self) -> Self {
    self.element = ElementKind::F32;
    self
  }
}

impl ParamType for FloatType {
  fn name(&self) -> &str {
    "number"
  }

  fn parse(&self, buffer: &mut ArgBuffer, cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    let token = buffer.require_next()?;
    let n: f64 = token
      .parse()
      .ok()
      .filter(|n: &f64| n.is_finite())
      .ok_or_else(|| ParamError::invalid(format!("'{token}' is not a number")))?;
    if let Some(range) = cx.param.config::<NumberRange>() {
      range.check(n)?;
    }
    Ok(Value::Float(n))
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    self.default.map(Value::Float).ok_or(ParamError::NoDefault)
  }

  fn element_kind(&self) -> ElementKind {
    self.element
  }
}

const TRUE_WORDS: [&str; 3] = ["true", "yes", "on"];
const FALSE_WORDS: [&str; 3] = ["false", "no", "off"];

/// `true`/`false` (also `yes`/`no`, `on`/`off`). Declared as a flag it becomes
/// a [`PresenceFlag`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl ParamType for BoolType {
  fn name(&self) -> &str {
    "true|false"
  }

  fn parse(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    let token = buffer.require_next()?;
    let lower = token.to_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
      Ok(Value::Bool(true))
    } else if FALSE_WORDS.contains(&lower.as_str()) {
      Ok(Value::Bool(false))
    } else {
      Err(ParamError::invalid(format!("'{token}' is not true or false")))
    }
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    Ok(Value::Bool(false))
  }

  fn complete(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Vec<String> {
    filter_prefix(["true", "false"], &partial(buffer))
  }

  fn flag_variant(&self) -> Option<Arc<dyn ParamType>> {
    Some(Arc::new(PresenceFlag))
  }

  fn element_kind(&self) -> ElementKind {
    ElementKind::Bool
  }
}

/// One of a fixed set of words, matched case-insensitively. The value is the
/// declared spelling.
#[derive(Debug, Clone)]
pub struct ChoiceType {
  choices: Vec<String>,
  hint:    String,
  default: Option<String>,
}

impl ChoiceType {
  pub fn new<I, S>(choices: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
    let hint = choices.join("|");
    Self {
      choices,
      hint,
      default: None,
    }
  }

  pub fn with_default(mut self, default: impl Into<String>) -> Self {
    let default = default.into();
    debug_assert!(
      self.choices.contains(&default),
      "default '{default}' is not one of the choices"
    );
    self.default = Some(default);
    self
  }

  pub fn choices(&self) -> &[String] {
    &self.choices
  }
}

impl ParamType for ChoiceType {
  fn name(&self) -> &str {
    &self.hint
  }

  fn parse(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    let token = buffer.require_next()?;
    self
      .choices
      .iter()
      .find(|choice| choice.eq_ignore_ascii_case(token))
      .map(|choice| Value::Str(choice.clone()))
      .ok_or_else(|| {
        ParamError::invalid(format!(
          "'{token}' is not one of {}",
          self.choices.join(", ")
        ))
      })
  }

  fn default_value(&self, _cx: &TypeCx<'_>) -> Result<Value, ParamError> {
    self
      .default
      .clone()
      .map(Value::Str)
      .ok_or(ParamError::NoDefault)
  }

  fn complete(&self, buffer: &mut ArgBuffer, _cx: &TypeCx<'_>) -> Vec<String> {
    filter_prefix(self.choices.iter().map(String::as_str), &partial(buffer))
  }

  fn element_kind(&self) -> ElementKind {
    ElementKind::Str
  }
}
