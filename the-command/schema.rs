//! Parameter schemas.
//!
//! A [`Schema`] is declared once per command through a [`SchemaBuilder`] and
//! is immutable afterwards, so any number of parses may read it at the same
//! time.
//!
//! ```ignore
//! use the_command::{
//!   param::Parameter,
//!   schema::{Required, SchemaBuilder},
//!   types::{BoolType, IntegerType, StringType},
//! };
//!
//! let schema = SchemaBuilder::new()
//!   .param(Parameter::positional("name", StringType::new()))?
//!   .param(Parameter::positional("count", IntegerType::new().with_default(1)))?
//!   .param(Parameter::flag("-verbose", BoolType))?
//!   .required(Required::Count(1))
//!   .build()?;
//!
//! assert_eq!(schema.usage(), "<name> [count] [-verbose]");
//! ```

use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
  buffer::{
    ArgBuffer,
    MergeRule,
  },
  config::Settings,
  error::SchemaError,
  param::{
    ParamKind,
    Parameter,
  },
  types::Arity,
  value::ElementKind,
};

/// How many positional parameters must receive input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Required {
  /// Every positional parameter except the repeated one.
  #[default]
  AllPositional,
  /// The first `n` positional parameters. The rest fall back to defaults.
  Count(usize),
  /// Every positional parameter, and the repeated one needs at least one
  /// value.
  Unlimited,
}

#[derive(Debug, Clone)]
pub struct SchemaBuilder {
  params:      IndexMap<String, Parameter>,
  vararg:      Option<usize>,
  required:    Required,
  flag_prefix: char,
  merge:       Option<MergeRule>,
}

impl Default for SchemaBuilder {
  fn default() -> Self {
    Self::with_settings(&Settings::default())
  }
}

impl SchemaBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// A builder using the flag prefix and merge rule from `settings`.
  pub fn with_settings(settings: &Settings) -> Self {
    Self {
      params:      IndexMap::new(),
      vararg:      None,
      required:    Required::default(),
      flag_prefix: settings.flag_prefix,
      merge:       settings.merge_rule(),
    }
  }

  /// Declares a parameter.
  ///
  /// Fails if the name is taken, if a flag lacks the flag prefix, or if a
  /// positional parameter would follow the repeated one.
  pub fn param(mut self, param: Parameter) -> Result<Self, SchemaError> {
    self.push(param)?;
    Ok(self)
  }

  /// Declares the repeated parameter, which absorbs every positional token
  /// left over once the other positional parameters are filled. It must be
  /// the last positional parameter.
  pub fn vararg(mut self, param: Parameter) -> Result<Self, SchemaError> {
    if let Some(existing) = self.vararg {
      return Err(SchemaError::SecondVararg {
        existing: self.name_at(existing).to_string(),
      });
    }
    if param.is_flag() {
      return Err(SchemaError::VarargFlag {
        name: param.name().to_string(),
      });
    }
    let index = self.push(param)?;
    self.vararg = Some(index);
    Ok(self)
  }

  pub fn required(mut self, required: Required) -> Self {
    self.required = required;
    self
  }

  /// Replaces the token-merging rule. `None` disables merging.
  pub fn merge(mut self, merge: Option<MergeRule>) -> Self {
    self.merge = merge;
    self
  }

  fn name_at(&self, index: usize) -> &str {
    self
      .params
      .get_index(index)
      .map_or("", |(name, _)| name.as_str())
  }

  fn push(&mut self, param: Parameter) -> Result<usize, SchemaError> {
    let name = param.name();
    if name.is_empty() {
      return Err(SchemaError::EmptyName);
    }
    if self.params.contains_key(name) {
      return Err(SchemaError::DuplicateParameter {
        name: name.to_string(),
      });
    }

    match param.kind() {
      ParamKind::Flag => {
        if !name.starts_with(self.flag_prefix) {
          return Err(SchemaError::MissingFlagPrefix {
            name:   name.to_string(),
            prefix: self.flag_prefix,
          });
        }
      },
      ParamKind::Positional => {
        if name.starts_with(self.flag_prefix) {
          return Err(SchemaError::PositionalWithFlagPrefix {
            name:   name.to_string(),
            prefix: self.flag_prefix,
          });
        }
        if param.ty().arity() == Arity::Exact(0) {
          return Err(SchemaError::ZeroArityPositional {
            name: name.to_string(),
          });
        }
        if let Some(vararg) = self.vararg {
          return Err(SchemaError::VarargNotLast {
            vararg: self.name_at(vararg).to_string(),
            next:   name.to_string(),
          });
        }
      },
    }

    let (index, _) = self.params.insert_full(name.to_string(), param);
    Ok(index)
  }

  /// Derives the ordered views and freezes the schema.
  pub fn build(self) -> Result<Schema, SchemaError> {
    let positionals: Vec<usize> = self
      .params
      .values()
      .enumerate()
      .filter(|(_, param)| !param.is_flag())
      .map(|(index, _)| index)
      .collect();

    let fixed = positionals.len() - usize::from(self.vararg.is_some());
    let required = match self.required {
      Required::AllPositional => fixed,
      Required::Count(n) if n <= positionals.len() => n,
      Required::Count(n) => {
        return Err(SchemaError::RequiredOutOfRange {
          required:    n,
          positionals: positionals.len(),
        });
      },
      Required::Unlimited => positionals.len(),
    };

    let element_kind = self
      .vararg
      .and_then(|index| self.params.get_index(index))
      .map_or(ElementKind::Value, |(_, param)| param.ty().element_kind());

    Ok(Schema {
      params: self.params,
      positionals,
      vararg: self.vararg,
      element_kind,
      required,
      flag_prefix: self.flag_prefix,
      merge: self.merge,
    })
  }
}

/// An immutable, ordered parameter declaration.
#[derive(Debug, Clone)]
pub struct Schema {
  params:       IndexMap<String, Parameter>,
  /// Indices into `params`, in declaration order.
  positionals:  Vec<usize>,
  vararg:       Option<usize>,
  element_kind: ElementKind,
  required:     usize,
  flag_prefix:  char,
  merge:        Option<MergeRule>,
}

impl Schema {
  /// A schema without parameters.
  pub fn empty() -> Self {
    Self {
      params:       IndexMap::new(),
      positionals:  Vec::new(),
      vararg:       None,
      element_kind: ElementKind::Value,
      required:     0,
      flag_prefix:  Settings::default().flag_prefix,
      merge:        None,
    }
  }

  pub fn get(&self, name: &str) -> Option<&Parameter> {
    self.params.get(name)
  }

  pub fn len(&self) -> usize {
    self.params.len()
  }

  pub fn is_empty(&self) -> bool {
    self.params.is_empty()
  }

  pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
    self.params.get_index_of(name)
  }

  pub(crate) fn at(&self, index: usize) -> &Parameter {
    &self.params[index]
  }

  /// All parameters in declaration order.
  pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
    self.params.values()
  }

  /// Positional parameters in declaration order, the repeated one last.
  pub fn positionals(&self) -> impl Iterator<Item = &Parameter> {
    self.positionals.iter().map(|&index| self.at(index))
  }

  pub(crate) fn positional_index(&self, nth: usize) -> Option<usize> {
    self.positionals.get(nth).copied()
  }

  /// Number of positional parameters, the repeated one included.
  pub fn positional_count(&self) -> usize {
    self.positionals.len()
  }

  /// Number of positional parameters that are filled one token each, i.e.
  /// all of them except the repeated one.
  pub fn fixed_count(&self) -> usize {
    self.positionals.len() - usize::from(self.vararg.is_some())
  }

  pub fn flags(&self) -> impl Iterator<Item = &Parameter> {
    self.params.values().filter(|param| param.is_flag())
  }

  /// The flag named by `token`, prefix included.
  pub fn flag(&self, token: &str) -> Option<&Parameter> {
    self.get(token).filter(|param| param.is_flag())
  }

  pub fn vararg(&self) -> Option<&Parameter> {
    self.vararg.map(|index| self.at(index))
  }

  pub(crate) fn vararg_index(&self) -> Option<usize> {
    self.vararg
  }

  /// Storage kind of the repeated parameter's values.
  pub fn vararg_element(&self) -> ElementKind {
    self.element_kind
  }

  /// How many positional parameters must receive input.
  pub fn required_count(&self) -> usize {
    self.required
  }

  pub fn flag_prefix(&self) -> char {
    self.flag_prefix
  }

  pub fn merge_rule(&self) -> Option<MergeRule> {
    self.merge
  }

  /// Derives the buffer the parser reads from. The input is left untouched.
  pub fn preprocess(&self, buffer: &ArgBuffer) -> ArgBuffer {
    match self.merge {
      Some(rule) => buffer.merge(rule),
      None => buffer.snapshot_at(0),
    }
  }

  /// A one-line synopsis, e.g. `<name> [count] [items...] [-verbose]`.
  pub fn usage(&self) -> String {
    let mut usage = String::new();
    let mut push = |part: String| {
      if !usage.is_empty() {
        usage.push(' ');
      }
      usage.push_str(&part);
    };

    for (nth, &index) in self.positionals.iter().enumerate() {
      let param = self.at(index);
      let ellipsis = if Some(index) == self.vararg { "..." } else { "" };
      if nth < self.required {
        push(format!("<{}{ellipsis}>", param.name()));
      } else {
        push(format!("[{}{ellipsis}]", param.name()));
      }
    }

    for flag in self.flags() {
      let mut part = format!("[{}", flag.name());
      if flag.ty().arity() != Arity::Exact(0) {
        let _ = write!(part, " <{}>", flag.ty().name());
      }
      part.push(']');
      push(part);
    }

    usage
  }
}
