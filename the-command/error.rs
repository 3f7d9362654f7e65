//! Error types for parsing, schema construction and tree setup.
//!
//! Errors fall into two groups. [`ParseError`] (and the [`ParamError`] that
//! parameter types return) describe bad user input and are meant to be shown
//! to whoever typed the command line. [`SchemaError`] and [`TreeError`]
//! describe a schema or tree that was assembled incorrectly. They are returned
//! from the setup builders and are not expected to be caught per request.

use thiserror::Error;

use crate::command::CommandError;

/// A failure reported by a [`ParamType`](crate::types::ParamType).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
  /// The buffer ran out before the type could read its value.
  #[error("expected a value")]
  Missing,
  /// The token content was rejected.
  #[error("{message}")]
  Invalid { message: String },
  /// The type cannot synthesize a value for an omitted parameter.
  #[error("no default value available")]
  NoDefault,
}

impl ParamError {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Invalid {
      message: message.into(),
    }
  }
}

/// A user-facing failure produced while parsing a command's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("too many arguments: expected at most {capacity}, found unexpected '{token}'")]
  TooManyArguments { capacity: usize, token: String },
  #[error("missing required argument '{param}'")]
  MissingRequired { param: String },
  #[error("invalid value for '{param}' (expected {expected}): {message}")]
  InvalidArgument {
    param:    String,
    expected: String,
    message:  String,
  },
  #[error("no value given for '{param}' and no default is available")]
  NoDefault { param: String },
}

impl ParseError {
  /// Name of the parameter the failure concerns, if any.
  pub fn param(&self) -> Option<&str> {
    match self {
      Self::TooManyArguments { .. } => None,
      Self::MissingRequired { param }
      | Self::InvalidArgument { param, .. }
      | Self::NoDefault { param } => Some(param),
    }
  }

  pub(crate) fn from_param(err: ParamError, param: &str, expected: &str) -> Self {
    match err {
      ParamError::Missing => {
        Self::MissingRequired {
          param: param.to_string(),
        }
      },
      ParamError::Invalid { message } => {
        Self::InvalidArgument {
          param: param.to_string(),
          expected: expected.to_string(),
          message,
        }
      },
      ParamError::NoDefault => {
        Self::NoDefault {
          param: param.to_string(),
        }
      },
    }
  }
}

/// A schema was declared incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("parameter names must not be empty")]
  EmptyName,
  #[error("parameter '{name}' is declared more than once")]
  DuplicateParameter { name: String },
  #[error("flag '{name}' must start with the flag prefix '{prefix}'")]
  MissingFlagPrefix { name: String, prefix: char },
  #[error("positional parameter '{name}' must not start with the flag prefix '{prefix}'")]
  PositionalWithFlagPrefix { name: String, prefix: char },
  #[error("positional parameter '{name}' reads no tokens")]
  ZeroArityPositional { name: String },
  #[error("repeated parameter '{vararg}' must be the last positional, but '{next}' follows it")]
  VarargNotLast { vararg: String, next: String },
  #[error("flag '{name}' cannot be the repeated parameter")]
  VarargFlag { name: String },
  #[error("a schema may declare only one repeated parameter, '{existing}' is already declared")]
  SecondVararg { existing: String },
  #[error("required count {required} exceeds the {positionals} declared positional parameters")]
  RequiredOutOfRange { required: usize, positionals: usize },
}

/// The address tree was assembled incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
  #[error("a node needs at least one name")]
  NoNames,
  #[error("node '{name}' is not part of this tree")]
  UnknownNode { name: String },
  #[error("node '{name}' is already attached to a parent")]
  AlreadyAttached { name: String },
  #[error("attaching '{name}' would create a cycle")]
  Cycle { name: String },
  #[error("the names of node '{name}' are frozen once it is attached")]
  NamesFrozen { name: String },
}

/// Settings could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse settings: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("invalid setting '{key}': {reason}")]
  Invalid { key: &'static str, reason: String },
}

/// Everything that can go wrong while dispatching a command line.
#[derive(Debug, Error)]
pub enum DispatchError {
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error(transparent)]
  Command(#[from] CommandError),
  #[error("{}", format_not_found(.address, .token.as_deref()))]
  NotFound {
    address: String,
    token:   Option<String>,
  },
}

fn format_not_found(address: &str, token: Option<&str>) -> String {
  match (address.is_empty(), token) {
    (true, Some(token)) => format!("unknown command '{token}'"),
    (true, None) => "no command given".to_string(),
    (false, Some(token)) => format!("unknown subcommand '{token}' for '{address}'"),
    (false, None) => format!("'{address}' needs a subcommand"),
  }
}
