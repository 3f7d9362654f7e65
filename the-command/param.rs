//! Parameter declarations.

use std::{
  any::Any,
  fmt,
  sync::Arc,
};

use crate::types::ParamType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
  /// Filled by position, in declaration order.
  Positional,
  /// Selected by a token naming it, e.g. `-verbose`.
  Flag,
}

/// One declared parameter of a command.
///
/// Flag names include the schema's flag prefix (`-verbose`, not `verbose`) so
/// that a token can be looked up directly. A flag declared with a type that
/// has a [flag variant](ParamType::flag_variant) uses that variant, which
/// reads no tokens and yields `true` when the flag is present.
#[derive(Clone)]
pub struct Parameter {
  name:        String,
  description: String,
  ty:          Arc<dyn ParamType>,
  config:      Option<Arc<dyn Any + Send + Sync>>,
  kind:        ParamKind,
  permission:  Option<String>,
}

impl Parameter {
  pub fn new(name: impl Into<String>, kind: ParamKind, ty: Arc<dyn ParamType>) -> Self {
    let ty = match kind {
      ParamKind::Flag => ty.flag_variant().unwrap_or(ty),
      ParamKind::Positional => ty,
    };

    Self {
      name: name.into(),
      description: String::new(),
      ty,
      config: None,
      kind,
      permission: None,
    }
  }

  pub fn positional(name: impl Into<String>, ty: impl ParamType + 'static) -> Self {
    Self::new(name, ParamKind::Positional, Arc::new(ty))
  }

  pub fn flag(name: impl Into<String>, ty: impl ParamType + 'static) -> Self {
    Self::new(name, ParamKind::Flag, Arc::new(ty))
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Attaches a configuration object the parameter's type can read back with
  /// [`Self::config`], for example a [`NumberRange`](crate::types::NumberRange).
  pub fn with_config<T: Any + Send + Sync>(mut self, config: T) -> Self {
    self.config = Some(Arc::new(config));
    self
  }

  /// Requires the caller to hold `permission` before the flag can be used.
  ///
  /// Without the permission a token naming the flag is read as an ordinary
  /// positional argument.
  pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
    debug_assert!(
      self.kind == ParamKind::Flag,
      "only flags can be gated by a permission"
    );
    self.permission = Some(permission.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn ty(&self) -> &dyn ParamType {
    self.ty.as_ref()
  }

  pub fn config<T: Any>(&self) -> Option<&T> {
    self.config.as_deref().and_then(|config| config.downcast_ref())
  }

  pub fn kind(&self) -> ParamKind {
    self.kind
  }

  pub fn is_flag(&self) -> bool {
    self.kind == ParamKind::Flag
  }

  pub fn permission(&self) -> Option<&str> {
    self.permission.as_deref()
  }
}

impl fmt::Debug for Parameter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Parameter")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("type", &self.ty.name())
      .field("permission", &self.permission)
      .finish()
  }
}
