//! Commands bound to address tree nodes.

use std::{
  fmt,
  sync::Arc,
};

use crate::{
  buffer::ArgBuffer,
  config::Settings,
  error::SchemaError,
  param::Parameter,
  schema::{
    Schema,
    SchemaBuilder,
  },
  tree::{
    AddressTree,
    NodeId,
  },
  types::StringType,
  value::Values,
};

/// Whoever issues a command line.
///
/// Identity and permission storage live outside this crate; the parser only
/// asks whether a permission-gated flag may be used.
pub trait Invoker {
  fn has_permission(&self, permission: &str) -> bool;

  /// Shows a message to the invoker.
  fn reply(&mut self, message: &str);
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
  pub message: String,
}

impl fmt::Display for CommandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl std::error::Error for CommandError {}

impl CommandError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Everything a handler gets besides the invoker.
pub struct Invocation<'a, Ctx: 'static> {
  pub tree:   &'a AddressTree<Ctx>,
  /// The node whose command is running.
  pub node:   NodeId,
  pub values: Values,
  /// The tokens after the command's address, before merging.
  pub input:  ArgBuffer,
}

impl<Ctx: 'static> Invocation<'_, Ctx> {
  pub fn address(&self) -> String {
    self.tree.address(self.node)
  }
}

pub type CommandFn<Ctx> = fn(&mut Ctx, Invocation<'_, Ctx>) -> CommandResult;

/// The closed set of command variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Plain,
  /// The built-in help command. A node bound to it becomes its parent's help
  /// child and handles input that names no subcommand.
  Help,
}

pub struct Command<Ctx: 'static> {
  kind:        CommandKind,
  description: String,
  schema:      Arc<Schema>,
  fun:         CommandFn<Ctx>,
}

impl<Ctx: 'static> Clone for Command<Ctx> {
  fn clone(&self) -> Self {
    Self {
      kind:        self.kind,
      description: self.description.clone(),
      schema:      Arc::clone(&self.schema),
      fun:         self.fun,
    }
  }
}

impl<Ctx: Invoker + 'static> Command<Ctx> {
  pub fn new(description: impl Into<String>, schema: Schema, fun: CommandFn<Ctx>) -> Self {
    Self {
      kind: CommandKind::Plain,
      description: description.into(),
      schema: Arc::new(schema),
      fun,
    }
  }

  /// The built-in help command: `help [topic...]`.
  ///
  /// Replies with one usage line per command below the help node's parent,
  /// or below the node named by `topic`. Topics are merged with the rule from
  /// `settings`. Fails when `topic` starts with the configured flag prefix.
  pub fn help(settings: &Settings) -> Result<Self, SchemaError> {
    let schema = SchemaBuilder::with_settings(settings)
      .vararg(
        Parameter::positional(HELP_TOPIC, StringType::new())
          .with_description("Subcommand to show help for"),
      )?
      .build()?;

    Ok(Self {
      kind: CommandKind::Help,
      description: "Show available commands".to_string(),
      schema: Arc::new(schema),
      fun: run_help::<Ctx>,
    })
  }
}

impl<Ctx: 'static> Command<Ctx> {
  pub fn kind(&self) -> CommandKind {
    self.kind
  }

  pub fn is_help(&self) -> bool {
    self.kind == CommandKind::Help
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn execute(&self, ctx: &mut Ctx, invocation: Invocation<'_, Ctx>) -> CommandResult {
    (self.fun)(ctx, invocation)
  }
}

impl<Ctx: 'static> fmt::Debug for Command<Ctx> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Command")
      .field("kind", &self.kind)
      .field("description", &self.description)
      .field("usage", &self.schema.usage())
      .finish()
  }
}

const HELP_TOPIC: &str = "topic";

fn run_help<Ctx: Invoker + 'static>(ctx: &mut Ctx, call: Invocation<'_, Ctx>) -> CommandResult {
  let tree = call.tree;
  let mut scope = tree.parent(call.node).unwrap_or_else(|| tree.root());

  let topic = call
    .values
    .get_array(HELP_TOPIC)
    .and_then(|topic| topic.as_strs())
    .unwrap_or_default();
  for name in topic {
    scope = tree.child(scope, name).ok_or_else(|| {
      CommandError::new(format!(
        "no help for '{}'",
        tree.render_path(scope, name)
      ))
    })?;
  }

  let lines = tree.usage_lines(scope);
  if lines.is_empty() {
    ctx.reply("no commands available");
  }
  for line in lines {
    ctx.reply(&line);
  }
  Ok(())
}
