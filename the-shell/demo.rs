//! The command tree the shell ships with.

use std::collections::{
  BTreeMap,
  HashSet,
};

use eyre::Result;
use the_command::{
  AddressTree,
  Command,
  CommandError,
  CommandResult,
  Invocation,
  Invoker,
  NodeBuilder,
  Parameter,
  Required,
  SchemaBuilder,
  Settings,
  types::{
    BoolType,
    ChoiceType,
    FloatType,
    GreedyStringType,
    IntegerType,
    NumberRange,
    StringType,
  },
};

/// Permission needed for `config set -force`.
pub const CONFIG_WRITE: &str = "config.write";

const CONFIG_KEYS: [&str; 3] = ["name", "theme", "tab-width"];

/// The invoker behind the shell. Replies go to stdout.
#[derive(Debug, Default)]
pub struct Session {
  grants: HashSet<String>,
  values: BTreeMap<String, String>,
}

impl Session {
  pub fn new(grants: impl IntoIterator<Item = String>) -> Self {
    Self {
      grants: grants.into_iter().collect(),
      values: BTreeMap::new(),
    }
  }
}

impl Invoker for Session {
  fn has_permission(&self, permission: &str) -> bool {
    self.grants.contains(permission)
  }

  fn reply(&mut self, message: &str) {
    println!("{message}");
  }
}

pub fn build_tree(settings: &Settings) -> Result<AddressTree<Session>> {
  let schema = || SchemaBuilder::with_settings(settings);
  let prefix = settings.flag_prefix;

  let mut tree = AddressTree::with_settings(settings.clone());
  let root = tree.root();

  let greet_schema = schema()
    .param(
      Parameter::positional("name", StringType::new().with_suggestions(["world", "there"]))
        .with_description("Who to greet"),
    )?
    .param(
      Parameter::positional("count", IntegerType::new().with_default(1))
        .with_config(NumberRange::new(1.0, 10.0))
        .with_description("How many times"),
    )?
    .param(Parameter::flag(format!("{prefix}loud"), BoolType))?
    .required(Required::Count(1))
    .build()?;
  tree.add_child(
    root,
    NodeBuilder::new("greet")
      .alias("hi")
      .command(Command::new("Greet someone", greet_schema, greet)),
  )?;

  let sum_schema = schema()
    .vararg(Parameter::positional("numbers", FloatType::new()))?
    .required(Required::Unlimited)
    .build()?;
  tree.add_child(
    root,
    NodeBuilder::new("sum")
      .alias("add")
      .command(Command::new("Add numbers", sum_schema, sum)),
  )?;

  let echo_schema = schema()
    .param(Parameter::positional("text", GreedyStringType))?
    .build()?;
  tree.add_child(
    root,
    NodeBuilder::new("echo").command(Command::new("Print text as typed", echo_schema, echo)),
  )?;

  let config = tree.add_child(root, NodeBuilder::new("config").alias("cfg"))?;
  let get_schema = schema()
    .param(Parameter::positional("key", ChoiceType::new(CONFIG_KEYS)))?
    .build()?;
  tree.add_child(
    config,
    NodeBuilder::new("get").command(Command::new("Show a setting", get_schema, config_get)),
  )?;
  let set_schema = schema()
    .param(Parameter::positional("key", ChoiceType::new(CONFIG_KEYS)))?
    .param(Parameter::positional("value", StringType::new()))?
    .param(
      Parameter::flag(format!("{prefix}force"), BoolType)
        .with_permission(CONFIG_WRITE)
        .with_description("Overwrite a value that is already set"),
    )?
    .build()?;
  tree.add_child(
    config,
    NodeBuilder::new("set")
      .alias("put")
      .command(Command::new("Change a setting", set_schema, config_set)),
  )?;
  tree.add_child(config, NodeBuilder::new("help").command(Command::help(settings)?))?;

  tree.add_child(root, NodeBuilder::new("help").alias("h").command(Command::help(settings)?))?;

  Ok(tree)
}

fn flag_name(call: &Invocation<'_, Session>, name: &str) -> String {
  format!("{}{name}", call.tree.settings().flag_prefix)
}

fn greet(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
  let name = call.values.get_str("name").unwrap_or_default();
  let count = call.values.get_int("count").unwrap_or(1);
  let mut line = format!("hello {name}");
  if call.values.has_flag(&flag_name(&call, "loud")) {
    line = line.to_uppercase();
  }
  for _ in 0..count {
    session.reply(&line);
  }
  Ok(())
}

fn sum(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
  let total: f64 = call
    .values
    .get_array("numbers")
    .map(|numbers| numbers.to_values())
    .unwrap_or_default()
    .iter()
    .filter_map(|value| value.as_float())
    .sum();
  session.reply(&total.to_string());
  Ok(())
}

fn echo(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
  session.reply(call.values.get_str("text").unwrap_or_default());
  Ok(())
}

fn config_get(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
  let key = call.values.get_str("key").unwrap_or_default();
  let message = match session.values.get(key) {
    Some(value) => format!("{key} = {value}"),
    None => format!("{key} is not set"),
  };
  session.reply(&message);
  Ok(())
}

fn config_set(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
  let key = call.values.get_str("key").unwrap_or_default();
  let value = call.values.get_str("value").unwrap_or_default();
  let force = flag_name(&call, "force");

  if session.values.contains_key(key) && !call.values.has_flag(&force) {
    return Err(CommandError::new(format!(
      "'{key}' is already set, use {force} to overwrite it"
    )));
  }
  session.values.insert(key.to_string(), value.to_string());
  log::debug!("set {key} via '{}'", call.input.raw());
  Ok(())
}
