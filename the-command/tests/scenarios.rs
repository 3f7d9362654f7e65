use std::collections::HashSet;

use the_command::{
  AddressTree,
  ArgBuffer,
  Command,
  CommandResult,
  DispatchError,
  ExecutionContext,
  Invocation,
  Invoker,
  NodeBuilder,
  ParseError,
  Parameter,
  Required,
  Schema,
  SchemaBuilder,
  Settings,
  Values,
  error::{
    SchemaError,
    TreeError,
  },
  types::{
    BoolType,
    IntegerType,
    StringType,
  },
  value::TypedArray,
};

#[derive(Default)]
struct User {
  permissions: HashSet<&'static str>,
  log:         Vec<String>,
}

impl Invoker for User {
  fn has_permission(&self, permission: &str) -> bool {
    self.permissions.contains(permission)
  }

  fn reply(&mut self, message: &str) {
    self.log.push(message.to_string());
  }
}

#[track_caller]
fn parse(schema: &Schema, user: &User, tokens: &[&str]) -> Result<Values, ParseError> {
  let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
  let raw = tokens.join(" ");
  let mut cx = ExecutionContext::new(schema, ArgBuffer::new(tokens, raw), user);
  cx.parse().map(|()| cx.into_values())
}

fn greet_schema() -> Schema {
  SchemaBuilder::new()
    .param(Parameter::positional("name", StringType::new()))
    .and_then(|b| b.param(Parameter::positional("count", IntegerType::new().with_default(1))))
    .and_then(|b| b.param(Parameter::flag("-verbose", BoolType)))
    .map(|b| b.required(Required::Count(1)))
    .and_then(SchemaBuilder::build)
    .unwrap()
}

#[test]
fn optional_positional_and_presence_flag() {
  let schema = greet_schema();
  let user = User::default();

  let values = parse(&schema, &user, &["bob", "-verbose", "5"]).unwrap();
  assert_eq!(values.get_str("name"), Some("bob"));
  assert_eq!(values.get_bool("-verbose"), Some(true));
  assert_eq!(values.get_int("count"), Some(5));

  let values = parse(&schema, &user, &["bob"]).unwrap();
  assert_eq!(values.get_str("name"), Some("bob"));
  assert_eq!(values.get_int("count"), Some(1));
  assert_eq!(values.get_bool("-verbose"), Some(false));
}

#[test]
fn extra_positional_without_vararg() {
  let schema = greet_schema();
  let err = parse(&schema, &User::default(), &["bob", "5", "extra"]).unwrap_err();
  assert_eq!(err, ParseError::TooManyArguments {
    capacity: 2,
    token:    "extra".into(),
  });
}

#[test]
fn trailing_vararg() {
  let schema = SchemaBuilder::new()
    .param(Parameter::positional("target", StringType::new()))
    .and_then(|b| b.vararg(Parameter::positional("items", StringType::new())))
    .and_then(SchemaBuilder::build)
    .unwrap();
  let values = parse(&schema, &User::default(), &["alice", "a", "b", "c"]).unwrap();
  assert_eq!(values.get_str("target"), Some("alice"));
  assert_eq!(
    values.get_array("items"),
    Some(&TypedArray::Str(vec!["a".into(), "b".into(), "c".into()]))
  );
}

#[test]
fn flag_without_permission_is_positional() {
  let schema = SchemaBuilder::new()
    .param(Parameter::positional("target", StringType::new()))
    .and_then(|b| b.param(Parameter::flag("-silent", BoolType).with_permission("mod")))
    .map(|b| b.required(Required::Count(0)))
    .and_then(SchemaBuilder::build)
    .unwrap();

  let values = parse(&schema, &User::default(), &["-silent"]).unwrap();
  assert_eq!(values.get_str("target"), Some("-silent"));
  assert!(!values.has_flag("-silent"));

  let moderator = User {
    permissions: HashSet::from(["mod"]),
    ..User::default()
  };
  let err = parse(&schema, &moderator, &["-silent"]).unwrap_err();
  assert_eq!(err, ParseError::NoDefault {
    param: "target".into(),
  });
}

#[test]
fn schema_mistakes_fail_at_build_time() {
  let err = SchemaBuilder::new()
    .param(Parameter::positional("a", StringType::new()))
    .and_then(|b| b.param(Parameter::positional("a", StringType::new())))
    .unwrap_err();
  assert_eq!(err, SchemaError::DuplicateParameter { name: "a".into() });

  let err = SchemaBuilder::new()
    .vararg(Parameter::positional("rest", StringType::new()))
    .and_then(|b| b.param(Parameter::positional("after", StringType::new())))
    .unwrap_err();
  assert_eq!(err, SchemaError::VarargNotLast {
    vararg: "rest".into(),
    next:   "after".into(),
  });

  let err = SchemaBuilder::with_settings(&Settings {
    flag_prefix: '/',
    ..Settings::default()
  })
  .param(Parameter::flag("-v", BoolType))
  .unwrap_err();
  assert_eq!(err, SchemaError::MissingFlagPrefix {
    name:   "-v".into(),
    prefix: '/',
  });
}

fn record(user: &mut User, call: Invocation<'_, User>) -> CommandResult {
  user.log.push(format!("{} {:?}", call.address(), call.values.get_str("value")));
  Ok(())
}

#[test]
fn tree_resolution_and_addresses() {
  let mut tree = AddressTree::<User>::new();
  let root = tree.root();
  let value = SchemaBuilder::new()
    .param(Parameter::positional("value", StringType::new()))
    .and_then(SchemaBuilder::build)
    .unwrap();

  let outer = tree
    .add_child(root, NodeBuilder::new("admin").aliases(["a", "adm"]))
    .unwrap();
  let inner = tree
    .add_child(
      outer,
      NodeBuilder::new("motd")
        .alias("m")
        .command(Command::new("Set the message", value, record)),
    )
    .unwrap();

  assert_eq!(tree.address(inner), "admin motd");
  assert_eq!(tree.depth(inner), 2);
  assert_eq!(tree.add_alias(inner, "x"), Err(TreeError::NamesFrozen {
    name: "motd".into(),
  }));

  let mut user = User::default();
  tree.dispatch(&mut user, "adm m hello").unwrap();
  assert_eq!(user.log, [r#"admin motd Some("hello")"#]);

  let err = tree.dispatch(&mut user, "admin").unwrap_err();
  assert!(matches!(err, DispatchError::NotFound { token: None, .. }));
  assert_eq!(err.to_string(), "'admin' needs a subcommand");
}
