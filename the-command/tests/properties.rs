use quickcheck::TestResult;
use the_command::{
  AddressTree,
  ArgBuffer,
  Command,
  CommandResult,
  ExecutionContext,
  Invocation,
  Invoker,
  NodeBuilder,
  ParseError,
  Parameter,
  Required,
  Schema,
  SchemaBuilder,
  types::{
    BoolType,
    ChoiceType,
    GreedyStringType,
    IntegerType,
    StringType,
  },
};

struct Anyone;

impl Invoker for Anyone {
  fn has_permission(&self, _permission: &str) -> bool {
    true
  }

  fn reply(&mut self, _message: &str) {}
}

fn noop(_: &mut Anyone, _: Invocation<'_, Anyone>) -> CommandResult {
  Ok(())
}

/// `n` optional-after-`required` string positionals and two flags.
fn positional_schema(n: usize, required: usize) -> Schema {
  let mut builder = SchemaBuilder::new();
  for i in 0..n {
    builder = builder
      .param(Parameter::positional(format!("p{i}"), StringType::new().with_default("-")))
      .unwrap();
  }
  builder
    .param(Parameter::flag("-a", BoolType))
    .and_then(|b| b.param(Parameter::flag("-b", BoolType)))
    .map(|b| b.required(Required::Count(required)))
    .and_then(SchemaBuilder::build)
    .unwrap()
}

fn parse(schema: &Schema, tokens: Vec<String>) -> Result<the_command::Values, ParseError> {
  let raw = tokens.join(" ");
  let mut cx = ExecutionContext::new(schema, ArgBuffer::new(tokens, raw), &Anyone);
  cx.parse().map(|()| cx.into_values())
}

fn tree() -> AddressTree<Anyone> {
  let mut tree = AddressTree::new();
  let root = tree.root();
  let schema = SchemaBuilder::new()
    .param(Parameter::positional("mode", ChoiceType::new(["fast", "slow"])))
    .and_then(|b| b.param(Parameter::positional("n", IntegerType::new().with_default(0))))
    .and_then(|b| b.vararg(Parameter::positional("rest", StringType::new())))
    .and_then(|b| b.param(Parameter::flag("-x", BoolType).with_permission("x")))
    .map(|b| b.required(Required::Count(1)))
    .and_then(SchemaBuilder::build)
    .unwrap();
  let run = tree
    .add_child(root, NodeBuilder::new("run").command(Command::new("", schema, noop)))
    .unwrap();
  let text = SchemaBuilder::new()
    .param(Parameter::positional("text", GreedyStringType))
    .and_then(SchemaBuilder::build)
    .unwrap();
  tree
    .add_child(run, NodeBuilder::new("say").command(Command::new("", text, noop)))
    .unwrap();
  tree
}

quickcheck::quickcheck! {
  fn positional_counts_in_range_parse(n: u8, required: u8, supplied: u8) -> TestResult {
    let n = usize::from(n % 6);
    let required = usize::from(required) % (n + 1);
    let supplied = required + usize::from(supplied) % (n - required + 1);

    let schema = positional_schema(n, required);
    let tokens = (0..supplied).map(|i| format!("v{i}")).collect();
    let values = match parse(&schema, tokens) {
      Ok(values) => values,
      Err(err) => return TestResult::error(err.to_string()),
    };
    let filled = (0..n).all(|i| {
      let expected = if i < supplied { format!("v{i}") } else { "-".to_string() };
      values.get_str(&format!("p{i}")) == Some(expected.as_str())
    });
    TestResult::from_bool(filled)
  }

  fn overflow_is_rejected(n: u8) -> bool {
    let n = usize::from(n % 6);
    let schema = positional_schema(n, n);
    let tokens = (0..=n).map(|i| format!("v{i}")).collect();
    matches!(
      parse(&schema, tokens),
      Err(ParseError::TooManyArguments { capacity, .. }) if capacity == n
    )
  }

  fn flags_can_go_anywhere(supplied: u8, a_at: u8, b_at: u8) -> bool {
    let supplied = usize::from(supplied % 4);
    let schema = positional_schema(3, 0);
    let mut tokens: Vec<String> = (0..supplied).map(|i| format!("v{i}")).collect();
    tokens.insert(usize::from(a_at) % (tokens.len() + 1), "-a".to_string());
    tokens.insert(usize::from(b_at) % (tokens.len() + 1), "-b".to_string());

    let Ok(values) = parse(&schema, tokens) else {
      return false;
    };
    values.has_flag("-a")
      && values.has_flag("-b")
      && (0..supplied).all(|i| values.get_str(&format!("p{i}")) == Some(format!("v{i}").as_str()))
  }

  fn completion_never_fails(line: String) -> bool {
    let tree = tree();
    let suggestions = tree.complete(&Anyone, &line);
    let mut unique = suggestions.clone();
    unique.sort();
    unique.dedup();
    unique.len() == suggestions.len()
  }

  fn quiet_parse_then_complete(tokens: Vec<String>) -> bool {
    let tree = tree();
    let mut buffer = ArgBuffer::new(tokens.clone(), tokens.join(" "));
    let node = tree.resolve(&mut buffer);
    let Some(command) = tree.command(node) else {
      return true;
    };
    let mut cx = ExecutionContext::new(command.schema(), buffer.split_off(), &Anyone);
    cx.parse_quietly();
    let _ = cx.completions();
    true
  }
}
