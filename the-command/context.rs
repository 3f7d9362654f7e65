//! One parse of a command line against a [`Schema`].
//!
//! An [`ExecutionContext`] is created per dispatched (or completed) line and
//! thrown away afterwards. [`ExecutionContext::parse`] runs exactly once. It
//! walks the buffer, routes each token either to a flag or to the next
//! positional parameter, fills in defaults for everything the input left out
//! and remembers which parameter it was in the middle of when it stopped.
//! That last bit is what [`ExecutionContext::completions`] resumes from.
//!
//! Completion uses the same walk through [`ExecutionContext::parse_quietly`],
//! which only drops the error.

use std::collections::HashSet;

use crate::{
  buffer::ArgBuffer,
  command::Invoker,
  error::{
    ParamError,
    ParseError,
  },
  param::Parameter,
  schema::Schema,
  types::TypeCx,
  value::{
    TypedArray,
    Value,
    Values,
  },
};

/// Where parsing stopped inside a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InProgress {
  param:  usize,
  /// Buffer position right before the parameter's type started reading.
  cursor: usize,
}

pub struct ExecutionContext<'a> {
  schema:         &'a Schema,
  invoker:        &'a dyn Invoker,
  original:       ArgBuffer,
  buffer:         ArgBuffer,
  values:         Values,
  /// Indices of parameters the input selected.
  touched:        HashSet<usize>,
  /// Number of non-repeated positional parameters selected so far.
  filled:         usize,
  vararg:         TypedArray,
  vararg_started: bool,
  attempted:      bool,
  quiet:          bool,
  in_progress:    Option<InProgress>,
}

impl<'a> ExecutionContext<'a> {
  /// Binds a context to `schema`. The schema's merge rule is applied to
  /// `input` right away, `input` itself is kept as the original.
  pub fn new(schema: &'a Schema, input: ArgBuffer, invoker: &'a dyn Invoker) -> Self {
    Self {
      schema,
      invoker,
      buffer: schema.preprocess(&input),
      original: input,
      values: Values::new(),
      touched: HashSet::new(),
      filled: 0,
      vararg: schema.vararg_element().empty(),
      vararg_started: false,
      attempted: false,
      quiet: false,
      in_progress: None,
    }
  }

  pub fn schema(&self) -> &'a Schema {
    self.schema
  }

  /// The buffer as handed in, before merging.
  pub fn original(&self) -> &ArgBuffer {
    &self.original
  }

  /// The merged buffer the parser reads from.
  pub fn buffer(&self) -> &ArgBuffer {
    &self.buffer
  }

  pub fn values(&self) -> &Values {
    &self.values
  }

  pub fn into_values(self) -> Values {
    self.values
  }

  pub fn is_quiet(&self) -> bool {
    self.quiet
  }

  /// The parameter parsing stopped in, and the buffer position its type
  /// started reading at.
  pub fn in_progress(&self) -> Option<(&'a Parameter, usize)> {
    let schema = self.schema;
    self
      .in_progress
      .map(|progress| (schema.at(progress.param), progress.cursor))
  }

  /// Parses the buffer into the value map.
  ///
  /// Defaults are filled in even when parsing fails, so a failed context
  /// still holds every value that could be determined.
  ///
  /// # Panics
  ///
  /// When called a second time on the same context.
  pub fn parse(&mut self) -> Result<(), ParseError> {
    assert!(!self.attempted, "execution context parsed twice");
    self.attempted = true;

    let collected = self.collect();
    let defaulted = self.apply_defaults();
    if self.vararg_started {
      let kind = self.vararg.kind();
      let items = std::mem::replace(&mut self.vararg, kind.empty());
      if let Some(param) = self.schema.vararg() {
        self.values.insert(param.name(), Value::Array(items));
      }
    }

    collected.and(defaulted)
  }

  /// Parses without reporting failures. Used to prepare
  /// [`Self::completions`].
  pub fn parse_quietly(&mut self) {
    self.quiet = true;
    if let Err(err) = self.parse() {
      tracing::trace!(target: "the_command::context", %err, "quiet parse stopped");
    }
  }

  fn collect(&mut self) -> Result<(), ParseError> {
    while let Some(token) = self.buffer.peek() {
      let target = match self.select_flag(token) {
        Some(index) => {
          self.buffer.next();
          index
        },
        None => {
          let token = token.to_string();
          self.next_positional(token)?
        },
      };
      self.parse_param(target)?;
    }

    let satisfied = self.filled + usize::from(self.vararg_started);
    if satisfied < self.schema.required_count() {
      let param = self
        .schema
        .positional_index(satisfied)
        .map(|index| self.schema.at(index));
      if let Some(param) = param {
        return Err(ParseError::MissingRequired {
          param: param.name().to_string(),
        });
      }
    }
    Ok(())
  }

  /// The flag `token` selects, if it names one that is still available to
  /// this invoker.
  fn select_flag(&self, token: &str) -> Option<usize> {
    if !token.starts_with(self.schema.flag_prefix()) {
      return None;
    }
    let index = self.schema.index_of(token)?;
    let param = self.schema.at(index);
    if !param.is_flag() || self.touched.contains(&index) {
      return None;
    }
    if !self.permitted(param) {
      tracing::trace!(
        target: "the_command::context",
        flag = %param.name(),
        "flag not permitted, reading it as a positional argument"
      );
      return None;
    }
    Some(index)
  }

  fn permitted(&self, param: &Parameter) -> bool {
    param
      .permission()
      .is_none_or(|permission| self.invoker.has_permission(permission))
  }

  fn next_positional(&mut self, token: String) -> Result<usize, ParseError> {
    if let Some(vararg) = self.schema.vararg_index().filter(|_| self.vararg_started) {
      return Ok(vararg);
    }
    if self.filled < self.schema.fixed_count() {
      if let Some(index) = self.schema.positional_index(self.filled) {
        return Ok(index);
      }
    }
    if let Some(vararg) = self.schema.vararg_index() {
      self.vararg_started = true;
      return Ok(vararg);
    }
    Err(ParseError::TooManyArguments {
      capacity: self.schema.fixed_count(),
      token,
    })
  }

  fn parse_param(&mut self, index: usize) -> Result<(), ParseError> {
    let schema = self.schema;
    let param = schema.at(index);
    let is_vararg = schema.vararg_index() == Some(index);
    let start = self.buffer.position();

    self.touched.insert(index);
    if !param.is_flag() && !is_vararg {
      self.filled += 1;
    }

    let cx = TypeCx {
      param,
      invoker: self.invoker,
    };
    let value = match param.ty().parse(&mut self.buffer, &cx) {
      Ok(value) => value,
      Err(err) => return Err(self.fail(index, start, err)),
    };

    if is_vararg {
      assert!(
        self.buffer.position() > start,
        "type '{}' of repeated parameter '{}' read no tokens",
        param.ty().name(),
        param.name()
      );
      if let Err(err) = self.vararg.push(value) {
        return Err(self.fail(index, start, err));
      }
    } else {
      self.values.insert(param.name(), value);
    }

    // The last token may still be being typed.
    if self.quiet && !self.buffer.has_next() && self.buffer.position() > start {
      self.in_progress = Some(InProgress {
        param:  index,
        cursor: start,
      });
    }
    Ok(())
  }

  fn fail(&mut self, index: usize, cursor: usize, err: ParamError) -> ParseError {
    self.in_progress = Some(InProgress {
      param: index,
      cursor,
    });
    let param = self.schema.at(index);
    ParseError::from_param(err, param.name(), param.ty().name())
  }

  fn apply_defaults(&mut self) -> Result<(), ParseError> {
    let schema = self.schema;
    let mut first_err = None;

    for (index, param) in schema.parameters().enumerate() {
      if self.touched.contains(&index) {
        continue;
      }
      if schema.vararg_index() == Some(index) {
        self
          .values
          .insert(param.name(), Value::Array(schema.vararg_element().empty()));
        continue;
      }

      let cx = TypeCx {
        param,
        invoker: self.invoker,
      };
      match param.ty().default_value(&cx) {
        Ok(value) => {
          self.values.insert(param.name(), value);
        },
        Err(err) => {
          if first_err.is_none() {
            first_err = Some(ParseError::from_param(err, param.name(), param.ty().name()));
          }
        },
      }
    }

    first_err.map_or(Ok(()), Err)
  }

  /// Suggestions for the last token of the buffer, in display order.
  ///
  /// When parsing stopped inside a parameter, its type completes from where
  /// that parameter started. Otherwise the flags that are still available
  /// are offered. Flags are also offered whenever the last token starts with
  /// the flag prefix.
  pub fn completions(&self) -> Vec<String> {
    let partial = self.buffer.last().unwrap_or_default();
    let typing_flag = partial.starts_with(self.schema.flag_prefix());
    let mut suggestions = Vec::new();

    if let Some(progress) = self.in_progress {
      let param = self.schema.at(progress.param);
      let cx = TypeCx {
        param,
        invoker: self.invoker,
      };
      let mut replay = self.buffer.snapshot_at(progress.cursor);
      suggestions.extend(param.ty().complete(&mut replay, &cx));
    }

    if self.in_progress.is_none() || typing_flag {
      for (index, param) in self.schema.parameters().enumerate() {
        if !param.is_flag() || !self.permitted(param) {
          continue;
        }
        let offered = if typing_flag {
          param.name().starts_with(partial)
            && (!self.touched.contains(&index) || param.name() == partial)
        } else {
          !self.touched.contains(&index)
        };
        if offered {
          suggestions.push(param.name().to_string());
        }
      }
    }

    let mut seen = HashSet::new();
    suggestions.retain(|suggestion| seen.insert(suggestion.clone()));
    suggestions
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    command::test_support::Caller,
    schema::{
      Required,
      SchemaBuilder,
    },
    types::{
      BoolType,
      ChoiceType,
      FloatType,
      IntegerType,
      NumberRange,
      StringType,
    },
    value::ElementKind,
  };

  /// `<name> [count] [-verbose]`
  fn greet_schema() -> Schema {
    SchemaBuilder::new()
      .param(Parameter::positional("name", StringType::new()))
      .and_then(|b| b.param(Parameter::positional("count", IntegerType::new().with_default(1))))
      .and_then(|b| b.param(Parameter::flag("-verbose", BoolType)))
      .map(|b| b.required(Required::Count(1)))
      .and_then(SchemaBuilder::build)
      .unwrap()
  }

  /// `<target> [items...]`
  fn collect_schema() -> Schema {
    SchemaBuilder::new()
      .param(Parameter::positional("target", StringType::new()))
      .and_then(|b| b.vararg(Parameter::positional("items", StringType::new())))
      .and_then(SchemaBuilder::build)
      .unwrap()
  }

  #[track_caller]
  fn parse(schema: &Schema, caller: &Caller, line: &str) -> Result<Values, ParseError> {
    let mut cx = ExecutionContext::new(schema, ArgBuffer::from_line(line, false), caller);
    cx.parse().map(|()| cx.into_values())
  }

  #[track_caller]
  fn complete(schema: &Schema, caller: &Caller, line: &str) -> Vec<String> {
    let mut cx = ExecutionContext::new(schema, ArgBuffer::from_line(line, true), caller);
    cx.parse_quietly();
    cx.completions()
  }

  #[test]
  fn flags_mix_with_positionals() {
    let schema = greet_schema();
    let caller = Caller::default();

    let values = parse(&schema, &caller, "bob -verbose 5").unwrap();
    assert_eq!(values.get_str("name"), Some("bob"));
    assert_eq!(values.get_int("count"), Some(5));
    assert_eq!(values.get_bool("-verbose"), Some(true));

    let values = parse(&schema, &caller, "bob").unwrap();
    assert_eq!(values.get_str("name"), Some("bob"));
    assert_eq!(values.get_int("count"), Some(1));
    assert_eq!(values.get_bool("-verbose"), Some(false));
  }

  #[test]
  fn too_many_arguments() {
    let schema = greet_schema();
    assert_eq!(
      parse(&schema, &Caller::default(), "bob 5 extra"),
      Err(ParseError::TooManyArguments {
        capacity: 2,
        token:    "extra".into(),
      })
    );
  }

  #[test]
  fn flag_position_does_not_matter() {
    let schema = greet_schema();
    let caller = Caller::default();
    let expected = parse(&schema, &caller, "bob 5 -verbose").unwrap();
    for line in ["-verbose bob 5", "bob -verbose 5"] {
      let values = parse(&schema, &caller, line).unwrap();
      assert_eq!(values.get_str("name"), expected.get_str("name"), "{line}");
      assert_eq!(values.get_int("count"), expected.get_int("count"), "{line}");
      assert!(values.has_flag("-verbose"), "{line}");
    }
  }

  #[test]
  fn missing_required_names_the_first_gap() {
    let schema = greet_schema();
    assert_eq!(
      parse(&schema, &Caller::default(), "-verbose"),
      Err(ParseError::MissingRequired {
        param: "name".into(),
      })
    );
  }

  #[test]
  fn vararg_collects_overflow_in_order() {
    let schema = collect_schema();
    let caller = Caller::default();

    let values = parse(&schema, &caller, "alice a b c").unwrap();
    assert_eq!(values.get_str("target"), Some("alice"));
    let items = values.get_array("items").unwrap();
    assert_eq!(items.as_strs(), Some(&["a".to_string(), "b".into(), "c".into()][..]));

    let values = parse(&schema, &caller, "alice").unwrap();
    let items = values.get_array("items").unwrap();
    assert!(items.is_empty());
    assert_eq!(items.kind(), ElementKind::Str);
  }

  #[test]
  fn unlimited_requires_a_repeated_value() {
    let schema = SchemaBuilder::new()
      .param(Parameter::positional("target", StringType::new()))
      .and_then(|b| b.vararg(Parameter::positional("items", StringType::new())))
      .map(|b| b.required(Required::Unlimited))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    assert_eq!(
      parse(&schema, &caller, "alice"),
      Err(ParseError::MissingRequired {
        param: "items".into(),
      })
    );
    assert!(parse(&schema, &caller, "alice a").is_ok());
  }

  #[test]
  fn vararg_values_are_narrowed() {
    let schema = SchemaBuilder::new()
      .vararg(Parameter::positional(
        "bytes",
        IntegerType::new().stored_as(ElementKind::U8),
      ))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    let values = parse(&schema, &caller, "1 2 255").unwrap();
    let bytes = values.get_array("bytes").unwrap();
    assert_eq!(bytes, &TypedArray::U8(vec![1, 2, 255]));

    let err = parse(&schema, &caller, "1 256").unwrap_err();
    assert_eq!(err.param(), Some("bytes"));
  }

  #[test]
  fn single_precision_overflow_names_the_parameter() {
    let schema = SchemaBuilder::new()
      .vararg(Parameter::positional("weights", FloatType::new().single_precision()))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    let values = parse(&schema, &caller, "1.5 -2").unwrap();
    assert_eq!(values.get_array("weights"), Some(&TypedArray::F32(vec![1.5, -2.0])));

    assert_eq!(
      parse(&schema, &caller, "1.5 1e300"),
      Err(ParseError::InvalidArgument {
        param:    "weights".into(),
        expected: "number".into(),
        message:  "1e300 does not fit in f32".into(),
      })
    );
  }

  #[test]
  fn unpermitted_flags_are_positional() {
    let schema = SchemaBuilder::new()
      .param(Parameter::positional("target", StringType::new()))
      .and_then(|b| b.param(Parameter::flag("-force", BoolType).with_permission("admin")))
      .and_then(SchemaBuilder::build)
      .unwrap();

    let values = parse(&schema, &Caller::default(), "-force").unwrap();
    assert_eq!(values.get_str("target"), Some("-force"));
    assert_eq!(values.get_bool("-force"), Some(false));

    let admin = Caller::with_permissions(&["admin"]);
    assert_eq!(
      parse(&schema, &admin, "-force"),
      Err(ParseError::MissingRequired {
        param: "target".into(),
      })
    );
    let values = parse(&schema, &admin, "-force x").unwrap();
    assert!(values.has_flag("-force"));
  }

  #[test]
  fn repeated_flags_fall_through() {
    let schema = greet_schema();
    let values = parse(&schema, &Caller::default(), "-verbose -verbose").unwrap();
    assert_eq!(values.get_str("name"), Some("-verbose"));
    assert!(values.has_flag("-verbose"));
  }

  #[test]
  fn flags_with_values() {
    let schema = SchemaBuilder::new()
      .param(Parameter::flag("-limit", IntegerType::new().with_default(10)))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    assert_eq!(parse(&schema, &caller, "").unwrap().get_int("-limit"), Some(10));
    assert_eq!(parse(&schema, &caller, "-limit 3").unwrap().get_int("-limit"), Some(3));
    assert_eq!(
      parse(&schema, &caller, "-limit"),
      Err(ParseError::MissingRequired {
        param: "-limit".into(),
      })
    );
  }

  #[test]
  fn invalid_values_carry_the_expected_type() {
    let schema = greet_schema();
    assert_eq!(
      parse(&schema, &Caller::default(), "bob many"),
      Err(ParseError::InvalidArgument {
        param:    "count".into(),
        expected: "integer".into(),
        message:  "'many' is not a whole number".into(),
      })
    );
  }

  #[test]
  fn defaults_fill_even_on_failure() {
    let schema = greet_schema();
    let caller = Caller::default();
    let mut cx = ExecutionContext::new(&schema, ArgBuffer::from_line("bob 5 extra", false), &caller);
    assert!(cx.parse().is_err());
    assert_eq!(cx.values().get_bool("-verbose"), Some(false));
    assert_eq!(cx.values().get_int("count"), Some(5));
  }

  #[test]
  fn optional_parameter_without_default() {
    let schema = SchemaBuilder::new()
      .param(Parameter::positional("name", StringType::new()))
      .map(|b| b.required(Required::Count(0)))
      .and_then(SchemaBuilder::build)
      .unwrap();
    assert_eq!(
      parse(&schema, &Caller::default(), ""),
      Err(ParseError::NoDefault {
        param: "name".into(),
      })
    );
  }

  #[test]
  fn merged_tokens_fill_one_parameter() {
    let schema = collect_schema();
    let caller = Caller::default();
    let mut cx = ExecutionContext::new(
      &schema,
      ArgBuffer::from_line(r#"greeting "hello there" x"#, false),
      &caller,
    );
    cx.parse().unwrap();
    assert_eq!(cx.original().len(), 4);
    assert_eq!(cx.buffer().len(), 3);
    let items = cx.values().get_array("items").unwrap();
    assert_eq!(items.as_strs(), Some(&["hello there".to_string(), "x".into()][..]));
  }

  #[test]
  #[should_panic(expected = "parsed twice")]
  fn parsing_twice_panics() {
    let schema = greet_schema();
    let caller = Caller::default();
    let mut cx = ExecutionContext::new(&schema, ArgBuffer::from_line("bob", false), &caller);
    let _ = cx.parse();
    let _ = cx.parse();
  }

  #[test]
  fn failures_record_the_start_of_the_parameter() {
    let schema = greet_schema();
    let caller = Caller::default();
    let mut cx = ExecutionContext::new(&schema, ArgBuffer::from_line("bob -verbose x", false), &caller);
    assert!(cx.parse().is_err());
    let (param, cursor) = cx.in_progress().unwrap();
    assert_eq!(param.name(), "count");
    assert_eq!(cursor, 2);
  }

  #[test]
  fn completes_the_parameter_being_typed() {
    let schema = SchemaBuilder::new()
      .param(Parameter::positional("mode", ChoiceType::new(["fast", "slow", "fastest"])))
      .and_then(|b| b.param(Parameter::flag("-dry", BoolType)))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    assert_eq!(complete(&schema, &caller, "fa"), ["fast", "fastest"]);
    assert_eq!(complete(&schema, &caller, "fast"), ["fast", "fastest"]);
    assert_eq!(complete(&schema, &caller, ""), ["fast", "slow", "fastest"]);
    assert_eq!(complete(&schema, &caller, "-d"), ["-dry"]);
  }

  #[test]
  fn completes_flags_at_a_clean_boundary() {
    let schema = greet_schema();
    let caller = Caller::default();
    assert_eq!(complete(&schema, &caller, "bob 5 "), ["-verbose"]);
    assert_eq!(complete(&schema, &caller, "bob 5 -verbose "), Vec::<String>::new());
    assert_eq!(complete(&schema, &caller, "bob -verbose"), ["-verbose"]);
  }

  #[test]
  fn completion_resumes_inside_the_repeated_parameter() {
    let fruit = StringType::new().with_suggestions(["apple", "banana", "blueberry"]);
    let schema = SchemaBuilder::new()
      .param(Parameter::positional("target", StringType::new()))
      .and_then(|b| b.vararg(Parameter::positional("items", fruit)))
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();

    let mut cx = ExecutionContext::new(&schema, ArgBuffer::from_line("alice a b", true), &caller);
    cx.parse_quietly();
    let (param, cursor) = cx.in_progress().unwrap();
    assert_eq!(param.name(), "items");
    assert_eq!(cursor, 2);
    assert_eq!(cx.completions(), ["banana", "blueberry"]);

    assert_eq!(complete(&schema, &caller, "alice apple "), [
      "apple",
      "banana",
      "blueberry"
    ]);
  }

  #[test]
  fn completion_resumes_after_a_flag() {
    let schema = SchemaBuilder::new()
      .param(
        Parameter::flag("-level", IntegerType::new()).with_config(NumberRange::new(1.0, 3.0)),
      )
      .and_then(SchemaBuilder::build)
      .unwrap();
    let caller = Caller::default();
    assert_eq!(complete(&schema, &caller, "-level "), ["1", "2", "3"]);
    assert_eq!(complete(&schema, &caller, "-level 2"), ["2"]);
  }

  #[test]
  fn unpermitted_flags_are_not_suggested() {
    let schema = SchemaBuilder::new()
      .param(Parameter::flag("-force", BoolType).with_permission("admin"))
      .and_then(|b| b.param(Parameter::flag("-fast", BoolType)))
      .and_then(SchemaBuilder::build)
      .unwrap();
    assert_eq!(complete(&schema, &Caller::default(), "-f"), ["-fast"]);
    assert_eq!(
      complete(&schema, &Caller::with_permissions(&["admin"]), "-f"),
      ["-force", "-fast"]
    );
  }
}
