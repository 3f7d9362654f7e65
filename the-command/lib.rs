//! # the-command
//!
//! Command resolution and argument parsing for command-line style input.
//!
//! An [`AddressTree`] holds named nodes, each optionally bound to a
//! [`Command`]. A line is resolved by walking the tree with its leading
//! tokens; the rest is parsed against the command's [`Schema`] by an
//! [`ExecutionContext`], which also drives completion.
//!
//! ## Core Concepts
//!
//! - **Address**: the main keys from the root to a node, e.g. `config set`.
//!   Nodes also answer to aliases.
//! - **Schema**: positional parameters in order, flags selected by name
//!   (`-verbose`), and optionally one repeated parameter at the end.
//! - **Parameter types**: anything implementing [`ParamType`] can parse,
//!   default and complete a parameter.
//! - **Quiet parsing**: the same parse with errors dropped, leaving the
//!   context ready to compute completions.
//!
//! ## Basic Usage
//!
//! ```rust
//! use the_command::{
//!   AddressTree,
//!   Command,
//!   CommandResult,
//!   Invocation,
//!   Invoker,
//!   NodeBuilder,
//!   Parameter,
//!   SchemaBuilder,
//!   types::StringType,
//! };
//!
//! #[derive(Default)]
//! struct Session {
//!   out: Vec<String>,
//! }
//!
//! impl Invoker for Session {
//!   fn has_permission(&self, _permission: &str) -> bool {
//!     false
//!   }
//!
//!   fn reply(&mut self, message: &str) {
//!     self.out.push(message.to_string());
//!   }
//! }
//!
//! fn greet(session: &mut Session, call: Invocation<'_, Session>) -> CommandResult {
//!   let name = call.values.get_str("name").unwrap_or_default();
//!   session.reply(&format!("hello {name}"));
//!   Ok(())
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaBuilder::new()
//!   .param(Parameter::positional("name", StringType::new()))?
//!   .build()?;
//!
//! let mut tree = AddressTree::new();
//! let root = tree.root();
//! tree.add_child(
//!   root,
//!   NodeBuilder::new("greet").command(Command::new("Say hello", schema, greet)),
//! )?;
//!
//! let mut session = Session::default();
//! tree.dispatch(&mut session, "greet world")?;
//! assert_eq!(session.out, ["hello world"]);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod command;
pub mod config;
pub mod context;
mod dispatch;
pub mod error;
pub mod param;
pub mod schema;
pub mod tree;
pub mod types;
pub mod value;

pub use buffer::ArgBuffer;
pub use command::{
  Command,
  CommandError,
  CommandResult,
  Invocation,
  Invoker,
};
pub use config::Settings;
pub use context::ExecutionContext;
pub use error::{
  DispatchError,
  ParseError,
};
pub use param::Parameter;
pub use schema::{
  Required,
  Schema,
  SchemaBuilder,
};
pub use tree::{
  AddressTree,
  NodeBuilder,
  NodeId,
};
pub use types::ParamType;
pub use value::{
  Value,
  Values,
};
