//! Entry points that take a raw line all the way to a handler, or to a list
//! of completions.

use std::collections::HashSet;

use crate::{
  buffer::ArgBuffer,
  command::{
    Invocation,
    Invoker,
  },
  context::ExecutionContext,
  error::DispatchError,
  tree::{
    AddressTree,
    NodeId,
  },
};

impl<Ctx: 'static> AddressTree<Ctx> {
  /// Follows the buffer's tokens down from the root for as long as they name
  /// children, advancing past each one. Returns the deepest node reached.
  pub fn resolve(&self, buffer: &mut ArgBuffer) -> NodeId {
    self.walk(buffer, 0)
  }

  /// Like [`Self::resolve`], but leaves at least `keep` tokens unread.
  fn walk(&self, buffer: &mut ArgBuffer, keep: usize) -> NodeId {
    let mut node = self.root();
    while buffer.remaining() > keep {
      let Some(child) = buffer.peek().and_then(|token| self.child(node, token)) else {
        break;
      };
      buffer.next();
      node = child;
    }
    node
  }
}

impl<Ctx: Invoker + 'static> AddressTree<Ctx> {
  /// Resolves `line`, parses what follows the address and runs the command.
  ///
  /// A node without a command hands input that names nothing further to its
  /// help child.
  pub fn dispatch(&self, ctx: &mut Ctx, line: &str) -> Result<(), DispatchError> {
    let mut buffer = ArgBuffer::from_line(line, false);
    let node = self.resolve(&mut buffer);

    let target = match self.command(node) {
      Some(_) => node,
      None => {
        match self.help_child(node).filter(|_| !buffer.has_next()) {
          Some(help) => help,
          None => {
            return Err(DispatchError::NotFound {
              address: self.address(node),
              token:   buffer.peek().map(str::to_string),
            });
          },
        }
      },
    };
    let Some(command) = self.command(target) else {
      return Err(DispatchError::NotFound {
        address: self.address(node),
        token:   None,
      });
    };

    let input = buffer.split_off();
    let values = {
      let mut cx = ExecutionContext::new(command.schema(), input.snapshot(), &*ctx);
      cx.parse()?;
      cx.into_values()
    };

    tracing::debug!(
      target: "the_command::dispatch",
      address = %self.address(target),
      args = input.len(),
      "running command"
    );
    command.execute(ctx, Invocation {
      tree: self,
      node: target,
      values,
      input,
    })?;
    Ok(())
  }

  /// Suggestions for the last token of `line`, deduplicated and capped at
  /// the configured limit.
  ///
  /// A line ending in whitespace completes a new, empty token. When the last
  /// token directly follows a node's address, the node's child names are
  /// offered first.
  pub fn complete(&self, ctx: &Ctx, line: &str) -> Vec<String> {
    let mut buffer = ArgBuffer::from_line(line, true);
    let node = self.walk(&mut buffer, 1);
    let mut suggestions = Vec::new();

    if buffer.remaining() == 1 {
      let partial = buffer.peek().unwrap_or_default();
      suggestions.extend(
        self
          .child_names(node)
          .into_iter()
          .filter(|name| name.starts_with(partial))
          .map(str::to_string),
      );
    }

    if let Some(command) = self.command(node) {
      let mut cx = ExecutionContext::new(command.schema(), buffer.split_off(), ctx);
      cx.parse_quietly();
      suggestions.extend(cx.completions());
    }

    let mut seen = HashSet::new();
    suggestions.retain(|suggestion| seen.insert(suggestion.clone()));
    if let Some(limit) = self.settings().suggestion_limit() {
      suggestions.truncate(limit);
    }

    tracing::trace!(
      target: "the_command::dispatch",
      address = %self.address(node),
      count = suggestions.len(),
      "completed line"
    );
    suggestions
  }
}
