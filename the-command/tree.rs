//! The address tree: named nodes, each optionally bound to a command.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. A node's
//! names can change only while it is detached. Attaching it freezes them into
//! a shared slice, and once setup is done the tree is only read, so it can be
//! shared between threads without locking.

use std::{
  collections::HashMap,
  sync::Arc,
};

use slotmap::HopSlotMap;
use smallvec::SmallVec;

use crate::{
  command::Command,
  config::Settings,
  error::TreeError,
};

slotmap::new_key_type! {
  pub struct NodeId;
}

#[derive(Debug, Clone)]
enum Names {
  Open(SmallVec<[String; 2]>),
  Frozen(Arc<[String]>),
}

impl Names {
  fn as_slice(&self) -> &[String] {
    match self {
      Self::Open(names) => names.as_slice(),
      Self::Frozen(names) => &names[..],
    }
  }

  fn freeze(&mut self) {
    if let Self::Open(names) = self {
      let frozen: Arc<[String]> = names.drain(..).collect();
      *self = Self::Frozen(frozen);
    }
  }
}

#[derive(Debug)]
struct Node<Ctx: 'static> {
  names:      Names,
  command:    Option<Arc<Command<Ctx>>>,
  parent:     Option<NodeId>,
  children:   HashMap<String, NodeId>,
  help_child: Option<NodeId>,
}

/// A node under construction.
#[derive(Debug)]
pub struct NodeBuilder<Ctx: 'static> {
  names:   SmallVec<[String; 2]>,
  command: Option<Command<Ctx>>,
}

impl<Ctx: 'static> NodeBuilder<Ctx> {
  /// A node whose main key is `name`.
  pub fn new(name: impl Into<String>) -> Self {
    let mut names = SmallVec::new();
    names.push(name.into());
    Self {
      names,
      command: None,
    }
  }

  /// A node with no names yet. It cannot be attached until it has one.
  pub fn unnamed() -> Self {
    Self {
      names:   SmallVec::new(),
      command: None,
    }
  }

  pub fn alias(mut self, name: impl Into<String>) -> Self {
    self.names.push(name.into());
    self
  }

  pub fn aliases<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.names.extend(names.into_iter().map(Into::into));
    self
  }

  pub fn command(mut self, command: Command<Ctx>) -> Self {
    self.command = Some(command);
    self
  }
}

#[derive(Debug)]
pub struct AddressTree<Ctx: 'static> {
  nodes:    HopSlotMap<NodeId, Node<Ctx>>,
  root:     NodeId,
  settings: Settings,
}

impl<Ctx: 'static> Default for AddressTree<Ctx> {
  fn default() -> Self {
    Self::with_settings(Settings::default())
  }
}

impl<Ctx: 'static> AddressTree<Ctx> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_settings(settings: Settings) -> Self {
    let mut nodes = HopSlotMap::with_key();
    let root = nodes.insert(Node {
      names:      Names::Frozen(Arc::from([])),
      command:    None,
      parent:     None,
      children:   HashMap::new(),
      help_child: None,
    });

    Self {
      nodes,
      root,
      settings,
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  /// Adds a detached node. Its names can still be extended with
  /// [`Self::add_alias`] until it is attached.
  pub fn create(&mut self, node: NodeBuilder<Ctx>) -> NodeId {
    self.nodes.insert(Node {
      names:      Names::Open(node.names),
      command:    node.command.map(Arc::new),
      parent:     None,
      children:   HashMap::new(),
      help_child: None,
    })
  }

  /// Creates `node` and attaches it below `parent`.
  pub fn add_child(&mut self, parent: NodeId, node: NodeBuilder<Ctx>) -> Result<NodeId, TreeError> {
    let id = self.create(node);
    match self.attach(parent, id) {
      Ok(()) => Ok(id),
      Err(err) => {
        self.nodes.remove(id);
        Err(err)
      },
    }
  }

  pub fn add_alias(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
    let node = self.node_mut(id)?;
    match &mut node.names {
      Names::Open(names) => {
        names.push(name.into());
        Ok(())
      },
      Names::Frozen(names) => {
        Err(TreeError::NamesFrozen {
          name: names.first().cloned().unwrap_or_default(),
        })
      },
    }
  }

  fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<Ctx>, TreeError> {
    self.nodes.get_mut(id).ok_or_else(|| {
      TreeError::UnknownNode {
        name: format!("{id:?}"),
      }
    })
  }

  /// Attaches the detached node `child` below `parent`.
  ///
  /// The child is registered under each of its names. A name that is already
  /// taken in `parent` is skipped and the existing entry kept. Attaching
  /// freezes the child's names. A child bound to the built-in help command
  /// becomes `parent`'s help child.
  pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
    if !self.contains(parent) {
      return Err(TreeError::UnknownNode {
        name: format!("{parent:?}"),
      });
    }
    let node = self.node_mut(child)?;
    let main_key = node.names.as_slice().first().cloned();
    let attached = node.parent.is_some();
    let Some(main_key) = main_key else {
      return Err(TreeError::NoNames);
    };
    if attached || child == self.root {
      return Err(TreeError::AlreadyAttached { name: main_key });
    }
    if self.ancestors(parent).any(|id| id == child) {
      return Err(TreeError::Cycle { name: main_key });
    }

    let node = &mut self.nodes[child];
    node.names.freeze();
    node.parent = Some(parent);
    let names = node.names.clone();
    let is_help = node.command.as_ref().is_some_and(|command| command.is_help());

    let siblings = &mut self.nodes[parent];
    for name in names.as_slice() {
      match siblings.children.get(name) {
        Some(_) => {
          tracing::debug!(
            target: "the_command::tree",
            %name,
            node = %main_key,
            "name already taken, alias dropped"
          );
        },
        None => {
          siblings.children.insert(name.clone(), child);
        },
      }
    }
    if is_help {
      siblings.help_child = Some(child);
    }

    tracing::trace!(
      target: "the_command::tree",
      address = %self.address(child),
      "attached node"
    );
    Ok(())
  }

  /// Looks up a direct child by exact name.
  pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
    self.nodes.get(id)?.children.get(name).copied()
  }

  /// Distinct children, ordered by main key.
  pub fn children(&self, id: NodeId) -> Vec<NodeId> {
    let Some(node) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut children: Vec<NodeId> = node.children.values().copied().collect();
    children.sort_by(|a, b| self.main_key(*a).cmp(self.main_key(*b)).then(a.cmp(b)));
    children.dedup();
    children
  }

  /// Every name a child is registered under, aliases included, sorted.
  pub fn child_names(&self, id: NodeId) -> Vec<&str> {
    let Some(node) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut names: Vec<&str> = node.children.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// All names of a node, main key first. Empty for the root and for ids
  /// this tree does not know.
  pub fn names(&self, id: NodeId) -> &[String] {
    self.nodes.get(id).map_or(&[][..], |node| node.names.as_slice())
  }

  /// The first name of a node. Empty for the root.
  pub fn main_key(&self, id: NodeId) -> &str {
    self.names(id).first().map_or("", String::as_str)
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id)?.parent
  }

  pub fn command(&self, id: NodeId) -> Option<&Command<Ctx>> {
    self.nodes.get(id)?.command.as_deref()
  }

  pub fn help_child(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id)?.help_child
  }

  /// `id` followed by each of its ancestors up to the root.
  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(id), |&id| self.parent(id))
  }

  /// The main keys from the root down to `id`, joined by single spaces.
  pub fn address(&self, id: NodeId) -> String {
    let mut keys: Vec<&str> = self
      .ancestors(id)
      .filter(|&id| id != self.root)
      .map(|id| self.main_key(id))
      .collect();
    keys.reverse();
    keys.join(" ")
  }

  /// The address of `id` extended by `name`.
  pub fn render_path(&self, id: NodeId, name: &str) -> String {
    let address = self.address(id);
    if address.is_empty() {
      name.to_string()
    } else {
      format!("{address} {name}")
    }
  }

  /// Number of parent hops from `id` to the root.
  pub fn depth(&self, id: NodeId) -> usize {
    self.ancestors(id).count() - 1
  }

  /// Like `depth(id) > n`, but stops walking after `n + 1` hops.
  pub fn is_depth_larger_than(&self, id: NodeId, n: usize) -> bool {
    self.ancestors(id).skip(1).nth(n).is_some()
  }

  /// Usage lines for every command at or below `id`, depth first in main key
  /// order. Help commands are left out.
  pub fn usage_lines(&self, id: NodeId) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack = vec![id];

    while let Some(id) = stack.pop() {
      if let Some(command) = self.command(id).filter(|command| !command.is_help()) {
        let mut line = self.address(id);
        let usage = command.schema().usage();
        if !usage.is_empty() {
          line.push(' ');
          line.push_str(&usage);
        }
        if !command.description().is_empty() {
          line.push_str(" - ");
          line.push_str(command.description());
        }
        lines.push(line);
      }
      stack.extend(self.children(id).into_iter().rev());
    }

    lines
  }
}
