//! A small interactive shell over the-command.
//!
//! Runs single lines with `-c`, prints completions with `--complete`, and
//! otherwise reads lines from stdin. A line ending in `?` prints the
//! completions for the text before it instead of running it.

mod demo;

use std::{
  io::{
    self,
    BufRead,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use clap::Parser;
use eyre::{
  Context,
  Result,
};
use the_command::{
  AddressTree,
  Settings,
};

use crate::demo::Session;

#[derive(Debug, Parser)]
#[command(name = "the-shell")]
#[command(about = "Run and complete commands against a demo command tree")]
struct Cli {
  /// Settings file (TOML)
  #[arg(long, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Grant a permission to the session, may be repeated
  #[arg(long = "grant", value_name = "PERMISSION")]
  grants: Vec<String>,

  /// Print the completions for LINE and exit
  #[arg(long, value_name = "LINE", conflicts_with = "command")]
  complete: Option<String>,

  /// Run LINE and exit
  #[arg(short = 'c', long, value_name = "LINE")]
  command: Option<String>,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
  let Some(path) = path else {
    return Ok(Settings::default());
  };
  let source = std::fs::read_to_string(path)
    .wrap_err_with(|| format!("failed to read {}", path.display()))?;
  Settings::from_toml(&source).wrap_err_with(|| format!("invalid settings in {}", path.display()))
}

fn print_completions(tree: &AddressTree<Session>, session: &Session, line: &str) {
  for suggestion in tree.complete(session, line) {
    println!("{suggestion}");
  }
}

fn repl(tree: &AddressTree<Session>, session: &mut Session) -> Result<()> {
  let stdin = io::stdin();
  let mut stdout = io::stdout();

  loop {
    write!(stdout, "> ")?;
    stdout.flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    let line = line.trim_end_matches(['\n', '\r']);

    if let Some(partial) = line.strip_suffix('?') {
      print_completions(tree, session, partial);
      continue;
    }
    if line.trim().is_empty() {
      continue;
    }
    if let Err(err) = tree.dispatch(session, line) {
      eprintln!("error: {err}");
    }
  }

  Ok(())
}

fn main() -> Result<()> {
  env_logger::init();
  let cli = Cli::parse();

  let settings = load_settings(cli.config.as_deref())?;
  let tree = demo::build_tree(&settings).wrap_err("failed to build the command tree")?;
  let mut session = Session::new(cli.grants);
  log::debug!("settings: {settings:?}");

  if let Some(line) = cli.complete {
    print_completions(&tree, &session, &line);
    return Ok(());
  }

  if let Some(line) = cli.command {
    tree
      .dispatch(&mut session, &line)
      .wrap_err_with(|| format!("'{line}' failed"))?;
    return Ok(());
  }

  repl(&tree, &mut session)
}
