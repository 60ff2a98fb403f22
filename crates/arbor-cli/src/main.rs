use arbor::{
    ArborConfig, ExpansionOutcome, Explorer, LayoutConfig, RawReply, ScriptedClient, Tree,
    Viewport, decode_reply, layout_tree, merge_candidates,
};
use futures::executor::block_on;
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEMO_ROOT_NAME: &str = "Artificial Intelligence";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Arbor(arbor::Error),
    Json(serde_json::Error),
    Expansion(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Arbor(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Expansion(msg) => write!(f, "expansion failed: {msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<arbor::Error> for CliError {
    fn from(value: arbor::Error) -> Self {
        Self::Arbor(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Ask,
    Merge,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    node: Option<String>,
    question: Option<String>,
    reply: Option<String>,
    configs: Vec<String>,
    overrides: Vec<String>,
    viewport_width: Option<f64>,
    viewport_height: Option<f64>,
}

fn usage() -> &'static str {
    "arbor-cli\n\
\n\
USAGE:\n\
  arbor-cli [layout] [--pretty] [--config <path>]... [--set <key=value>]... \
[--viewport-width <w>] [--viewport-height <h>] [<tree.json>|-]\n\
  arbor-cli ask --node <id> --question <text> [--pretty] [--config <path>]... \
[--set <key=value>]... [<tree.json>|-]\n\
  arbor-cli merge --node <id> --reply <reply.json> [--pretty] [<tree.json>|-]\n\
\n\
NOTES:\n\
  - layout and merge read the tree from stdin if <tree.json> is omitted or '-'.\n\
  - ask starts from a fresh demo root if <tree.json> is omitted and answers from a built-in \
catalogue.\n\
  - ask and merge print the resulting tree; layout prints node positions and edges.\n\
  - Each --config document is layered over the previous ones; --set overrides are applied last\n\
    (e.g. --set layout.topMargin=20 --set explorer.policy=serialize).\n\
  - Set ARBOR_LOG (e.g. ARBOR_LOG=debug) to control diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "ask" => args.command = Command::Ask,
            "merge" => args.command = Command::Merge,
            "--pretty" => args.pretty = true,
            "--node" => {
                let Some(node) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.node = Some(node.clone());
            }
            "--question" => {
                let Some(question) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.question = Some(question.clone());
            }
            "--reply" => {
                let Some(reply) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.reply = Some(reply.clone());
            }
            "--config" => {
                let Some(config) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.configs.push(config.clone());
            }
            "--set" => {
                let Some(assignment) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.overrides.push(assignment.clone());
            }
            "--viewport-width" => {
                let Some(w) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.viewport_width = Some(w.parse::<f64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--viewport-height" => {
                let Some(h) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.viewport_height =
                    Some(h.parse::<f64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    match args.command {
        Command::Ask if args.node.is_none() || args.question.is_none() => {
            Err(CliError::Usage(usage()))
        }
        Command::Merge if args.node.is_none() || args.reply.is_none() => {
            Err(CliError::Usage(usage()))
        }
        _ => Ok(args),
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn read_tree(input: Option<&str>) -> Result<Tree, CliError> {
    Ok(Tree::from_json(&read_input(input)?)?)
}

fn read_config(paths: &[String], overrides: &[String]) -> Result<ArborConfig, CliError> {
    let mut config = ArborConfig::default();
    for path in paths {
        config.merge_from(&ArborConfig::from_json(&std::fs::read_to_string(path)?)?);
    }
    for assignment in overrides {
        config.apply_override(assignment)?;
    }
    Ok(config)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn viewport(args: &Args) -> Viewport {
    let default = Viewport::default();
    Viewport::new(
        args.viewport_width.unwrap_or(default.width),
        args.viewport_height.unwrap_or(default.height),
    )
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ARBOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn run(args: Args) -> Result<(), CliError> {
    let config = read_config(&args.configs, &args.overrides)?;

    match args.command {
        Command::Layout => {
            let tree = read_tree(args.input.as_deref())?;
            let layout_config = LayoutConfig::from_config(&config)?;
            let layout = layout_tree(&tree, viewport(&args), &layout_config);
            write_json(&layout, args.pretty)?;
            Ok(())
        }
        Command::Ask => {
            let tree = match args.input.as_deref() {
                None => Tree::new(DEMO_ROOT_NAME),
                input => read_tree(input)?,
            };
            let (Some(node), Some(question)) = (args.node.as_deref(), args.question.as_deref())
            else {
                return Err(CliError::Usage(usage()));
            };
            let explorer = Explorer::from_config(ScriptedClient::demo(), tree, &config)?
                .with_viewport(viewport(&args));
            match block_on(explorer.ask(node, question)) {
                ExpansionOutcome::Merged { added, .. } => {
                    tracing::info!(node, added = added.len(), "tree expanded");
                }
                ExpansionOutcome::TargetMissing { node_id } => {
                    return Err(CliError::Expansion(format!("node `{node_id}` not found")));
                }
                ExpansionOutcome::Rejected { error, .. }
                | ExpansionOutcome::Failed { error, .. } => {
                    return Err(CliError::Expansion(error.to_string()));
                }
                ExpansionOutcome::Cancelled { node_id } => {
                    return Err(CliError::Expansion(format!(
                        "request for `{node_id}` cancelled"
                    )));
                }
            }
            write_json(&explorer.tree(), args.pretty)?;
            Ok(())
        }
        Command::Merge => {
            let tree = read_tree(args.input.as_deref())?;
            let (Some(node), Some(reply_path)) = (args.node.as_deref(), args.reply.as_deref())
            else {
                return Err(CliError::Usage(usage()));
            };
            let body: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(reply_path)?)?;
            let decoded =
                decode_reply(RawReply::ok(body)).map_err(|e| CliError::Expansion(e.to_string()))?;
            let merged = merge_candidates(&tree, node, &decoded.candidates);
            if !merged.target_found {
                return Err(CliError::Expansion(format!("node `{node}` not found")));
            }
            tracing::info!(
                node,
                targets = merged.targets,
                added = merged.added.len(),
                duplicates = merged.duplicates,
                rejected = decoded.rejected + merged.malformed,
                "reply merged"
            );
            write_json(&merged.tree, args.pretty)?;
            Ok(())
        }
    }
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Expansion(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
