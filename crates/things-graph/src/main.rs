//! CLI entry point for the things-graph property graph.
//!
//! Reads a JSON graph document from stdin, builds the graph, and writes the
//! requested JSON view to stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

use things_core::ThingsConfig;
use things_graph::{EntityGraph, GraphDocument};

#[derive(Parser)]
#[command(name = "things-graph")]
#[command(about = "In-memory typed property graph of entities, attributes, and relationships")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: things).
    #[arg(short, long, default_value = "things", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Serialize every member of the graph.
    Dump {
        /// Expansion depth (overrides graph.max_expand_depth).
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Serialize a single entity.
    Show {
        /// Entity identifier.
        #[arg(long)]
        id: String,
        /// Expansion depth (overrides graph.max_expand_depth).
        #[arg(long)]
        depth: Option<usize>,
    },
    /// List relationships, optionally filtered by type.
    Relationships {
        /// Exact relation type to match.
        #[arg(long = "type")]
        relation_type: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ThingsConfig::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.graph.log_filter));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let input = std::io::read_to_string(std::io::stdin())?;
    let graph = GraphDocument::from_json(&input)?.build()?;
    let default_depth = config.graph.max_expand_depth;

    let output = match cli.command {
        Command::Dump { depth } => dump(&graph, depth.unwrap_or(default_depth)),
        Command::Show { ref id, depth } => {
            let entity = graph
                .get_entity(id)
                .ok_or_else(|| anyhow::anyhow!("Entity not found: {id}"))?;
            entity.serialize_depth(depth.unwrap_or(default_depth))
        }
        Command::Relationships { ref relation_type } => {
            let rels: Vec<Value> = graph
                .find_relationships(relation_type.as_deref())
                .iter()
                .map(|rel| {
                    let mut value = rel.serialize(false);
                    if let (Some(map), Some(sentence)) = (value.as_object_mut(), rel.sentence()) {
                        map.insert("sentence".into(), Value::String(sentence));
                    }
                    value
                })
                .collect();
            Value::Array(rels)
        }
    };

    if config.graph.pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }

    Ok(())
}

fn dump(graph: &EntityGraph, depth: usize) -> Value {
    let entities: Vec<Value> = graph.iter().map(|e| e.serialize_depth(depth)).collect();
    json!({
        "summary": graph.summary(),
        "entities": entities,
    })
}
