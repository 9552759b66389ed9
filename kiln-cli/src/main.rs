//! Kiln command-line front end
//!
//! Commands:
//! - compile: compile a JSON or YAML document with the sampling plugins
//! - schema: print the JSON schema of accepted documents
//! - docs: print markdown reference documentation
//! - list: print categories and their type tags

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kiln::{CompileConfig, Kiln, UnknownCategoryPolicy};
use kiln_core::Raw;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kiln", version, about = "Compile declarative object descriptions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document and print one line per object
    Compile {
        /// Input document (.json, .yaml or .yml)
        file: PathBuf,
        /// Compile configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Category compile order, comma separated
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
        /// Fail on categories missing from the compile order
        #[arg(long)]
        strict: bool,
    },
    /// Print the JSON schema of input documents
    Schema,
    /// Print markdown reference documentation
    Docs {
        /// Only document this category
        category: Option<String>,
    },
    /// List categories and their type tags
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let registry = kiln_sampling::standard_registry()?;

    match cli.command {
        Commands::Compile { file, config, order, strict } => {
            let compile_config = compile_config(config.as_deref(), order, strict)?;
            let document = read_document(&file)?;
            let kiln = Kiln::new(registry).with_config(compile_config);
            let objects = kiln.compile_all(&document)?;
            for object in &objects {
                println!(
                    "{} {} {}",
                    object.category().unwrap_or("-"),
                    object.kind(),
                    object.name().unwrap_or("-")
                );
            }
        }
        Commands::Schema => {
            let kiln = Kiln::new(registry);
            println!("{}", serde_json::to_string_pretty(&kiln.json_schema())?);
        }
        Commands::Docs { category } => {
            let kiln = Kiln::new(registry);
            print!("{}", kiln.docs(category.as_deref())?);
        }
        Commands::List => {
            for category in registry.categories() {
                let Some(compiler) = registry.compiler(&category) else {
                    continue;
                };
                let aliases = registry.aliases_for(&category);
                if aliases.is_empty() {
                    println!("{}", category);
                } else {
                    println!("{} (aliases: {})", category, aliases.join(", "));
                }
                for tag in compiler.type_tags() {
                    println!("  {}", tag);
                }
            }
        }
    }

    Ok(())
}

/// Configuration file (if any) overridden by command-line flags
fn compile_config(path: Option<&Path>, order: Vec<String>, strict: bool) -> Result<CompileConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            CompileConfig::from_json_str(&text)?
        }
        None => CompileConfig::default(),
    };
    if !order.is_empty() {
        config = config.with_compile_order(order);
    }
    if strict {
        config = config.with_unknown_categories(UnknownCategoryPolicy::Reject);
    }
    config.validate()?;
    Ok(config)
}

/// Read a document, choosing the syntax from the file extension
fn read_document(path: &Path) -> Result<Raw> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    debug!(path = %path.display(), extension, "reading document");
    parse_document(&text, extension).with_context(|| format!("parsing {}", path.display()))
}

fn parse_document(text: &str, extension: &str) -> Result<Raw> {
    match extension.to_ascii_lowercase().as_str() {
        "json" => Ok(serde_json::from_str(text)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(text)?),
        other => bail!("unsupported document type '{}': expected .json, .yaml or .yml", other),
    }
}
