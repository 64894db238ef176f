//! String Catalog CLI
//!
//! Builds, inspects and formats resolved string catalogs.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use string_catalog::{
    discover_documents, BuildError, CatalogBuilder, CatalogConfig, QualifiedPath, ResolvedBuild,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "string-catalog")]
#[command(about = "Resolve cross-referencing localization string catalogs")]
struct Cli {
    /// Configuration file (layered over catalog.toml and CATALOG__* variables)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Source directory (overrides source.dir)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog and report errors and warnings
    Build {
        /// Write the flattened catalog (JSON) to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Treat flow warnings as fatal
        #[arg(long)]
        warnings_as_errors: bool,
    },

    /// Format one catalog entry
    Format {
        /// Qualified path, e.g. waqi::config::step::user::title
        path: String,
        /// Placeholder values as name=value
        #[arg(short = 'v', long = "value")]
        values: Vec<String>,
    },

    /// Export the reference graph as DOT
    Graph {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// List the paths that depend on this one instead
        #[arg(long)]
        dependents: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to this file instead of printing
        #[arg(long)]
        save: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CatalogConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(dir) = cli.dir {
        config.source.dir = Some(dir);
    }

    match cli.command {
        Commands::Build {
            output,
            warnings_as_errors,
        } => {
            if warnings_as_errors {
                config.validation.warnings_as_errors = true;
            }
            let build = build(&config)?;
            let catalog = &build.catalog;

            println!(
                "✅ Built {} entries across {} namespaces ({})",
                catalog.len(),
                catalog.namespaces().count(),
                catalog.fingerprint().short()
            );
            println!("   {} references", build.graph.reference_count());
            if !build.warnings.is_empty() {
                println!();
                println!("⚠️  {} flow warning(s):", build.warnings.len());
                for warning in &build.warnings {
                    println!("{}", warning);
                }
            }

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&catalog.to_flat_json())?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("📄 Wrote {}", path.display());
            }
            Ok(())
        }

        Commands::Format { path, values } => {
            let values = parse_values(&values)?;
            let build = build(&config)?;
            println!("{}", build.catalog.format(&path, &values)?);
            Ok(())
        }

        Commands::Graph { output, dependents } => {
            let build = build(&config)?;

            if let Some(target) = dependents {
                let target = QualifiedPath::parse(&target)
                    .ok_or_else(|| anyhow!("'{}' is not a qualified path", target))?;
                let found = build.graph.dependents(&target);
                if found.is_empty() {
                    println!("No entries depend on {}", target);
                }
                for (path, depth) in found {
                    println!("{}{}", "  ".repeat(depth), path);
                }
                return Ok(());
            }

            let dot = build.graph.to_dot();
            match output {
                Some(path) => {
                    std::fs::write(&path, dot)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("📄 Wrote {}", path.display());
                }
                None => print!("{}", dot),
            }
            Ok(())
        }

        Commands::Config { save } => {
            match save {
                Some(path) => {
                    config.save(&path)?;
                    println!("📄 Wrote {}", path);
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
    }
}

fn build(config: &CatalogConfig) -> anyhow::Result<ResolvedBuild> {
    let dir = config
        .source_dir()
        .ok_or_else(|| anyhow!("no source directory; pass --dir or set source.dir"))?;
    let documents = discover_documents(&dir, &config.source)?;
    let builder = CatalogBuilder::new(config)?;

    builder.build(&documents).map_err(|err| {
        report(&err);
        anyhow!(err)
    })
}

fn report(err: &BuildError) {
    eprintln!("❌ Build failed");
    for failure in &err.errors {
        eprintln!("   └─ {}", failure);
    }
    for warning in &err.warnings {
        eprintln!("{}", warning);
    }
}

fn parse_values(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut values = HashMap::with_capacity(raw.len());
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("placeholder value '{}' must look like name=value", pair);
        };
        values.insert(name.to_string(), value.to_string());
    }
    Ok(values)
}
