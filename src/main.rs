use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use node_locator::config::{load_rule_set, Mode};
use node_locator::query::{segments, Rule, Traversal};
use node_locator::tree::{frame_documents, load_snapshot_path, MemoryTree, NodeId};
use node_locator::unique::unique;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "node-locator")]
#[command(about = "Locate elements in document snapshots with compact rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Log engine decisions to stderr (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate elements matching a rule in a snapshot
    Locate {
        /// Rule text, e.g. `ppcl=sidebar;tag=iframe`
        #[arg(short, long)]
        rule: String,

        /// JSON document snapshot
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Also return matches nested inside other matches
        #[arg(short, long, conflicts_with = "roots")]
        all: bool,

        /// Print the reduced search roots instead of matches
        #[arg(long)]
        roots: bool,

        /// Also search documents embedded in frames
        #[arg(long)]
        frames: bool,
    },

    /// Parse a rule and show how it compiles
    Check {
        /// Rule text to check
        rule: String,
    },

    /// Evaluate every rule of a rule-set file against a snapshot
    Run {
        /// TOML rule-set file
        #[arg(short, long)]
        rules: PathBuf,

        /// JSON document snapshot
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Locate {
            rule,
            snapshot,
            all,
            roots,
            frames,
        } => cmd_locate(&rule, &snapshot, all, roots, frames),

        Commands::Check { rule } => cmd_check(&rule),

        Commands::Run { rules, snapshot } => cmd_run(&rules, &snapshot),
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_tree(snapshot: &Path) -> Result<(MemoryTree, NodeId)> {
    load_snapshot_path(snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))
}

fn cmd_locate(rule_text: &str, snapshot: &Path, all: bool, roots: bool, frames: bool) -> Result<()> {
    let rule: Rule = rule_text.parse()?;
    let (tree, document) = load_tree(snapshot)?;

    let mut scopes = vec![document];
    if frames {
        scopes.extend(frame_documents(&tree, document));
    }

    let traversal = if all {
        Traversal::AllMatches
    } else {
        Traversal::FirstMatch
    };
    let found = unique(scopes.iter().flat_map(|scope| {
        if roots {
            rule.locate_roots(&tree, Some(*scope))
        } else {
            rule.locate(&tree, Some(*scope), traversal)
        }
    }));

    if found.is_empty() {
        eprintln!("{}", format!("No matches for {rule}").yellow());
        return Ok(());
    }

    for node in &found {
        println!("{}", tree.path(*node));
    }
    eprintln!(
        "{} {} {}",
        "✓".green(),
        found.len(),
        if roots { "root(s)" } else { "match(es)" }
    );
    Ok(())
}

fn cmd_check(rule_text: &str) -> Result<()> {
    let mut usable = 0usize;
    let mut rows = Vec::new();
    for (index, segment) in segments(rule_text).enumerate() {
        match segment {
            Ok(identifier) => {
                usable += 1;
                rows.push(format!(
                    "  {:<3} {:<24} {:<8} {:<12} {}",
                    index + 1,
                    identifier.encode(),
                    format!("{:?}", identifier.kind()).to_lowercase(),
                    format!("{:?}", identifier.scope()).to_lowercase(),
                    if identifier.is_wildcard() { "wildcard" } else { "" }
                ));
            }
            Err(reason) => {
                rows.push(format!(
                    "  {:<3} {}",
                    index + 1,
                    format!("skipped: {reason}").yellow()
                ));
            }
        }
    }

    if usable == 0 {
        eprintln!(
            "{} {}",
            "✗".red(),
            format!("'{rule_text}' contains no usable predicates").red()
        );
        for row in rows {
            eprintln!("{row}");
        }
        std::process::exit(1);
    }

    let rule: Rule = rule_text.parse()?;
    println!("{} {}", "Rule:".bold(), rule);
    println!(
        "  {:<3} {:<24} {:<8} {:<12} {}",
        "#".dimmed(),
        "predicate".dimmed(),
        "kind".dimmed(),
        "scope".dimmed(),
        "".dimmed()
    );
    for row in rows {
        println!("{row}");
    }
    Ok(())
}

fn cmd_run(rules: &Path, snapshot: &Path) -> Result<()> {
    let rule_set = load_rule_set(rules)?;
    let (tree, document) = load_tree(snapshot)?;

    if !rule_set.name().is_empty() {
        println!("{} {}", "Rule set:".bold(), rule_set.name());
    }
    if let Some(description) = rule_set.description() {
        println!("{}", description.dimmed());
    }
    println!();

    let outcomes = rule_set.run(&tree, document);
    let mut total = 0usize;
    for outcome in &outcomes {
        total += outcome.nodes.len();
        let label = match outcome.mode {
            Mode::First => "first",
            Mode::All => "all",
            Mode::Roots => "roots",
        };
        if outcome.nodes.is_empty() {
            println!(
                "{} {} ({}): {}",
                "⊘".cyan(),
                outcome.name,
                label,
                "no matches".dimmed()
            );
            continue;
        }
        println!(
            "{} {} ({}): {}",
            "✓".green(),
            outcome.name,
            label,
            outcome.nodes.len()
        );
        for node in &outcome.nodes {
            println!("    {}", tree.path(*node));
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} rule(s)", outcomes.len());
    println!("  {} node(s) located", format!("{total}").green());
    Ok(())
}
