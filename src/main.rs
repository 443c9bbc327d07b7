//! grf: find verified GPAC / MP4Box command lines for a goal.
//!
//! Without a subcommand, reads a `{"goal": "...", "limit": 5}` request on
//! stdin and writes the JSON response on stdout. Errors in that mode are
//! reported as a JSON object with exit status 0, so a calling hook never
//! blocks on them.

use clap::{Parser, Subcommand};
use colored::*;
use gpac_recipe_finder::engine::CommandResult;
use gpac_recipe_finder::scripts::ScriptMatch;
use gpac_recipe_finder::{Config, Confidence, Engine, FindResponse, FinderError};
use serde::Deserialize;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "grf")]
#[command(about = "Find verified GPAC / MP4Box commands in the test-suite corpus")]
#[command(version)]
struct Cli {
    /// Test corpus XML (overrides XML_TESTS_PATH)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Alias table JSON (overrides ALIASES_PATH)
    #[arg(long, global = true)]
    aliases: Option<PathBuf>,

    /// Test-suite scripts directory (overrides SCRIPTS_DIR)
    #[arg(long, global = true)]
    scripts: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find commands that accomplish a goal
    Find {
        #[arg(required = true)]
        goal: Vec<String>,

        /// Maximum number of commands (1-10)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the JSON response instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Search tests by keywords
    Tests {
        #[arg(required = true)]
        keywords: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Include subtest names and descriptions
        #[arg(long)]
        subtests: bool,
    },

    /// List tests in corpus order
    List {
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        subtests: bool,
    },

    /// Show one test with its commands
    Show { name: String },

    /// Print a dry-run shell script reproducing a test
    Repro { name: String },

    /// Validate a command against the installed tools' documentation
    Validate {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Look up tool documentation
    Docs {
        #[command(subcommand)]
        target: DocsTarget,
    },

    /// Read or search the test-suite scripts
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },

    /// Print index statistics
    Stats,
}

#[derive(Subcommand)]
enum DocsTarget {
    /// Components carrying an option (or a `--global` option)
    Option { name: String },
    /// Full help of one component
    Filter { name: String },
    /// MP4Box switch and its help groups
    Switch {
        #[arg(allow_hyphen_values = true)]
        name: String,
    },
}

#[derive(Subcommand)]
enum ScriptAction {
    /// Print lines START..=END (1-based) of a loaded script
    Read {
        path: String,
        start: usize,
        end: usize,
    },
    /// Case-insensitive regex search
    Search {
        #[arg(allow_hyphen_values = true)]
        pattern: String,

        /// Context lines around each match
        #[arg(short, long, default_value_t = 3)]
        context: usize,
    },
}

/// Request payload read from stdin
#[derive(Debug, Deserialize)]
struct FindRequest {
    goal: String,
    #[serde(default)]
    limit: Option<usize>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(cli.corpus, cli.aliases, cli.scripts);

    match cli.command {
        None => {
            if let Err(e) = run_request(config) {
                error!("Error: {}", e);
                let output = serde_json::json!({ "error": "REQUEST_FAILED", "message": e.to_string() });
                println!("{}", output);
                std::process::exit(0);
            }
        }
        Some(command) => {
            if let Err(e) = run_command(config, command) {
                error!("Error: {}", e);
                eprintln!("{} {}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
    }
}

fn run_request(config: Config) -> Result<(), FinderError> {
    let mut input_json = String::new();
    io::stdin().read_to_string(&mut input_json)?;
    debug!("Received input: {}", input_json);

    let request: FindRequest = serde_json::from_str(&input_json)?;
    info!(
        "Processing goal: {}",
        request.goal.chars().take(50).collect::<String>()
    );

    let engine = Engine::load(config);
    let response = engine.find_commands(&request.goal, request.limit);
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn run_command(config: Config, command: Commands) -> Result<(), FinderError> {
    let engine = Engine::load(config);

    match command {
        Commands::Find { goal, limit, json } => {
            let response = engine.find_commands(&goal.join(" "), limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_find(&response);
            }
        }
        Commands::Tests {
            keywords,
            limit,
            offset,
            subtests,
        } => {
            let page = engine.find_tests(&keywords, limit, offset, subtests);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::List {
            limit,
            offset,
            subtests,
        } => {
            let page = engine.list_tests(limit, offset, subtests);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Show { name } => {
            println!("{}", serde_json::to_string_pretty(&engine.test_detail(&name)?)?);
        }
        Commands::Repro { name } => println!("{}", engine.repro_script(&name)?),
        Commands::Validate { command } => {
            let result = engine.validate(&command.join(" "));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Docs { target } => print_docs(&engine, target),
        Commands::Script { action } => match action {
            ScriptAction::Read { path, start, end } => {
                println!("{}", engine.scripts().read_segment(&path, start, end)?);
            }
            ScriptAction::Search { pattern, context } => {
                print_script_matches(&engine.scripts().search(&pattern, context)?);
            }
        },
        Commands::Stats => println!("{}", serde_json::to_string_pretty(&engine.stats())?),
    }

    Ok(())
}

// ============================================================================
// Human-readable output
// ============================================================================

fn colored_confidence(confidence: Confidence) -> ColoredString {
    match confidence {
        Confidence::High => confidence.as_str().green(),
        Confidence::Medium => confidence.as_str().yellow(),
        Confidence::Low => confidence.as_str().red(),
    }
}

fn print_find(response: &FindResponse) {
    match response {
        FindResponse::NoMatch { query, .. } => {
            println!("{} no command matches {:?}", "NO_MATCH".red().bold(), query);
        }
        FindResponse::Found { commands, note, .. } => {
            for (i, item) in commands.iter().enumerate() {
                print_command(i + 1, item);
            }
            println!("{}", note.dimmed());
        }
    }
}

fn print_command(rank: usize, item: &CommandResult) {
    println!(
        "{}. {} [{}] (score: {})",
        rank,
        format!("{}/{}", item.test, item.subtest).bold(),
        colored_confidence(item.confidence),
        item.score
    );
    if !item.description.is_empty() {
        println!("   {}", item.description);
    }
    println!("   $ {}", item.command.cyan());
    if let Some(original) = &item.original_command {
        println!("   {} {}", "from:".dimmed(), original.dimmed());
    }
    for issue in &item.validation_errors {
        match &issue.suggestion {
            Some(hint) => println!("   {} {} ({})", "✗".red(), issue.message, hint),
            None => println!("   {} {}", "✗".red(), issue.message),
        }
    }
    for warning in &item.validation_warnings {
        println!("   {} {}", "!".yellow(), warning);
    }
    println!();
}

fn print_docs(engine: &Engine, target: DocsTarget) {
    let docs = engine.docs();
    match target {
        DocsTarget::Option { name } => {
            if let Some(description) = docs.filters().global_option(&name) {
                println!("{} (global): {}", name.bold(), description);
                return;
            }
            let owners = docs.options_named(&name);
            if owners.is_empty() {
                println!("No component documents option '{}'", name);
            }
            for doc in owners {
                println!("{}.{}: {}", doc.component.bold(), doc.option, doc.description);
            }
        }
        DocsTarget::Filter { name } => println!("{}", docs.component_help(&name)),
        DocsTarget::Switch { name } => {
            let entries = docs.switch_info(&name);
            if entries.is_empty() {
                println!("Unknown MP4Box switch: {}", name);
            }
            for doc in entries {
                println!("{} [{}]: {}", doc.switch.bold(), doc.group, doc.description);
            }
        }
    }
}

fn print_script_matches(matches: &[ScriptMatch]) {
    for hit in matches {
        println!("{}:{}", hit.file.bold(), hit.line);
        for line in &hit.context {
            let marker = if line.line == hit.line { ">" } else { " " };
            println!("{} {:>5} | {}", marker, line.line, line.content);
        }
        println!();
    }
    println!("{}", format!("{} match(es)", matches.len()).dimmed());
}
