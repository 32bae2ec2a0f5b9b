use clap::{CommandFactory, Parser, Subcommand};
use std::path::Path;

use douban_meta_core::config::{config_path, load_config, load_config_from, save_config_to, AppConfig};
use douban_meta_core::error::ConfigError;
use douban_meta_core::lookup::chooser::{candidate_lines, parse_selection, CandidateChooser};
use douban_meta_core::lookup::douban::{DoubanConfig, DoubanProvider};
use douban_meta_core::lookup::raw::RawBook;
use douban_meta_core::lookup::{MetadataProvider, MetadataQuery};
use douban_meta_core::sink::FieldMap;

#[derive(Parser)]
#[command(name = "douban-meta")]
#[command(about = "Look up book metadata on Douban")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Override the configured API key
    #[arg(long, global = true)]
    apikey: Option<String>,

    /// Override the configured API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print raw search results for a title
    Search {
        /// Book title (exactly one; anything else prints usage)
        title: Vec<String>,

        /// Author, appended to the query
        #[arg(long)]
        author: Option<String>,
    },

    /// Fetch normalized metadata by id, ISBN or title
    Fetch {
        /// Douban subject id
        #[arg(long)]
        id: Option<String>,

        /// ISBN
        #[arg(long)]
        isbn: Option<String>,

        /// Title (searched when id/ISBN lookups find nothing)
        #[arg(long, default_value = "")]
        title: String,

        /// Author
        #[arg(long)]
        author: Option<String>,

        /// Prompt for a choice when the search is ambiguous
        #[arg(long)]
        select: bool,

        /// Write the downloaded cover image here
        #[arg(long)]
        cover: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

/// Lists candidates on stdout and reads an index from the terminal.
struct ConsoleChooser;

impl CandidateChooser for ConsoleChooser {
    fn choose(&self, title: &str, author: Option<&str>, candidates: &[RawBook]) -> Option<usize> {
        println!("\nSearch: <<{}>>, {}", title, author.unwrap_or(""));
        for line in candidate_lines(candidates) {
            println!("{}", line);
        }
        let answer: String = dialoguer::Input::new()
            .with_prompt("Select")
            .allow_empty(true)
            .interact_text()
            .ok()?;
        parse_selection(&answer, candidates.len())
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Search { title, author } => match title.as_slice() {
            [title] => run_search(&cli, title, author.as_deref()),
            _ => print_search_usage(),
        },
        Commands::Fetch { id, isbn, title, author, select, cover } => {
            let query = MetadataQuery {
                identifier: id.clone(),
                isbn: isbn.clone(),
                title: title.clone(),
                author: author.clone(),
            };
            run_fetch(&cli, &query, *select, cover.as_deref())
        }
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn provider_config(cli: &Cli) -> DoubanConfig {
    let mut config = DoubanConfig::from(&load_config().douban);
    if let Some(key) = &cli.apikey {
        config.apikey = key.clone();
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    config
}

fn print_search_usage() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cmd = Cli::command();
    if let Some(search) = cmd.find_subcommand_mut("search") {
        search.print_help()?;
    }
    Ok(())
}

fn run_search(
    cli: &Cli,
    title: &str,
    author: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let provider = DoubanProvider::new(provider_config(cli))?;
    let books = provider.search_by_title(title, author)?.unwrap_or_default();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&books)?);
    } else if books.is_empty() {
        println!("No results found");
    } else {
        for line in candidate_lines(&books) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn run_fetch(
    cli: &Cli,
    query: &MetadataQuery,
    select: bool,
    cover: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = provider_config(cli);
    if cover.is_some() {
        config.copy_image = true;
    }
    let provider = DoubanProvider::new(config)?.with_chooser(ConsoleChooser);
    let found = if select {
        provider.select_metadata(query)
    } else {
        provider.get_metadata(query)
    };
    let Some(md) = found else {
        if cli.json {
            println!("null");
        } else {
            println!("No metadata found");
        }
        return Ok(());
    };

    if let (Some(out), Some(data)) = (cover, md.cover_data.as_ref()) {
        std::fs::write(Path::new(out), &data.data)?;
        if !cli.json {
            println!("Saved cover to {}", out);
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&md)?);
    } else {
        let mut fields = FieldMap::new();
        md.apply_to(&mut fields);
        for (key, value) in fields.iter() {
            println!("{:>12}: {}", key, value);
        }
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or(ConfigError::NoConfigDir)?;
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return Ok(());
            }
            save_config_to(&AppConfig::default(), &path)?;
            println!("Created config at {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or(ConfigError::NoConfigDir)?;
            let mut cfg = load_config_from(&path)?;
            cfg.set(key, value)?;
            save_config_to(&cfg, &path)?;
            if !json {
                println!("Set {} = {}", key, value);
            }
        }
    }
    Ok(())
}
