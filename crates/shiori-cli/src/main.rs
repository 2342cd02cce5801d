mod render;
mod terminal;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use shiori_core::config::{AppConfig, BackendKind};
use shiori_core::models::CatalogId;
use shiori_core::view::Section;
use shiori_runtime::{PageError, Runtime, RuntimeError, ScopeToken, SearchSession, ViewScope};

use crate::terminal::TerminalShell;

/// Shiori - Persian anime catalog
#[derive(Parser)]
#[command(name = "shiori")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog backend to use instead of the configured one
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one catalog section
    #[command(alias = "ls")]
    Section {
        /// latest, popular, episodes, movies, featured or donghua
        section: Section,
        /// Bypass the cached copy
        #[arg(long)]
        refresh: bool,
    },

    /// Show a title with its episodes and subtitles
    #[command(alias = "i")]
    Show { id: String },

    /// Show this week's broadcast schedule
    Schedule {
        #[arg(long)]
        refresh: bool,
    },

    /// Search titles
    #[command(alias = "s")]
    Search {
        query: Vec<String>,
        /// Read queries from stdin as you type, one per line
        #[arg(short, long)]
        interactive: bool,
    },

    /// Titles similar to the given one
    Similar { id: String },

    /// Toggle a title in favorites
    Fav { id: String },

    /// List favorites
    Favs,

    /// List recently watched titles
    Recent,

    /// Manage watch lists
    Lists {
        #[command(subcommand)]
        command: Option<ListCommands>,
    },

    /// Write the current config to the user config file
    Init,
}

#[derive(Subcommand)]
enum ListCommands {
    /// Create a list
    Create {
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Delete a list
    Rm { list_id: String },
    /// Add an item to a list
    Add {
        list_id: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Delete an item from a list
    RmItem { list_id: String, item_id: String },
    /// Toggle an item's completed flag
    Toggle { list_id: String, item_id: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shiori=info,shiori_runtime=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shell = TerminalShell::new();

    if let Err(e) = run(cli, &shell).await {
        match &e {
            RuntimeError::Page(PageError::Cancelled) => {}
            RuntimeError::Page(page) => shell.alert_page(page),
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, shell: &TerminalShell) -> Result<(), RuntimeError> {
    let mut config = AppConfig::load().map_err(|e| RuntimeError::Config(e.to_string()))?;
    if let Some(backend) = cli.backend {
        config.general.backend = backend;
    }

    if let Commands::Init = cli.command {
        config.save()?;
        println!("wrote {}", AppConfig::config_path().display());
        return Ok(());
    }

    let runtime = Arc::new(Runtime::from_config(config)?);
    runtime.boot(shell);

    // The whole command is one view; Ctrl-C leaves it.
    let scope = ViewScope::new();
    let token = scope.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            scope.cancel();
        }
    });

    match cli.command {
        Commands::Section { section, refresh } => {
            let cards = if refresh {
                runtime.refresh_section(section, &token).await?
            } else {
                runtime.load_section(section, &token).await?
            };
            render::cards(&cards);
        }
        Commands::Show { id } => {
            let id = CatalogId::from(id);
            let detail = runtime.open_detail(&id, &token).await?;
            let favorite = runtime.is_favorite(&id).await;
            render::detail(&detail, favorite);
        }
        Commands::Schedule { refresh } => {
            let snapshot = if refresh {
                runtime.refresh_schedule(&token).await?
            } else {
                runtime.load_schedule(&token).await?
            };
            render::schedule(&snapshot);
        }
        Commands::Search { query, interactive } => {
            if interactive {
                interactive_search(Arc::clone(&runtime), token).await;
            } else {
                let items = runtime.search(&query.join(" "), &token).await?;
                render::list_items(&items);
            }
        }
        Commands::Similar { id } => {
            let cards = runtime.similar(&CatalogId::from(id), &token).await?;
            render::cards(&cards);
        }
        Commands::Fav { id } => {
            let id = CatalogId::from(id);
            let now = runtime.toggle_favorite(&id).await?;
            println!("{id}: {}", if now { "added to favorites" } else { "removed from favorites" });
        }
        Commands::Favs => {
            let cards = runtime.favorite_cards(&token).await?;
            render::cards(&cards);
        }
        Commands::Recent => {
            let state = runtime.user_state().await;
            for id in &state.recently_watched {
                match runtime.load_detail(id, &token).await {
                    Ok(detail) => println!("{id}\t{}", detail.entry.title),
                    Err(PageError::NotFound(_)) => println!("{id}\t-"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Commands::Lists { command } => lists(&runtime, shell, command).await?,
        Commands::Init => {}
    }
    Ok(())
}

async fn lists(
    runtime: &Runtime,
    shell: &TerminalShell,
    command: Option<ListCommands>,
) -> Result<(), RuntimeError> {
    match command {
        None => render::lists(&runtime.user_state().await.lists),
        Some(ListCommands::Create { title }) => {
            let list = runtime.create_list(&title.join(" ")).await?;
            println!("created {} ({})", list.title, list.id);
        }
        Some(ListCommands::Rm { list_id }) => {
            if !runtime.remove_list(&list_id, shell).await? {
                println!("kept {list_id}");
            }
        }
        Some(ListCommands::Add { list_id, text }) => {
            let state = runtime.add_item(&list_id, &text.join(" ")).await?;
            render::lists(&state.lists);
        }
        Some(ListCommands::RmItem { list_id, item_id }) => {
            let state = runtime.remove_item(&list_id, &item_id).await?;
            render::lists(&state.lists);
        }
        Some(ListCommands::Toggle { list_id, item_id }) => {
            let state = runtime.toggle_item_completed(&list_id, &item_id).await?;
            render::lists(&state.lists);
        }
    }
    Ok(())
}

/// Every stdin line is the current contents of the search box.
async fn interactive_search(runtime: Arc<Runtime>, token: ScopeToken) {
    let mut session = SearchSession::spawn(runtime, token);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if open => match line {
                Ok(Some(text)) => {
                    session.input(text).await;
                }
                _ => {
                    open = false;
                    session.close();
                }
            },
            outcome = session.next_result() => match outcome {
                Some(outcome) => match outcome.result {
                    Ok(items) => {
                        println!("── {} ──", outcome.query);
                        render::list_items(&items);
                    }
                    Err(PageError::Cancelled) => {}
                    Err(e) => eprintln!("{}", e.user_message()),
                },
                None => break,
            },
        }
    }
}
