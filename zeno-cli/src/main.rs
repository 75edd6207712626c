use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use zeno_core::{
    CompletionBackend, EngineConfig, IdKind, RandomSource, ResolveOutcome, Resolver, RngSource, Session, Task,
    TaskStore, seed_tasks,
};

mod auth;
mod config;
mod llm;
mod render;
mod repl;
mod state;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ZENO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "zeno", version = VERSION, about = "ZENO: gamified schedule conflict resolver")]
struct Cli {
    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session on the starter timeline (or a task file)
    Play {
        #[arg(long)]
        tasks: Option<PathBuf>,

        /// Skip the remote model and use the local scheduler only
        #[arg(long)]
        offline: bool,

        /// Seed for chaos injection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Resolve a task file once and print the result
    Resolve {
        /// JSON task list (either schema); defaults to the starter timeline
        #[arg(long)]
        tasks: Option<PathBuf>,

        /// urgency | importance | energy | balanced
        #[arg(long)]
        rule: Option<String>,

        #[arg(long)]
        offline: bool,

        /// Inject this many chaos tasks before resolving
        #[arg(long, default_value_t = 0)]
        chaos: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the resolved tasks as JSON instead of a timeline
        #[arg(long)]
        json: bool,
    },

    /// Print a timeline with conflict flags and the stress reading
    Timeline {
        #[arg(long)]
        tasks: Option<PathBuf>,
    },

    /// Print one injected chaos task as JSON
    Chaos {
        #[arg(long)]
        tasks: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage ~/.zeno/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store API keys in ~/.zeno/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    PasteGeminiKey,
    PasteOpenaiKey,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    debug!(version = VERSION, "starting");

    match cli.command {
        Command::Play { tasks, offline, seed } => {
            let (engine, resolver) = build_engine(offline)?;
            let session = Arc::new(
                Session::with_tasks(engine, resolver, load_tasks(tasks.as_deref())?)
                    .context("invalid task list")?,
            );
            repl::run(session, rng_for(seed)).await?;
        }

        Command::Resolve {
            tasks,
            rule,
            offline,
            chaos,
            seed,
            json,
        } => {
            let (engine, resolver) = build_engine(offline)?;
            let session = Session::with_tasks(engine, resolver, load_tasks(tasks.as_deref())?)
                .context("invalid task list")?;
            if let Some(rule) = rule {
                session.select_rule(&rule);
            }

            let mut rng = rng_for(seed);
            for _ in 0..chaos {
                session.inject_chaos(rng.as_mut());
            }
            info!(tasks = session.tasks().len(), conflicts = session.conflict_count(), "resolving");

            let outcome = session.resolve().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&session.tasks())?);
            } else {
                render::print_advisories(&session.drain_advisories());
                println!("{}", render::outcome_line(&outcome));
                render::print_timeline(&session.timeline(), &session.stress());
            }
            if let ResolveOutcome::Failed(e) = outcome {
                return Err(e).context("resolution failed");
            }
        }

        Command::Timeline { tasks } => {
            let engine = config::load_config()?.engine.to_engine_config()?;
            let resolver = offline_resolver(&engine);
            let session = Session::with_tasks(engine, resolver, load_tasks(tasks.as_deref())?)
                .context("invalid task list")?;
            render::print_timeline(&session.timeline(), &session.stress());
        }

        Command::Chaos { tasks, seed } => {
            let mut store = TaskStore::with_tasks(load_tasks(tasks.as_deref())?)
                .context("invalid task list")?;
            let id = store.next_id(IdKind::Chaos);
            let mut rng = rng_for(seed);
            let task = zeno_core::inject_chaos(store.tasks(), zeno_core::CHAOS_CATALOG, rng.as_mut(), id)
                .context("chaos catalog is empty")?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteGeminiKey => auth::gemini_paste_api_key()?,
            AuthCommand::PasteOpenaiKey => auth::openai_paste_api_key()?,
        },
    }

    Ok(())
}

fn load_tasks(path: Option<&Path>) -> Result<Vec<Task>> {
    match path {
        Some(p) => state::read_tasks(p),
        None => Ok(seed_tasks()),
    }
}

fn rng_for(seed: Option<u64>) -> Box<dyn RandomSource + Send> {
    match seed {
        Some(s) => Box::new(RngSource::seeded(s)),
        None => Box::new(RngSource::from_os()),
    }
}

fn offline_resolver(engine: &EngineConfig) -> Arc<dyn Resolver> {
    Arc::new(zeno_core::LocalResolver::new(zeno_core::LocalScheduler::new(engine.window)))
}

/// Engine settings plus the resolver stack the config asks for. A missing
/// API key degrades to local-only with a warning rather than failing.
fn build_engine(offline: bool) -> Result<(EngineConfig, Arc<dyn Resolver>)> {
    let cfg = config::load_config()?;
    let engine = cfg.engine.to_engine_config()?;
    if offline {
        return Ok((engine.clone(), offline_resolver(&engine)));
    }

    let auth = auth::load_auth()?;
    let resolver = match llm::backend_from_config(&cfg.llm, &auth) {
        Ok(Some(backend)) => {
            debug!(backend = backend.name(), model = %cfg.llm.model, "remote resolution enabled");
            Session::remote_resolver(&engine, backend)
        }
        Ok(None) => offline_resolver(&engine),
        Err(e) => {
            warn!("{e:#}; using local scheduler only");
            offline_resolver(&engine)
        }
    };
    Ok((engine, resolver))
}
