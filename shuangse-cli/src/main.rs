mod config;
mod display;
mod feed;
mod scoring;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shuangse_db::db::{count_tickets, fetch_tickets, insert_ticket, migrate, open_db};
use shuangse_db::history::{load_csv_history, load_store_history};
use shuangse_db::rusqlite::Connection;
use shuangse_model::history::History;
use shuangse_model::prize::{EvalMode, evaluate_text};
use shuangse_model::snapshot::ModelSnapshot;

use crate::config::{CONFIG_FILE, Config, Generator, load_config};
use crate::display::{
    display_model, display_outcome, display_scoring_summary, display_ticket_records,
    display_tickets,
};
use crate::feed::FeedClient;
use crate::scoring::score_tickets;
use crate::server::AppState;

#[derive(Parser)]
#[command(name = "shuangse", about = "Générateur de grilles Shuangseqiu par chaîne de Markov")]
struct Cli {
    /// Fichier de configuration TOML
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Générer des grilles
    Generate {
        /// Nombre de grilles
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Stratégie de génération (par défaut : celle du fichier de configuration)
        #[arg(short, long)]
        strategy: Option<Generator>,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Historique CSV (6 rouges puis la bleue) à la place de la base
        #[arg(long)]
        history: Option<PathBuf>,

        /// Ne pas enregistrer les grilles
        #[arg(long)]
        no_save: bool,
    },

    /// Lister les derniers tickets
    List {
        /// Nombre de tickets à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Afficher les tables de transition et de fréquence
    Model {
        /// Historique CSV à la place de la base
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Classer une grille contre un tirage
    Check {
        /// Grille, ex. "01 02 03 04 05 06 07"
        ticket: String,

        /// Rouges officielles, ex. "01,02,03,04,05,06"
        red: String,

        /// Bleue officielle
        blue: String,

        /// Ignorer les numéros illisibles au lieu de rejeter
        #[arg(long)]
        lenient: bool,
    },

    /// Relever les résultats officiels et classer les tickets
    Fetch,

    /// Lancer le service HTTP
    Serve {
        /// Port d'écoute
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Afficher le chemin de la base de données
    DbPath,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.log_level);

    let path = config.db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Generate {
            count,
            strategy,
            seed,
            history,
            no_save,
        } => {
            let csv = history.or_else(|| config.generator.history_csv.clone());
            let generator = strategy.unwrap_or(config.generator.strategy);
            cmd_generate(&conn, generator, count, seed, csv.as_deref(), no_save)
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Model { history } => {
            let csv = history.or_else(|| config.generator.history_csv.clone());
            cmd_model(&conn, csv.as_deref())
        }
        Command::Check {
            ticket,
            red,
            blue,
            lenient,
        } => {
            let mode = if lenient { EvalMode::Lenient } else { config.eval_mode() };
            cmd_check(&ticket, &red, &blue, mode)
        }
        Command::Fetch => cmd_fetch(&conn, &config),
        Command::Serve { port } => cmd_serve(conn, config, port),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Historique dédoublonné : CSV si fourni, sinon tirages recopiés en base.
pub(crate) fn load_history(conn: &Connection, csv: Option<&Path>) -> Result<History> {
    let draws = match csv {
        Some(path) => load_csv_history(path)?,
        None => load_store_history(conn)?,
    };
    Ok(History::from_draws(draws))
}

fn cmd_generate(
    conn: &Connection,
    generator: Generator,
    count: usize,
    seed: Option<u64>,
    csv: Option<&Path>,
    no_save: bool,
) -> Result<()> {
    let history = load_history(conn, csv)?;
    let snapshot = ModelSnapshot::build(&history);
    if generator == Generator::Markov && !snapshot.is_trained() {
        println!("Historique vide : tirage uniforme.");
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let tickets: Vec<_> = (0..count)
        .map(|_| generator.generate(&snapshot, &mut rng))
        .collect();

    if !no_save {
        let now = Local::now().naive_local();
        for ticket in &tickets {
            insert_ticket(conn, ticket, now)?;
        }
        info!(count = tickets.len(), "Grilles enregistrées");
    }
    display_tickets(&tickets);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_tickets(conn)? == 0 {
        println!("Aucun ticket. Lancez d'abord : shuangse generate");
        return Ok(());
    }
    let tickets = fetch_tickets(conn, last)?;
    display_ticket_records(&tickets);
    Ok(())
}

fn cmd_model(conn: &Connection, csv: Option<&Path>) -> Result<()> {
    let history = load_history(conn, csv)?;
    if history.is_empty() {
        println!("Historique vide : aucun tirage classé. Lancez d'abord : shuangse fetch");
        return Ok(());
    }
    display_model(&ModelSnapshot::build(&history));
    Ok(())
}

fn cmd_check(ticket: &str, red: &str, blue: &str, mode: EvalMode) -> Result<()> {
    let outcome = evaluate_text(ticket, red, blue, mode)
        .with_context(|| format!("Grille ou tirage invalide : '{}' / '{}' + '{}'", ticket, red, blue))?;
    display_outcome(ticket, &outcome);
    Ok(())
}

fn cmd_fetch(conn: &Connection, config: &Config) -> Result<()> {
    let feed = FeedClient::new(&config.feed)?;
    let runtime = tokio::runtime::Runtime::new().context("Impossible de démarrer le runtime")?;
    let draws = runtime.block_on(feed.fetch())?;
    let summary = score_tickets(conn, &draws, config.draw_time()?, config.eval_mode())?;
    display_scoring_summary(&summary);
    Ok(())
}

fn cmd_serve(conn: Connection, config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let history = load_history(&conn, config.generator.history_csv.as_deref())?;
    let snapshot = ModelSnapshot::build(&history);
    let feed = FeedClient::new(&config.feed)?;
    let state = AppState::new(conn, snapshot, feed, config);

    let runtime = tokio::runtime::Runtime::new().context("Impossible de démarrer le runtime")?;
    runtime.block_on(server::serve(state, port))
}
