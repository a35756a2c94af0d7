use anyhow::{Result, anyhow};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{error, info, warn};

use shuangse_db::db::{fetch_tickets, format_timestamp, insert_ticket};
use shuangse_db::models::{Ticket, TicketRecord};
use shuangse_db::rusqlite::Connection;
use shuangse_model::snapshot::ModelSnapshot;

use crate::config::{Config, Generator};
use crate::feed::FeedClient;
use crate::load_history;
use crate::scoring::score_tickets;

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    snapshot: Arc<RwLock<Arc<ModelSnapshot>>>,
    feed: Arc<FeedClient>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(conn: Connection, snapshot: ModelSnapshot, feed: FeedClient, config: Config) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            feed: Arc::new(feed),
            config: Arc::new(config),
        }
    }

    fn current_snapshot(&self) -> Result<Arc<ModelSnapshot>> {
        let guard = self.snapshot.read().map_err(|_| anyhow!("Verrou du modèle empoisonné"))?;
        Ok(Arc::clone(&guard))
    }

    fn swap_snapshot(&self, snapshot: ModelSnapshot) -> Result<()> {
        let mut guard = self.snapshot.write().map_err(|_| anyhow!("Verrou du modèle empoisonné"))?;
        *guard = Arc::new(snapshot);
        Ok(())
    }

    /// Exécute `f` sur la connexion dans un thread bloquant.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| anyhow!("Verrou de la base empoisonné"))?;
            f(&guard)
        })
        .await?
    }
}

pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Requête en échec");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Erreur : {}", self.0)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

/// Ticket tel que renvoyé par `/lotteryHistory`.
#[derive(Debug, Serialize, PartialEq)]
pub struct TicketView {
    pub id: i64,
    pub lottery: String,
    pub code: Option<String>,
    pub date: Option<String>,
    pub red: Option<String>,
    pub blue: Option<String>,
    #[serde(rename = "myPrizeGrade")]
    pub my_prize_grade: Option<u8>,
    pub create_time_str: String,
}

impl From<TicketRecord> for TicketView {
    fn from(record: TicketRecord) -> Self {
        TicketView {
            id: record.id,
            lottery: record.code,
            code: record.issue,
            date: record.draw_date,
            red: record.red.map(|r| r.replace(',', " ")),
            blue: record.blue,
            my_prize_grade: record.prize_tier,
            create_time_str: format_timestamp(record.created_at),
        }
    }
}

pub fn create_ticket<R: Rng + ?Sized>(
    conn: &Connection,
    snapshot: &ModelSnapshot,
    generator: Generator,
    rng: &mut R,
    now: NaiveDateTime,
) -> Result<Ticket> {
    let ticket = generator.generate(snapshot, rng);
    let id = insert_ticket(conn, &ticket, now)?;
    info!(id, code = %ticket, "Ticket enregistré");
    Ok(ticket)
}

pub fn ticket_views(conn: &Connection) -> Result<Vec<TicketView>> {
    Ok(fetch_tickets(conn, u32::MAX)?
        .into_iter()
        .map(TicketView::from)
        .collect())
}

async fn lottery(State(state): State<AppState>) -> Result<String, AppError> {
    let snapshot = state.current_snapshot()?;
    let generator = state.config.generator.strategy;
    let ticket = state
        .with_conn(move |conn| {
            let mut rng = rand::rng();
            create_ticket(conn, &snapshot, generator, &mut rng, Local::now().naive_local())
        })
        .await?;
    Ok(ticket.to_code())
}

async fn lottery_history(State(state): State<AppState>) -> Result<Json<Vec<TicketView>>, AppError> {
    let views = state.with_conn(ticket_views).await?;
    Ok(Json(views))
}

async fn query_kjgg(State(state): State<AppState>) -> &'static str {
    tokio::spawn(async move {
        if let Err(e) = refresh(&state).await {
            error!(error = %e, "Relève des résultats en échec");
        }
    });
    "success"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lottery", post(lottery))
        .route("/lotteryHistory", post(lottery_history))
        .route("/queryKjgg", get(query_kjgg))
        .with_state(state)
}

/// Relève du flux, classement des tickets, puis reconstruction du modèle.
pub async fn refresh(state: &AppState) -> Result<()> {
    let draws = state.feed.fetch().await?;
    let close = state.config.draw_time()?;
    let mode = state.config.eval_mode();
    let csv = state.config.generator.history_csv.clone();

    let snapshot = state
        .with_conn(move |conn| {
            score_tickets(conn, &draws, close, mode)?;
            let history = load_history(conn, csv.as_deref())?;
            Ok(ModelSnapshot::build(&history))
        })
        .await?;
    state.swap_snapshot(snapshot)?;
    Ok(())
}

/// Durée jusqu'à la prochaine occurrence de `at`, strictement après `now`.
pub fn until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today = now.date().and_time(at);
    let next = if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

async fn run_scheduler(state: AppState, at: NaiveTime) {
    loop {
        let wait = until_next(Local::now().naive_local(), at);
        info!(minutes = wait.as_secs() / 60, "Prochaine relève programmée");
        tokio::time::sleep(wait).await;
        if let Err(e) = refresh(&state).await {
            warn!(error = %e, "Relève programmée en échec");
        }
    }
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let at = state.config.schedule_time()?;

    let startup = state.clone();
    tokio::spawn(async move {
        if let Err(e) = refresh(&startup).await {
            warn!(error = %e, "Relève initiale en échec");
        }
    });
    tokio::spawn(run_scheduler(state.clone(), at));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Serveur démarré");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Arrêt demandé");
        })
        .await?;
    Ok(())
}
