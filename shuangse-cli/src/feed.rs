use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use shuangse_db::models::OfficialDraw;

use crate::config::FeedConfig;

pub const DEFAULT_FEED_URL: &str =
    "http://www.cwl.gov.cn/cwl_admin/front/cwlkj/search/kjxx/findDrawNotice?name=ssq&issueCount=30";

const FEED_REFERER: &str = "http://www.cwl.gov.cn/ygkj/kjgg/";
const FEED_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.99 Safari/537.36";

#[derive(Debug, Deserialize)]
pub struct NoticeResponse {
    #[serde(default)]
    pub state: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Vec<NoticeItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoticeItem {
    #[serde(default)]
    pub code: String,
    #[serde(default, rename = "detailsLink")]
    pub details_link: String,
    #[serde(default, rename = "videoLink")]
    pub video_link: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub week: String,
    #[serde(default)]
    pub red: String,
    #[serde(default)]
    pub blue: String,
    #[serde(default)]
    pub sales: String,
    #[serde(default, rename = "poolmoney")]
    pub pool_money: String,
    #[serde(default)]
    pub content: String,
}

impl From<NoticeItem> for OfficialDraw {
    fn from(item: NoticeItem) -> Self {
        OfficialDraw {
            issue: item.code,
            date: item.date,
            week: item.week,
            red: item.red,
            blue: item.blue,
            sales: item.sales,
            pool_money: item.pool_money,
            content: item.content,
            details_link: item.details_link,
            video_link: item.video_link,
        }
    }
}

/// Tirages du plus récent au plus ancien, dans l'ordre du flux.
pub fn parse_notice(body: &str) -> Result<Vec<OfficialDraw>> {
    let response: NoticeResponse = serde_json::from_str(body)
        .context("Réponse du flux officiel illisible")?;
    debug!(state = response.state, message = %response.message, items = response.result.len(), "Flux officiel décodé");
    Ok(response.result.into_iter().map(OfficialDraw::from).collect())
}

/// "2024-01-02(二)" + heure de clôture => instant du tirage.
pub fn draw_instant(date: &str, close: NaiveTime) -> Result<NaiveDateTime> {
    let day = date.split('(').next().unwrap_or(date).trim();
    let day = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Date de tirage invalide : '{}'", date))?;
    Ok(day.and_time(close))
}

pub struct FeedClient {
    client: Client,
    url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(FEED_REFERER));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(FEED_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Impossible de créer le client HTTP")?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub async fn fetch(&self) -> Result<Vec<OfficialDraw>> {
        let resp = self.client.get(&self.url).send().await
            .context("Flux officiel injoignable")?
            .error_for_status()
            .context("Flux officiel en erreur")?;
        let body = resp.text().await.context("Lecture de la réponse du flux impossible")?;
        let draws = parse_notice(&body)?;
        info!(draws = draws.len(), "Résultats officiels récupérés");
        Ok(draws)
    }
}
