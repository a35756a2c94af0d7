use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

use crate::models::{OfficialDraw, PrizeRecord, Ticket, TicketRecord};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    code          TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    issue         TEXT NULL,
    details_link  TEXT NULL,
    video_link    TEXT NULL,
    draw_date     TEXT NULL,
    week          TEXT NULL,
    red           TEXT NULL,
    blue          TEXT NULL,
    sales         TEXT NULL,
    pool_money    TEXT NULL,
    content       TEXT NULL,
    prize_tier    INTEGER NULL,
    red_count     INTEGER NULL,
    blue_count    INTEGER NULL
);
CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets (created_at);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("shuangse.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn insert_ticket(conn: &Connection, ticket: &Ticket, created_at: NaiveDateTime) -> Result<i64> {
    conn.execute(
        "INSERT INTO tickets (code, created_at) VALUES (?1, ?2)",
        rusqlite::params![ticket.to_code(), format_timestamp(created_at)],
    ).context("Échec de l'insertion du ticket")?;
    Ok(conn.last_insert_rowid())
}

const TICKET_COLUMNS: &str =
    "id, code, created_at, issue, draw_date, red, blue, prize_tier, red_count, blue_count";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<TicketRecord> {
    Ok(TicketRecord {
        id: row.get(0)?,
        code: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
        issue: row.get(3)?,
        draw_date: row.get(4)?,
        red: row.get(5)?,
        blue: row.get(6)?,
        prize_tier: row.get(7)?,
        red_count: row.get(8)?,
        blue_count: row.get(9)?,
    })
}

pub fn fetch_tickets(conn: &Connection, limit: u32) -> Result<Vec<TicketRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let tickets = stmt.query_map([limit], ticket_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tickets)
}

pub fn fetch_ticket(conn: &Connection, id: i64) -> Result<Option<TicketRecord>> {
    let ticket = conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
        [id],
        ticket_from_row,
    ).optional()?;
    Ok(ticket)
}

/// Tickets non encore classés dont la création tombe dans `[start, end]`.
pub fn fetch_unscored_between(
    conn: &Connection,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, code FROM tickets
         WHERE prize_tier IS NULL AND created_at BETWEEN ?1 AND ?2
         ORDER BY created_at DESC, id DESC"
    )?;
    let rows = stmt.query_map(
        [format_timestamp(start), format_timestamp(end)],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn record_result(
    conn: &Connection,
    id: i64,
    draw: &OfficialDraw,
    prize: &PrizeRecord,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tickets SET issue = ?1, details_link = ?2, video_link = ?3, draw_date = ?4, week = ?5,
            red = ?6, blue = ?7, sales = ?8, pool_money = ?9, content = ?10,
            prize_tier = ?11, red_count = ?12, blue_count = ?13
         WHERE id = ?14",
        rusqlite::params![
            draw.issue,
            draw.details_link,
            draw.video_link,
            draw.date,
            draw.week,
            draw.red,
            draw.blue,
            draw.sales,
            draw.pool_money,
            draw.content,
            prize.tier,
            prize.red_count,
            prize.blue_count,
            id,
        ],
    ).with_context(|| format!("Échec de la mise à jour du ticket {}", id))?;
    Ok(changed > 0)
}

/// Numéros officiels recopiés sur chaque ticket classé, du plus ancien au plus récent.
/// Un même tirage apparaît autant de fois qu'il a classé de tickets.
pub fn fetch_history_rows(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT red, blue FROM tickets
         WHERE red IS NOT NULL AND blue IS NOT NULL
         ORDER BY created_at ASC, id ASC"
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_tickets(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn official(issue: &str, red: &str, blue: &str) -> OfficialDraw {
        OfficialDraw {
            issue: issue.to_string(),
            date: "2024-01-02(二)".to_string(),
            week: "二".to_string(),
            red: red.to_string(),
            blue: blue.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_count() {
        let conn = test_conn();
        assert_eq!(count_tickets(&conn).unwrap(), 0);

        let ticket = Ticket::new([1, 2, 3, 4, 5, 6], 7).unwrap();
        let id = insert_ticket(&conn, &ticket, at(1, 10, 0)).unwrap();
        assert_eq!(count_tickets(&conn).unwrap(), 1);

        let stored = fetch_ticket(&conn, id).unwrap().unwrap();
        assert_eq!(stored.code, "01 02 03 04 05 06 07");
        assert_eq!(stored.created_at, at(1, 10, 0));
        assert_eq!(stored.prize_tier, None);
    }

    #[test]
    fn test_fetch_order() {
        let conn = test_conn();
        let ticket = Ticket::new([1, 2, 3, 4, 5, 6], 7).unwrap();
        insert_ticket(&conn, &ticket, at(1, 10, 0)).unwrap();
        insert_ticket(&conn, &ticket, at(5, 10, 0)).unwrap();
        insert_ticket(&conn, &ticket, at(3, 10, 0)).unwrap();

        let tickets = fetch_tickets(&conn, 10).unwrap();
        assert_eq!(tickets.len(), 3);
        assert_eq!(tickets[0].created_at, at(5, 10, 0));
        assert_eq!(tickets[1].created_at, at(3, 10, 0));
        assert_eq!(tickets[2].created_at, at(1, 10, 0));

        assert_eq!(fetch_tickets(&conn, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_unscored_window() {
        let conn = test_conn();
        let ticket = Ticket::new([1, 2, 3, 4, 5, 6], 7).unwrap();
        let before = insert_ticket(&conn, &ticket, at(1, 21, 0)).unwrap();
        let inside = insert_ticket(&conn, &ticket, at(2, 12, 0)).unwrap();
        let scored = insert_ticket(&conn, &ticket, at(2, 13, 0)).unwrap();
        let after = insert_ticket(&conn, &ticket, at(2, 22, 0)).unwrap();

        let prize = PrizeRecord { red_count: 1, blue_count: 0, tier: 7 };
        record_result(&conn, scored, &official("24001", "01,09,10,11,12,13", "08"), &prize).unwrap();

        let rows = fetch_unscored_between(&conn, at(1, 21, 30), at(2, 21, 30)).unwrap();
        let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![inside]);
        assert!(!ids.contains(&before));
        assert!(!ids.contains(&after));
    }

    #[test]
    fn test_record_result() {
        let conn = test_conn();
        let ticket = Ticket::new([1, 2, 3, 4, 5, 6], 7).unwrap();
        let id = insert_ticket(&conn, &ticket, at(1, 10, 0)).unwrap();

        let prize = PrizeRecord { red_count: 6, blue_count: 1, tier: 1 };
        let updated = record_result(&conn, id, &official("24001", "01,02,03,04,05,06", "07"), &prize).unwrap();
        assert!(updated);
        assert!(!record_result(&conn, id + 100, &OfficialDraw::default(), &prize).unwrap());

        let stored = fetch_ticket(&conn, id).unwrap().unwrap();
        assert_eq!(stored.issue.as_deref(), Some("24001"));
        assert_eq!(stored.red.as_deref(), Some("01,02,03,04,05,06"));
        assert_eq!(stored.prize_tier, Some(1));
        assert_eq!(stored.red_count, Some(6));
        assert_eq!(stored.blue_count, Some(1));
    }

    #[test]
    fn test_history_rows_keep_duplicates_in_order() {
        let conn = test_conn();
        let ticket = Ticket::new([1, 2, 3, 4, 5, 6], 7).unwrap();
        let prize = PrizeRecord { red_count: 0, blue_count: 0, tier: 7 };
        let first = official("24001", "05,01,20,13,33,08", "04");
        let second = official("24002", "10,02,30,03,17,22", "11");

        let a = insert_ticket(&conn, &ticket, at(1, 10, 0)).unwrap();
        let b = insert_ticket(&conn, &ticket, at(1, 11, 0)).unwrap();
        let c = insert_ticket(&conn, &ticket, at(3, 10, 0)).unwrap();
        insert_ticket(&conn, &ticket, at(4, 10, 0)).unwrap();
        record_result(&conn, c, &second, &prize).unwrap();
        record_result(&conn, a, &first, &prize).unwrap();
        record_result(&conn, b, &first, &prize).unwrap();

        let rows = fetch_history_rows(&conn).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "05,01,20,13,33,08");
        assert_eq!(rows[1].0, "05,01,20,13,33,08");
        assert_eq!(rows[2], ("10,02,30,03,17,22".to_string(), "11".to_string()));
    }
}
