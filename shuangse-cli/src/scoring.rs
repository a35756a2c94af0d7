use anyhow::Result;
use chrono::NaiveTime;
use tracing::{debug, info, warn};

use shuangse_db::db::{fetch_unscored_between, record_result};
use shuangse_db::models::OfficialDraw;
use shuangse_db::rusqlite::Connection;
use shuangse_model::prize::{EvalMode, evaluate_text};

use crate::feed::draw_instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringSummary {
    pub windows: usize,
    pub scored: usize,
    pub winners: usize,
    pub skipped: usize,
}

/// Classe les tickets en attente contre les tirages du flux.
///
/// `draws` est trié du plus récent au plus ancien. Un ticket créé entre le
/// tirage i+1 et le tirage i est évalué contre le tirage i. Le plus ancien
/// tirage n'a pas de borne inférieure : ses tickets restent en attente.
pub fn score_tickets(
    conn: &Connection,
    draws: &[OfficialDraw],
    close: NaiveTime,
    mode: EvalMode,
) -> Result<ScoringSummary> {
    let mut summary = ScoringSummary::default();
    let tx = conn.unchecked_transaction()?;

    for pair in draws.windows(2) {
        let (draw, previous) = (&pair[0], &pair[1]);
        let (end, start) = match (draw_instant(&draw.date, close), draw_instant(&previous.date, close)) {
            (Ok(end), Ok(start)) => (end, start),
            (Err(e), _) | (_, Err(e)) => {
                warn!(issue = %draw.issue, error = %e, "Fenêtre ignorée");
                continue;
            }
        };
        summary.windows += 1;

        let pending = fetch_unscored_between(&tx, start, end)?;
        debug!(issue = %draw.issue, %start, %end, pending = pending.len(), "Fenêtre de classement");

        for (id, code) in pending {
            let outcome = match evaluate_text(&code, &draw.red, &draw.blue, mode) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(id, code = %code, issue = %draw.issue, error = %e, "Ticket non classé");
                    summary.skipped += 1;
                    continue;
                }
            };
            if outcome.reduced_confidence {
                warn!(id, code = %code, issue = %draw.issue, "Classement en mode tolérant, jetons ignorés");
            }
            if record_result(&tx, id, draw, &outcome.to_record())? {
                summary.scored += 1;
                if outcome.tier.is_winning() {
                    summary.winners += 1;
                    info!(id, code = %code, issue = %draw.issue, tier = %outcome.tier, "Ticket gagnant");
                }
            }
        }
    }

    tx.commit()?;
    info!(
        windows = summary.windows,
        scored = summary.scored,
        winners = summary.winners,
        skipped = summary.skipped,
        "Classement terminé"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use shuangse_db::db::{fetch_ticket, insert_ticket, migrate};
    use shuangse_db::models::Ticket;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn close() -> NaiveTime {
        NaiveTime::from_hms_opt(21, 30, 0).unwrap()
    }

    fn official(issue: &str, date: &str, red: &str, blue: &str) -> OfficialDraw {
        OfficialDraw {
            issue: issue.to_string(),
            date: date.to_string(),
            red: red.to_string(),
            blue: blue.to_string(),
            ..Default::default()
        }
    }

    fn feed() -> Vec<OfficialDraw> {
        vec![
            official("2024003", "2024-01-07(日)", "01,02,03,04,05,06", "07"),
            official("2024002", "2024-01-04(四)", "10,11,12,13,14,15", "16"),
            official("2024001", "2024-01-02(二)", "20,21,22,23,24,25", "01"),
        ]
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn insert(conn: &Connection, code: &str, created_at: NaiveDateTime) -> i64 {
        insert_ticket(conn, &Ticket::parse_code(code).unwrap(), created_at).unwrap()
    }

    #[test]
    fn test_tickets_scored_against_next_draw() {
        let conn = test_conn();
        let jackpot = insert(&conn, "01 02 03 04 05 06 07", at(5, 9, 0));
        let middle = insert(&conn, "10 11 12 20 21 22 16", at(3, 9, 0));
        let oldest = insert(&conn, "20 21 22 23 24 25 01", at(1, 9, 0));

        let summary = score_tickets(&conn, &feed(), close(), EvalMode::Strict).unwrap();
        assert_eq!(summary.windows, 2);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.winners, 2);

        let stored = fetch_ticket(&conn, jackpot).unwrap().unwrap();
        assert_eq!(stored.issue.as_deref(), Some("2024003"));
        assert_eq!(stored.prize_tier, Some(1));
        assert_eq!(stored.red_count, Some(6));
        assert_eq!(stored.blue_count, Some(1));

        let stored = fetch_ticket(&conn, middle).unwrap().unwrap();
        assert_eq!(stored.issue.as_deref(), Some("2024002"));
        assert_eq!(stored.red_count, Some(3));
        assert_eq!(stored.prize_tier, Some(5));

        // Avant le plus ancien tirage listé : pas de borne, reste en attente.
        let stored = fetch_ticket(&conn, oldest).unwrap().unwrap();
        assert_eq!(stored.prize_tier, None);
    }

    #[test]
    fn test_boundaries_follow_draw_close() {
        let conn = test_conn();
        let after_close = insert(&conn, "01 02 03 04 05 06 07", at(4, 21, 45));
        let before_close = insert(&conn, "01 02 03 04 05 06 07", at(4, 21, 15));

        score_tickets(&conn, &feed(), close(), EvalMode::Strict).unwrap();

        let stored = fetch_ticket(&conn, after_close).unwrap().unwrap();
        assert_eq!(stored.issue.as_deref(), Some("2024003"));
        let stored = fetch_ticket(&conn, before_close).unwrap().unwrap();
        assert_eq!(stored.issue.as_deref(), Some("2024002"));
        assert_eq!(stored.prize_tier, Some(7));
    }

    #[test]
    fn test_already_scored_left_alone() {
        let conn = test_conn();
        insert(&conn, "01 02 03 04 05 06 07", at(5, 9, 0));

        let first = score_tickets(&conn, &feed(), close(), EvalMode::Strict).unwrap();
        assert_eq!(first.scored, 1);
        let second = score_tickets(&conn, &feed(), close(), EvalMode::Strict).unwrap();
        assert_eq!(second.scored, 0);
        assert_eq!(second.windows, 2);
    }

    #[test]
    fn test_malformed_draw_strict_vs_lenient() {
        let draws = vec![
            official("2024003", "2024-01-07(日)", "01,02,xx,04,05,06", "07"),
            official("2024002", "2024-01-04(四)", "10,11,12,13,14,15", "16"),
        ];

        let conn = test_conn();
        let id = insert(&conn, "01 02 03 04 05 06 07", at(5, 9, 0));
        let summary = score_tickets(&conn, &draws, close(), EvalMode::Strict).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(fetch_ticket(&conn, id).unwrap().unwrap().prize_tier, None);

        let summary = score_tickets(&conn, &draws, close(), EvalMode::Lenient).unwrap();
        assert_eq!(summary.scored, 1);
        let stored = fetch_ticket(&conn, id).unwrap().unwrap();
        assert_eq!(stored.red_count, Some(5));
        assert_eq!(stored.prize_tier, Some(3));
    }

    #[test]
    fn test_short_feed_has_no_window() {
        let conn = test_conn();
        insert(&conn, "01 02 03 04 05 06 07", at(5, 9, 0));
        let summary = score_tickets(&conn, &feed()[..1], close(), EvalMode::Strict).unwrap();
        assert_eq!(summary, ScoringSummary::default());
        let summary = score_tickets(&conn, &[], close(), EvalMode::Strict).unwrap();
        assert_eq!(summary, ScoringSummary::default());
    }
}
