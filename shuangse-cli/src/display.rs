use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use shuangse_db::db::format_timestamp;
use shuangse_db::models::{Ticket, TicketRecord};
use shuangse_model::prize::PrizeOutcome;
use shuangse_model::snapshot::ModelSnapshot;
use shuangse_model::transition::START_STATE;

use crate::scoring::ScoringSummary;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn reds_str(reds: &[u8]) -> String {
    reds.iter()
        .map(|r| format!("{:2}", r))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn tier_cell(tier: Option<u8>) -> Cell {
    match tier {
        None => Cell::new("En attente"),
        Some(t) if t < 7 => Cell::new(format!("Rang {}", t)).fg(Color::Green),
        Some(_) => Cell::new("Perdant"),
    }
}

pub fn display_tickets(tickets: &[Ticket]) {
    println!("\n🎲 Grilles générées\n");

    let mut table = new_table(vec!["#", "Rouges", "Bleue", "Code"]);
    for (i, ticket) in tickets.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(reds_str(&ticket.reds)).fg(Color::Red),
            Cell::new(format!("{:2}", ticket.blue)).fg(Color::Blue),
            Cell::new(ticket.to_code()),
        ]);
    }
    println!("{table}");
}

pub fn display_ticket_records(records: &[TicketRecord]) {
    if records.is_empty() {
        println!("Aucun ticket à afficher.");
        return;
    }

    let mut table = new_table(vec!["Id", "Créé le", "Grille", "Tirage", "Numéros officiels", "Rouges", "Bleue", "Résultat"]);
    for record in records {
        let official = match (&record.red, &record.blue) {
            (Some(red), Some(blue)) => format!("{} + {}", red, blue),
            _ => "—".to_string(),
        };
        let count = |c: Option<u8>| c.map(|c| c.to_string()).unwrap_or_else(|| "—".to_string());
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(format_timestamp(record.created_at)),
            Cell::new(&record.code),
            Cell::new(record.issue.as_deref().unwrap_or("—")),
            Cell::new(official),
            Cell::new(count(record.red_count)),
            Cell::new(count(record.blue_count)),
            tier_cell(record.prize_tier),
        ]);
    }
    println!("{table}");
}

pub fn display_model(snapshot: &ModelSnapshot) {
    println!(
        "\n🔗 Modèle construit sur {} tirages ({})\n",
        snapshot.draw_count,
        format_timestamp(snapshot.built_at)
    );

    println!("── Transitions des rouges ──");
    let mut table = new_table(vec!["État", "Successeurs (probabilité)"]);
    for (state, row) in snapshot.transitions.iter() {
        let label = if state == START_STATE {
            "Début".to_string()
        } else {
            format!("{:2}", state)
        };
        let successors = row
            .iter()
            .map(|(n, p)| format!("{:02}:{:.3}", n, p))
            .collect::<Vec<_>>()
            .join("  ");
        table.add_row(vec![label, successors]);
    }
    println!("{table}");

    println!("\n── Fréquences de la bleue ──");
    let mut table = new_table(vec!["Numéro", "Probabilité"]);
    for (blue, p) in snapshot.frequencies.iter() {
        table.add_row(vec![
            Cell::new(format!("{:2}", blue)),
            Cell::new(format!("{:.4}", p)),
        ]);
    }
    println!("{table}");
}

pub fn display_outcome(code: &str, outcome: &PrizeOutcome) {
    let mut table = new_table(vec!["Grille", "Rouges trouvées", "Bleue", "Résultat"]);
    table.add_row(vec![
        Cell::new(code),
        Cell::new(outcome.red_matches),
        Cell::new(if outcome.blue_match { "oui" } else { "non" }),
        tier_cell(Some(outcome.tier.rank())),
    ]);
    println!("{table}");
    if outcome.reduced_confidence {
        println!("⚠ Des numéros illisibles ont été ignorés (mode tolérant).");
    }
}

pub fn display_scoring_summary(summary: &ScoringSummary) {
    println!("Classement terminé :");
    println!("  Fenêtres de tirage : {}", summary.windows);
    println!("  Tickets classés    : {}", summary.scored);
    println!("  Tickets gagnants   : {}", summary.winners);
    if summary.skipped > 0 {
        println!("  Tickets ignorés    : {}", summary.skipped);
    }
}
