use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::db::fetch_history_rows;
use crate::models::{Draw, Pool, RED_PICK};

/// Tirages recopiés sur les tickets classés, du plus ancien au plus récent.
/// Les doublons sont conservés : le dédoublonnage appartient au modèle.
pub fn load_store_history(conn: &Connection) -> Result<Vec<Draw>> {
    let rows = fetch_history_rows(conn)?;
    let mut draws = Vec::with_capacity(rows.len());
    for (red, blue) in &rows {
        match Draw::parse(red, blue) {
            Ok(draw) => draws.push(draw),
            Err(e) => warn!(red = %red, blue = %blue, error = %e, "Ligne d'historique ignorée"),
        }
    }
    debug!(rows = rows.len(), draws = draws.len(), "Historique chargé depuis la base");
    Ok(draws)
}

/// CSV sans en-tête : 6 rouges dans l'ordre de sortie puis la bleue.
pub fn load_csv_history(path: &Path) -> Result<Vec<Draw>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    read_csv_history(reader)
}

pub fn read_csv_history<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Draw>> {
    let mut draws = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let line = line + 1;
        let record = record.with_context(|| format!("Erreur lecture ligne {}", line))?;
        draws.push(parse_record(&record).with_context(|| format!("Erreur parsing ligne {}", line))?);
    }
    Ok(draws)
}

fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    if record.len() < RED_PICK + 1 {
        bail!("{} colonnes attendues, {} reçues", RED_PICK + 1, record.len());
    }
    let mut reds = [0u8; RED_PICK];
    for (i, slot) in reds.iter_mut().enumerate() {
        *slot = Pool::Red.parse(&record[i])?;
    }
    let blue = Pool::Blue.parse(&record[RED_PICK])?;
    Ok(Draw::new(reds, blue)?)
}
