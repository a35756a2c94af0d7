use chrono::{Local, NaiveDateTime};
use rand::Rng;
use tracing::info;

use shuangse_db::models::Ticket;

use crate::frequency::FrequencyTable;
use crate::history::History;
use crate::sampler::sample_ticket;
use crate::transition::TransitionTable;

/// Paire de modèles construite d'un seul bloc à partir d'un historique figé.
/// Jamais modifiée après construction : on en reconstruit une nouvelle.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub transitions: TransitionTable,
    pub frequencies: FrequencyTable,
    pub draw_count: usize,
    pub built_at: NaiveDateTime,
}

impl ModelSnapshot {
    pub fn build(history: &History) -> Self {
        let transitions = TransitionTable::build(history);
        let frequencies = FrequencyTable::build(history);
        info!(
            draws = history.len(),
            states = transitions.len(),
            blues = frequencies.len(),
            "Modèle construit"
        );
        Self {
            transitions,
            frequencies,
            draw_count: history.len(),
            built_at: Local::now().naive_local(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.draw_count > 0
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Ticket {
        sample_ticket(&self.transitions, &self.frequencies, rng)
    }
}
