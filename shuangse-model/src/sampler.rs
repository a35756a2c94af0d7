use rand::Rng;
use rand::seq::index;

use shuangse_db::models::{Pool, RED_PICK, Ticket};

use crate::frequency::FrequencyTable;
use crate::transition::{START_STATE, TransitionTable};

/// Roulette cumulative déterministe.
///
/// `candidates` doit être trié par numéro croissant et normalisé. Retourne le
/// premier candidat dont la probabilité cumulée atteint `r`, ou le dernier si
/// les arrondis empêchent d'atteindre `r`. `None` seulement si la liste est vide.
pub fn select_weighted(candidates: &[(u8, f64)], r: f64) -> Option<u8> {
    let mut cumulative = 0.0;
    for &(number, p) in candidates {
        cumulative += p;
        if cumulative >= r {
            return Some(number);
        }
    }
    candidates.last().map(|&(number, _)| number)
}

fn normalize(mut candidates: Vec<(u8, f64)>) -> Option<Vec<(u8, f64)>> {
    let total: f64 = candidates.iter().map(|(_, p)| p).sum();
    if candidates.is_empty() || total.is_nan() || total <= 0.0 {
        return None;
    }
    for (_, p) in &mut candidates {
        *p /= total;
    }
    Some(candidates)
}

/// Successeurs encore disponibles de `state`, renormalisés.
fn red_candidates(transitions: &TransitionTable, state: u8, selected: &[u8]) -> Option<Vec<(u8, f64)>> {
    let row = transitions.row(state)?;
    let candidates = row
        .iter()
        .filter(|&(n, _)| Pool::Red.contains(*n) && !selected.contains(n))
        .map(|(&n, &p)| (n, p))
        .collect();
    normalize(candidates)
}

fn uniform_unselected<R: Rng + ?Sized>(selected: &[u8], rng: &mut R) -> u8 {
    let available: Vec<u8> = (1..=Pool::Red.size())
        .filter(|n| !selected.contains(n))
        .collect();
    available[rng.random_range(0..available.len())]
}

/// Six rouges distinctes, dans l'ordre où la chaîne les a produites.
pub fn sample_reds<R: Rng + ?Sized>(transitions: &TransitionTable, rng: &mut R) -> [u8; RED_PICK] {
    let mut picked = [0u8; RED_PICK];
    let mut state = START_STATE;
    for slot in 0..RED_PICK {
        let selected = &picked[..slot];
        let next = red_candidates(transitions, state, selected)
            .and_then(|candidates| select_weighted(&candidates, rng.random::<f64>()))
            .unwrap_or_else(|| uniform_unselected(selected, rng));
        picked[slot] = next;
        state = next;
    }
    picked
}

pub fn sample_blue<R: Rng + ?Sized>(frequencies: &FrequencyTable, rng: &mut R) -> u8 {
    let candidates = frequencies
        .iter()
        .filter(|&(blue, _)| Pool::Blue.contains(blue))
        .collect();
    normalize(candidates)
        .and_then(|candidates| select_weighted(&candidates, rng.random::<f64>()))
        .unwrap_or_else(|| rng.random_range(1..=Pool::Blue.size()))
}

/// Une grille tirée des deux modèles ; tables vides => tirage uniforme.
pub fn sample_ticket<R: Rng + ?Sized>(
    transitions: &TransitionTable,
    frequencies: &FrequencyTable,
    rng: &mut R,
) -> Ticket {
    let mut reds = sample_reds(transitions, rng);
    reds.sort_unstable();
    let blue = sample_blue(frequencies, rng);
    Ticket { reds, blue }
}

/// Grille purement uniforme, sans historique.
pub fn uniform_ticket<R: Rng + ?Sized>(rng: &mut R) -> Ticket {
    let mut reds = [0u8; RED_PICK];
    let picks = index::sample(rng, Pool::Red.size() as usize, RED_PICK);
    for (slot, idx) in reds.iter_mut().zip(picks.iter()) {
        *slot = idx as u8 + 1;
    }
    reds.sort_unstable();
    let blue = rng.random_range(1..=Pool::Blue.size());
    Ticket { reds, blue }
}
