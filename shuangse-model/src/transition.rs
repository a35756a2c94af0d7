use std::collections::BTreeMap;

use crate::history::History;

/// État de départ, avant la première rouge d'un tirage.
pub const START_STATE: u8 = 0;

/// Chaîne de Markov d'ordre 1 sur les rouges : P(suivante | courante).
///
/// Les états jamais observés comme source sont absents. Les clés sont
/// triées, ce qui fixe l'ordre de parcours lors de l'échantillonnage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    rows: BTreeMap<u8, BTreeMap<u8, f64>>,
}

impl TransitionTable {
    pub fn build(history: &History) -> Self {
        let mut counts: BTreeMap<u8, BTreeMap<u8, u32>> = BTreeMap::new();
        for draw in history.draws() {
            let mut state = START_STATE;
            for &red in &draw.reds {
                *counts.entry(state).or_default().entry(red).or_insert(0) += 1;
                state = red;
            }
        }
        Self::from_counts(counts)
    }

    /// Normalise chaque ligne de comptage ; les lignes vides sont écartées.
    pub fn from_counts(counts: BTreeMap<u8, BTreeMap<u8, u32>>) -> Self {
        let rows = counts
            .into_iter()
            .filter_map(|(state, next_counts)| {
                let total: u32 = next_counts.values().sum();
                if total == 0 {
                    return None;
                }
                let probs = next_counts
                    .into_iter()
                    .filter(|&(_, c)| c > 0)
                    .map(|(next, c)| (next, c as f64 / total as f64))
                    .collect();
                Some((state, probs))
            })
            .collect();
        Self { rows }
    }

    pub fn row(&self, state: u8) -> Option<&BTreeMap<u8, f64>> {
        self.rows.get(&state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &BTreeMap<u8, f64>)> {
        self.rows.iter().map(|(&state, row)| (state, row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::make_test_draws;
    use shuangse_db::models::Draw;

    fn history(draws: &[([u8; 6], u8)]) -> History {
        History::from_draws(draws.iter().map(|&(reds, blue)| Draw::new(reds, blue).unwrap()))
    }

    #[test]
    fn test_single_draw_chain() {
        let table = TransitionTable::build(&history(&[([5, 1, 20, 13, 33, 8], 4)]));
        assert_eq!(table.len(), 6);
        assert_eq!(table.row(START_STATE).unwrap().get(&5), Some(&1.0));
        assert_eq!(table.row(5).unwrap().get(&1), Some(&1.0));
        assert_eq!(table.row(1).unwrap().get(&20), Some(&1.0));
        assert_eq!(table.row(13).unwrap().get(&33), Some(&1.0));
        assert_eq!(table.row(33).unwrap().get(&8), Some(&1.0));
        // La dernière rouge n'est source d'aucune transition.
        assert!(table.row(8).is_none());
    }

    #[test]
    fn test_transition_frequencies() {
        let table = TransitionTable::build(&history(&[
            ([1, 2, 3, 4, 5, 6], 1),
            ([1, 3, 7, 8, 9, 10], 2),
            ([2, 1, 3, 11, 12, 13], 3),
            ([1, 2, 14, 15, 16, 17], 4),
        ]));

        let start = table.row(START_STATE).unwrap();
        assert!((start[&1] - 0.75).abs() < 1e-12);
        assert!((start[&2] - 0.25).abs() < 1e-12);

        let from_one = table.row(1).unwrap();
        assert!((from_one[&2] - 0.5).abs() < 1e-12);
        assert!((from_one[&3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rows_sum_to_one() {
        let table = TransitionTable::build(&History::from_draws(make_test_draws(200)));
        assert!(!table.is_empty());
        for (state, row) in table.iter() {
            let sum: f64 = row.values().sum();
            assert!((sum - 1.0).abs() < 1e-9, "state {} sum = {}", state, sum);
            assert!(row.values().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_empty_history_empty_table() {
        let table = TransitionTable::build(&History::default());
        assert!(table.is_empty());
        assert!(table.row(START_STATE).is_none());
    }

    #[test]
    fn test_from_counts_drops_empty_rows() {
        let mut counts = BTreeMap::new();
        counts.insert(3u8, BTreeMap::from([(4u8, 0u32)]));
        counts.insert(START_STATE, BTreeMap::from([(9u8, 3u32), (10u8, 1u32)]));
        let table = TransitionTable::from_counts(counts);
        assert!(table.row(3).is_none());
        assert_eq!(table.row(START_STATE).unwrap().get(&10), Some(&0.25));
    }
}
