use std::collections::BTreeMap;

use crate::history::History;

/// Fréquences marginales de la bleue. Seules les valeurs vues sont présentes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    probs: BTreeMap<u8, f64>,
}

impl FrequencyTable {
    pub fn build(history: &History) -> Self {
        let mut counts: BTreeMap<u8, u32> = BTreeMap::new();
        for draw in history.draws() {
            *counts.entry(draw.blue).or_insert(0) += 1;
        }
        Self::from_counts(counts)
    }

    pub fn from_counts(counts: BTreeMap<u8, u32>) -> Self {
        let total: u32 = counts.values().sum();
        if total == 0 {
            return Self::default();
        }
        let probs = counts
            .into_iter()
            .filter(|&(_, c)| c > 0)
            .map(|(blue, c)| (blue, c as f64 / total as f64))
            .collect();
        Self { probs }
    }

    pub fn get(&self, blue: u8) -> Option<f64> {
        self.probs.get(&blue).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.probs.iter().map(|(&blue, &p)| (blue, p))
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}
