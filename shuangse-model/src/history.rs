use std::collections::HashSet;

use shuangse_db::models::Draw;

/// Historique d'entraînement : tirages uniques, du plus ancien au plus récent.
///
/// La base recopie le même tirage officiel sur chaque ticket de sa fenêtre ;
/// sans dédoublonnage, un tirage compterait autant de fois qu'il a de tickets.
/// Deux tirages réels aux rouges identiques (même ordre) sont confondus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    draws: Vec<Draw>,
}

impl History {
    /// Garde la première occurrence de chaque clé d'identité, ordre conservé.
    pub fn from_draws(draws: impl IntoIterator<Item = Draw>) -> Self {
        let mut seen = HashSet::new();
        let draws = draws
            .into_iter()
            .filter(|draw| seen.insert(draw.identity_key()))
            .collect();
        Self { draws }
    }

    pub fn dedup(self) -> Self {
        Self::from_draws(self.draws)
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

/// Tirages synthétiques valides, rouges dans un ordre non trié.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    (0..n)
        .map(|i| {
            let base = (i % 27) as u8;
            Draw {
                reds: [base + 7, base + 1, base + 4, base + 2, base + 6, base + 3],
                blue: (i % 16) as u8 + 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(reds: [u8; 6], blue: u8) -> Draw {
        Draw::new(reds, blue).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = draw([5, 1, 20, 13, 33, 8], 4);
        let b = draw([10, 2, 30, 3, 17, 22], 11);
        let a_other_blue = draw([5, 1, 20, 13, 33, 8], 9);

        let history = History::from_draws(vec![a, a, b, a_other_blue, b]);
        assert_eq!(history.draws(), &[a, b]);
        assert_eq!(history.draws()[0].blue, 4);
    }

    #[test]
    fn test_dedup_is_order_sensitive() {
        let a = draw([1, 2, 3, 4, 5, 6], 1);
        let a_reordered = draw([6, 5, 4, 3, 2, 1], 1);
        let history = History::from_draws(vec![a, a_reordered]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_dedup_idempotent() {
        let draws = make_test_draws(60);
        let once = History::from_draws(draws);
        let twice = once.clone().dedup();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 27);
    }

    #[test]
    fn test_empty_history() {
        let history = History::from_draws(Vec::new());
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_make_test_draws_valid() {
        for d in make_test_draws(100) {
            assert!(Draw::new(d.reds, d.blue).is_ok(), "{:?}", d);
        }
    }
}
