use tracing::debug;

use shuangse_db::models::{Draw, PrizeRecord, RED_PICK, Ticket, ValidationError};

/// Rang de gain, 1 = premier rang, 7 = perdant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrizeTier(u8);

impl PrizeTier {
    pub const FIRST: PrizeTier = PrizeTier(1);
    pub const NONE: PrizeTier = PrizeTier(7);

    pub fn classify(red_matches: u8, blue_match: bool) -> Self {
        let rank = match (red_matches, blue_match) {
            (6, true) => 1,
            (6, false) => 2,
            (5, true) => 3,
            (5, false) | (4, true) => 4,
            (4, false) | (3, true) => 5,
            (0..=2, true) => 6,
            _ => 7,
        };
        PrizeTier(rank)
    }

    pub fn rank(&self) -> u8 {
        self.0
    }

    pub fn is_winning(&self) -> bool {
        *self < Self::NONE
    }
}

impl std::fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_winning() {
            write!(f, "Rang {}", self.0)
        } else {
            write!(f, "Perdant")
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvalMode {
    /// Rejette toute entrée mal formée.
    #[default]
    Strict,
    /// Comportement historique : les jetons illisibles ne comptent pas.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeOutcome {
    pub red_matches: u8,
    pub blue_match: bool,
    pub tier: PrizeTier,
    /// Vrai si le mode tolérant a ignoré au moins un jeton.
    pub reduced_confidence: bool,
}

impl PrizeOutcome {
    pub fn to_record(&self) -> PrizeRecord {
        PrizeRecord {
            red_count: self.red_matches,
            blue_count: u8::from(self.blue_match),
            tier: self.tier.rank(),
        }
    }
}

/// Compare une grille à un tirage ; les rouges comptent sans tenir compte de la position.
pub fn evaluate(ticket: &Ticket, reds: &[u8; RED_PICK], blue: u8) -> PrizeOutcome {
    let red_matches = ticket.reds.iter().filter(|r| reds.contains(r)).count() as u8;
    let blue_match = ticket.blue == blue;
    PrizeOutcome {
        red_matches,
        blue_match,
        tier: PrizeTier::classify(red_matches, blue_match),
        reduced_confidence: false,
    }
}

/// Évalue les formes textuelles stockées : grille "01 02 03 04 05 06 07",
/// rouges officielles "01,02,03,04,05,06", bleue "07".
pub fn evaluate_text(
    ticket_code: &str,
    draw_red: &str,
    draw_blue: &str,
    mode: EvalMode,
) -> Result<PrizeOutcome, ValidationError> {
    match mode {
        EvalMode::Strict => {
            let ticket = Ticket::parse_code(ticket_code)?;
            let draw = Draw::parse(draw_red, draw_blue)?;
            Ok(evaluate(&ticket, &draw.reds, draw.blue))
        }
        EvalMode::Lenient => Ok(evaluate_lenient(ticket_code, draw_red, draw_blue)),
    }
}

fn evaluate_lenient(ticket_code: &str, draw_red: &str, draw_blue: &str) -> PrizeOutcome {
    let mut reduced_confidence = false;
    let ticket_tokens: Vec<&str> = ticket_code.split(' ').collect();

    let mut draw_numbers = Vec::with_capacity(RED_PICK);
    let draw_tokens: Vec<&str> = draw_red.split(',').collect();
    if draw_tokens.len() < RED_PICK {
        reduced_confidence = true;
    }
    for token in draw_tokens.iter().take(RED_PICK) {
        match token.trim().parse::<u32>() {
            Ok(n) => draw_numbers.push(n),
            Err(_) => {
                debug!(token = %token, "Rouge officielle illisible, ignorée");
                reduced_confidence = true;
            }
        }
    }

    let mut red_matches = 0u8;
    let mut seen = Vec::with_capacity(RED_PICK);
    for i in 0..RED_PICK {
        let Some(token) = ticket_tokens.get(i) else {
            reduced_confidence = true;
            continue;
        };
        let parsed = token.trim().parse::<u32>();
        if let Ok(mine) = parsed {
            if seen.contains(&mine) {
                debug!(token = %token, "Rouge de la grille en double");
                reduced_confidence = true;
            }
            seen.push(mine);
        }
        match parsed {
            Ok(mine) if draw_numbers.contains(&mine) => red_matches += 1,
            Ok(_) => {}
            Err(_) => {
                debug!(token = %token, "Rouge de la grille illisible, ignorée");
                reduced_confidence = true;
            }
        }
    }

    let my_blue = ticket_tokens
        .get(RED_PICK)
        .and_then(|t| t.trim().parse::<u32>().ok());
    let their_blue = draw_blue.trim().parse::<u32>().ok();
    let (Some(my_blue), Some(their_blue)) = (my_blue, their_blue) else {
        // Bleue illisible d'un côté ou de l'autre : perdant quel que soit le nombre de rouges.
        return PrizeOutcome {
            red_matches,
            blue_match: false,
            tier: PrizeTier::NONE,
            reduced_confidence: true,
        };
    };

    let blue_match = my_blue == their_blue;
    PrizeOutcome {
        red_matches,
        blue_match,
        tier: PrizeTier::classify(red_matches, blue_match),
        reduced_confidence,
    }
}
