use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

pub const RED_PICK: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{what} : {expected} numéros attendus, {found} reçus")]
    WrongArity {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Jeton non numérique : '{0}'")]
    NotANumber(String),
    #[error("Numéro {value} hors limites (1-{max})")]
    OutOfRange { value: u32, max: u8 },
    #[error("Numéro en double : {0}")]
    Duplicate(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Red,
    Blue,
}

impl Pool {
    pub fn size(&self) -> u8 {
        match self {
            Pool::Red => 33,
            Pool::Blue => 16,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Pool::Red => RED_PICK,
            Pool::Blue => 1,
        }
    }

    pub fn contains(&self, n: u8) -> bool {
        (1..=self.size()).contains(&n)
    }

    /// Convertit un jeton textuel en numéro du pool, bornes comprises.
    pub fn parse(&self, token: &str) -> Result<u8, ValidationError> {
        let token = token.trim();
        let value: u32 = token
            .parse()
            .map_err(|_| ValidationError::NotANumber(token.to_string()))?;
        if value < 1 || value > self.size() as u32 {
            return Err(ValidationError::OutOfRange {
                value,
                max: self.size(),
            });
        }
        Ok(value as u8)
    }
}

pub fn validate_numbers(reds: &[u8; RED_PICK], blue: u8) -> Result<(), ValidationError> {
    for &r in reds {
        if !Pool::Red.contains(r) {
            return Err(ValidationError::OutOfRange {
                value: r as u32,
                max: Pool::Red.size(),
            });
        }
    }
    if !Pool::Blue.contains(blue) {
        return Err(ValidationError::OutOfRange {
            value: blue as u32,
            max: Pool::Blue.size(),
        });
    }
    for i in 0..reds.len() {
        for j in (i + 1)..reds.len() {
            if reds[i] == reds[j] {
                return Err(ValidationError::Duplicate(reds[i]));
            }
        }
    }
    Ok(())
}

fn parse_reds<'a>(
    tokens: impl Iterator<Item = &'a str>,
    what: &'static str,
) -> Result<[u8; RED_PICK], ValidationError> {
    let tokens: Vec<&str> = tokens.collect();
    if tokens.len() != RED_PICK {
        return Err(ValidationError::WrongArity {
            what,
            expected: RED_PICK,
            found: tokens.len(),
        });
    }
    let mut reds = [0u8; RED_PICK];
    for (slot, token) in reds.iter_mut().zip(tokens) {
        *slot = Pool::Red.parse(token)?;
    }
    Ok(reds)
}

fn join_numbers(numbers: &[u8], sep: &str) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Tirage historique : les rouges restent dans l'ordre de sortie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Draw {
    pub reds: [u8; RED_PICK],
    pub blue: u8,
}

impl Draw {
    pub fn new(reds: [u8; RED_PICK], blue: u8) -> Result<Self, ValidationError> {
        validate_numbers(&reds, blue)?;
        Ok(Self { reds, blue })
    }

    /// `red` au format du flux officiel : "03,11,07,21,30,02".
    pub fn parse(red: &str, blue: &str) -> Result<Self, ValidationError> {
        let reds = parse_reds(red.split(','), "Rouges du tirage")?;
        let blue = Pool::Blue.parse(blue)?;
        Self::new(reds, blue)
    }

    pub fn identity_key(&self) -> String {
        join_numbers(&self.reds, ",")
    }
}

/// Grille jouée, rouges triées par ordre croissant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub reds: [u8; RED_PICK],
    pub blue: u8,
}

impl Ticket {
    pub fn new(mut reds: [u8; RED_PICK], blue: u8) -> Result<Self, ValidationError> {
        validate_numbers(&reds, blue)?;
        reds.sort_unstable();
        Ok(Self { reds, blue })
    }

    /// Format stocké : "01 02 03 04 05 06 07", la bleue en dernier.
    pub fn to_code(&self) -> String {
        format!("{} {:02}", join_numbers(&self.reds, " "), self.blue)
    }

    pub fn parse_code(code: &str) -> Result<Self, ValidationError> {
        let tokens: Vec<&str> = code.split_whitespace().collect();
        if tokens.len() != RED_PICK + 1 {
            return Err(ValidationError::WrongArity {
                what: "Grille",
                expected: RED_PICK + 1,
                found: tokens.len(),
            });
        }
        let reds = parse_reds(tokens[..RED_PICK].iter().copied(), "Rouges de la grille")?;
        let blue = Pool::Blue.parse(tokens[RED_PICK])?;
        Self::new(reds, blue)
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_code())
    }
}

/// Résultat officiel tel que publié par le flux, champs textuels bruts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfficialDraw {
    pub issue: String,
    pub date: String,
    pub week: String,
    pub red: String,
    pub blue: String,
    pub sales: String,
    pub pool_money: String,
    pub content: String,
    pub details_link: String,
    pub video_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeRecord {
    pub red_count: u8,
    pub blue_count: u8,
    pub tier: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRecord {
    pub id: i64,
    pub code: String,
    pub created_at: NaiveDateTime,
    pub issue: Option<String>,
    pub draw_date: Option<String>,
    pub red: Option<String>,
    pub blue: Option<String>,
    pub prize_tier: Option<u8>,
    pub red_count: Option<u8>,
    pub blue_count: Option<u8>,
}
