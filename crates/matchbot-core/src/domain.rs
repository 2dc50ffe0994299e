use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// The three mutually-exclusive signup states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Yes,
    Maybe,
    No,
}

impl Availability {
    /// Lookup/cleanup order: yes, then maybe, then no.
    pub const ALL: [Availability; 3] = [Availability::Yes, Availability::Maybe, Availability::No];
}

/// A scheduled match with its signup lists and per-map results.
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    pub id: u32,
    /// Wall-clock date + time, no offset.
    pub date: NaiveDateTime,
    pub team: String,
    pub game_type: String,
    pub comment: Option<String>,
    pub yes: Vec<String>,
    pub maybe: Vec<String>,
    pub no: Vec<String>,
    pub results: Vec<MapResult>,
    pub deleted: bool,
}

impl Match {
    pub fn new(
        id: u32,
        date: NaiveDateTime,
        team: String,
        game_type: String,
        comment: Option<String>,
    ) -> Self {
        Self {
            id,
            date,
            team,
            game_type,
            comment,
            yes: Vec::new(),
            maybe: Vec::new(),
            no: Vec::new(),
            results: Vec::new(),
            deleted: false,
        }
    }

    /// Which signup list currently holds `name`, if any.
    pub fn signup_of(&self, name: &str) -> Option<Availability> {
        Availability::ALL
            .into_iter()
            .find(|&a| self.list(a).iter().any(|n| n == name))
    }

    pub fn list(&self, a: Availability) -> &Vec<String> {
        match a {
            Availability::Yes => &self.yes,
            Availability::Maybe => &self.maybe,
            Availability::No => &self.no,
        }
    }

    pub(crate) fn list_mut(&mut self, a: Availability) -> &mut Vec<String> {
        match a {
            Availability::Yes => &mut self.yes,
            Availability::Maybe => &mut self.maybe,
            Availability::No => &mut self.no,
        }
    }
}

/// One played map within a match.
#[derive(Clone, Debug, PartialEq)]
pub struct MapResult {
    pub map: String,
    pub team: String,
    pub our_score: u32,
    pub their_score: u32,
    pub comment: Option<String>,
}

/// Why a date string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateParseError {
    /// Not `dd/mm/yy HH:MM` shaped at all.
    Shape,
    /// Shaped right but not a real calendar date/time (e.g. 31/02, hour 24).
    Invalid,
}

/// Parse a `dd/mm/yy HH:MM` date. Two-digit years map into 20xx.
///
/// Used for both chat input and the persisted file, so the accepted shape is
/// exactly the persisted format.
pub fn parse_match_date(input: &str) -> Result<NaiveDateTime, DateParseError> {
    let re = Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}) (\d{1,2}):(\d{2})$").expect("valid regex");
    let caps = re.captures(input).ok_or(DateParseError::Shape)?;

    // The shape regex caps every group well inside u32 range.
    let num = |i: usize| caps[i].parse::<u32>().expect("digits");

    let date = NaiveDate::from_ymd_opt(2000 + num(3) as i32, num(2), num(1))
        .ok_or(DateParseError::Invalid)?;
    date.and_hms_opt(num(4), num(5), 0)
        .ok_or(DateParseError::Invalid)
}
