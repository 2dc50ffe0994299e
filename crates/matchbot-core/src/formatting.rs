//! Response-line building: date strings, highlight codes, listing lines.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{Availability, MapResult, Match};

/// Chat-client highlight codes: the 0x03 control byte plus a palette digit.
/// Opaque literals, passed through to the transport verbatim.
pub const GREEN: &str = "\u{3}3";
pub const ORANGE: &str = "\u{3}7";
pub const RED: &str = "\u{3}4";

/// "Today"/"Tomorrow" by calendar-day comparison, otherwise the full
/// weekday/date/time form. Never elapsed-time arithmetic: a match at 00:30
/// is "Today" until midnight, whatever the hour now is.
pub fn date_string(date: NaiveDateTime, today: NaiveDate) -> String {
    if date.date() == today {
        date.format("Today %H:%M").to_string()
    } else if today.succ_opt() == Some(date.date()) {
        date.format("Tomorrow %H:%M").to_string()
    } else {
        date.format("%a %d/%m/%y %H:%M").to_string()
    }
}

/// Highlighted signup status word for a name on a match.
pub fn status_word(status: Option<Availability>) -> String {
    match status {
        Some(Availability::Yes) => format!("{GREEN}available"),
        Some(Availability::Maybe) => format!("{ORANGE}maybe"),
        Some(Availability::No) => format!("{RED}unavailable"),
        None => "unsigned".to_string(),
    }
}

fn counts(m: &Match) -> String {
    format!(
        "{GREEN}{}/{ORANGE}{}/{RED}{}",
        m.yes.len(),
        m.maybe.len(),
        m.no.len()
    )
}

/// `[Info] {id}: {date} AMS :: {gametype} vs {team}[ :: {comment}]`
fn base_line(m: &Match, today: NaiveDate) -> String {
    let mut line = format!(
        "[Info] {}: {} AMS :: {} vs {}",
        m.id,
        date_string(m.date, today),
        m.game_type,
        m.team
    );
    if let Some(comment) = m.comment.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(" :: ");
        line.push_str(comment);
    }
    line
}

fn played(m: &Match) -> String {
    if m.results.is_empty() {
        String::new()
    } else {
        format!(" :: {} map(s) played", m.results.len())
    }
}

/// One `!list` line for a channel audience.
pub fn list_line_public(m: &Match, today: NaiveDate) -> String {
    format!("{}{} :: {}", base_line(m, today), played(m), counts(m))
}

/// One `!list` line for the requesting user, with their own status.
pub fn list_line_private(m: &Match, name: &str, today: NaiveDate) -> String {
    format!(
        "{}{} :: {} :: Signed as {}.",
        base_line(m, today),
        played(m),
        counts(m),
        status_word(m.signup_of(name))
    )
}

/// One join-announcement line: like the private list line, without the
/// played-maps clause.
pub fn join_line(m: &Match, name: &str, today: NaiveDate) -> String {
    format!(
        "{} :: {} :: Signed as {}.",
        base_line(m, today),
        counts(m),
        status_word(m.signup_of(name))
    )
}

/// `!info` header for the requesting user. No trailing period here.
pub fn info_header_private(m: &Match, name: &str, today: NaiveDate) -> String {
    format!(
        "{} :: Signed as {}",
        base_line(m, today),
        status_word(m.signup_of(name))
    )
}

/// `!info` header for a channel audience.
pub fn info_header_public(m: &Match, today: NaiveDate) -> String {
    base_line(m, today)
}

/// `[Info] {id}: Signed up: ...` with all three lists spelled out.
pub fn info_signups_line(m: &Match) -> String {
    format!(
        "[Info] {}: Signed up: {GREEN}Yes ({}): {} {ORANGE}Maybe ({}): {} {RED}No ({}): {}",
        m.id,
        m.yes.len(),
        m.yes.join(", "),
        m.maybe.len(),
        m.maybe.join(", "),
        m.no.len(),
        m.no.join(", ")
    )
}

/// `[Info] {id}: Results: ...`, or None when nothing was played yet.
pub fn info_results_line(m: &Match) -> Option<String> {
    if m.results.is_empty() {
        return None;
    }
    let rendered: Vec<String> = m
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| result_entry(i + 1, r))
        .collect();
    Some(format!(
        "[Info] {}: Results: {}",
        m.id,
        rendered.join(" :: ")
    ))
}

fn result_entry(ordinal: usize, r: &MapResult) -> String {
    let mut entry = format!(
        "{ordinal}: {} ({}) {}-{}",
        r.map, r.team, r.our_score, r.their_score
    );
    if let Some(comment) = r.comment.as_deref().filter(|c| !c.is_empty()) {
        entry.push_str(&format!(" [{comment}]"));
    }
    entry
}
