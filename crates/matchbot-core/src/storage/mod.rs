//! Durable round-trip of the scheduling store and alias table.
//!
//! The document is plain structured text: an `Aliases` section plus one
//! section per match, named by its decimal id. Saving always copies the
//! previous file to the backup path first; loading refuses structurally
//! invalid documents outright instead of operating on partial data.

pub mod ini;

use std::{fs, path::Path};

use chrono::NaiveDateTime;
use regex::Regex;

use crate::{
    aliases::AliasTable,
    domain::{parse_match_date, MapResult, Match},
    errors::Error,
    store::MatchStore,
    Result,
};

const ALIASES_SECTION: &str = "Aliases";
const DATE_FORMAT: &str = "%d/%m/%y %H:%M";

/// Store + aliases as read back from disk.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub store: MatchStore,
    pub aliases: AliasTable,
}

/// Write the full document, backing up the previous file first so a failed
/// write leaves the prior good state recoverable.
pub fn save(path: &Path, backup: &Path, store: &MatchStore, aliases: &AliasTable) -> Result<()> {
    if path.exists() {
        fs::copy(path, backup)?;
    }
    fs::write(path, render_document(store, aliases).render())?;
    Ok(())
}

/// Read the document back. A missing file is a first run (empty state);
/// anything structurally invalid is fatal.
pub fn load(path: &Path) -> Result<LoadedState> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LoadedState::default());
        }
        Err(e) => return Err(e.into()),
    };

    let doc = ini::Document::parse(&text).map_err(|detail| data_err(path, detail))?;

    let mut aliases = AliasTable::new();
    for section in doc.sections() {
        if section.name() != ALIASES_SECTION {
            continue;
        }
        for (slave, master) in section.values() {
            aliases.set(slave.clone(), master.clone());
        }
    }

    let id_re = Regex::new(r"^\d+$").expect("valid regex");
    let mut matches = Vec::new();
    let mut next_id = 1u32;

    for section in doc.sections() {
        if section.name() == ALIASES_SECTION {
            continue;
        }
        if !id_re.is_match(section.name()) {
            return Err(data_err(path, format!("Invalid ID: {}", section.name())));
        }
        let id: u32 = section
            .name()
            .parse()
            .map_err(|_| data_err(path, format!("Invalid ID: {}", section.name())))?;
        if id >= next_id {
            next_id = id + 1;
        }

        // Deleted sections reserve their id but are not reloaded; a deleted
        // match with results survives in the file only.
        if section.get("Deleted") == Some("Yes") {
            continue;
        }

        matches.push(read_match(path, section, id, &aliases)?);
    }

    Ok(LoadedState {
        store: MatchStore::from_loaded(matches, next_id),
        aliases,
    })
}

fn read_match(
    path: &Path,
    section: &ini::Section,
    id: u32,
    aliases: &AliasTable,
) -> Result<Match> {
    let date_raw = section.get("Date").unwrap_or("");
    let date: NaiveDateTime = parse_match_date(date_raw)
        .map_err(|_| data_err(path, format!("Invalid Date: {date_raw}")))?;

    let count_re = Regex::new(r"^\d+$").expect("valid regex");
    let count_raw = section.get("ResultCount").unwrap_or("");
    if !count_re.is_match(count_raw) {
        return Err(data_err(path, format!("Invalid Result Count: {count_raw}")));
    }
    let count: usize = count_raw
        .parse()
        .map_err(|_| data_err(path, format!("Invalid Result Count: {count_raw}")))?;

    let mut results = Vec::with_capacity(count);
    for i in 0..count {
        let line = section.get(&format!("Result{i}")).unwrap_or("");
        let result = parse_result_line(line)
            .ok_or_else(|| data_err(path, format!("Invalid Result Line: {line}")))?;
        results.push(result);
    }

    Ok(Match {
        id,
        date,
        team: section.get("Team").unwrap_or("").to_string(),
        game_type: section.get("GameType").unwrap_or("").to_string(),
        comment: non_empty(section.get("Comment")),
        yes: read_names(section.get("Yes"), aliases),
        maybe: read_names(section.get("Maybe"), aliases),
        no: read_names(section.get("No"), aliases),
        results,
        deleted: false,
    })
}

fn render_document(store: &MatchStore, aliases: &AliasTable) -> ini::Document {
    let mut doc = ini::Document::new();

    let mut section = ini::Section::new(ALIASES_SECTION);
    for (slave, master) in aliases.iter() {
        section.push(slave, master);
    }
    doc.push(section);

    for m in store.matches() {
        // A hard-deleted match with nothing played is garbage-collected; one
        // with results is retained as an audit trail.
        if m.deleted && m.results.is_empty() {
            continue;
        }

        let mut section = ini::Section::new(m.id.to_string());
        section.push("Date", m.date.format(DATE_FORMAT).to_string());
        section.push("Team", m.team.as_str());
        section.push("GameType", m.game_type.as_str());
        section.push("Comment", m.comment.as_deref().unwrap_or(""));
        section.push("Yes", m.yes.join(" "));
        section.push("Maybe", m.maybe.join(" "));
        section.push("No", m.no.join(" "));
        section.push("Deleted", if m.deleted { "Yes" } else { "No" });
        section.push("ResultCount", m.results.len().to_string());
        for (i, r) in m.results.iter().enumerate() {
            section.push(format!("Result{i}"), render_result_line(r));
        }
        doc.push(section);
    }

    doc
}

fn render_result_line(r: &MapResult) -> String {
    let mut line = format!("{} {} {} {}", r.map, r.team, r.our_score, r.their_score);
    if let Some(comment) = &r.comment {
        line.push(' ');
        line.push_str(comment);
    }
    line
}

fn parse_result_line(line: &str) -> Option<MapResult> {
    let re = Regex::new(r"^(\w+) (\w+) (\d+) (\d+)( (.*))?$").expect("valid regex");
    let caps = re.captures(line)?;

    Some(MapResult {
        map: caps[1].to_string(),
        team: caps[2].to_string(),
        our_score: caps[3].parse().ok()?,
        their_score: caps[4].parse().ok()?,
        comment: non_empty(caps.get(6).map(|m| m.as_str())),
    })
}

fn read_names(value: Option<&str>, aliases: &AliasTable) -> Vec<String> {
    value
        .unwrap_or("")
        .split_whitespace()
        .map(|name| aliases.resolve(name).to_string())
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => None,
    }
}

fn data_err(path: &Path, detail: impl Into<String>) -> Error {
    Error::DataFormat {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}
