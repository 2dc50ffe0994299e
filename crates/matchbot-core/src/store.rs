use chrono::NaiveDateTime;

use crate::domain::{Availability, MapResult, Match};

/// Owns the match collection and the id counter.
///
/// All mutation goes through this type so its invariants hold in one place:
/// ids are unique and strictly increasing (never reused, even across
/// deletes), a name sits in at most one signup list per match, and the
/// collection stays sorted ascending by date.
#[derive(Clone, Debug)]
pub struct MatchStore {
    matches: Vec<Match>,
    next_id: u32,
}

/// Outcome of a yes/maybe/no transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupOutcome {
    Applied,
    /// The name was already exclusively in the target list; nothing changed.
    AlreadySet,
}

/// Outcome of an unsign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsignOutcome {
    Applied,
    NotSigned,
}

impl MatchStore {
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild from persisted matches. `next_id` is supplied by the loader
    /// because skipped deleted sections still reserve their ids.
    pub fn from_loaded(matches: Vec<Match>, next_id: u32) -> Self {
        let mut store = Self { matches, next_id };
        store.sort_by_date();
        store
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Allocate the next id, append, and re-sort. Returns the new id.
    pub fn add_match(
        &mut self,
        date: NaiveDateTime,
        team: String,
        game_type: String,
        comment: Option<String>,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.matches
            .push(Match::new(id, date, team, game_type, comment));
        self.sort_by_date();
        id
    }

    /// Linear scan by id; deleted matches are still addressable.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    pub fn get(&self, index: usize) -> &Match {
        &self.matches[index]
    }

    pub fn set_date(&mut self, index: usize, date: NaiveDateTime) {
        self.matches[index].date = date;
        self.sort_by_date();
    }

    pub fn set_team(&mut self, index: usize, team: String) {
        self.matches[index].team = team;
    }

    pub fn set_game_type(&mut self, index: usize, game_type: String) {
        self.matches[index].game_type = game_type;
    }

    pub fn set_comment(&mut self, index: usize, comment: Option<String>) {
        self.matches[index].comment = comment;
    }

    pub fn set_deleted(&mut self, index: usize, deleted: bool) {
        self.matches[index].deleted = deleted;
    }

    /// Move `name` into `target`, removing it from the other lists.
    pub fn signup(&mut self, index: usize, name: &str, target: Availability) -> SignupOutcome {
        let m = &mut self.matches[index];
        if m.list(target).iter().any(|n| n == name) {
            return SignupOutcome::AlreadySet;
        }
        for a in Availability::ALL {
            m.list_mut(a).retain(|n| n != name);
        }
        m.list_mut(target).push(name.to_string());
        SignupOutcome::Applied
    }

    /// Remove `name` from whichever list holds it.
    pub fn unsign(&mut self, index: usize, name: &str) -> UnsignOutcome {
        let m = &mut self.matches[index];
        if m.signup_of(name).is_none() {
            return UnsignOutcome::NotSigned;
        }
        for a in Availability::ALL {
            m.list_mut(a).retain(|n| n != name);
        }
        UnsignOutcome::Applied
    }

    /// Replace the first occurrence of `from` (yes, then maybe, then no)
    /// with `to`, in place. Returns false when `from` is in no list.
    pub fn rename(&mut self, index: usize, from: &str, to: &str) -> bool {
        let m = &mut self.matches[index];
        for a in Availability::ALL {
            if let Some(slot) = m.list_mut(a).iter_mut().find(|n| n.as_str() == from) {
                *slot = to.to_string();
                return true;
            }
        }
        false
    }

    pub fn add_result(&mut self, index: usize, result: MapResult) {
        self.matches[index].results.push(result);
    }

    /// Translate a 1-based result ordinal into a list index, bounds-checked.
    pub fn result_index(&self, match_index: usize, ordinal: usize) -> Option<usize> {
        if ordinal == 0 {
            return None;
        }
        let i = ordinal - 1;
        (i < self.matches[match_index].results.len()).then_some(i)
    }

    pub fn result_mut(&mut self, match_index: usize, result_index: usize) -> &mut MapResult {
        &mut self.matches[match_index].results[result_index]
    }

    pub fn delete_result(&mut self, match_index: usize, result_index: usize) {
        self.matches[match_index].results.remove(result_index);
    }

    /// Apply `f` to every name in every signup list of every match.
    pub fn map_names<F: Fn(&str) -> String>(&mut self, f: F) {
        for m in &mut self.matches {
            for a in Availability::ALL {
                for name in m.list_mut(a).iter_mut() {
                    *name = f(name);
                }
            }
        }
    }

    /// Stable ascending sort by date.
    pub fn sort_by_date(&mut self) {
        self.matches.sort_by_key(|m| m.date);
    }
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new()
    }
}
