//! Chat-text command grammar.
//!
//! Matching is two-stage per command: a loose prefix pattern decides which
//! command a line is aimed at, then the strict pattern validates the full
//! argument shape. A prefix hit with a strict miss yields that command's
//! usage topic instead of a mutation; text matching no prefix at all is
//! ignored so the bot stays quiet in busy channels.

use regex::{Captures, Regex};

/// Which usage/help text to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopic {
    Commands,
    Add,
    Signup,
    List,
    Info,
    Update,
    Result,
    UpdateResult,
    DelResult,
    Del,
    Undel,
    Rename,
    Alias,
    DelAlias,
}

impl HelpTopic {
    /// Topic for a `!help <command>` argument.
    pub fn for_name(name: &str) -> Option<HelpTopic> {
        Some(match name {
            "add" => HelpTopic::Add,
            "yes" | "maybe" | "no" | "unsign" => HelpTopic::Signup,
            "list" => HelpTopic::List,
            "info" => HelpTopic::Info,
            "update" => HelpTopic::Update,
            "result" => HelpTopic::Result,
            "updateresult" => HelpTopic::UpdateResult,
            "delresult" => HelpTopic::DelResult,
            "del" => HelpTopic::Del,
            "undel" => HelpTopic::Undel,
            "rename" => HelpTopic::Rename,
            "alias" => HelpTopic::Alias,
            "delalias" => HelpTopic::DelAlias,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupKind {
    Yes,
    Maybe,
    No,
    Unsign,
}

/// A chat command with its arguments extracted.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help {
        topic: String,
    },
    Add {
        date_raw: String,
        game_type: String,
        team: String,
        comment: Option<String>,
    },
    Signup {
        kind: SignupKind,
        match_id: u32,
        name: Option<String>,
    },
    List {
        public: bool,
        unsigned_only: bool,
        name: Option<String>,
    },
    Info {
        public: bool,
        match_id: u32,
        name: Option<String>,
    },
    Update {
        match_id: u32,
        field: String,
        /// First whitespace token of the value, for single-token fields.
        word: Option<String>,
        /// The whole remainder of the line.
        rest: Option<String>,
    },
    AddResult {
        match_id: u32,
        map: String,
        team: String,
        our_score: u32,
        their_score: u32,
        comment: Option<String>,
    },
    UpdateResult {
        match_id: u32,
        ordinal: usize,
        field: String,
        word: Option<String>,
        rest: Option<String>,
    },
    DelResult {
        match_id: u32,
        ordinal: usize,
    },
    Del {
        match_id: u32,
    },
    Undel {
        match_id: u32,
    },
    Rename {
        match_id: u32,
        from: String,
        to: String,
    },
    Alias {
        master: String,
        slave: String,
    },
    DelAlias {
        slave: String,
    },
}

/// Outcome of routing one line of chat text.
#[derive(Clone, Debug, PartialEq)]
pub enum Routed {
    Command(Command),
    Usage(HelpTopic),
    Ignored,
}

struct Rule {
    prefix: Regex,
    strict: Regex,
    usage: HelpTopic,
    build: fn(&Captures) -> Option<Command>,
}

/// Ordered grammar table. Priority order decides which usage text a
/// half-formed line gets.
pub struct Router {
    rules: Vec<Rule>,
}

impl Router {
    pub fn new() -> Self {
        let rule = |prefix: &str, strict: &str, usage, build| Rule {
            prefix: Regex::new(prefix).expect("valid regex"),
            strict: Regex::new(strict).expect("valid regex"),
            usage,
            build,
        };

        let rules = vec![
            rule(
                r"^!help( .*)?$",
                r"^!help !?([^ ]+)$",
                HelpTopic::Commands,
                build_help,
            ),
            rule(
                r"^!add( .*)?$",
                r"^!add (\d{1,2}/\d{1,2}/\d{2} \d{1,2}:\d{2}) ([^ ]+) ([^ ]+)( (.*))?",
                HelpTopic::Add,
                build_add,
            ),
            rule(
                r"^!(yes|maybe|no|unsign)( .*)?$",
                r"^!(yes|maybe|no|unsign) (\d+)( ([^ ]+))?$",
                HelpTopic::Signup,
                build_signup,
            ),
            rule(
                r"^([!@])list( .*)?$",
                r"^([!@])list( ([^ ]+))?( ([^ ]+))?",
                HelpTopic::List,
                build_list,
            ),
            rule(
                r"^([!@])info( .*)?$",
                r"^([!@])info (\d+)( ([^ ]+))?",
                HelpTopic::Info,
                build_info,
            ),
            rule(
                r"^!update( .*)?$",
                r"^!update (\d+) ([^ ]+)( (([^ ]+).*))?$",
                HelpTopic::Update,
                build_update,
            ),
            rule(
                r"^!result( .*)?$",
                r"^!result (\d+) ([^ ]+) ([^ ]+) (\d+) (\d+)( (.*))?$",
                HelpTopic::Result,
                build_result,
            ),
            rule(
                r"^!updateresult( .*)?$",
                r"^!updateresult (\d+) (\d+) ([^ ]+)( (([^ ]+).*))?$",
                HelpTopic::UpdateResult,
                build_update_result,
            ),
            rule(
                r"^!delresult( .*)?$",
                r"^!delresult (\d+) (\d+)$",
                HelpTopic::DelResult,
                build_del_result,
            ),
            rule(
                r"^!del( .*)?$",
                r"^!del (\d+)$",
                HelpTopic::Del,
                build_del,
            ),
            rule(
                r"^!undel( .*)?$",
                r"^!undel (\d+)$",
                HelpTopic::Undel,
                build_undel,
            ),
            rule(
                r"^!rename( .*)?$",
                r"^!rename (\d+) ([^ ]+) ([^ ]+)$",
                HelpTopic::Rename,
                build_rename,
            ),
            rule(
                r"^!alias( .*)?$",
                r"^!alias ([^ ]+) ([^ ]+)$",
                HelpTopic::Alias,
                build_alias,
            ),
            rule(
                r"^!delalias( .*)?$",
                r"^!delalias ([^ ]+)$",
                HelpTopic::DelAlias,
                build_del_alias,
            ),
        ];

        Self { rules }
    }

    pub fn route(&self, text: &str) -> Routed {
        for rule in &self.rules {
            if !rule.prefix.is_match(text) {
                continue;
            }
            let Some(caps) = rule.strict.captures(text) else {
                return Routed::Usage(rule.usage);
            };
            return match (rule.build)(&caps) {
                Some(cmd) => Routed::Command(cmd),
                None => Routed::Usage(rule.usage),
            };
        }
        Routed::Ignored
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn cap(caps: &Captures, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn cap_nonempty(caps: &Captures, i: usize) -> Option<String> {
    cap(caps, i).filter(|s| !s.is_empty())
}

fn build_help(caps: &Captures) -> Option<Command> {
    Some(Command::Help {
        topic: caps[1].to_string(),
    })
}

fn build_add(caps: &Captures) -> Option<Command> {
    Some(Command::Add {
        date_raw: caps[1].to_string(),
        game_type: caps[2].to_string(),
        team: caps[3].to_string(),
        comment: cap_nonempty(caps, 5),
    })
}

fn build_signup(caps: &Captures) -> Option<Command> {
    let kind = match &caps[1] {
        "yes" => SignupKind::Yes,
        "maybe" => SignupKind::Maybe,
        "no" => SignupKind::No,
        _ => SignupKind::Unsign,
    };
    Some(Command::Signup {
        kind,
        match_id: caps[2].parse().ok()?,
        name: cap(caps, 4),
    })
}

fn build_list(caps: &Captures) -> Option<Command> {
    let params = [cap(caps, 3), cap(caps, 5)];
    let unsigned_only = params.iter().flatten().any(|p| p == "unsigned");
    let name = params
        .iter()
        .flatten()
        .filter(|p| *p != "unsigned")
        .next_back()
        .cloned();
    Some(Command::List {
        public: &caps[1] == "@",
        unsigned_only,
        name,
    })
}

fn build_info(caps: &Captures) -> Option<Command> {
    Some(Command::Info {
        public: &caps[1] == "@",
        match_id: caps[2].parse().ok()?,
        name: cap(caps, 4),
    })
}

fn build_update(caps: &Captures) -> Option<Command> {
    Some(Command::Update {
        match_id: caps[1].parse().ok()?,
        field: caps[2].to_string(),
        word: cap(caps, 5),
        rest: cap(caps, 4),
    })
}

fn build_result(caps: &Captures) -> Option<Command> {
    Some(Command::AddResult {
        match_id: caps[1].parse().ok()?,
        map: caps[2].to_string(),
        team: caps[3].to_string(),
        our_score: caps[4].parse().ok()?,
        their_score: caps[5].parse().ok()?,
        comment: cap_nonempty(caps, 7),
    })
}

fn build_update_result(caps: &Captures) -> Option<Command> {
    Some(Command::UpdateResult {
        match_id: caps[1].parse().ok()?,
        ordinal: caps[2].parse().ok()?,
        field: caps[3].to_string(),
        word: cap(caps, 6),
        rest: cap(caps, 5),
    })
}

fn build_del_result(caps: &Captures) -> Option<Command> {
    Some(Command::DelResult {
        match_id: caps[1].parse().ok()?,
        ordinal: caps[2].parse().ok()?,
    })
}

fn build_del(caps: &Captures) -> Option<Command> {
    Some(Command::Del {
        match_id: caps[1].parse().ok()?,
    })
}

fn build_undel(caps: &Captures) -> Option<Command> {
    Some(Command::Undel {
        match_id: caps[1].parse().ok()?,
    })
}

fn build_rename(caps: &Captures) -> Option<Command> {
    Some(Command::Rename {
        match_id: caps[1].parse().ok()?,
        from: caps[2].to_string(),
        to: caps[3].to_string(),
    })
}

fn build_alias(caps: &Captures) -> Option<Command> {
    Some(Command::Alias {
        master: caps[1].to_string(),
        slave: caps[2].to_string(),
    })
}

fn build_del_alias(caps: &Captures) -> Option<Command> {
    Some(Command::DelAlias {
        slave: caps[1].to_string(),
    })
}
