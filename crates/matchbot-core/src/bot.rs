//! Command execution and the event loop.
//!
//! One inbound event is fully processed, persistence write-through included,
//! before the next is taken, so no locking guards the store.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    aliases::AliasTable,
    config::Config,
    domain::{parse_match_date, Availability, DateParseError, MapResult},
    formatting,
    messaging::{
        port::ChatPort,
        types::{JoinEvent, MessageEvent, Phase, TransportEvent},
    },
    router::{Command, HelpTopic, Routed, Router, SignupKind},
    storage,
    store::{MatchStore, SignupOutcome, UnsignOutcome},
    utils::{AuditEvent, AuditLogger},
    Result,
};

/// The application: router, store, alias table and persistence glue behind
/// the transport port.
pub struct MatchBot {
    cfg: Arc<Config>,
    port: Arc<dyn ChatPort>,
    router: Router,
    store: MatchStore,
    aliases: AliasTable,
    audit: AuditLogger,
}

impl MatchBot {
    /// Load persisted state and build the bot. Corrupt data is fatal here,
    /// before any command is accepted.
    pub fn load(cfg: Arc<Config>, port: Arc<dyn ChatPort>) -> Result<Self> {
        let loaded = storage::load(&cfg.data_file)?;
        info!(
            matches = loaded.store.matches().len(),
            next_id = loaded.store.next_id(),
            "match data loaded"
        );

        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
        Ok(Self {
            cfg,
            port,
            router: Router::new(),
            store: loaded.store,
            aliases: loaded.aliases,
            audit,
        })
    }

    /// Drive the bot until the transport's lifetime signal fires or the
    /// event stream closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event).await;
                }
            }
        }
        info!("event loop stopped");
    }

    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(m) => self.handle_message(&m).await,
            TransportEvent::Join(j) => self.handle_join(&j).await,
        }
    }

    pub async fn handle_message(&mut self, event: &MessageEvent) {
        if event.phase == Phase::Before {
            return;
        }

        match self.router.route(&event.text) {
            Routed::Ignored => {}
            Routed::Usage(topic) => {
                self.notice(&event.sender, usage_text(topic)).await;
            }
            Routed::Command(command) => {
                info!(sender = %event.sender, text = %event.text, "command");
                self.audit_write(AuditEvent::command(
                    &event.sender,
                    event.origin.name(),
                    &event.text,
                ));
                self.execute(event, command).await;
            }
        }
    }

    /// List every active match with the joiner's signup status, after a
    /// short delay so the transport can settle its own join bookkeeping.
    pub async fn handle_join(&mut self, event: &JoinEvent) {
        if event.phase == Phase::Before {
            return;
        }
        if event.user == self.cfg.nick {
            return;
        }

        tokio::time::sleep(self.cfg.join_delay).await;

        self.audit_write(AuditEvent::join(&event.user, &event.channel));
        let name = self.aliases.resolve(&event.user).to_string();
        let today = today();

        let mut listed = 0;
        for m in self.store.matches() {
            if m.deleted {
                continue;
            }
            self.notice(&event.user, &formatting::join_line(m, &name, today))
                .await;
            listed += 1;
        }
        if listed == 0 {
            self.notice(&event.user, "[Info] No matches.").await;
        }
    }

    async fn execute(&mut self, event: &MessageEvent, command: Command) {
        match command {
            Command::Help { topic } => self.cmd_help(event, &topic).await,
            Command::Add {
                date_raw,
                game_type,
                team,
                comment,
            } => self.cmd_add(event, &date_raw, game_type, team, comment).await,
            Command::Signup {
                kind,
                match_id,
                name,
            } => self.cmd_signup(event, kind, match_id, name).await,
            Command::List {
                public,
                unsigned_only,
                name,
            } => self.cmd_list(event, public, unsigned_only, name).await,
            Command::Info {
                public,
                match_id,
                name,
            } => self.cmd_info(event, public, match_id, name).await,
            Command::Update {
                match_id,
                field,
                word,
                rest,
            } => self.cmd_update(event, match_id, &field, word, rest).await,
            Command::AddResult {
                match_id,
                map,
                team,
                our_score,
                their_score,
                comment,
            } => {
                let result = MapResult {
                    map,
                    team,
                    our_score,
                    their_score,
                    comment,
                };
                self.cmd_add_result(event, match_id, result).await
            }
            Command::UpdateResult {
                match_id,
                ordinal,
                field,
                word,
                rest,
            } => {
                self.cmd_update_result(event, match_id, ordinal, &field, word, rest)
                    .await
            }
            Command::DelResult { match_id, ordinal } => {
                self.cmd_del_result(event, match_id, ordinal).await
            }
            Command::Del { match_id } => self.cmd_del(event, match_id, true).await,
            Command::Undel { match_id } => self.cmd_del(event, match_id, false).await,
            Command::Rename { match_id, from, to } => {
                self.cmd_rename(event, match_id, &from, &to).await
            }
            Command::Alias { master, slave } => self.cmd_alias(event, master, slave).await,
            Command::DelAlias { slave } => self.cmd_del_alias(event, &slave).await,
        }
    }

    async fn cmd_help(&self, event: &MessageEvent, topic: &str) {
        match HelpTopic::for_name(topic) {
            Some(topic) => self.notice(&event.sender, usage_text(topic)).await,
            None => {
                self.notice(
                    &event.sender,
                    "[Help] Unknown command.  Use !help for a list of commands.",
                )
                .await
            }
        }
    }

    async fn cmd_add(
        &mut self,
        event: &MessageEvent,
        date_raw: &str,
        game_type: String,
        team: String,
        comment: Option<String>,
    ) {
        let Some(date) = self.parse_date_or_notice(event, date_raw).await else {
            return;
        };

        let id = self.store.add_match(date, team, game_type, comment);

        self.notice(&event.sender, &format!("[Success] New match id {id} added!"))
            .await;
        if let Some(channel) = event.origin.channel_name() {
            self.public(channel, &format!("[Match] New match id {id} added!"))
                .await;
        }
        self.persist();
    }

    async fn cmd_signup(
        &mut self,
        event: &MessageEvent,
        kind: SignupKind,
        match_id: u32,
        name_arg: Option<String>,
    ) {
        let raw = name_arg.unwrap_or_else(|| event.sender.clone());
        let name = self.aliases.resolve(&raw).to_string();
        let on_behalf = name != event.sender;

        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            self.notice(&event.sender, usage_text(HelpTopic::Signup)).await;
            return;
        };

        match kind {
            SignupKind::Yes => {
                self.apply_signup(event, index, &name, Availability::Yes, on_behalf, "available")
                    .await
            }
            SignupKind::Maybe => {
                self.apply_signup(event, index, &name, Availability::Maybe, on_behalf, "maybe")
                    .await
            }
            SignupKind::No => {
                self.apply_signup(event, index, &name, Availability::No, on_behalf, "unavailable")
                    .await
            }
            SignupKind::Unsign => match self.store.unsign(index, &name) {
                UnsignOutcome::NotSigned => {
                    self.notice(&event.sender, "[Error] You are not signed up for that match.")
                        .await;
                }
                UnsignOutcome::Applied => {
                    let text = if on_behalf {
                        format!("[Success] Unsigned from the match as {name}.")
                    } else {
                        "[Success] Unsigned from the match.".to_string()
                    };
                    self.notice(&event.sender, &text).await;
                    self.persist();
                }
            },
        }
    }

    async fn apply_signup(
        &mut self,
        event: &MessageEvent,
        index: usize,
        name: &str,
        target: Availability,
        on_behalf: bool,
        word: &str,
    ) {
        match self.store.signup(index, name, target) {
            SignupOutcome::AlreadySet => {
                self.notice(
                    &event.sender,
                    &format!("[Error] You are already set as {word} for that match."),
                )
                .await;
            }
            SignupOutcome::Applied => {
                let text = if on_behalf {
                    format!("[Success] Signed up as {word}, as {name}.")
                } else {
                    format!("[Success] Signed up as {word}.")
                };
                self.notice(&event.sender, &text).await;
                self.persist();
            }
        }
    }

    async fn cmd_list(
        &self,
        event: &MessageEvent,
        public: bool,
        unsigned_only: bool,
        name_arg: Option<String>,
    ) {
        let public = public && event.origin.channel_name().is_some();
        let name = name_arg.unwrap_or_else(|| event.sender.clone());
        let today = today();

        let mut listed = 0;
        for m in self.store.matches() {
            if m.deleted {
                continue;
            }
            if unsigned_only && m.signup_of(&name).is_some() {
                continue;
            }

            if public {
                self.public(
                    event.origin.name(),
                    &formatting::list_line_public(m, today),
                )
                .await;
            } else {
                self.notice(&event.sender, &formatting::list_line_private(m, &name, today))
                    .await;
            }
            listed += 1;
        }

        if listed == 0 {
            if public {
                self.public(event.origin.name(), "[Info] No matches.").await;
            } else {
                self.notice(&event.sender, "[Info] No matches.").await;
            }
        }
    }

    async fn cmd_info(
        &self,
        event: &MessageEvent,
        public: bool,
        match_id: u32,
        name_arg: Option<String>,
    ) {
        let public = public && event.origin.channel_name().is_some();
        let name = name_arg.unwrap_or_else(|| event.sender.clone());

        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            return;
        };
        let m = self.store.get(index);
        let today = today();

        if public {
            let channel = event.origin.name();
            self.public(channel, &formatting::info_header_public(m, today))
                .await;
            self.public(channel, &formatting::info_signups_line(m)).await;
            if let Some(line) = formatting::info_results_line(m) {
                self.public(channel, &line).await;
            }
        } else {
            self.notice(&event.sender, &formatting::info_header_private(m, &name, today))
                .await;
            self.notice(&event.sender, &formatting::info_signups_line(m))
                .await;
            if let Some(line) = formatting::info_results_line(m) {
                self.notice(&event.sender, &line).await;
            }
        }
    }

    async fn cmd_update(
        &mut self,
        event: &MessageEvent,
        match_id: u32,
        field: &str,
        word: Option<String>,
        rest: Option<String>,
    ) {
        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            return;
        };

        // Every field except the comment needs an actual value.
        if field != "comment" && rest.is_none() {
            self.notice(&event.sender, usage_text(HelpTopic::Update)).await;
            return;
        }

        match field {
            "date" => {
                let raw = rest.unwrap_or_default();
                let Some(date) = self.parse_date_or_notice(event, &raw).await else {
                    return;
                };
                self.store.set_date(index, date);
            }
            "team" => self.store.set_team(index, word.unwrap_or_default()),
            "gametype" => self.store.set_game_type(index, word.unwrap_or_default()),
            "comment" => self.store.set_comment(index, rest),
            _ => {
                self.notice(&event.sender, "[Error] Unknown match property.").await;
                return;
            }
        }

        self.notice(&event.sender, "[Success] Updated.").await;
        self.persist();
    }

    async fn cmd_add_result(&mut self, event: &MessageEvent, match_id: u32, result: MapResult) {
        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            return;
        };

        self.store.add_result(index, result);
        self.notice(&event.sender, "[Success] Result added.").await;
        self.persist();
    }

    async fn cmd_update_result(
        &mut self,
        event: &MessageEvent,
        match_id: u32,
        ordinal: usize,
        field: &str,
        word: Option<String>,
        rest: Option<String>,
    ) {
        let Some(mi) = self.find_match_or_notice(event, match_id).await else {
            return;
        };
        let Some(ri) = self.find_result_or_notice(event, mi, ordinal).await else {
            return;
        };

        if field != "comment" && rest.is_none() {
            self.notice(&event.sender, usage_text(HelpTopic::UpdateResult))
                .await;
            return;
        }

        let word = word.unwrap_or_default();
        match field {
            "map" => self.store.result_mut(mi, ri).map = word,
            "team" => self.store.result_mut(mi, ri).team = word,
            "ourscore" => match word.parse::<u32>() {
                Ok(score) => self.store.result_mut(mi, ri).our_score = score,
                Err(_) => {
                    self.notice(&event.sender, "[Error] Our score must be numeric.").await;
                    return;
                }
            },
            "theirscore" => match word.parse::<u32>() {
                Ok(score) => self.store.result_mut(mi, ri).their_score = score,
                Err(_) => {
                    self.notice(&event.sender, "[Error] Their score must be numeric.")
                        .await;
                    return;
                }
            },
            "comment" => self.store.result_mut(mi, ri).comment = rest,
            _ => {
                self.notice(&event.sender, "[Error] Unknown result property.").await;
                return;
            }
        }

        self.notice(&event.sender, "[Success] Updated.").await;
        self.persist();
    }

    async fn cmd_del_result(&mut self, event: &MessageEvent, match_id: u32, ordinal: usize) {
        let Some(mi) = self.find_match_or_notice(event, match_id).await else {
            return;
        };
        let Some(ri) = self.find_result_or_notice(event, mi, ordinal).await else {
            return;
        };

        self.store.delete_result(mi, ri);
        self.notice(&event.sender, "[Success] Result deleted.").await;
        self.persist();
    }

    async fn cmd_del(&mut self, event: &MessageEvent, match_id: u32, deleted: bool) {
        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            return;
        };

        self.store.set_deleted(index, deleted);
        let text = if deleted {
            "[Success] Match marked as deleted."
        } else {
            "[Success] Match restored."
        };
        self.notice(&event.sender, text).await;
        self.persist();
    }

    async fn cmd_rename(&mut self, event: &MessageEvent, match_id: u32, from: &str, to: &str) {
        let Some(index) = self.find_match_or_notice(event, match_id).await else {
            return;
        };

        if self.store.rename(index, from, to) {
            self.notice(&event.sender, "[Success] Sign-up changed.").await;
            self.persist();
        } else {
            self.notice(
                &event.sender,
                "[Error] That person is not signed up for that match.",
            )
            .await;
        }
    }

    async fn cmd_alias(&mut self, event: &MessageEvent, master: String, slave: String) {
        let replaced = self.aliases.set(slave, master);
        let text = if replaced {
            "[Success] Updated alias."
        } else {
            "[Success] Alias added."
        };

        // Recorded signups must reflect the new mapping, not just future
        // lookups.
        self.aliases.reapply(&mut self.store);

        self.notice(&event.sender, text).await;
        self.persist();
    }

    async fn cmd_del_alias(&mut self, event: &MessageEvent, slave: &str) {
        if !self.aliases.remove(slave) {
            self.notice(&event.sender, "[Error] Alias does not exist.").await;
            return;
        }

        self.notice(&event.sender, "[Success] Alias removed.").await;
        self.persist();
    }

    async fn find_match_or_notice(&self, event: &MessageEvent, id: u32) -> Option<usize> {
        let index = self.store.index_of(id);
        if index.is_none() {
            self.notice(&event.sender, "[Error] Match id doesn't exist.").await;
        }
        index
    }

    async fn find_result_or_notice(
        &self,
        event: &MessageEvent,
        match_index: usize,
        ordinal: usize,
    ) -> Option<usize> {
        let index = self.store.result_index(match_index, ordinal);
        if index.is_none() {
            self.notice(&event.sender, "[Error] Result id doesn't exist.").await;
        }
        index
    }

    async fn parse_date_or_notice(&self, event: &MessageEvent, raw: &str) -> Option<NaiveDateTime> {
        match parse_match_date(raw) {
            Ok(date) => Some(date),
            Err(DateParseError::Shape) => {
                self.notice(
                    &event.sender,
                    "[Error] Unable to parse date.  Please use the following format: <dd/mm/yy> <hh:mm>.",
                )
                .await;
                None
            }
            Err(DateParseError::Invalid) => {
                self.notice(&event.sender, "[Error] Unable to instantiate date.").await;
                None
            }
        }
    }

    async fn notice(&self, to: &str, text: &str) {
        if let Err(e) = self.port.send_notice(to, text).await {
            warn!(to, "notice delivery failed: {e}");
        }
    }

    async fn public(&self, channel: &str, text: &str) {
        if let Err(e) = self.port.send_message(channel, text).await {
            warn!(channel, "message delivery failed: {e}");
        }
    }

    /// Write-through: the whole store hits disk after every mutation. On
    /// failure the in-memory state stands and the next successful command
    /// re-persists everything.
    fn persist(&self) {
        if let Err(e) = storage::save(
            &self.cfg.data_file,
            &self.cfg.backup_file,
            &self.store,
            &self.aliases,
        ) {
            error!("failed to persist match data: {e}");
        }
    }

    fn audit_write(&self, event: AuditEvent) {
        if let Err(e) = self.audit.write(event) {
            warn!("audit write failed: {e}");
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn usage_text(topic: HelpTopic) -> &'static str {
    match topic {
        HelpTopic::Commands => {
            "[Help] Available commands: !add !yes !maybe !no !unsign !list !info !update !result \
             !updateresult !delresult !del !undel !rename !alias !delalias - Use !help <command> \
             for more information."
        }
        HelpTopic::Add => {
            "[Help] !add <dd/mm/yy> <hh:mm> <gametype> <team> [comment] - Add a new match.  \
             AMS times!"
        }
        HelpTopic::Signup => {
            "[Help] !(yes|maybe|no|unsign) <id> [name] - Set yourself as available, maybe, \
             unavailable or unsign for a match.  If you include a name, that name will be used \
             instead of your nick. For a list of ids, use !list or rejoin the channel."
        }
        HelpTopic::List => {
            "[Help] !list [unsigned] [name] - List the upcoming matches.  If you include \
             'unsigned', it will only show the matches you aren't signed up for.  If you include \
             a name, that name will be used instead of your nick to check for availability."
        }
        HelpTopic::Info => {
            "[Help] !info <id> [name] - Get information about a match.  Includes lists of players \
             that are signed up.  If you include a name, that name will be used instead of your \
             nick to check for availability."
        }
        HelpTopic::Update => {
            "[Help] !update <id> <property> [value] - Update the information in a match.  You can \
             update: date, team, gametype and comment."
        }
        HelpTopic::Result => {
            "[Help] !result <id> <map> <ourteam> <ourscore> <theirscore> [comment] - Add a map \
             result for a match.  Repeat once for each map."
        }
        HelpTopic::UpdateResult => {
            "[Help] !updateresult <matchid> <resultid> <property> [value] - Update the information \
             in a result.  You can update: map, team, ourscore, theirscore and comment."
        }
        HelpTopic::DelResult => {
            "[Help] !delresult <matchid> <resultid> - Permanently delete this result from a match."
        }
        HelpTopic::Del => {
            "[Help] !del <id> - Remove a match from the list.  Add results before removing.  \
             Matches removed without results will not be saved!"
        }
        HelpTopic::Undel => "[Help] !undel <id> - Restores a deleted match to the active list.",
        HelpTopic::Rename => {
            "[Help] !rename <id> <from> <to> - Changes the name of a somebody already signed up \
             to a match.  Use if you signed up with the wrong name by mistake."
        }
        HelpTopic::Alias => {
            "[Help] !alias <master> <slave> - Adds an alias to the bot.  Aliases will \
             automatically change your name from your current nick to another name."
        }
        HelpTopic::DelAlias => {
            "[Help] !delalias <slave> - Removes an alias to the bot.  Aliases will automatically \
             change your name from your current nick to another name."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::Origin;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakePort {
        sent: Mutex<Vec<Sent>>,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Sent {
        target: String,
        text: String,
        public: bool,
    }

    #[async_trait::async_trait]
    impl ChatPort for FakePort {
        async fn send_notice(&self, to: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent {
                target: to.to_string(),
                text: text.to_string(),
                public: false,
            });
            Ok(())
        }

        async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent {
                target: channel.to_string(),
                text: text.to_string(),
                public: true,
            });
            Ok(())
        }
    }

    impl FakePort {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.sent().into_iter().map(|s| s.text).collect()
        }

        fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.ini"))
    }

    fn test_config(data_file: PathBuf) -> Arc<Config> {
        let backup_file = data_file.with_extension("old.ini");
        Arc::new(Config {
            nick: "matchbot".to_string(),
            data_file,
            backup_file,
            private_channel: "#clan".to_string(),
            channel_key: None,
            public_channel: "#clan-pub".to_string(),
            join_delay: Duration::from_millis(0),
            audit_log_path: None,
            audit_log_json: false,
        })
    }

    fn test_bot(port: Arc<FakePort>) -> MatchBot {
        let cfg = test_config(tmp_file("matchbot-bot-test"));
        MatchBot::load(cfg, port).unwrap()
    }

    fn cleanup(bot: &MatchBot) {
        let _ = std::fs::remove_file(&bot.cfg.data_file);
        let _ = std::fs::remove_file(&bot.cfg.backup_file);
    }

    async fn channel_say(bot: &mut MatchBot, nick: &str, text: &str) {
        bot.handle_message(&MessageEvent {
            sender: nick.to_string(),
            origin: Origin::Channel("#clan".to_string()),
            text: text.to_string(),
            phase: Phase::After,
        })
        .await;
    }

    async fn private_say(bot: &mut MatchBot, nick: &str, text: &str) {
        bot.handle_message(&MessageEvent {
            sender: nick.to_string(),
            origin: Origin::User(nick.to_string()),
            text: text.to_string(),
            phase: Phase::After,
        })
        .await;
    }

    #[tokio::test]
    async fn add_creates_a_match_and_announces_it_twice() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        channel_say(&mut bot, "Bob", "!add 24/12/23 18:30 TDM OpponentsFC Xmas match").await;

        let m = &bot.store.matches()[0];
        assert_eq!(m.id, 1);
        assert_eq!(m.team, "OpponentsFC");
        assert_eq!(m.game_type, "TDM");
        assert_eq!(m.comment.as_deref(), Some("Xmas match"));
        assert_eq!(m.date, parse_match_date("24/12/23 18:30").unwrap());

        assert_eq!(
            port.sent(),
            vec![
                Sent {
                    target: "Bob".to_string(),
                    text: "[Success] New match id 1 added!".to_string(),
                    public: false
                },
                Sent {
                    target: "#clan".to_string(),
                    text: "[Match] New match id 1 added!".to_string(),
                    public: true
                },
            ]
        );

        // Write-through happened.
        let saved = std::fs::read_to_string(&bot.cfg.data_file).unwrap();
        assert!(saved.contains("[1]\nDate=24/12/23 18:30\n"));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn add_from_a_private_message_skips_the_public_half() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        private_say(&mut bot, "Bob", "!add 24/12/23 18:30 TDM OpponentsFC").await;

        let sent = port.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].public);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn signup_applies_then_reports_already_set() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        port.clear();

        channel_say(&mut bot, "Bob", "!yes 1").await;
        assert_eq!(port.texts(), vec!["[Success] Signed up as available."]);
        assert_eq!(bot.store.matches()[0].yes, vec!["Bob".to_string()]);

        port.clear();
        channel_say(&mut bot, "Bob", "!yes 1").await;
        assert_eq!(
            port.texts(),
            vec!["[Error] You are already set as available for that match."]
        );
        assert_eq!(bot.store.matches()[0].yes, vec!["Bob".to_string()]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn signup_on_behalf_of_another_name_says_so() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        port.clear();

        channel_say(&mut bot, "Bob", "!maybe 1 Carol").await;
        assert_eq!(port.texts(), vec!["[Success] Signed up as maybe, as Carol."]);
        assert_eq!(bot.store.matches()[0].maybe, vec!["Carol".to_string()]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn signup_against_a_missing_match_gets_error_then_usage() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        channel_say(&mut bot, "Bob", "!yes 9").await;
        let texts = port.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "[Error] Match id doesn't exist.");
        assert!(texts[1].starts_with("[Help] !(yes|maybe|no|unsign)"));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn unsign_requires_an_existing_signup() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        channel_say(&mut bot, "Bob", "!no 1").await;
        port.clear();

        channel_say(&mut bot, "Bob", "!unsign 1").await;
        assert_eq!(port.texts(), vec!["[Success] Unsigned from the match."]);

        port.clear();
        channel_say(&mut bot, "Bob", "!unsign 1").await;
        assert_eq!(
            port.texts(),
            vec!["[Error] You are not signed up for that match."]
        );
        cleanup(&bot);
    }

    #[tokio::test]
    async fn list_unsigned_with_nothing_open_says_no_matches() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        channel_say(&mut bot, "Bob", "!yes 1").await;
        port.clear();

        channel_say(&mut bot, "Bob", "!list unsigned").await;
        assert_eq!(port.texts(), vec!["[Info] No matches."]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn public_list_downgrades_to_private_outside_a_channel() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        port.clear();

        channel_say(&mut bot, "Bob", "@list").await;
        let sent = port.sent();
        assert!(sent[0].public);
        assert_eq!(sent[0].target, "#clan");
        assert!(!sent[0].text.contains("Signed as"));

        port.clear();
        private_say(&mut bot, "Bob", "@list").await;
        let sent = port.sent();
        assert!(!sent[0].public);
        assert_eq!(sent[0].target, "Bob");
        assert!(sent[0].text.contains("Signed as"));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn deleted_matches_are_hidden_from_listings_but_addressable() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 24/12/23 18:30 TDM Them").await;
        port.clear();

        channel_say(&mut bot, "Admin", "!del 1").await;
        assert_eq!(port.texts(), vec!["[Success] Match marked as deleted."]);

        port.clear();
        channel_say(&mut bot, "Bob", "!list").await;
        assert_eq!(port.texts(), vec!["[Info] No matches."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!undel 1").await;
        assert_eq!(port.texts(), vec!["[Success] Match restored."]);

        port.clear();
        channel_say(&mut bot, "Bob", "!list").await;
        assert_eq!(port.texts().len(), 1);
        assert!(port.texts()[0].starts_with("[Info] 1:"));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn malformed_commands_degrade_to_usage_and_noise_is_ignored() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        channel_say(&mut bot, "Bob", "!add whenever TDM Them").await;
        assert!(port.texts()[0].starts_with("[Help] !add"));

        port.clear();
        channel_say(&mut bot, "Bob", "so, anyone up for a scrim?").await;
        assert!(port.texts().is_empty());

        port.clear();
        channel_say(&mut bot, "Bob", "!help").await;
        assert!(port.texts()[0].starts_with("[Help] Available commands:"));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn invalid_calendar_date_is_rejected_without_a_match() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        channel_say(&mut bot, "Bob", "!add 31/02/23 10:00 TDM Them").await;
        assert_eq!(port.texts(), vec!["[Error] Unable to instantiate date."]);
        assert!(bot.store.matches().is_empty());
        cleanup(&bot);
    }

    #[tokio::test]
    async fn update_date_resorts_and_update_team_takes_one_token() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM First").await;
        channel_say(&mut bot, "Admin", "!add 02/01/24 10:00 TDM Second").await;
        port.clear();

        channel_say(&mut bot, "Admin", "!update 1 date 03/01/24 10:00").await;
        assert_eq!(port.texts(), vec!["[Success] Updated."]);
        let ids: Vec<u32> = bot.store.matches().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);

        port.clear();
        channel_say(&mut bot, "Admin", "!update 2 team NewTeam with junk").await;
        assert_eq!(port.texts(), vec!["[Success] Updated."]);
        let idx = bot.store.index_of(2).unwrap();
        assert_eq!(bot.store.get(idx).team, "NewTeam");

        port.clear();
        channel_say(&mut bot, "Admin", "!update 2 team").await;
        assert!(port.texts()[0].starts_with("[Help] !update"));

        port.clear();
        channel_say(&mut bot, "Admin", "!update 2 color red").await;
        assert_eq!(port.texts(), vec!["[Error] Unknown match property."]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn result_lifecycle_add_update_delete() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        port.clear();

        channel_say(&mut bot, "Admin", "!result 1 mp_depot us 13 7 good one").await;
        assert_eq!(port.texts(), vec!["[Success] Result added."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!updateresult 1 1 ourscore 14").await;
        assert_eq!(port.texts(), vec!["[Success] Updated."]);
        assert_eq!(bot.store.matches()[0].results[0].our_score, 14);

        port.clear();
        channel_say(&mut bot, "Admin", "!updateresult 1 1 ourscore lots").await;
        assert_eq!(port.texts(), vec!["[Error] Our score must be numeric."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!delresult 1 2").await;
        assert_eq!(port.texts(), vec!["[Error] Result id doesn't exist."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!delresult 1 1").await;
        assert_eq!(port.texts(), vec!["[Success] Result deleted."]);
        assert!(bot.store.matches()[0].results.is_empty());
        cleanup(&bot);
    }

    #[tokio::test]
    async fn alias_rewrites_existing_signups_and_future_ones() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        channel_say(&mut bot, "SmurfBob", "!yes 1").await;
        port.clear();

        channel_say(&mut bot, "Admin", "!alias Bob SmurfBob").await;
        assert_eq!(port.texts(), vec!["[Success] Alias added."]);
        assert_eq!(bot.store.matches()[0].yes, vec!["Bob".to_string()]);

        // The sender now resolves to the master, so the self-signup reads as
        // acting on behalf of that name.
        port.clear();
        channel_say(&mut bot, "SmurfBob", "!maybe 1").await;
        assert_eq!(port.texts(), vec!["[Success] Signed up as maybe, as Bob."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!alias Robert SmurfBob").await;
        assert_eq!(port.texts(), vec!["[Success] Updated alias."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!delalias SmurfBob").await;
        assert_eq!(port.texts(), vec!["[Success] Alias removed."]);

        port.clear();
        channel_say(&mut bot, "Admin", "!delalias SmurfBob").await;
        assert_eq!(port.texts(), vec!["[Error] Alias does not exist."]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn rename_moves_a_signup_in_place() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        channel_say(&mut bot, "Alice", "!maybe 1").await;
        port.clear();

        channel_say(&mut bot, "Admin", "!rename 1 Alice Alicia").await;
        assert_eq!(port.texts(), vec!["[Success] Sign-up changed."]);
        assert_eq!(bot.store.matches()[0].maybe, vec!["Alicia".to_string()]);

        port.clear();
        channel_say(&mut bot, "Admin", "!rename 1 Alice Anyone").await;
        assert_eq!(
            port.texts(),
            vec!["[Error] That person is not signed up for that match."]
        );
        cleanup(&bot);
    }

    #[tokio::test]
    async fn info_reports_signups_and_results() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        channel_say(&mut bot, "Bob", "!yes 1").await;
        channel_say(&mut bot, "Admin", "!result 1 mp_depot us 13 7").await;
        port.clear();

        channel_say(&mut bot, "Bob", "!info 1").await;
        let texts = port.texts();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("Signed as \u{3}3available"));
        assert!(texts[1].contains("Signed up: \u{3}3Yes (1): Bob"));
        assert!(texts[2].contains("Results: 1: mp_depot (us) 13-7"));

        port.clear();
        channel_say(&mut bot, "Bob", "!info 9").await;
        assert_eq!(port.texts(), vec!["[Error] Match id doesn't exist."]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn before_phase_events_are_ignored() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        bot.handle_message(&MessageEvent {
            sender: "Bob".to_string(),
            origin: Origin::Channel("#clan".to_string()),
            text: "!help".to_string(),
            phase: Phase::Before,
        })
        .await;
        assert!(port.texts().is_empty());
        cleanup(&bot);
    }

    #[tokio::test]
    async fn join_announcer_lists_active_matches_for_the_joiner() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        channel_say(&mut bot, "Admin", "!add 02/01/24 10:00 CTF Others").await;
        channel_say(&mut bot, "SmurfBob", "!yes 1").await;
        channel_say(&mut bot, "Admin", "!alias Bob SmurfBob").await;
        channel_say(&mut bot, "Admin", "!del 2").await;
        port.clear();

        bot.handle_join(&JoinEvent {
            user: "SmurfBob".to_string(),
            channel: "#clan".to_string(),
            phase: Phase::After,
        })
        .await;

        let sent = port.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "SmurfBob");
        assert!(sent[0].text.contains("Signed as \u{3}3available."));
        cleanup(&bot);
    }

    #[tokio::test]
    async fn join_announcer_ignores_the_bot_itself_and_handles_empty_rosters() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());

        bot.handle_join(&JoinEvent {
            user: "matchbot".to_string(),
            channel: "#clan".to_string(),
            phase: Phase::After,
        })
        .await;
        assert!(port.texts().is_empty());

        bot.handle_join(&JoinEvent {
            user: "Bob".to_string(),
            channel: "#clan".to_string(),
            phase: Phase::After,
        })
        .await;
        assert_eq!(port.texts(), vec!["[Info] No matches."]);
        cleanup(&bot);
    }

    #[tokio::test]
    async fn deleted_match_with_results_survives_save_but_not_reload() {
        let port = Arc::new(FakePort::default());
        let mut bot = test_bot(port.clone());
        channel_say(&mut bot, "Admin", "!add 01/01/24 10:00 TDM Them").await;
        channel_say(&mut bot, "Admin", "!result 1 mp_depot us 13 7").await;
        channel_say(&mut bot, "Admin", "!del 1").await;

        let saved = std::fs::read_to_string(&bot.cfg.data_file).unwrap();
        assert!(saved.contains("[1]\n"));
        assert!(saved.contains("Deleted=Yes\n"));

        // Restart: the retained section is skipped, its id stays reserved.
        let port2 = Arc::new(FakePort::default());
        let mut bot2 = MatchBot::load(bot.cfg.clone(), port2.clone()).unwrap();
        assert!(bot2.store.matches().is_empty());

        channel_say(&mut bot2, "Admin", "!add 05/01/24 10:00 TDM Next").await;
        assert_eq!(bot2.store.matches()[0].id, 2);
        cleanup(&bot);
    }
}
