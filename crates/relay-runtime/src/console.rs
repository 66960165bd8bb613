//! # Console Driver
//!
//! Line-based commands that play the part of the chat platform: members join,
//! type messages, reply to the numbered copies they see, and moderators act
//! on those copies.
//!
//! ```text
//! join 1            say 1 hello world      reply 2 1 hi back
//! upvote 2 1        warn 1 3               delete 1 3
//! remove 1 3        info 1                 debug 1
//! karma 1           stats                  leave 1
//! ```
//!
//! Copy numbers are always the ones shown in the acting member's own chat.

use relay_core::adapters::MemoryDirectory;
use relay_core::ports::{SystemTimeSource, TimeSource, UserDirectory};
use relay_core::{RelayApi, RelayError, UpvoteOutcome};
use shared_types::{CopyId, InboundMessage, RecipientId, Timestamp};
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::ConsoleTransport;
use crate::container::{ConsoleRelay, RelayContainer};

pub const HELP: &str = "\
commands:
  join <member>                 add a member
  leave <member>                remove a member
  say <member> <text>           send a message
  reply <member> <copy> <text>  reply to a copy in the member's chat
  upvote <member> <copy>        give karma to a copy's author
  warn <mod> <copy>             warn the author (cooldown)
  delete <mod> <copy>           warn the author and delete everywhere
  remove <mod> <copy>           delete everywhere without a warning
  info <member>                 show a member's profile
  debug <member>                toggle receiving own messages
  karma <member>                toggle karma notifications
  stats                         relay counters
  quit                          stop the relay";

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(RecipientId),
    Leave(RecipientId),
    Say { sender: RecipientId, text: String },
    Reply { sender: RecipientId, copy: CopyId, text: String },
    Upvote { voter: RecipientId, copy: CopyId },
    Warn { moderator: RecipientId, copy: CopyId },
    Delete { moderator: RecipientId, copy: CopyId },
    Remove { moderator: RecipientId, copy: CopyId },
    Info(RecipientId),
    ToggleDebug(RecipientId),
    ToggleKarma(RecipientId),
    Stats,
    Help,
    Quit,
}

/// Malformed command lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Not a member id: {0}")]
    BadMember(String),

    #[error("Not a message number: {0}")]
    BadCopy(String),
}

fn member(raw: Option<&str>, usage: &'static str) -> Result<RecipientId, CommandError> {
    let raw = raw.ok_or(CommandError::Usage(usage))?;
    raw.parse()
        .map(RecipientId)
        .map_err(|_| CommandError::BadMember(raw.to_string()))
}

fn copy(raw: Option<&str>, usage: &'static str) -> Result<CopyId, CommandError> {
    let raw = raw.ok_or(CommandError::Usage(usage))?;
    raw.trim_start_matches('#')
        .parse()
        .map(CopyId)
        .map_err(|_| CommandError::BadCopy(raw.to_string()))
}

fn text(rest: Option<&str>, usage: &'static str) -> Result<String, CommandError> {
    match rest.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.replace("\\n", "\n")),
        _ => Err(CommandError::Usage(usage)),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let mut args = rest.split_whitespace();

        let command = match name {
            "join" => Command::Join(member(args.next(), "join <member>")?),
            "leave" => Command::Leave(member(args.next(), "leave <member>")?),
            "say" => {
                const USAGE: &str = "say <member> <text>";
                let (who, body) = rest.trim_start().split_once(' ').unwrap_or((rest, ""));
                Command::Say {
                    sender: member(Some(who).filter(|w| !w.is_empty()), USAGE)?,
                    text: text(Some(body), USAGE)?,
                }
            }
            "reply" => {
                const USAGE: &str = "reply <member> <copy> <text>";
                let mut parts = rest.trim_start().splitn(3, ' ');
                Command::Reply {
                    sender: member(parts.next().filter(|w| !w.is_empty()), USAGE)?,
                    copy: copy(parts.next(), USAGE)?,
                    text: text(parts.next(), USAGE)?,
                }
            }
            "upvote" | "+1" => {
                const USAGE: &str = "upvote <member> <copy>";
                Command::Upvote {
                    voter: member(args.next(), USAGE)?,
                    copy: copy(args.next(), USAGE)?,
                }
            }
            "warn" => {
                const USAGE: &str = "warn <mod> <copy>";
                Command::Warn {
                    moderator: member(args.next(), USAGE)?,
                    copy: copy(args.next(), USAGE)?,
                }
            }
            "delete" => {
                const USAGE: &str = "delete <mod> <copy>";
                Command::Delete {
                    moderator: member(args.next(), USAGE)?,
                    copy: copy(args.next(), USAGE)?,
                }
            }
            "remove" => {
                const USAGE: &str = "remove <mod> <copy>";
                Command::Remove {
                    moderator: member(args.next(), USAGE)?,
                    copy: copy(args.next(), USAGE)?,
                }
            }
            "info" => Command::Info(member(args.next(), "info <member>")?),
            "debug" => Command::ToggleDebug(member(args.next(), "debug <member>")?),
            "karma" => Command::ToggleKarma(member(args.next(), "karma <member>")?),
            "stats" => Command::Stats,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Failures while executing a command.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("{0} is not a moderator")]
    NotModerator(RecipientId),

    #[error("{0} is not a member")]
    UnknownMember(RecipientId),
}

fn format_time(at: Timestamp) -> String {
    i64::try_from(at.as_secs())
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| at.as_secs().to_string())
}

/// Executes commands against the relay and its adapters.
pub struct ConsoleDriver {
    relay: Arc<ConsoleRelay>,
    transport: Arc<ConsoleTransport>,
    directory: Arc<MemoryDirectory>,
    clock: Arc<SystemTimeSource>,
}

impl ConsoleDriver {
    pub fn new(container: &RelayContainer) -> Self {
        Self {
            relay: Arc::clone(&container.relay),
            transport: Arc::clone(&container.transport),
            directory: Arc::clone(&container.directory),
            clock: Arc::clone(&container.clock),
        }
    }

    fn require_moderator(&self, id: RecipientId) -> Result<(), ConsoleError> {
        match self.directory.profile(id) {
            Some(profile) if profile.rank.is_privileged() => Ok(()),
            Some(_) => Err(ConsoleError::NotModerator(id)),
            None => Err(ConsoleError::UnknownMember(id)),
        }
    }

    async fn relay_text(
        &self,
        sender: RecipientId,
        text: String,
        reply_to: Option<CopyId>,
    ) -> Result<String, ConsoleError> {
        let origin = self.transport.post_origin(sender);
        let mut message = InboundMessage::text(sender, origin, text);
        message.reply_to = reply_to;
        let canonical = self.relay.submit_inbound(message).await?;
        Ok(format!("{sender} #{origin} relayed as {canonical}"))
    }

    /// Run one command and describe the result.
    pub async fn execute(&self, command: Command) -> Result<String, ConsoleError> {
        let now = self.clock.now();
        match command {
            Command::Join(id) => {
                let profile = self.directory.join(id, now);
                if !profile.is_active() {
                    return Ok(format!("{id} is blacklisted"));
                }
                if self.relay.join(id) {
                    Ok(format!("{id} joined"))
                } else {
                    Ok(format!("{id} is already in the chat"))
                }
            }
            Command::Leave(id) => {
                self.directory
                    .leave(id, now)
                    .map_err(|_| ConsoleError::UnknownMember(id))?;
                self.relay.leave(id);
                Ok(format!("{id} left"))
            }
            Command::Say { sender, text } => self.relay_text(sender, text, None).await,
            Command::Reply { sender, copy, text } => {
                self.relay_text(sender, text, Some(copy)).await
            }
            Command::Upvote { voter, copy } => {
                let canonical = self.relay.resolve_reply(voter, copy)?;
                let outcome = match self.relay.upvote(canonical, voter).await? {
                    UpvoteOutcome::Accepted => "upvoted",
                    UpvoteOutcome::AlreadyUpvoted => "already upvoted",
                    UpvoteOutcome::SelfUpvote => "can't upvote own message",
                };
                Ok(format!("{voter}: {canonical} {outcome}"))
            }
            Command::Warn { moderator, copy } => {
                self.require_moderator(moderator)?;
                let canonical = self.relay.resolve_reply(moderator, copy)?;
                let cooldown = self.relay.moderate_warn(canonical).await?;
                Ok(format!(
                    "author of {canonical} warned, cooldown {} minutes",
                    cooldown.as_secs() / 60
                ))
            }
            Command::Delete { moderator, copy } => {
                self.require_moderator(moderator)?;
                let canonical = self.relay.resolve_reply(moderator, copy)?;
                let (cooldown, report) = self.relay.moderate_warn_and_delete(canonical).await?;
                Ok(format!(
                    "{canonical} deleted ({} copies, {} failed), cooldown {} minutes",
                    report.retracted,
                    report.failed,
                    cooldown.as_secs() / 60
                ))
            }
            Command::Remove { moderator, copy } => {
                self.require_moderator(moderator)?;
                let canonical = self.relay.resolve_reply(moderator, copy)?;
                let report = self.relay.moderate_delete(canonical).await?;
                Ok(format!(
                    "{canonical} removed ({} copies, {} failed)",
                    report.retracted, report.failed
                ))
            }
            Command::Info(id) => {
                let profile = self
                    .directory
                    .profile(id)
                    .ok_or(ConsoleError::UnknownMember(id))?;
                let mut line = format!(
                    "{id}: {}, karma {}, warnings {}",
                    profile.rank, profile.karma, profile.warnings
                );
                if profile.is_in_cooldown(now) {
                    if let Some(until) = profile.cooldown_until {
                        line.push_str(&format!(", cooldown until {}", format_time(until)));
                    }
                }
                if !profile.is_active() {
                    line.push_str(", not in chat");
                }
                Ok(line)
            }
            Command::ToggleDebug(id) => {
                let profile = self
                    .directory
                    .update(id, |p| p.debug_enabled = !p.debug_enabled)
                    .map_err(|_| ConsoleError::UnknownMember(id))?;
                Ok(format!("{id}: debug mode {}", on_off(profile.debug_enabled)))
            }
            Command::ToggleKarma(id) => {
                let profile = self
                    .directory
                    .update(id, |p| p.hide_karma = !p.hide_karma)
                    .map_err(|_| ConsoleError::UnknownMember(id))?;
                Ok(format!(
                    "{id}: karma notifications {}",
                    on_off(!profile.hide_karma)
                ))
            }
            Command::Stats => Ok(format!(
                "members {}, cached messages {}, live broadcasts {}, spam scores {}",
                self.relay.roster().len(),
                self.relay.cache().len(),
                self.relay.ledger().len(),
                self.relay.scores().tracked()
            )),
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok("bye".to_string()),
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Read commands from `input` until EOF, `quit` or shutdown.
///
/// Results go to `out`; failures are reported there too and never end the
/// loop.
pub async fn run_console<R, W>(
    driver: &ConsoleDriver,
    input: R,
    out: &mut W,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.changed() => break,
        };
        let Some(line) = line else {
            info!("Console input closed");
            break;
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };
        let quit = command == Command::Quit;
        match driver.execute(command).await {
            Ok(reply) => writeln!(out, "{reply}")?,
            Err(e) => {
                warn!("Command failed: {}", e);
                writeln!(out, "error: {e}")?;
            }
        }
        if quit {
            break;
        }
    }
    Ok(())
}
