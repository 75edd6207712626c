//! `zeno play`: line-oriented session loop.
//!
//! Resolution runs on a spawned task and reports back over a channel, so the
//! prompt keeps accepting commands (and edits) while a remote call is pending.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use zeno_core::{RandomSource, ResolveOutcome, Session, TaskDraft, TaskType};

use crate::render;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(TaskDraft),
    Chaos,
    Resolve,
    Rule(String),
    Recharge,
    Remove(String),
    Clear,
    Show,
    Stats,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  add <start> <duration> <title...> [u=1-5] [i=1-5] [e=1-5] [type=work|personal|health]
  chaos                 inject a disruptive task
  resolve               resolve conflicts with the current rule
  rule <id>             urgency | importance | energy | balanced
  recharge              restore mana
  rm <id>               remove a task
  clear                 empty the timeline
  show | stats | help | quit";

pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let cmd = match head.to_ascii_lowercase().as_str() {
        "add" | "a" => Command::Add(parse_add(&rest)?),
        "chaos" | "c" => Command::Chaos,
        "resolve" | "r" => Command::Resolve,
        "rule" => match rest.first() {
            Some(id) => Command::Rule(id.to_string()),
            None => bail!("usage: rule <urgency|importance|energy|balanced>"),
        },
        "recharge" | "meditate" => Command::Recharge,
        "rm" | "remove" => match rest.first() {
            Some(id) => Command::Remove(id.to_string()),
            None => bail!("usage: rm <id>"),
        },
        "clear" => Command::Clear,
        "show" | "ls" => Command::Show,
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command: {other} (try `help`)"),
    };
    Ok(Some(cmd))
}

fn parse_add(args: &[&str]) -> Result<TaskDraft> {
    let [start, duration, rest @ ..] = args else {
        bail!("usage: add <start> <duration> <title...>");
    };
    let mut draft = TaskDraft {
        start_time: parse_hour(start)?,
        duration: duration
            .parse()
            .with_context(|| format!("duration must be hours, got {duration}"))?,
        ..TaskDraft::default()
    };

    let mut title = Vec::new();
    for word in rest {
        match word.split_once('=') {
            Some((key, value)) => apply_option(&mut draft, key, value)?,
            None => title.push(*word),
        }
    }
    draft.title = title.join(" ");
    Ok(draft)
}

/// `9`, `9.5` or `09:30`.
fn parse_hour(s: &str) -> Result<f64> {
    if let Some((h, m)) = s.split_once(':') {
        let h: f64 = h.parse().with_context(|| format!("bad hour in {s}"))?;
        let m: f64 = m.parse().with_context(|| format!("bad minutes in {s}"))?;
        return Ok(h + m / 60.0);
    }
    s.parse().with_context(|| format!("start must be an hour, got {s}"))
}

fn apply_option(draft: &mut TaskDraft, key: &str, value: &str) -> Result<()> {
    let metric = || value.parse::<i32>().with_context(|| format!("{key} must be 1-5, got {value}"));
    match key {
        "u" | "urgency" => draft.urgency = metric()?,
        "i" | "importance" => draft.importance = metric()?,
        "e" | "energy" => draft.energy_level = metric()?,
        "type" | "t" => {
            draft.task_type = match TaskType::parse(value) {
                Some(TaskType::Chaos) | None => bail!("type must be work, personal, or health"),
                Some(t) => t,
            }
        }
        other => bail!("unknown option: {other}"),
    }
    Ok(())
}

pub async fn run(session: Arc<Session>, mut rng: Box<dyn RandomSource + Send>) -> Result<()> {
    println!("ZENO online. Type `help` for commands.");
    show(&session);

    let (tx, mut rx) = mpsc::unbounded_channel::<ResolveOutcome>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                let cmd = match parse_command(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                debug!(?cmd, "command");
                match cmd {
                    Command::Quit => break,
                    Command::Resolve => {
                        if session.is_resolving() {
                            println!("{}", render::outcome_line(&ResolveOutcome::AlreadyInFlight));
                            continue;
                        }
                        println!("Resolving with {}...", session.rule());
                        let session = session.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(session.resolve().await);
                        });
                    }
                    other => apply(&session, other, rng.as_mut()),
                }
            }
            Some(outcome) = rx.recv() => {
                println!("{}", render::outcome_line(&outcome));
                show(&session);
            }
        }
    }
    Ok(())
}

fn apply(session: &Session, cmd: Command, rng: &mut (dyn RandomSource + Send)) {
    match cmd {
        Command::Add(draft) => match session.add_task(draft) {
            Ok(t) => println!("Added {} at {}", t.id, zeno_core::format_range(&t)),
            Err(e) => println!("Rejected: {e}"),
        },
        Command::Chaos => {
            if let Some(t) = session.inject_chaos(rng) {
                println!("Chaos: {} at {}", t.title, zeno_core::format_range(&t));
            }
        }
        Command::Rule(id) => println!("Rule set to {}", session.select_rule(&id)),
        Command::Recharge => {
            session.recharge();
        }
        Command::Remove(id) => match session.remove_task(&id) {
            Some(t) => println!("Removed {} ({})", t.id, t.title),
            None => println!("No task with id {id}"),
        },
        Command::Clear => session.clear(),
        Command::Show | Command::Stats => {}
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Resolve | Command::Quit => return,
    }
    show(session);
}

fn show(session: &Session) {
    render::print_advisories(&session.drain_advisories());
    render::print_timeline(&session.timeline(), &session.stress());
    println!("{}", render::stats_line(&session.stats(), session.rule()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_options() {
        let cmd = parse_command("add 09:30 1.5 Deep work block u=5 type=health e=2").unwrap();
        let Some(Command::Add(d)) = &cmd else {
            panic!("expected add, got {cmd:?}");
        };
        assert_eq!(d.title, "Deep work block");
        assert_eq!(d.start_time, 9.5);
        assert_eq!(d.duration, 1.5);
        assert_eq!(d.urgency, 5);
        assert_eq!(d.importance, 3);
        assert_eq!(d.energy_level, 2);
        assert_eq!(d.task_type, TaskType::Health);
    }

    #[test]
    fn add_requires_start_and_duration() {
        assert!(parse_command("add lunch").is_err());
        assert!(parse_command("add 12 1 lunch type=chaos").is_err());
        assert!(parse_command("add 12 1 lunch x=1").is_err());
    }

    #[test]
    fn blank_lines_and_aliases() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("r").unwrap(), Some(Command::Resolve));
        assert_eq!(parse_command("rule energy").unwrap(), Some(Command::Rule("energy".into())));
        assert!(parse_command("rm").is_err());
        assert!(parse_command("dance").is_err());
    }
}
