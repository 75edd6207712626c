use chrono::Local;

use zeno_core::{Advisory, PlayerStats, PriorityRule, ResolveOutcome, StressReading, TimelineEntry};

pub fn timeline_lines(entries: &[TimelineEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["  (timeline empty)".to_string()];
    }
    entries
        .iter()
        .map(|e| {
            let flag = if e.has_conflict { "!!" } else { "  " };
            format!(
                "{flag} {}  {:<28} {:<8} [{}] u{} i{} e{} mana {}",
                e.range,
                e.task.title,
                format!("{:?}", e.task.task_type),
                e.task.id,
                e.task.urgency,
                e.task.importance,
                e.task.energy_level,
                e.task.mana_cost,
            )
        })
        .collect()
}

pub fn stress_line(stress: &StressReading) -> String {
    format!(
        "Stress {:>5.1}%  {}  ({} conflicting)",
        stress.percent,
        stress.status.label(),
        stress.conflicts
    )
}

pub fn stats_line(stats: &PlayerStats, rule: PriorityRule) -> String {
    format!(
        "LV {}  XP {}  MANA {}  FOCUS {}  AGILITY {}  CONSISTENCY {}  ZEN {}  RULE {}",
        stats.level,
        stats.xp,
        stats.mana,
        stats.focus,
        stats.agility,
        stats.consistency,
        stats.zen,
        rule.id().to_uppercase()
    )
}

pub fn advisory_line(a: &Advisory) -> String {
    let at = a.at.with_timezone(&Local).format("%H:%M:%S");
    if a.xp > 0 {
        format!("[{at}] {} (+{} XP)", a.message, a.xp)
    } else {
        format!("[{at}] {}", a.message)
    }
}

pub fn outcome_line(outcome: &ResolveOutcome) -> String {
    match outcome {
        ResolveOutcome::Resolved {
            rule,
            source,
            fallback_reason,
            overflow,
        } => {
            let mut s = format!("Resolved with {rule} ({source:?})");
            if let Some(reason) = fallback_reason {
                s.push_str(&format!("; remote skipped: {reason}"));
            }
            if !overflow.is_empty() {
                s.push_str(&format!("; past close: {}", overflow.join(", ")));
            }
            s
        }
        ResolveOutcome::AlreadyInFlight => "Resolution already in progress".to_string(),
        ResolveOutcome::InsufficientMana { mana, required } => {
            format!("Not enough mana ({mana}/{required}); try `recharge`")
        }
        ResolveOutcome::Failed(e) => format!("Resolution failed: {e}"),
    }
}

pub fn print_timeline(entries: &[TimelineEntry], stress: &StressReading) {
    for line in timeline_lines(entries) {
        println!("{line}");
    }
    println!("{}", stress_line(stress));
}

pub fn print_advisories(advisories: &[Advisory]) {
    for a in advisories {
        println!("{}", advisory_line(a));
    }
}
