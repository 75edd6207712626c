//! Player stats ledger, advanced only through [`apply_event`].

use serde::{Deserialize, Serialize};

use crate::strategy::PriorityRule;

pub const STAT_MAX: i32 = 100;
pub const XP_PER_LEVEL: i32 = 1000;
pub const RESOLUTION_MANA_COST: i32 = 20;
pub const RECHARGE_MANA: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub focus: i32,
    pub agility: i32,
    pub consistency: i32,
    pub zen: i32,
    pub mana: i32,
    pub xp: i32,
    pub level: i32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            focus: 65,
            agility: 40,
            consistency: 80,
            zen: 50,
            mana: 80,
            xp: 250,
            level: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    TaskAdded,
    ChaosInjected,
    ResolutionExecuted { rule: PriorityRule },
    ResolutionRefused,
    Recharged,
    RechargeRefused,
    TimelineCleared,
}

impl StatEvent {
    pub fn xp(&self) -> i32 {
        match self {
            StatEvent::TaskAdded => 50,
            StatEvent::ChaosInjected => 75,
            StatEvent::ResolutionExecuted { .. } => 250,
            StatEvent::Recharged => 25,
            StatEvent::ResolutionRefused | StatEvent::RechargeRefused | StatEvent::TimelineCleared => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            StatEvent::TaskAdded => "New Timeline Node Anchored".to_string(),
            StatEvent::ChaosInjected => "Anomalous Signal Injected".to_string(),
            StatEvent::ResolutionExecuted { rule } => {
                format!("{} Optimization Complete", rule.id().to_uppercase())
            }
            StatEvent::ResolutionRefused => "Insufficient Mana! Meditate to recover.".to_string(),
            StatEvent::Recharged => "Meditating... Mana Restored".to_string(),
            StatEvent::RechargeRefused => "Energy Pool at Maximum".to_string(),
            StatEvent::TimelineCleared => "Temporal Buffer Cleared".to_string(),
        }
    }
}

pub fn apply_event(stats: PlayerStats, event: &StatEvent) -> PlayerStats {
    let mut next = stats;
    match event {
        StatEvent::ResolutionExecuted { .. } => {
            next.zen = (next.zen + 10).min(STAT_MAX);
            next.mana = (next.mana - RESOLUTION_MANA_COST).max(0);
            next.agility = (next.agility + 12).min(STAT_MAX);
            next.focus = (next.focus + 5).min(STAT_MAX);
        }
        StatEvent::Recharged => {
            next.mana = (next.mana + RECHARGE_MANA).min(STAT_MAX);
            next.zen = (next.zen + 5).min(STAT_MAX);
        }
        _ => {}
    }
    next.xp += event.xp();
    next.level = next.xp / XP_PER_LEVEL + 1;
    next
}
