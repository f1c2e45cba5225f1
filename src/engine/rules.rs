//! Transition rule tables.
//!
//! Each state owns an ordered slice of rules. Rules are checked top to
//! bottom and the first satisfied predicate wins; if none match the bot
//! stays where it is. The death override is checked ahead of every table.
//! Pure data: nothing here touches a bot directly.

use super::config::*;
use super::state::BotState;

/// Inputs a rule predicate may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext {
    pub visible: bool,
    /// Distance to the player; `f64::INFINITY` when unknown.
    pub distance: f64,
    pub health: i32,
    /// Seconds since the last actual state change.
    pub time_in_state: f64,
    pub idle_timer: f64,
    pub patrol_timer: f64,
}

/// A single candidate transition.
#[derive(Clone, Copy)]
pub struct Rule {
    pub target: BotState,
    pub reason: &'static str,
    pub when: fn(&RuleContext) -> bool,
}

impl Rule {
    pub fn matches(&self, ctx: &RuleContext) -> bool {
        (self.when)(ctx)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("target", &self.target)
            .field("reason", &self.reason)
            .finish()
    }
}

// ── Predicates ───────────────────────────────────────────────────────

fn health_depleted(ctx: &RuleContext) -> bool {
    ctx.health <= 0
}

fn player_in_chase_range(ctx: &RuleContext) -> bool {
    ctx.visible && ctx.distance < CHASE_RANGE
}

fn player_in_attack_range(ctx: &RuleContext) -> bool {
    ctx.visible && ctx.distance < ATTACK_RANGE
}

fn player_beyond_attack_range(ctx: &RuleContext) -> bool {
    ctx.visible && ctx.distance > ATTACK_RANGE
}

fn player_not_visible(ctx: &RuleContext) -> bool {
    !ctx.visible
}

fn player_escaped_chase(ctx: &RuleContext) -> bool {
    ctx.distance > CHASE_GIVE_UP_RANGE
}

fn player_at_safe_distance(ctx: &RuleContext) -> bool {
    ctx.distance > FLEE_SAFE_RANGE
}

fn health_critical(ctx: &RuleContext) -> bool {
    ctx.health < FLEE_HEALTH_THRESHOLD
}

fn recovered_and_player_visible(ctx: &RuleContext) -> bool {
    ctx.health > RECOVER_HEALTH_THRESHOLD && ctx.visible
}

fn idle_timer_expired(ctx: &RuleContext) -> bool {
    ctx.time_in_state > ctx.idle_timer
}

fn patrol_timer_expired(ctx: &RuleContext) -> bool {
    ctx.time_in_state > ctx.patrol_timer
}

// ── Tables ───────────────────────────────────────────────────────────

/// Checked before any per-state table, in every state.
pub static DEATH_RULE: Rule = Rule {
    target: BotState::Dead,
    reason: REASON_HEALTH_DEPLETED,
    when: health_depleted,
};

const IDLE_RULES: &[Rule] = &[
    Rule {
        target: BotState::Chase,
        reason: "Player detected nearby",
        when: player_in_chase_range,
    },
    Rule {
        target: BotState::Patrol,
        reason: "Idle timer expired",
        when: idle_timer_expired,
    },
];

const PATROL_RULES: &[Rule] = &[
    Rule {
        target: BotState::Chase,
        reason: "Player spotted during patrol",
        when: player_in_chase_range,
    },
    Rule {
        target: BotState::Flee,
        reason: "Health critical, retreating",
        when: health_critical,
    },
    Rule {
        target: BotState::Idle,
        reason: "Patrol complete",
        when: patrol_timer_expired,
    },
];

const CHASE_RULES: &[Rule] = &[
    Rule {
        target: BotState::Flee,
        reason: "Health critical during chase",
        when: health_critical,
    },
    Rule {
        target: BotState::Attack,
        reason: "Player in attack range",
        when: player_in_attack_range,
    },
    Rule {
        target: BotState::Patrol,
        reason: "Lost sight of player",
        when: player_not_visible,
    },
    Rule {
        target: BotState::Patrol,
        reason: "Player out of range",
        when: player_escaped_chase,
    },
];

const ATTACK_RULES: &[Rule] = &[
    Rule {
        target: BotState::Flee,
        reason: "Health critical, retreating from combat",
        when: health_critical,
    },
    Rule {
        target: BotState::Chase,
        reason: "Player moved out of attack range",
        when: player_beyond_attack_range,
    },
    Rule {
        target: BotState::Chase,
        reason: "Lost visual on player",
        when: player_not_visible,
    },
];

const FLEE_RULES: &[Rule] = &[
    Rule {
        target: BotState::Chase,
        reason: "Health recovered, re-engaging",
        when: recovered_and_player_visible,
    },
    Rule {
        target: BotState::Patrol,
        reason: "Escaped, returning to patrol",
        when: player_not_visible,
    },
    Rule {
        target: BotState::Idle,
        reason: "Safe distance reached",
        when: player_at_safe_distance,
    },
];

/// Ordered rules for `state`. `Dead` has none.
pub fn rules_for(state: BotState) -> &'static [Rule] {
    match state {
        BotState::Idle => IDLE_RULES,
        BotState::Patrol => PATROL_RULES,
        BotState::Chase => CHASE_RULES,
        BotState::Attack => ATTACK_RULES,
        BotState::Flee => FLEE_RULES,
        BotState::Dead => &[],
    }
}

/// Pick the winning rule for `state`, if any.
///
/// The returned rule may target `state` itself (e.g. the death rule while
/// already dead); callers treat that as staying put.
pub fn decide(state: BotState, ctx: &RuleContext) -> Option<&'static Rule> {
    if DEATH_RULE.matches(ctx) {
        return Some(&DEATH_RULE);
    }
    rules_for(state).iter().find(|rule| rule.matches(ctx))
}
