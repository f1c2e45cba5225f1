// A single bot: one behavior state machine plus its health and perception.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::config::*;
use super::error::BotError;
use super::id::BotId;
use super::rules::{self, RuleContext};
use super::state::BotState;

/// What a bot currently senses of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub visible: bool,
    /// `None` means no information: treated as arbitrarily far.
    pub distance: Option<f64>,
}

impl Perception {
    /// Validated constructor for untrusted input.
    pub fn new(visible: bool, distance: Option<f64>) -> Result<Self, BotError> {
        if let Some(d) = distance {
            if !d.is_finite() || d < 0.0 {
                return Err(BotError::InvalidDistance(d));
            }
        }
        Ok(Self { visible, distance })
    }

    pub fn seen_at(distance: f64) -> Self {
        Self {
            visible: true,
            distance: Some(distance),
        }
    }

    pub fn unseen() -> Self {
        Self {
            visible: false,
            distance: None,
        }
    }
}

/// Point-in-time view of a bot, returned by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSnapshot {
    pub bot_id: String,
    pub state: BotState,
    pub reason: String,
    pub health: i32,
    pub max_health: i32,
    pub player_visible: bool,
    /// Rounded to 2 decimals; `null` when the distance is unknown.
    pub player_distance: Option<f64>,
    /// Seconds since the last state change, rounded to 2 decimals.
    pub time_in_state: f64,
}

/// Result of a damage or heal call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthChange {
    pub previous_health: i32,
    pub current_health: i32,
    pub snapshot: BotSnapshot,
}

pub struct Bot {
    id: BotId,
    state: BotState,
    health: i32,
    max_health: i32,
    perceived_visible: bool,
    perceived_distance: Option<f64>,
    last_transition_at: Duration,
    last_transition_reason: &'static str,
    idle_timer: f64,
    patrol_timer: f64,
    rng: ChaCha8Rng,
    clock: Arc<dyn Clock>,
}

impl Bot {
    /// Create a bot in `Idle` at full health. `max_health` is the initial
    /// health; callers validate that it is positive.
    pub fn new(id: BotId, max_health: i32, clock: Arc<dyn Clock>, mut rng: ChaCha8Rng) -> Self {
        let idle_timer = draw_secs(&mut rng, IDLE_TIMER_SECS);
        let patrol_timer = draw_secs(&mut rng, PATROL_TIMER_SECS);
        let max_health = max_health.max(0);
        Self {
            id,
            state: BotState::Idle,
            health: max_health,
            max_health,
            perceived_visible: false,
            perceived_distance: None,
            last_transition_at: clock.now(),
            last_transition_reason: REASON_INITIALIZED,
            idle_timer,
            patrol_timer,
            rng,
            clock,
        }
    }

    pub fn id(&self) -> BotId {
        self.id
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn reason(&self) -> &'static str {
        self.last_transition_reason
    }

    pub fn perception(&self) -> Perception {
        Perception {
            visible: self.perceived_visible,
            distance: self.perceived_distance,
        }
    }

    pub fn last_transition_at(&self) -> Duration {
        self.last_transition_at
    }

    pub fn idle_timer(&self) -> f64 {
        self.idle_timer
    }

    pub fn patrol_timer(&self) -> f64 {
        self.patrol_timer
    }

    /// Seconds since the last actual state change.
    pub fn time_in_state(&self) -> f64 {
        self.clock
            .now()
            .saturating_sub(self.last_transition_at)
            .as_secs_f64()
    }

    /// Record a perception sample and run one evaluation of the rule table.
    ///
    /// Perception is stored even while dead. A zero-health bot becomes
    /// `Dead` here, not when the damage lands.
    pub fn update(&mut self, perception: Perception) -> BotSnapshot {
        self.perceived_visible = perception.visible;
        self.perceived_distance = perception.distance;

        let ctx = self.rule_context();
        if let Some(rule) = rules::decide(self.state, &ctx) {
            self.transition_to(rule.target, rule.reason);
        }
        self.snapshot()
    }

    /// Reduce health, flooring at zero. Does not evaluate transitions.
    pub fn take_damage(&mut self, amount: i64) -> Result<HealthChange, BotError> {
        if amount < 0 {
            return Err(BotError::NegativeAmount {
                field: "damage",
                amount,
            });
        }
        let previous_health = self.health;
        let next = i64::from(self.health).saturating_sub(amount).max(0);
        self.health = next as i32;
        Ok(self.health_change(previous_health))
    }

    /// Restore health, capped at `max_health`. Does not evaluate transitions.
    pub fn heal(&mut self, amount: i64) -> Result<HealthChange, BotError> {
        if amount < 0 {
            return Err(BotError::NegativeAmount {
                field: "amount",
                amount,
            });
        }
        let previous_health = self.health;
        let next = i64::from(self.health)
            .saturating_add(amount)
            .min(i64::from(self.max_health));
        self.health = next as i32;
        Ok(self.health_change(previous_health))
    }

    /// Back to a fresh `Idle` bot at full health. The only way out of `Dead`.
    pub fn reset(&mut self) -> BotSnapshot {
        self.state = BotState::Idle;
        self.health = self.max_health;
        self.perceived_visible = false;
        self.perceived_distance = None;
        self.last_transition_at = self.clock.now();
        self.idle_timer = draw_secs(&mut self.rng, IDLE_TIMER_SECS);
        self.patrol_timer = draw_secs(&mut self.rng, PATROL_TIMER_SECS);
        self.last_transition_reason = REASON_RESET;
        self.snapshot()
    }

    pub fn snapshot(&self) -> BotSnapshot {
        BotSnapshot {
            bot_id: self.id.to_string(),
            state: self.state,
            reason: self.last_transition_reason.to_string(),
            health: self.health,
            max_health: self.max_health,
            player_visible: self.perceived_visible,
            player_distance: self.perceived_distance.map(round2),
            time_in_state: round2(self.time_in_state()),
        }
    }

    fn rule_context(&self) -> RuleContext {
        RuleContext {
            visible: self.perceived_visible,
            distance: self.perceived_distance.unwrap_or(f64::INFINITY),
            health: self.health,
            time_in_state: self.time_in_state(),
            idle_timer: self.idle_timer,
            patrol_timer: self.patrol_timer,
        }
    }

    /// Apply a rule outcome. Targeting the current state is a no-op.
    fn transition_to(&mut self, next: BotState, reason: &'static str) {
        if next == self.state {
            return;
        }
        tracing::debug!(
            bot_id = %self.id,
            from = %self.state,
            to = %next,
            reason,
            "Bot state transition"
        );
        self.state = next;
        self.last_transition_at = self.clock.now();
        self.last_transition_reason = reason;

        match next {
            BotState::Idle => self.idle_timer = draw_secs(&mut self.rng, IDLE_TIMER_SECS),
            BotState::Patrol => self.patrol_timer = draw_secs(&mut self.rng, PATROL_TIMER_SECS),
            _ => {}
        }
    }

    fn health_change(&self, previous_health: i32) -> HealthChange {
        HealthChange {
            previous_health,
            current_health: self.health,
            snapshot: self.snapshot(),
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("health", &self.health)
            .field("max_health", &self.max_health)
            .field("reason", &self.last_transition_reason)
            .finish_non_exhaustive()
    }
}

fn draw_secs(rng: &mut ChaCha8Rng, (min, max): (f64, f64)) -> f64 {
    rng.gen_range(min..=max)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn make_bot(health: i32) -> (Bot, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let bot = Bot::new(
            BotId::new(1),
            health,
            clock.clone(),
            ChaCha8Rng::seed_from_u64(42),
        );
        (bot, clock)
    }

    fn assert_timers_in_range(bot: &Bot) {
        assert!((IDLE_TIMER_SECS.0..=IDLE_TIMER_SECS.1).contains(&bot.idle_timer()));
        assert!((PATROL_TIMER_SECS.0..=PATROL_TIMER_SECS.1).contains(&bot.patrol_timer()));
    }

    /// Idle -> Chase -> Attack with a visible player.
    fn drive_to_attack(bot: &mut Bot) {
        assert_eq!(bot.update(Perception::seen_at(20.0)).state, BotState::Chase);
        assert_eq!(bot.update(Perception::seen_at(8.0)).state, BotState::Attack);
    }

    #[test]
    fn test_new_bot_defaults() {
        let (bot, _) = make_bot(100);
        let snap = bot.snapshot();
        assert_eq!(snap.bot_id, "bot_1");
        assert_eq!(snap.state, BotState::Idle);
        assert_eq!(snap.reason, "Bot initialized");
        assert_eq!(snap.health, 100);
        assert_eq!(snap.max_health, 100);
        assert!(!snap.player_visible);
        assert_eq!(snap.player_distance, None);
        assert_eq!(snap.time_in_state, 0.0);
        assert_timers_in_range(&bot);
    }

    #[test]
    fn test_idle_detects_player_regardless_of_elapsed() {
        let (mut bot, clock) = make_bot(100);
        clock.advance_secs(60.0);
        let snap = bot.update(Perception::seen_at(10.0));
        assert_eq!(snap.state, BotState::Chase);
        assert_eq!(snap.reason, "Player detected nearby");
        assert_eq!(snap.time_in_state, 0.0);
    }

    #[test]
    fn test_idle_timer_expires_into_patrol() {
        let (mut bot, clock) = make_bot(100);
        let idle_timer = bot.idle_timer();

        clock.advance_secs(idle_timer - 0.1);
        assert_eq!(bot.update(Perception::unseen()).state, BotState::Idle);

        clock.advance_secs(0.2);
        let snap = bot.update(Perception::unseen());
        assert_eq!(snap.state, BotState::Patrol);
        assert_eq!(snap.reason, "Idle timer expired");
        assert_timers_in_range(&bot);
    }

    #[test]
    fn test_patrol_completes_back_to_idle() {
        let (mut bot, clock) = make_bot(100);
        clock.advance_secs(IDLE_TIMER_SECS.1 + 0.01);
        bot.update(Perception::unseen());
        assert_eq!(bot.state(), BotState::Patrol);

        clock.advance_secs(PATROL_TIMER_SECS.1 + 0.01);
        let snap = bot.update(Perception::unseen());
        assert_eq!(snap.state, BotState::Idle);
        assert_eq!(snap.reason, "Patrol complete");
    }

    #[test]
    fn test_chase_low_health_flees_before_attacking() {
        let (mut bot, _) = make_bot(100);
        bot.update(Perception::seen_at(20.0));
        assert_eq!(bot.state(), BotState::Chase);

        bot.take_damage(85).unwrap();
        assert_eq!(bot.health(), 15);
        let snap = bot.update(Perception::seen_at(8.0));
        assert_eq!(snap.state, BotState::Flee);
        assert_eq!(snap.reason, "Health critical during chase");
    }

    #[test]
    fn test_attack_to_flee_end_to_end() {
        let (mut bot, _) = make_bot(100);
        drive_to_attack(&mut bot);

        let change = bot.take_damage(85).unwrap();
        assert_eq!(change.previous_health, 100);
        assert_eq!(change.current_health, 15);
        // Damage alone does not move the state machine
        assert_eq!(change.snapshot.state, BotState::Attack);

        let snap = bot.update(Perception::seen_at(8.0));
        assert_eq!(snap.state, BotState::Flee);
        assert_eq!(snap.reason, "Health critical, retreating from combat");
    }

    #[test]
    fn test_flee_recovers_into_chase() {
        let (mut bot, _) = make_bot(100);
        drive_to_attack(&mut bot);
        bot.take_damage(85).unwrap();
        bot.update(Perception::seen_at(8.0));
        assert_eq!(bot.state(), BotState::Flee);

        let change = bot.heal(55).unwrap();
        assert_eq!(change.current_health, 70);
        let snap = bot.update(Perception::seen_at(20.0));
        assert_eq!(snap.state, BotState::Chase);
        assert_eq!(snap.reason, "Health recovered, re-engaging");
    }

    #[test]
    fn test_zero_health_dies_on_next_update_only() {
        let (mut bot, _) = make_bot(100);
        let change = bot.take_damage(150).unwrap();
        assert_eq!(change.current_health, 0);
        assert_eq!(bot.state(), BotState::Idle);

        let snap = bot.update(Perception::seen_at(5.0));
        assert_eq!(snap.state, BotState::Dead);
        assert_eq!(snap.reason, "Health depleted");
    }

    #[test]
    fn test_heal_before_update_averts_death() {
        let (mut bot, _) = make_bot(100);
        bot.take_damage(100).unwrap();
        bot.heal(40).unwrap();
        let snap = bot.update(Perception::unseen());
        assert_ne!(snap.state, BotState::Dead);
    }

    #[test]
    fn test_dead_is_sticky_until_reset() {
        let (mut bot, clock) = make_bot(100);
        bot.take_damage(100).unwrap();
        bot.update(Perception::unseen());
        assert_eq!(bot.state(), BotState::Dead);

        bot.heal(80).unwrap();
        clock.advance_secs(30.0);
        for p in [
            Perception::seen_at(5.0),
            Perception::seen_at(25.0),
            Perception::unseen(),
        ] {
            let snap = bot.update(p);
            assert_eq!(snap.state, BotState::Dead);
            assert_eq!(snap.reason, "Health depleted");
        }

        let snap = bot.reset();
        assert_eq!(snap.state, BotState::Idle);
        assert_eq!(snap.health, 100);
    }

    #[test]
    fn test_dead_still_records_perception() {
        let (mut bot, _) = make_bot(100);
        bot.take_damage(100).unwrap();
        bot.update(Perception::unseen());
        let snap = bot.update(Perception::seen_at(12.346));
        assert_eq!(snap.state, BotState::Dead);
        assert!(snap.player_visible);
        assert_eq!(snap.player_distance, Some(12.35));
    }

    #[test]
    fn test_self_transition_keeps_clock_and_timers() {
        let (mut bot, clock) = make_bot(100);
        bot.take_damage(100).unwrap();
        bot.update(Perception::unseen());
        let entered_at = bot.last_transition_at();
        let timers = (bot.idle_timer(), bot.patrol_timer());

        clock.advance_secs(2.5);
        // Death rule fires again but targets the current state
        let snap = bot.update(Perception::unseen());
        assert_eq!(bot.last_transition_at(), entered_at);
        assert_eq!((bot.idle_timer(), bot.patrol_timer()), timers);
        assert_eq!(snap.time_in_state, 2.5);
    }

    #[test]
    fn test_no_match_keeps_reason_and_clock() {
        let (mut bot, clock) = make_bot(100);
        bot.update(Perception::seen_at(20.0));
        let entered_at = bot.last_transition_at();

        clock.advance_secs(1.0);
        // Visible at mid range: chase has nothing to do
        let snap = bot.update(Perception::seen_at(20.0));
        assert_eq!(snap.state, BotState::Chase);
        assert_eq!(snap.reason, "Player detected nearby");
        assert_eq!(bot.last_transition_at(), entered_at);
    }

    #[test]
    fn test_entering_idle_redraws_only_idle_timer() {
        let (mut bot, clock) = make_bot(100);
        bot.update(Perception::seen_at(20.0));
        bot.take_damage(85).unwrap();
        bot.update(Perception::seen_at(20.0));
        assert_eq!(bot.state(), BotState::Flee);
        let patrol_timer = bot.patrol_timer();

        clock.advance_secs(1.0);
        let snap = bot.update(Perception::seen_at(70.0));
        assert_eq!(snap.state, BotState::Idle);
        assert_eq!(snap.reason, "Safe distance reached");
        assert_eq!(bot.patrol_timer(), patrol_timer);
        assert_timers_in_range(&bot);
    }

    #[test]
    fn test_reset_restores_fresh_idle() {
        let (mut bot, clock) = make_bot(80);
        drive_to_attack(&mut bot);
        clock.advance_secs(4.0);
        bot.take_damage(30).unwrap();

        let snap = bot.reset();
        assert_eq!(snap.state, BotState::Idle);
        assert_eq!(snap.reason, "Bot reset");
        assert_eq!(snap.health, 80);
        assert!(!snap.player_visible);
        assert_eq!(snap.player_distance, None);
        assert_eq!(snap.time_in_state, 0.0);
        assert_eq!(bot.last_transition_at(), clock.now());
        assert_timers_in_range(&bot);
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let (mut bot, _) = make_bot(100);
        bot.take_damage(10).unwrap();

        let err = bot.take_damage(-5).unwrap_err();
        assert!(matches!(err, BotError::NegativeAmount { field: "damage", amount: -5 }));
        let err = bot.heal(-5).unwrap_err();
        assert!(matches!(err, BotError::NegativeAmount { field: "amount", amount: -5 }));
        assert_eq!(bot.health(), 90);
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let (mut bot, _) = make_bot(100);
        assert_eq!(bot.take_damage(i64::MAX).unwrap().current_health, 0);
        assert_eq!(bot.heal(i64::MAX).unwrap().current_health, 100);
    }

    #[test]
    fn test_perception_validation() {
        assert!(Perception::new(true, Some(0.0)).is_ok());
        assert!(Perception::new(false, None).is_ok());
        assert_eq!(
            Perception::new(true, Some(-1.0)),
            Err(BotError::InvalidDistance(-1.0))
        );
        assert!(Perception::new(true, Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_unknown_distance_counts_as_far() {
        let (mut bot, _) = make_bot(100);
        bot.update(Perception::seen_at(20.0));
        // Visible, but no distance information: out of chase range
        let snap = bot.update(Perception {
            visible: true,
            distance: None,
        });
        assert_eq!(snap.state, BotState::Patrol);
        assert_eq!(snap.reason, "Player out of range");
    }

    #[test]
    fn test_same_seed_same_timers() {
        let (a, _) = make_bot(100);
        let (b, _) = make_bot(100);
        assert_eq!(a.idle_timer(), b.idle_timer());
        assert_eq!(a.patrol_timer(), b.patrol_timer());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let (mut bot, clock) = make_bot(100);
        clock.advance_secs(1.234);
        let json = serde_json::to_value(bot.snapshot()).unwrap();
        assert_eq!(json["bot_id"], "bot_1");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["player_distance"], serde_json::Value::Null);
        assert_eq!(json["time_in_state"], 1.23);

        bot.update(Perception::seen_at(45.678));
        let json = serde_json::to_value(bot.snapshot()).unwrap();
        assert_eq!(json["player_distance"], 45.68);
    }

    #[derive(Debug, Clone)]
    enum HealthOp {
        Damage(i64),
        Heal(i64),
    }

    fn health_op() -> impl Strategy<Value = HealthOp> {
        prop_oneof![
            (0i64..500).prop_map(HealthOp::Damage),
            (0i64..500).prop_map(HealthOp::Heal),
        ]
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(
            max_health in 1i32..1000,
            ops in prop::collection::vec(health_op(), 0..50),
        ) {
            let (mut bot, _) = make_bot(max_health);
            for op in ops {
                let change = match op {
                    HealthOp::Damage(n) => bot.take_damage(n).unwrap(),
                    HealthOp::Heal(n) => bot.heal(n).unwrap(),
                };
                prop_assert!(change.current_health >= 0);
                prop_assert!(change.current_health <= max_health);
                prop_assert_eq!(change.current_health, bot.health());
            }
        }
    }
}
