// Bot behavior tuning constants

// Perception ranges (world units)
pub const CHASE_RANGE: f64 = 30.0;
pub const ATTACK_RANGE: f64 = 10.0;

// Chase gives up once the player is this far away
pub const CHASE_GIVE_UP_RANGE: f64 = CHASE_RANGE * 1.5;

// Flee settles back to idle beyond this distance
pub const FLEE_SAFE_RANGE: f64 = CHASE_RANGE * 2.0;

// Health thresholds
pub const FLEE_HEALTH_THRESHOLD: i32 = 20;
pub const RECOVER_HEALTH_THRESHOLD: i32 = 50;

pub const DEFAULT_INITIAL_HEALTH: i32 = 100;

// Dwell timer ranges in seconds [min, max], drawn on state entry
pub const IDLE_TIMER_SECS: (f64, f64) = (2.0, 5.0);
pub const PATROL_TIMER_SECS: (f64, f64) = (3.0, 8.0);

// Transition reasons that do not come from the rule table
pub const REASON_INITIALIZED: &str = "Bot initialized";
pub const REASON_RESET: &str = "Bot reset";
pub const REASON_HEALTH_DEPLETED: &str = "Health depleted";

// Identifier prefix: bots are named "bot_1", "bot_2", ...
pub const BOT_ID_PREFIX: &str = "bot_";
