/// Trust pipeline: resonance adjustment, momentum scaling, clamping.
///
/// Invoked by the mutation engine for every trust delta. The stages run in
/// a fixed order and each reads the output of the one before it, so the
/// composition is part of the contract.
use crate::schema::registry::PatternAffinity;
use crate::schema::state::{PatternKind, Patterns, TrustMomentum, TRUST_MAX, TRUST_MIN};

/// Largest share of the base delta a resonance match can add or remove.
const RESONANCE_WEIGHT: f32 = 0.5;
/// Maps momentum in [-1, 1] to a multiplier in [0.5, 1.5].
const MOMENTUM_SPREAD: f32 = 0.5;
/// Momentum gained per positive trust change.
const MOMENTUM_GAIN: f32 = 0.1;
/// Extra gain once a positive streak reaches `STREAK_THRESHOLD`.
const MOMENTUM_STREAK_BONUS: f32 = 0.05;
/// Momentum lost per negative trust change. Larger than the gain: trust
/// is harder to rebuild than to lose.
const MOMENTUM_LOSS: f32 = 0.18;
/// Geometric decay factor applied per idle session.
const MOMENTUM_DECAY: f32 = 0.75;
/// Consecutive positive changes needed before the streak bonus applies.
const STREAK_THRESHOLD: u32 = 3;

/// Everything the pipeline reads besides the current trust and delta.
#[derive(Debug, Clone, Copy)]
pub struct TrustContext<'a> {
    /// The global pattern vector, after any pattern deltas from the same
    /// state change were applied.
    pub patterns: &'a Patterns,
    /// The target character's affinity table, if registered.
    pub affinity: Option<&'a PatternAffinity>,
    /// The pattern of the choice that produced this delta.
    pub choice_pattern: Option<PatternKind>,
    /// The character's momentum, if it has one yet.
    pub momentum: Option<TrustMomentum>,
    /// Current session index; drives momentum decay.
    pub session: u64,
    /// Batch/QA callers set this to get raw, unresonated deltas.
    pub skip_resonance: bool,
}

/// Per-stage observability for one trust change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustBreakdown {
    pub base_delta: i32,
    pub resonance_multiplier: f32,
    pub after_resonance: f32,
    pub momentum_multiplier: f32,
    pub after_momentum: f32,
    /// Amount cut by clamping to [0, 10]; signed, zero when in range.
    pub clamped: i32,
}

/// The pipeline's output. `actual_delta` is always exactly
/// `new_trust - current_trust`, clamping included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustResult {
    pub new_trust: i32,
    pub actual_delta: i32,
    pub momentum: TrustMomentum,
    pub breakdown: TrustBreakdown,
}

/// Run the full pipeline for one trust delta.
pub fn calculate_trust_change(
    current_trust: i32,
    base_delta: i32,
    ctx: &TrustContext<'_>,
) -> TrustResult {
    // Stage 1: resonance.
    let resonance_multiplier = if ctx.skip_resonance {
        1.0
    } else {
        resonance_multiplier(ctx)
    };
    let after_resonance = base_delta as f32 * resonance_multiplier;

    // Stage 2: momentum. Decay first, scale by the decayed value, then
    // fold this change into the streak state.
    let mut momentum = ctx
        .momentum
        .unwrap_or_else(|| TrustMomentum::new(ctx.session));
    decay_momentum(&mut momentum, ctx.session);

    let momentum_multiplier = 1.0 + MOMENTUM_SPREAD * momentum.momentum;
    let after_momentum = after_resonance * momentum_multiplier;

    update_momentum(&mut momentum, base_delta, ctx.session);

    // Stage 3: clamping. Round the adjusted delta, then clamp the sum.
    let rounded_delta = after_momentum.round() as i32;
    let unclamped = current_trust.saturating_add(rounded_delta);
    let new_trust = unclamped.clamp(TRUST_MIN, TRUST_MAX);
    let clamped = unclamped - new_trust;

    TrustResult {
        new_trust,
        actual_delta: new_trust - current_trust,
        momentum,
        breakdown: TrustBreakdown {
            base_delta,
            resonance_multiplier,
            after_resonance,
            momentum_multiplier,
            after_momentum,
            clamped,
        },
    }
}

/// Scale factor from the character's affinity and the player's tendency
/// toward the choice's pattern. 1.0 when no pattern or affinity applies.
fn resonance_multiplier(ctx: &TrustContext<'_>) -> f32 {
    let (pattern, affinity) = match (ctx.choice_pattern, ctx.affinity) {
        (Some(pattern), Some(affinity)) => (pattern, affinity),
        _ => return 1.0,
    };

    let share = ctx.patterns.share(pattern);
    if affinity.is_resonant(pattern) {
        1.0 + RESONANCE_WEIGHT * share
    } else if affinity.is_dissonant(pattern) {
        1.0 - RESONANCE_WEIGHT * share
    } else {
        1.0
    }
}

/// Geometric decay toward 0 for sessions with no trust changes.
fn decay_momentum(momentum: &mut TrustMomentum, session: u64) {
    let idle = session.saturating_sub(momentum.last_change_session);
    if idle == 0 {
        return;
    }
    // Beyond ~64 idle sessions the factor underflows to 0 anyway.
    let exponent = idle.min(64) as i32;
    momentum.momentum *= MOMENTUM_DECAY.powi(exponent);
}

/// Fold one trust change into the streak counters and momentum value.
fn update_momentum(momentum: &mut TrustMomentum, delta: i32, session: u64) {
    if delta > 0 {
        momentum.consecutive_positive += 1;
        momentum.consecutive_negative = 0;
        let mut gain = MOMENTUM_GAIN;
        if momentum.consecutive_positive >= STREAK_THRESHOLD {
            gain += MOMENTUM_STREAK_BONUS;
        }
        momentum.momentum = (momentum.momentum + gain).clamp(-1.0, 1.0);
    } else if delta < 0 {
        momentum.consecutive_negative += 1;
        momentum.consecutive_positive = 0;
        momentum.momentum = (momentum.momentum - MOMENTUM_LOSS).clamp(-1.0, 1.0);
    }
    momentum.last_change_session = session;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::state::Patterns;

    fn plain_ctx(patterns: &Patterns) -> TrustContext<'_> {
        TrustContext {
            patterns,
            affinity: None,
            choice_pattern: None,
            momentum: None,
            session: 0,
            skip_resonance: false,
        }
    }

    #[test]
    fn positive_delta_applies() {
        let patterns = Patterns::default();
        let result = calculate_trust_change(3, 2, &plain_ctx(&patterns));
        assert_eq!(result.new_trust, 5);
        assert_eq!(result.actual_delta, 2);
        assert_eq!(result.breakdown.clamped, 0);
    }

    #[test]
    fn clamp_at_ceiling_reports_cut() {
        // Trust 9, delta +5, no resonance or momentum: clamps to 10 and
        // the breakdown shows the 4 points cut.
        let patterns = Patterns::default();
        let result = calculate_trust_change(9, 5, &plain_ctx(&patterns));
        assert_eq!(result.new_trust, 10);
        assert_eq!(result.actual_delta, 1);
        assert_eq!(result.breakdown.clamped, 4);
    }

    #[test]
    fn clamp_at_floor() {
        let patterns = Patterns::default();
        let result = calculate_trust_change(1, -5, &plain_ctx(&patterns));
        assert_eq!(result.new_trust, 0);
        assert_eq!(result.actual_delta, -1);
        assert_eq!(result.breakdown.clamped, -4);
    }

    #[test]
    fn delta_honesty_under_arbitrary_sequences() {
        let patterns = Patterns::default();
        let mut trust = 5;
        let mut momentum = None;
        for (i, delta) in [3, -7, 2, 2, 2, -1, 9, -20, 4].into_iter().enumerate() {
            let ctx = TrustContext {
                momentum,
                session: i as u64,
                ..plain_ctx(&patterns)
            };
            let result = calculate_trust_change(trust, delta, &ctx);
            assert_eq!(result.actual_delta, result.new_trust - trust);
            assert!((TRUST_MIN..=TRUST_MAX).contains(&result.new_trust));
            trust = result.new_trust;
            momentum = Some(result.momentum);
        }
    }

    #[test]
    fn momentum_stays_bounded() {
        let patterns = Patterns::default();
        let mut momentum = None;
        for i in 0..50 {
            let ctx = TrustContext {
                momentum,
                session: 0,
                ..plain_ctx(&patterns)
            };
            let result = calculate_trust_change(5, if i % 7 == 0 { -3 } else { 2 }, &ctx);
            assert!(result.momentum.momentum >= -1.0);
            assert!(result.momentum.momentum <= 1.0);
            momentum = Some(result.momentum);
        }
    }

    #[test]
    fn momentum_loss_outweighs_gain() {
        let patterns = Patterns::default();
        let up = calculate_trust_change(5, 1, &plain_ctx(&patterns));
        let down = calculate_trust_change(5, -1, &plain_ctx(&patterns));
        assert!(down.momentum.momentum.abs() > up.momentum.momentum.abs());
    }

    #[test]
    fn streak_bonus_after_third_positive() {
        let patterns = Patterns::default();
        let mut momentum = None;
        let mut gains = Vec::new();
        for _ in 0..4 {
            let before = momentum.map_or(0.0, |m: TrustMomentum| m.momentum);
            let ctx = TrustContext {
                momentum,
                session: 0,
                ..plain_ctx(&patterns)
            };
            let result = calculate_trust_change(5, 1, &ctx);
            gains.push(result.momentum.momentum - before);
            momentum = Some(result.momentum);
        }
        // First two changes gain the base amount, the third and fourth
        // include the streak bonus.
        assert!((gains[0] - MOMENTUM_GAIN).abs() < 1e-5);
        assert!((gains[1] - MOMENTUM_GAIN).abs() < 1e-5);
        assert!((gains[2] - (MOMENTUM_GAIN + MOMENTUM_STREAK_BONUS)).abs() < 1e-5);
        assert!((gains[3] - (MOMENTUM_GAIN + MOMENTUM_STREAK_BONUS)).abs() < 1e-5);
    }

    #[test]
    fn negative_change_resets_positive_streak() {
        let patterns = Patterns::default();
        let mut ctx = plain_ctx(&patterns);
        let first = calculate_trust_change(5, 2, &ctx);
        ctx.momentum = Some(first.momentum);
        let second = calculate_trust_change(7, -1, &ctx);
        assert_eq!(second.momentum.consecutive_positive, 0);
        assert_eq!(second.momentum.consecutive_negative, 1);
    }

    #[test]
    fn momentum_decays_over_idle_sessions() {
        let patterns = Patterns::default();
        let seeded = TrustMomentum {
            momentum: 0.8,
            consecutive_positive: 2,
            consecutive_negative: 0,
            last_change_session: 0,
        };
        let ctx = TrustContext {
            momentum: Some(seeded),
            session: 3,
            ..plain_ctx(&patterns)
        };
        let result = calculate_trust_change(5, 0, &ctx);
        let expected = 0.8 * MOMENTUM_DECAY.powi(3);
        assert!((result.momentum.momentum - expected).abs() < 1e-5);
        assert_eq!(result.momentum.last_change_session, 3);
    }

    #[test]
    fn high_momentum_amplifies_delta() {
        let patterns = Patterns::default();
        let hot = TrustMomentum {
            momentum: 1.0,
            consecutive_positive: 5,
            consecutive_negative: 0,
            last_change_session: 0,
        };
        let ctx = TrustContext {
            momentum: Some(hot),
            session: 0,
            ..plain_ctx(&patterns)
        };
        // +2 at full momentum scales by 1.5 to +3.
        let result = calculate_trust_change(2, 2, &ctx);
        assert_eq!(result.new_trust, 5);
        assert!((result.breakdown.momentum_multiplier - 1.5).abs() < 1e-5);
    }

    #[test]
    fn resonant_pattern_scales_delta_up() {
        let mut patterns = Patterns::default();
        patterns.add(PatternKind::Building, 4);
        let affinity = PatternAffinity {
            resonant: vec![PatternKind::Building],
            dissonant: vec![],
        };
        let ctx = TrustContext {
            patterns: &patterns,
            affinity: Some(&affinity),
            choice_pattern: Some(PatternKind::Building),
            momentum: None,
            session: 0,
            skip_resonance: false,
        };
        // Share is 1.0, so the multiplier reaches the full 1.5: +2 -> +3.
        let result = calculate_trust_change(2, 2, &ctx);
        assert!((result.breakdown.resonance_multiplier - 1.5).abs() < 1e-5);
        assert_eq!(result.new_trust, 5);
    }

    #[test]
    fn dissonant_pattern_scales_delta_down() {
        let mut patterns = Patterns::default();
        patterns.add(PatternKind::Exploring, 4);
        let affinity = PatternAffinity {
            resonant: vec![],
            dissonant: vec![PatternKind::Exploring],
        };
        let ctx = TrustContext {
            patterns: &patterns,
            affinity: Some(&affinity),
            choice_pattern: Some(PatternKind::Exploring),
            momentum: None,
            session: 0,
            skip_resonance: false,
        };
        let result = calculate_trust_change(2, 4, &ctx);
        assert!((result.breakdown.resonance_multiplier - 0.5).abs() < 1e-5);
        assert_eq!(result.new_trust, 4);
    }

    #[test]
    fn skip_resonance_yields_raw_multiplier() {
        let mut patterns = Patterns::default();
        patterns.add(PatternKind::Building, 4);
        let affinity = PatternAffinity {
            resonant: vec![PatternKind::Building],
            dissonant: vec![],
        };
        let ctx = TrustContext {
            patterns: &patterns,
            affinity: Some(&affinity),
            choice_pattern: Some(PatternKind::Building),
            momentum: None,
            session: 0,
            skip_resonance: true,
        };
        let result = calculate_trust_change(2, 2, &ctx);
        assert!((result.breakdown.resonance_multiplier - 1.0).abs() < f32::EPSILON);
        assert_eq!(result.new_trust, 4);
    }

    #[test]
    fn zero_delta_leaves_streaks_untouched() {
        let patterns = Patterns::default();
        let seeded = TrustMomentum {
            momentum: 0.3,
            consecutive_positive: 2,
            consecutive_negative: 0,
            last_change_session: 1,
        };
        let ctx = TrustContext {
            momentum: Some(seeded),
            session: 1,
            ..plain_ctx(&patterns)
        };
        let result = calculate_trust_change(5, 0, &ctx);
        assert_eq!(result.new_trust, 5);
        assert_eq!(result.momentum.consecutive_positive, 2);
        assert_eq!(result.momentum.consecutive_negative, 0);
    }
}
