//! Deterministic round-based battle simulation.
//!
//! [`resolve`] is a pure function of its inputs: no clock, no randomness, no
//! store access. Identical formations, participation and bonus always give
//! identical rounds, casualties and winner.

use crate::config::BattleConfig;
use crate::model::{
    Formation, ParticipationType, Round, Side, SideOutcome, Strategy, TroopCatalog, TroopStack,
    TroopType,
};

/// Everything the simulation depends on.
#[derive(Debug, Clone, Copy)]
pub struct CombatInput<'a> {
    /// `None` (or an empty formation) falls back to the configured default.
    pub attacker: Option<&'a Formation>,
    pub defender: Option<&'a Formation>,
    pub attacker_participation: ParticipationType,
    pub defender_participation: ParticipationType,
    /// Defender activity bonus captured when the battle was scheduled.
    pub defense_bonus: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatOutcome {
    pub winner: Side,
    pub is_decisive: bool,
    pub rounds: Vec<Round>,
    pub attacker: SideOutcome,
    pub defender: SideOutcome,
    pub attacker_xp: u32,
    pub defender_xp: u32,
    /// Sides that fought with the fallback formation.
    pub attacker_used_fallback: bool,
    pub defender_used_fallback: bool,
}

impl CombatOutcome {
    pub fn side(&self, side: Side) -> &SideOutcome {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    pub fn xp(&self, side: Side) -> u32 {
        match side {
            Side::Attacker => self.attacker_xp,
            Side::Defender => self.defender_xp,
        }
    }
}

/// Combat effectiveness for one side.
///
/// The defender adds the activity bonus on top of its proximity value,
/// capped at `max_defender_effectiveness`.
pub fn effectiveness(
    config: &BattleConfig,
    participation: ParticipationType,
    side: Side,
    defense_bonus: f64,
) -> f64 {
    let base = match participation {
        ParticipationType::Physical => config.physical_effectiveness,
        ParticipationType::Nearby => config.nearby_effectiveness,
        ParticipationType::Remote => config.remote_effectiveness,
    };
    match side {
        Side::Attacker => base,
        Side::Defender => (base + defense_bonus).min(config.max_defender_effectiveness),
    }
}

/// Classify a reported distance from the territory center.
pub fn classify_distance(config: &BattleConfig, distance_meters: f64) -> ParticipationType {
    if distance_meters <= config.physical_radius_meters {
        ParticipationType::Physical
    } else if distance_meters < config.nearby_radius_meters {
        ParticipationType::Nearby
    } else {
        ParticipationType::Remote
    }
}

/// Damage multiplier for a stack of `troop_type` against the living
/// opposing types. A single value per stack per round: the first strong
/// match wins, otherwise any weak match applies.
pub fn counter_multiplier(
    catalog: &TroopCatalog,
    config: &BattleConfig,
    troop_type: TroopType,
    opposing: &[TroopType],
) -> f64 {
    if opposing
        .iter()
        .any(|&target| catalog.is_strong_against(troop_type, target))
    {
        config.counter_multiplier
    } else if opposing
        .iter()
        .any(|&target| catalog.is_weak_against(troop_type, target))
    {
        config.weakness_multiplier
    } else {
        1.0
    }
}

pub fn fallback_formation(catalog: &TroopCatalog, config: &BattleConfig) -> Formation {
    Formation::new(
        catalog,
        vec![config.fallback.stack()],
        config.fallback.strategy,
    )
}

#[derive(Debug, Clone)]
struct LiveStack {
    troop_type: TroopType,
    level: u32,
    starting: u32,
    alive: u32,
}

#[derive(Debug, Clone)]
struct Army {
    side: Side,
    strategy: Strategy,
    effectiveness: f64,
    stacks: Vec<LiveStack>,
}

impl Army {
    fn new(side: Side, formation: &Formation, effectiveness: f64) -> Self {
        let stacks = formation
            .troops
            .iter()
            .map(|s| LiveStack {
                troop_type: s.troop_type,
                level: s.level,
                starting: s.count,
                alive: s.count,
            })
            .collect();
        Self {
            side,
            strategy: formation.strategy,
            effectiveness,
            stacks,
        }
    }

    fn alive(&self) -> u32 {
        self.stacks.iter().map(|s| s.alive).sum()
    }

    fn starting(&self) -> u32 {
        self.stacks.iter().map(|s| s.starting).sum()
    }

    fn living_types(&self) -> Vec<TroopType> {
        let mut types = Vec::new();
        for stack in self.stacks.iter().filter(|s| s.alive > 0) {
            if !types.contains(&stack.troop_type) {
                types.push(stack.troop_type);
            }
        }
        types
    }

    /// Total damage this army deals to `enemy` this round.
    fn damage_against(&self, enemy: &Army, catalog: &TroopCatalog, config: &BattleConfig) -> f64 {
        let opposing = enemy.living_types();
        let side_multiplier = match self.side {
            Side::Attacker => 1.0,
            Side::Defender => config.defender_multiplier,
        };
        let strategy = config.strategy_multiplier(self.strategy);
        self.stacks
            .iter()
            .filter(|s| s.alive > 0)
            .map(|s| {
                let attack = f64::from(catalog.stats(s.troop_type).base_attack);
                attack
                    * f64::from(s.alive)
                    * f64::from(s.level)
                    * self.effectiveness
                    * strategy
                    * side_multiplier
                    * counter_multiplier(catalog, config, s.troop_type, &opposing)
            })
            .sum()
    }

    fn average_health(&self, catalog: &TroopCatalog) -> f64 {
        let alive = self.alive();
        if alive == 0 {
            return 0.0;
        }
        let total: f64 = self
            .stacks
            .iter()
            .map(|s| {
                f64::from(catalog.stats(s.troop_type).base_health)
                    * f64::from(s.level)
                    * f64::from(s.alive)
            })
            .sum();
        total / f64::from(alive)
    }

    /// Spread `kills` over the living stacks in proportion to their size,
    /// rounding each share up and capping it at the stack. Returns the
    /// number of troops actually removed.
    fn take_casualties(&mut self, kills: f64) -> u32 {
        let alive = self.alive();
        if alive == 0 || kills <= 0.0 {
            return 0;
        }
        let mut removed = 0;
        for stack in self.stacks.iter_mut().filter(|s| s.alive > 0) {
            let share = (kills * f64::from(stack.alive) / f64::from(alive)).ceil();
            let lost = share.min(f64::from(stack.alive)) as u32;
            stack.alive -= lost;
            removed += lost;
        }
        removed
    }

    fn outcome(&self) -> SideOutcome {
        let starting_troops = self.starting();
        let remaining = self.alive();
        SideOutcome {
            starting_troops,
            troops_lost: starting_troops - remaining,
            survivors: self
                .stacks
                .iter()
                .filter(|s| s.alive > 0)
                .map(|s| TroopStack::new(s.troop_type, s.alive, s.level))
                .collect(),
            losses: self
                .stacks
                .iter()
                .filter(|s| s.starting > s.alive)
                .map(|s| TroopStack::new(s.troop_type, s.starting - s.alive, s.level))
                .collect(),
        }
    }
}

fn usable(formation: Option<&Formation>) -> Option<&Formation> {
    formation.filter(|f| f.troop_count() > 0)
}

/// Run the battle to completion.
pub fn resolve(
    catalog: &TroopCatalog,
    config: &BattleConfig,
    input: &CombatInput<'_>,
) -> CombatOutcome {
    let fallback = fallback_formation(catalog, config);
    let attacker_formation = usable(input.attacker);
    let defender_formation = usable(input.defender);

    let mut attacker = Army::new(
        Side::Attacker,
        attacker_formation.unwrap_or(&fallback),
        effectiveness(config, input.attacker_participation, Side::Attacker, 0.0),
    );
    let mut defender = Army::new(
        Side::Defender,
        defender_formation.unwrap_or(&fallback),
        effectiveness(
            config,
            input.defender_participation,
            Side::Defender,
            input.defense_bonus,
        ),
    );

    let mut rounds = Vec::new();
    for number in 1..=config.max_rounds {
        if attacker.alive() == 0 || defender.alive() == 0 {
            break;
        }
        // Both sides strike from the state at the start of the round.
        let attacker_damage = attacker.damage_against(&defender, catalog, config);
        let defender_damage = defender.damage_against(&attacker, catalog, config);
        let defender_hp = defender.average_health(catalog);
        let attacker_hp = attacker.average_health(catalog);

        let defender_casualties = defender.take_casualties(attacker_damage / defender_hp);
        let attacker_casualties = attacker.take_casualties(defender_damage / attacker_hp);

        rounds.push(Round {
            number,
            attacker_damage,
            defender_damage,
            attacker_casualties,
            defender_casualties,
            attacker_remaining: attacker.alive(),
            defender_remaining: defender.alive(),
        });
    }

    let attacker_outcome = attacker.outcome();
    let defender_outcome = defender.outcome();
    let winner = decide_winner(&attacker_outcome, &defender_outcome);
    let loser = match winner {
        Side::Attacker => &defender_outcome,
        Side::Defender => &attacker_outcome,
    };
    let is_decisive =
        loser.remaining() == 0 || loser.loss_fraction() >= config.decisive_loss_fraction;

    let xp_for = |side: Side| {
        let mut xp = config.base_xp;
        if side == winner {
            xp += config.winner_xp;
            if is_decisive {
                xp += config.decisive_xp;
            }
        }
        xp
    };

    CombatOutcome {
        winner,
        is_decisive,
        rounds,
        attacker_xp: xp_for(Side::Attacker),
        defender_xp: xp_for(Side::Defender),
        attacker: attacker_outcome,
        defender: defender_outcome,
        attacker_used_fallback: attacker_formation.is_none(),
        defender_used_fallback: defender_formation.is_none(),
    }
}

/// Survivor takes it; otherwise higher surviving fraction. The defender
/// holds on an exact tie.
fn decide_winner(attacker: &SideOutcome, defender: &SideOutcome) -> Side {
    match (attacker.remaining(), defender.remaining()) {
        (a, 0) if a > 0 => Side::Attacker,
        (0, d) if d > 0 => Side::Defender,
        _ if attacker.surviving_fraction() > defender.surviving_fraction() => Side::Attacker,
        _ => Side::Defender,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formation(stacks: &[(TroopType, u32, u32)], strategy: Strategy) -> Formation {
        let catalog = TroopCatalog::standard();
        Formation::new(
            &catalog,
            stacks
                .iter()
                .map(|&(t, c, l)| TroopStack::new(t, c, l))
                .collect(),
            strategy,
        )
    }

    fn remote(attacker: &Formation, defender: &Formation) -> CombatOutcome {
        resolve(
            &TroopCatalog::standard(),
            &BattleConfig::default(),
            &CombatInput {
                attacker: Some(attacker),
                defender: Some(defender),
                attacker_participation: ParticipationType::Remote,
                defender_participation: ParticipationType::Remote,
                defense_bonus: 0.0,
            },
        )
    }

    #[test]
    fn effectiveness_by_proximity_and_cap() {
        let c = BattleConfig::default();
        assert_eq!(effectiveness(&c, ParticipationType::Physical, Side::Attacker, 0.5), 1.0);
        assert_eq!(effectiveness(&c, ParticipationType::Nearby, Side::Attacker, 0.0), 0.75);
        assert_eq!(effectiveness(&c, ParticipationType::Remote, Side::Defender, 0.25), 0.75);
        assert_eq!(effectiveness(&c, ParticipationType::Physical, Side::Defender, 0.5), 1.5);
        assert_eq!(effectiveness(&c, ParticipationType::Physical, Side::Defender, 0.9), 1.5);
    }

    #[test]
    fn distance_classification_edges() {
        let c = BattleConfig::default();
        assert_eq!(classify_distance(&c, 0.0), ParticipationType::Physical);
        assert_eq!(classify_distance(&c, 100.0), ParticipationType::Physical);
        assert_eq!(classify_distance(&c, 100.5), ParticipationType::Nearby);
        assert_eq!(classify_distance(&c, 999.9), ParticipationType::Nearby);
        assert_eq!(classify_distance(&c, 1_000.0), ParticipationType::Remote);
    }

    #[test]
    fn counter_applies_once_and_strong_beats_weak() {
        let catalog = TroopCatalog::standard();
        let c = BattleConfig::default();
        // Infantry is strong against archer and weak against cavalry.
        let m = counter_multiplier(
            &catalog,
            &c,
            TroopType::Infantry,
            &[TroopType::Cavalry, TroopType::Archer, TroopType::Archer],
        );
        assert_eq!(m, 1.5);
        let m = counter_multiplier(&catalog, &c, TroopType::Infantry, &[TroopType::Cavalry]);
        assert_eq!(m, 0.6);
        let m = counter_multiplier(&catalog, &c, TroopType::Infantry, &[TroopType::Scout]);
        assert_eq!(m, 1.0);
    }

    #[test]
    fn infantry_crushes_archers() {
        let attacker = formation(&[(TroopType::Infantry, 100, 1)], Strategy::Balanced);
        let defender = formation(&[(TroopType::Archer, 50, 1)], Strategy::Balanced);
        let outcome = remote(&attacker, &defender);

        // 10 atk × 100 × 0.5 × 1.5 = 750 damage over 60 hp archers.
        let first = &outcome.rounds[0];
        assert!((first.attacker_damage - 750.0).abs() < 1e-9);
        assert_eq!(first.defender_casualties, 13);
        assert_eq!(outcome.winner, Side::Attacker);
        assert!(outcome.is_decisive);
        assert!(outcome.defender.loss_fraction() >= 0.7);
        assert_eq!(outcome.attacker_xp, 200);
        assert_eq!(outcome.defender_xp, 50);
    }

    #[test]
    fn identical_inputs_identical_outcomes() {
        let attacker = formation(
            &[(TroopType::Cavalry, 40, 2), (TroopType::Siege, 10, 1)],
            Strategy::Aggressive,
        );
        let defender = formation(
            &[(TroopType::Pikeman, 60, 1), (TroopType::Archer, 30, 2)],
            Strategy::Defensive,
        );
        assert_eq!(remote(&attacker, &defender), remote(&attacker, &defender));
    }

    #[test]
    fn round_cap_is_respected() {
        let mut config = BattleConfig::default();
        config.max_rounds = 3;
        // Two huge, evenly matched armies cannot finish in three rounds.
        let side = formation(&[(TroopType::Pikeman, 10_000, 1)], Strategy::Defensive);
        let outcome = resolve(
            &TroopCatalog::standard(),
            &config,
            &CombatInput {
                attacker: Some(&side),
                defender: Some(&side),
                attacker_participation: ParticipationType::Remote,
                defender_participation: ParticipationType::Remote,
                defense_bonus: 0.0,
            },
        );
        assert_eq!(outcome.rounds.len(), 3);
        assert!(outcome.attacker.remaining() > 0 && outcome.defender.remaining() > 0);
    }

    #[test]
    fn mirror_match_goes_to_defender() {
        let mut config = BattleConfig::default();
        config.defender_multiplier = 1.0;
        let side = formation(&[(TroopType::Infantry, 20, 1)], Strategy::Balanced);
        let outcome = resolve(
            &TroopCatalog::standard(),
            &config,
            &CombatInput {
                attacker: Some(&side),
                defender: Some(&side),
                attacker_participation: ParticipationType::Physical,
                defender_participation: ParticipationType::Physical,
                defense_bonus: 0.0,
            },
        );
        assert_eq!(outcome.attacker.remaining(), outcome.defender.remaining());
        assert_eq!(outcome.winner, Side::Defender);
    }

    #[test]
    fn missing_formations_fall_back() {
        let attacker = formation(&[(TroopType::Infantry, 10, 1)], Strategy::Balanced);
        let empty = Formation::new(&TroopCatalog::standard(), vec![], Strategy::Balanced);
        let outcome = resolve(
            &TroopCatalog::standard(),
            &BattleConfig::default(),
            &CombatInput {
                attacker: Some(&attacker),
                defender: Some(&empty),
                attacker_participation: ParticipationType::Remote,
                defender_participation: ParticipationType::Remote,
                defense_bonus: 0.0,
            },
        );
        assert!(outcome.defender_used_fallback);
        assert!(!outcome.attacker_used_fallback);
        assert_eq!(outcome.defender.starting_troops, 1);
        assert_eq!(outcome.winner, Side::Attacker);
    }

    #[test]
    fn casualties_never_exceed_stack_size() {
        let mut army = Army::new(
            Side::Defender,
            &formation(
                &[(TroopType::Scout, 3, 1), (TroopType::Archer, 1, 1)],
                Strategy::Balanced,
            ),
            1.0,
        );
        let removed = army.take_casualties(1_000.0);
        assert_eq!(removed, 4);
        assert_eq!(army.alive(), 0);
    }
}
