//! Alliance war overlay.
//!
//! A war runs `warning -> active -> peace_treaty -> ended` on a timeline
//! fixed at declaration. Phase changes are never requested by players; the
//! war sweep moves every war whose boundary has passed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::Engine;
use crate::collab::NotificationKind;
use crate::config::WarConfig;
use crate::error::{EngineError, StoreError};
use crate::model::{
    Alliance, AllianceWar, EventKind, GameTime, ParticipantRole, WarPhase, WarRewards, WarStatus,
    WarTimeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarDeclaration {
    pub war_id: u64,
    pub timeline: WarTimeline,
}

/// A member's view of their alliance's current war.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarStatusView {
    pub has_active_war: bool,
    pub war_id: Option<u64>,
    pub phase: Option<WarPhase>,
    pub opponent_id: Option<u64>,
    /// Minutes until the current phase ends.
    pub minutes_remaining: u64,
    pub own_score: u32,
    pub opponent_score: u32,
}

impl WarStatusView {
    fn none() -> Self {
        Self {
            has_active_war: false,
            war_id: None,
            phase: None,
            opponent_id: None,
            minutes_remaining: 0,
            own_score: 0,
            opponent_score: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarSweepReport {
    pub started: Vec<u64>,
    pub finalized: Vec<u64>,
    pub peace_ended: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl WarSweepReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
            && self.finalized.is_empty()
            && self.peace_ended.is_empty()
            && self.failed.is_empty()
    }
}

/// Winner and reward pool for a finished war. Pure.
///
/// Higher score wins and its members split the pool. On a draw the pool is
/// halved and split across the members of both alliances.
pub fn settle(
    war: &AllianceWar,
    challenger: &Alliance,
    defender: &Alliance,
    config: &WarConfig,
) -> (Option<u64>, WarRewards) {
    let mut pool = config.base_reward + config.reward_per_battle * u64::from(war.total_battles());
    let (winner_id, recipients) = match war.challenger_score.cmp(&war.defender_score) {
        std::cmp::Ordering::Greater => (Some(challenger.id), challenger.member_ids.clone()),
        std::cmp::Ordering::Less => (Some(defender.id), defender.member_ids.clone()),
        std::cmp::Ordering::Equal => {
            pool /= 2;
            let mut both = challenger.member_ids.clone();
            both.extend(defender.member_ids.iter().copied());
            (None, both)
        }
    };
    let per_member = match recipients.len() as u64 {
        0 => 0,
        n => pool / n,
    };
    (
        winner_id,
        WarRewards {
            pool,
            per_member,
            recipients,
        },
    )
}

fn phase_deadline(war: &AllianceWar) -> Option<GameTime> {
    match war.phase {
        WarPhase::Warning => Some(war.timeline.warning_ends_at),
        WarPhase::Active => Some(war.timeline.ends_at),
        WarPhase::PeaceTreaty => Some(war.timeline.peace_treaty_ends_at),
        WarPhase::Ended | WarPhase::Cancelled => None,
    }
}

impl Engine {
    /// Declare war on another alliance. Only the declaring alliance's leader
    /// may do this, and the declaring alliance must be large enough.
    pub fn declare_alliance_war(
        &self,
        caller_id: u64,
        target_alliance_id: u64,
        now: GameTime,
    ) -> Result<WarDeclaration, EngineError> {
        let config = &self.config.war;
        let caller = self.player(caller_id)?;
        let own_id = caller.alliance_id.ok_or(EngineError::NotInAlliance)?;
        let own = self.alliance(own_id)?;
        if !own.is_leader(caller_id) {
            return Err(EngineError::NotAllianceLeader);
        }
        if target_alliance_id == own_id {
            return Err(EngineError::SelfWar);
        }
        let target = self.alliance(target_alliance_id)?;
        if own.member_count() < config.min_alliance_members {
            return Err(EngineError::AllianceTooSmall {
                members: own.member_count(),
                required: config.min_alliance_members,
            });
        }

        let war_id = self.store.next_id();
        let timeline = WarTimeline::starting_at(
            now,
            config.warning_hours,
            config.active_hours,
            config.peace_treaty_hours,
        );
        let war = AllianceWar {
            id: war_id,
            challenger_alliance_id: own_id,
            defender_alliance_id: target_alliance_id,
            declared_by: caller_id,
            status: WarStatus::Pending,
            phase: WarPhase::Warning,
            timeline,
            challenger_score: 0,
            defender_score: 0,
            challenger_battles_won: 0,
            defender_battles_won: 0,
            winner_id: None,
            rewards: None,
            error: None,
        };

        // Open wars and running treaties are checked in the same step as the
        // insert so two leaders declaring at once cannot both succeed.
        self.store
            .wars
            .insert_unless(war_id, war, |w| {
                w.involves_pair(own_id, target_alliance_id)
                    && (w.status.is_open() || w.peace_treaty_running(now))
            })
            .map_err(|err| match err {
                StoreError::Conflict { existing_id, .. } => {
                    match self.store.wars.get(existing_id) {
                        Some(existing) if !existing.status.is_open() => {
                            EngineError::PeaceTreatyActive {
                                until: existing.timeline.peace_treaty_ends_at,
                            }
                        }
                        _ => EngineError::WarAlreadyOpen {
                            war_id: existing_id,
                        },
                    }
                }
                other => other.into(),
            })?;

        info!(war_id, challenger = own_id, defender = target_alliance_id, "war declared");
        self.store.record_event(
            EventKind::WarDeclared,
            now,
            format!("{} declared war on {}", own.name, target.name),
            None,
            json!({ "timeline": timeline }),
            &[
                (own_id, ParticipantRole::Challenger),
                (target_alliance_id, ParticipantRole::Defender),
                (war_id, ParticipantRole::War),
            ],
        );
        let data = json!({ "war_id": war_id });
        self.notify_alliance(
            target_alliance_id,
            NotificationKind::WarDeclared,
            "War declared",
            format!(
                "{} declared war on you; fighting starts at {}",
                own.name, timeline.warning_ends_at
            ),
            data.clone(),
        );
        self.notify_alliance(
            own_id,
            NotificationKind::WarDeclared,
            "War declared",
            format!("Your alliance declared war on {}", target.name),
            data,
        );

        Ok(WarDeclaration { war_id, timeline })
    }

    /// Call off a war during its warning phase. Challenger leader only.
    pub fn cancel_alliance_war(
        &self,
        caller_id: u64,
        war_id: u64,
        now: GameTime,
    ) -> Result<(), EngineError> {
        let war = self.war(war_id)?;
        let caller = self.player(caller_id)?;
        if caller.alliance_id != Some(war.challenger_alliance_id) {
            return Err(EngineError::NotChallenger);
        }
        let challenger = self.alliance(war.challenger_alliance_id)?;
        if !challenger.is_leader(caller_id) {
            return Err(EngineError::NotAllianceLeader);
        }

        self.store.wars.update(war_id, |w| {
            if w.phase != WarPhase::Warning || now >= w.timeline.warning_ends_at {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            w.status = WarStatus::Cancelled;
            w.phase = WarPhase::Cancelled;
            Ok(())
        })?;

        info!(war_id, caller_id, "war cancelled");
        self.store.record_event(
            EventKind::WarCancelled,
            now,
            format!("{} called off the war", challenger.name),
            None,
            serde_json::Value::Null,
            &[
                (war.challenger_alliance_id, ParticipantRole::Challenger),
                (war.defender_alliance_id, ParticipantRole::Defender),
                (war_id, ParticipantRole::War),
            ],
        );
        for alliance_id in [war.challenger_alliance_id, war.defender_alliance_id] {
            self.notify_alliance(
                alliance_id,
                NotificationKind::WarCancelled,
                "War cancelled",
                format!("{} called off the war", challenger.name),
                json!({ "war_id": war_id }),
            );
        }
        Ok(())
    }

    /// Current war for `alliance_id`, or the caller's own alliance.
    ///
    /// An open war takes precedence; otherwise a war still in its peace
    /// treaty is reported with `has_active_war` false.
    pub fn alliance_war_status(
        &self,
        caller_id: u64,
        alliance_id: Option<u64>,
        now: GameTime,
    ) -> Result<WarStatusView, EngineError> {
        let alliance_id = match alliance_id {
            Some(id) => id,
            None => self
                .player(caller_id)?
                .alliance_id
                .ok_or(EngineError::NotInAlliance)?,
        };
        self.alliance(alliance_id)?;

        let war = self
            .latest_war(alliance_id, |w| w.status.is_open())
            .or_else(|| self.latest_war(alliance_id, |w| w.phase == WarPhase::PeaceTreaty));
        let Some(war) = war else {
            return Ok(WarStatusView::none());
        };

        let opponent_id = war.opponent_of(alliance_id);
        Ok(WarStatusView {
            has_active_war: war.status.is_open(),
            war_id: Some(war.id),
            phase: Some(war.phase),
            opponent_id,
            minutes_remaining: phase_deadline(&war).map_or(0, |t| now.minutes_until(t)),
            own_score: war.score_of(alliance_id),
            opponent_score: opponent_id.map_or(0, |id| war.score_of(id)),
        })
    }

    fn latest_war(
        &self,
        alliance_id: u64,
        pred: impl Fn(&AllianceWar) -> bool,
    ) -> Option<AllianceWar> {
        self.store
            .wars
            .filter(|w| w.involves(alliance_id) && pred(w))
            .into_iter()
            .max_by_key(|w| w.id)
    }

    /// Credit a battle win to an alliance. Only counts while the war is in
    /// its active phase.
    pub fn record_war_battle(
        &self,
        war_id: u64,
        winning_alliance_id: u64,
        points: u32,
        now: GameTime,
    ) -> Result<(), EngineError> {
        self.store.wars.update(war_id, |w| {
            if w.phase != WarPhase::Active || now >= w.timeline.ends_at {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            if winning_alliance_id == w.challenger_alliance_id {
                w.challenger_score += points;
                w.challenger_battles_won += 1;
            } else if winning_alliance_id == w.defender_alliance_id {
                w.defender_score += points;
                w.defender_battles_won += 1;
            } else {
                return Err(EngineError::NotWarParticipant {
                    alliance_id: winning_alliance_id,
                });
            }
            Ok(())
        })?;
        debug!(war_id, winning_alliance_id, points, "war battle recorded");
        Ok(())
    }

    /// Move every war whose phase boundary has passed. Three independent
    /// scans: warnings that are over, active wars that are over, and peace
    /// treaties that are over. A war that fails to advance is cancelled with
    /// the error stored on it, so it is not picked up again.
    pub fn process_war_phases(&self, now: GameTime) -> WarSweepReport {
        let batch = self.config.sweep.batch_size;
        let mut report = WarSweepReport::default();

        let starting = self.store.wars.filter(|w| {
            w.status == WarStatus::Pending
                && w.phase == WarPhase::Warning
                && now >= w.timeline.warning_ends_at
        });
        for war in starting.into_iter().take(batch) {
            match self.start_war(war.id, now) {
                Ok(()) => report.started.push(war.id),
                Err(EngineError::WrongWarPhase { .. }) => {
                    debug!(war_id = war.id, "war already advanced");
                }
                Err(err) => report.failed.push(self.fail_war(&war, err, now)),
            }
        }

        let ending = self
            .store
            .wars
            .filter(|w| w.status == WarStatus::Active && now >= w.timeline.ends_at);
        for war in ending.into_iter().take(batch) {
            match self.finalize_war(war.id, now) {
                Ok(()) => report.finalized.push(war.id),
                Err(EngineError::WrongWarPhase { .. }) => {
                    debug!(war_id = war.id, "war already advanced");
                }
                Err(err) => report.failed.push(self.fail_war(&war, err, now)),
            }
        }

        let treaties = self.store.wars.filter(|w| {
            w.phase == WarPhase::PeaceTreaty && now >= w.timeline.peace_treaty_ends_at
        });
        for war in treaties.into_iter().take(batch) {
            match self.end_peace_treaty(war.id, now) {
                Ok(()) => report.peace_ended.push(war.id),
                Err(EngineError::WrongWarPhase { .. }) => {
                    debug!(war_id = war.id, "war already advanced");
                }
                Err(err) => report.failed.push(self.fail_war(&war, err, now)),
            }
        }

        if !report.is_empty() {
            info!(
                started = report.started.len(),
                finalized = report.finalized.len(),
                peace_ended = report.peace_ended.len(),
                failed = report.failed.len(),
                "war phases processed"
            );
        }
        report
    }

    /// Cancel a war the sweep could not advance. Leaves it alone if another
    /// caller moved it on in the meantime.
    fn fail_war(&self, war: &AllianceWar, err: EngineError, now: GameTime) -> (u64, String) {
        let reason = err.to_string();
        let stored = reason.clone();
        let (status, phase) = (war.status, war.phase);
        let cancelled = self.store.wars.update(war.id, |w| {
            if w.status != status || w.phase != phase {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            w.status = WarStatus::Cancelled;
            w.phase = WarPhase::Cancelled;
            w.error = Some(stored);
            Ok(())
        });
        if let Err(update_err) = cancelled {
            warn!(war_id = war.id, error = %update_err, "could not cancel war");
            return (war.id, reason);
        }

        warn!(war_id = war.id, reason = %reason, "war cancelled");
        self.store.record_event(
            EventKind::WarCancelled,
            now,
            format!("War {} cancelled: {reason}", war.id),
            None,
            json!({ "reason": reason, "code": err.code() }),
            &[
                (war.challenger_alliance_id, ParticipantRole::Challenger),
                (war.defender_alliance_id, ParticipantRole::Defender),
                (war.id, ParticipantRole::War),
            ],
        );
        (war.id, reason)
    }

    fn start_war(&self, war_id: u64, now: GameTime) -> Result<(), EngineError> {
        let war = self.store.wars.update(war_id, |w| {
            if w.status != WarStatus::Pending || w.phase != WarPhase::Warning {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            w.status = WarStatus::Active;
            w.phase = WarPhase::Active;
            Ok(w.clone())
        })?;

        self.store.record_event(
            EventKind::WarStarted,
            now,
            format!("War {war_id} has begun"),
            None,
            json!({ "ends_at": war.timeline.ends_at }),
            &[
                (war.challenger_alliance_id, ParticipantRole::Challenger),
                (war.defender_alliance_id, ParticipantRole::Defender),
                (war_id, ParticipantRole::War),
            ],
        );
        for alliance_id in [war.challenger_alliance_id, war.defender_alliance_id] {
            self.notify_alliance(
                alliance_id,
                NotificationKind::WarStarted,
                "War has begun",
                format!("Battles now count toward the war until {}", war.timeline.ends_at),
                json!({ "war_id": war_id }),
            );
        }
        Ok(())
    }

    fn finalize_war(&self, war_id: u64, now: GameTime) -> Result<(), EngineError> {
        let current = self.war(war_id)?;
        let challenger = self.alliance(current.challenger_alliance_id)?;
        let defender = self.alliance(current.defender_alliance_id)?;

        let war = self.store.wars.update(war_id, |w| {
            if w.status != WarStatus::Active {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            let (winner_id, rewards) = settle(w, &challenger, &defender, &self.config.war);
            w.status = WarStatus::Completed;
            w.phase = WarPhase::PeaceTreaty;
            w.winner_id = winner_id;
            w.rewards = Some(rewards);
            Ok(w.clone())
        })?;

        if let Some(rewards) = &war.rewards {
            self.pay_rewards(war_id, rewards);
        }

        info!(war_id, winner = ?war.winner_id, "war ended");
        self.store.record_event(
            EventKind::WarEnded,
            now,
            match war.winner_id {
                Some(id) if id == challenger.id => format!("{} won the war", challenger.name),
                Some(_) => format!("{} won the war", defender.name),
                None => "The war ended in a draw".to_string(),
            },
            None,
            json!({
                "challenger_score": war.challenger_score,
                "defender_score": war.defender_score,
                "winner_id": war.winner_id,
                "rewards": war.rewards,
            }),
            &[
                (war.challenger_alliance_id, ParticipantRole::Challenger),
                (war.defender_alliance_id, ParticipantRole::Defender),
                (war_id, ParticipantRole::War),
            ],
        );
        for alliance_id in [war.challenger_alliance_id, war.defender_alliance_id] {
            let body = match war.winner_id {
                Some(id) if id == alliance_id => "Your alliance won the war",
                Some(_) => "Your alliance lost the war",
                None => "The war ended in a draw",
            };
            self.notify_alliance(
                alliance_id,
                NotificationKind::WarEnded,
                "War over",
                body,
                json!({
                    "war_id": war_id,
                    "peace_treaty_ends_at": war.timeline.peace_treaty_ends_at,
                }),
            );
        }
        Ok(())
    }

    fn pay_rewards(&self, war_id: u64, rewards: &WarRewards) {
        if rewards.per_member == 0 {
            return;
        }
        let amounts = BTreeMap::from([(
            self.config.war.reward_resource.clone(),
            rewards.per_member,
        )]);
        for &member in &rewards.recipients {
            if let Err(err) = self.services.ledger.credit(member, &amounts) {
                warn!(war_id, member, error = %err, "war reward not credited");
            }
        }
    }

    fn end_peace_treaty(&self, war_id: u64, now: GameTime) -> Result<(), EngineError> {
        let war = self.store.wars.update(war_id, |w| {
            if w.phase != WarPhase::PeaceTreaty {
                return Err(EngineError::WrongWarPhase { phase: w.phase });
            }
            w.phase = WarPhase::Ended;
            Ok(w.clone())
        })?;
        self.store.record_event(
            EventKind::PeaceEnded,
            now,
            format!("Peace treaty for war {war_id} has expired"),
            None,
            serde_json::Value::Null,
            &[
                (war.challenger_alliance_id, ParticipantRole::Challenger),
                (war.defender_alliance_id, ParticipantRole::Defender),
                (war_id, ParticipantRole::War),
            ],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alliance(id: u64, members: &[u64]) -> Alliance {
        Alliance {
            id,
            name: format!("A{id}"),
            leader_id: members[0],
            member_ids: members.to_vec(),
        }
    }

    fn war(challenger_score: u32, defender_score: u32, battles: u32) -> AllianceWar {
        AllianceWar {
            id: 9,
            challenger_alliance_id: 1,
            defender_alliance_id: 2,
            declared_by: 10,
            status: WarStatus::Active,
            phase: WarPhase::Active,
            timeline: WarTimeline::starting_at(GameTime::EPOCH, 24, 48, 72),
            challenger_score,
            defender_score,
            challenger_battles_won: battles,
            defender_battles_won: 0,
            winner_id: None,
            rewards: None,
            error: None,
        }
    }

    #[test]
    fn higher_score_takes_the_pool() {
        let (winner, rewards) = settle(
            &war(45, 10, 4),
            &alliance(1, &[10, 11, 12, 13]),
            &alliance(2, &[20, 21, 22]),
            &WarConfig::default(),
        );
        assert_eq!(winner, Some(1));
        assert_eq!(rewards.pool, 1_400);
        assert_eq!(rewards.per_member, 350);
        assert_eq!(rewards.recipients, vec![10, 11, 12, 13]);
    }

    #[test]
    fn draw_halves_the_pool_across_both_sides() {
        let (winner, rewards) = settle(
            &war(0, 0, 0),
            &alliance(1, &[10, 11, 12]),
            &alliance(2, &[20, 21]),
            &WarConfig::default(),
        );
        assert_eq!(winner, None);
        assert_eq!(rewards.pool, 500);
        assert_eq!(rewards.per_member, 100);
        assert_eq!(rewards.recipients.len(), 5);
    }

    #[test]
    fn phase_deadlines_follow_the_timeline() {
        let mut w = war(0, 0, 0);
        w.phase = WarPhase::Warning;
        assert_eq!(phase_deadline(&w), Some(GameTime::from_hours(24)));
        w.phase = WarPhase::Active;
        assert_eq!(phase_deadline(&w), Some(GameTime::from_hours(72)));
        w.phase = WarPhase::PeaceTreaty;
        assert_eq!(phase_deadline(&w), Some(GameTime::from_hours(144)));
        w.phase = WarPhase::Ended;
        assert_eq!(phase_deadline(&w), None);
    }
}
