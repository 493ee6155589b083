use std::fmt::Display;

use serde::Serialize;
use sqlx::PgPool;

use crate::model::GameTime;
use crate::store::Store;

/// Load a snapshot of the store into Postgres using COPY FROM STDIN (text format).
///
/// Order respects FK constraints: territories and wars before battles,
/// events before event_participants.
pub async fn load_store(pool: &PgPool, store: &Store) -> Result<(), sqlx::Error> {
    // Players
    {
        let mut buf = String::new();
        for p in store.players.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                p.id,
                escape(&p.name),
                opt(p.alliance_id),
                minutes(p.created_at),
                minutes(p.last_active_at),
                opt(p.shield_expires_at.map(minutes)),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_players.sql"), &buf).await?;
    }

    // Alliances
    {
        let mut buf = String::new();
        for a in store.alliances.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                a.id,
                escape(&a.name),
                a.leader_id,
                json(&a.member_ids)?,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_alliances.sql"), &buf).await?;
    }

    // Territories
    {
        let mut buf = String::new();
        for t in store.territories.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                t.id,
                escape(&t.name),
                t.owner_id,
                t.center.lat,
                t.center.lon,
                t.state,
                t.battle_losses,
                opt(t.shield_expires_at.map(minutes)),
                opt(t.fallen_at.map(minutes)),
                opt(t.previous_owner_id),
                opt(t.blueprint_id),
                json(&t.buildings)?,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_territories.sql"), &buf).await?;
    }

    // Wars (before battles due to FK)
    {
        let mut buf = String::new();
        for w in store.wars.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                w.id,
                w.challenger_alliance_id,
                w.defender_alliance_id,
                w.declared_by,
                w.status,
                w.phase,
                minutes(w.timeline.declared_at),
                minutes(w.timeline.warning_ends_at),
                minutes(w.timeline.ends_at),
                minutes(w.timeline.peace_treaty_ends_at),
                w.challenger_score,
                w.defender_score,
                w.challenger_battles_won,
                w.defender_battles_won,
                opt(w.winner_id),
                opt_json(w.rewards.as_ref())?,
                w.error.as_deref().map_or_else(|| NULL.to_string(), escape),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_wars.sql"), &buf).await?;
    }

    // Battles
    {
        let mut buf = String::new();
        for b in store.battles.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                b.id,
                b.attacker_id,
                b.defender_id,
                opt(b.attacker_alliance_id),
                opt(b.defender_alliance_id),
                b.territory_id,
                opt(b.war_id),
                b.status,
                minutes(b.scheduled_at),
                minutes(b.battle_starts_at),
                opt_json(b.attacker_formation.as_ref())?,
                opt_json(b.defender_formation.as_ref())?,
                opt(b.attacker_participation),
                opt(b.defender_participation),
                b.defense_bonus,
                opt(b.completed_at.map(minutes)),
                opt_json(b.result.as_ref())?,
                b.error.as_deref().map_or_else(|| NULL.to_string(), escape),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_battles.sql"), &buf).await?;
    }

    // Events (before participants due to FK)
    {
        let mut buf = String::new();
        for ev in store.events.events() {
            let data = if ev.data.is_null() {
                NULL.to_string()
            } else {
                json(&ev.data)?
            };
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                ev.id,
                ev.kind,
                minutes(ev.timestamp),
                escape(&ev.description),
                opt(ev.caused_by),
                data,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_events.sql"), &buf).await?;
    }

    // Event participants
    {
        let mut buf = String::new();
        for p in store.events.participants() {
            buf.push_str(&format!("{}\t{}\t{}\n", p.event_id, p.entity_id, p.role));
        }
        copy_in(
            pool,
            include_str!("../../sql/copy_event_participants.sql"),
            &buf,
        )
        .await?;
    }

    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(pool: &PgPool, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

const NULL: &str = "\\N";

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Render an optional value as a COPY text value (`\N` for NULL).
fn opt<T: Display>(v: Option<T>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => NULL.to_string(),
    }
}

fn minutes(t: GameTime) -> u64 {
    t.as_minutes()
}

/// Serialize to a COPY-escaped JSON document for a JSONB column.
fn json<T: Serialize + ?Sized>(value: &T) -> Result<String, sqlx::Error> {
    let text = serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    Ok(escape(&text))
}

fn opt_json<T: Serialize>(value: Option<&T>) -> Result<String, sqlx::Error> {
    match value {
        Some(v) => json(v),
        None => Ok(NULL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_copy_specials() {
        assert_eq!(escape("a\tb\nc\\d"), "a\\tb\\nc\\\\d");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn opt_renders_null_marker() {
        assert_eq!(opt::<u64>(None), "\\N");
        assert_eq!(opt(Some(7)), "7");
    }

    #[test]
    fn json_escapes_embedded_backslashes() {
        let value = serde_json::json!({ "name": "tab\there" });
        // serde_json writes `\t` as two characters; COPY needs the backslash doubled.
        assert_eq!(json(&value).unwrap(), r#"{"name":"tab\\there"}"#);
    }
}
