use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::id::IdGenerator;
use crate::model::{
    Alliance, AllianceWar, Event, EventParticipant, Player, ScheduledBattle, Territory,
};
use crate::store::Store;

const PLAYERS: &str = "players.jsonl";
const ALLIANCES: &str = "alliances.jsonl";
const TERRITORIES: &str = "territories.jsonl";
const BATTLES: &str = "battles.jsonl";
const WARS: &str = "wars.jsonl";
const EVENTS: &str = "events.jsonl";
const EVENT_PARTICIPANTS: &str = "event_participants.jsonl";

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Flush the store to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes one file per
/// collection (`players`, `alliances`, `territories`, `battles`, `wars`)
/// plus `events.jsonl` and `event_participants.jsonl`.
pub fn flush_to_jsonl(store: &Store, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join(PLAYERS), store.players.values().iter())?;
    write_jsonl(&output_dir.join(ALLIANCES), store.alliances.values().iter())?;
    write_jsonl(
        &output_dir.join(TERRITORIES),
        store.territories.values().iter(),
    )?;
    write_jsonl(&output_dir.join(BATTLES), store.battles.values().iter())?;
    write_jsonl(&output_dir.join(WARS), store.wars.values().iter())?;
    write_jsonl(&output_dir.join(EVENTS), store.events.events().iter())?;
    write_jsonl(
        &output_dir.join(EVENT_PARTICIPANTS),
        store.events.participants().iter(),
    )?;

    Ok(())
}

/// Rebuild a store from a directory written by [`flush_to_jsonl`].
///
/// Records come back at version 1 and the ID generator resumes past the
/// highest ID seen in any file.
pub fn load_from_jsonl(input_dir: &Path) -> io::Result<Store> {
    let players: Vec<Player> = read_jsonl(&input_dir.join(PLAYERS))?;
    let alliances: Vec<Alliance> = read_jsonl(&input_dir.join(ALLIANCES))?;
    let territories: Vec<Territory> = read_jsonl(&input_dir.join(TERRITORIES))?;
    let battles: Vec<ScheduledBattle> = read_jsonl(&input_dir.join(BATTLES))?;
    let wars: Vec<AllianceWar> = read_jsonl(&input_dir.join(WARS))?;
    let events: Vec<Event> = read_jsonl(&input_dir.join(EVENTS))?;
    let participants: Vec<EventParticipant> =
        read_jsonl(&input_dir.join(EVENT_PARTICIPANTS))?;

    let max_id = players
        .iter()
        .map(|p| p.id)
        .chain(alliances.iter().map(|a| a.id))
        .chain(territories.iter().map(|t| t.id))
        .chain(battles.iter().map(|b| b.id))
        .chain(wars.iter().map(|w| w.id))
        .chain(events.iter().map(|e| e.id))
        .max()
        .unwrap_or(0);

    let store = Store::with_id_generator(IdGenerator::starting_from(max_id + 1));
    for p in players {
        store.players.insert(p.id, p);
    }
    for a in alliances {
        store.alliances.insert(a.id, a);
    }
    for t in territories {
        store.territories.insert(t.id, t);
    }
    for b in battles {
        store.battles.insert(b.id, b);
    }
    for w in wars {
        store.wars.insert(w.id, w);
    }
    let mut by_event: BTreeMap<u64, Vec<EventParticipant>> = BTreeMap::new();
    for p in participants {
        by_event.entry(p.event_id).or_default().push(p);
    }
    for event in events {
        let linked = by_event.remove(&event.id).unwrap_or_default();
        store.events.push(event, linked);
    }
    Ok(store)
}
