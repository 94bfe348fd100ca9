//! Integration Tests for the Property Engine
//!
//! These tests drive a small battle schema the way a game entity would:
//! leaves for level and strength, a random roll, and derived combat values.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;

use propgraph_core::{
    DerivedOptions, DirtyState, LeafSnapshot, PropertyError, PropertyHost, PropertyInstance,
    PropertySchema, SchemaBuilder, Value, RANDOM_LEAF,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Host of a battle unit: the attacker it is being hit by, plus a log of
/// every notification.
#[derive(Debug, Default)]
struct BattleHost {
    attacker_level: i64,
    changes: Vec<(String, Option<Value>, Value)>,
    pending: Vec<String>,
}

impl PropertyHost for BattleHost {
    fn on_value_changed(&mut self, name: &str, old: Option<&Value>, new: &Value) {
        self.changes.push((name.to_string(), old.cloned(), new.clone()));
    }

    fn on_pending_external_update(&mut self, name: &str, _current: Option<&Value>) {
        self.pending.push(name.to_string());
    }
}

impl BattleHost {
    fn changes_of(&self, name: &str) -> Vec<Value> {
        self.changes
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, _, new)| new.clone())
            .collect()
    }
}

fn float(v: &Value) -> f64 {
    v.as_float().unwrap_or(0.0)
}

/// level, strength, equip_strength, random
/// do_roll(level, random): random < (level - attacker_level) / level
/// base_hurt(do_roll, strength, equip_strength)
fn battle_schema(rolls: Arc<AtomicUsize>) -> Arc<PropertySchema<BattleHost>> {
    let mut builder = SchemaBuilder::<BattleHost>::new("player");
    builder.declare_leaf("level", &["level", "lv"]).unwrap();
    builder.declare_leaf("strength", &[]).unwrap();
    builder.declare_leaf("equip_strength", &[]).unwrap();
    builder.declare_random_leaf().unwrap();

    builder
        .declare_derived(
            "do_roll",
            &["level", RANDOM_LEAF],
            move |host: &BattleHost, args| {
                rolls.fetch_add(1, Ordering::SeqCst);
                let level = float(&args[0]);
                let chance = (level - host.attacker_level as f64) / level;
                Value::Bool(float(&args[1]) < chance)
            },
            DerivedOptions::default().pushable(),
        )
        .unwrap();

    builder
        .declare_derived(
            "base_hurt",
            &["do_roll", "strength", "equip_strength"],
            |_, args| {
                let factor = if args[0].as_bool().unwrap_or(false) { 1.5 } else { 1.0 };
                Value::Float(float(&args[1]) * float(&args[2]) * factor)
            },
            DerivedOptions::default()
                .pushable()
                .alias("base_hurt")
                .alias("hurt"),
        )
        .unwrap();

    Arc::new(builder.finalize().unwrap())
}

struct Equip {
    strength: i64,
}

/// A game entity composed of a property instance and its equipment.
struct Player {
    props: PropertyInstance<BattleHost>,
    equipment: Vec<Equip>,
}

impl Player {
    fn new(schema: &Arc<PropertySchema<BattleHost>>, level: i64, strength: i64) -> Self {
        let mut player = Self {
            props: schema.instantiate(BattleHost::default()),
            equipment: Vec::new(),
        };
        player.props.write("level", level).unwrap();
        player.props.write("strength", strength).unwrap();
        player.refresh_equipment();
        player
    }

    fn equip(&mut self, item: Equip) {
        self.equipment.push(item);
        self.refresh_equipment();
    }

    fn refresh_equipment(&mut self) {
        let factor = 1 + self.equipment.iter().map(|e| e.strength).sum::<i64>();
        self.props.write("equip_strength", factor).unwrap();
    }

    fn roll(&mut self, random: f64) {
        self.props.write(RANDOM_LEAF, random).unwrap();
    }

    fn base_hurt(&mut self) -> Option<f64> {
        self.props.read("base_hurt").unwrap().as_ref().and_then(Value::as_float)
    }
}

/// A crit roll stays unresolved until the random draw arrives, then multiplies damage.
#[test]
fn critical_roll_scenario() {
    init_tracing();
    let rolls = Arc::new(AtomicUsize::new(0));
    let schema = battle_schema(rolls.clone());

    let mut player = Player::new(&schema, 2, 1);
    player.props.host_mut().attacker_level = 1;

    // no random draw yet: the roll cannot resolve
    assert_eq!(player.base_hurt(), None);
    assert_eq!(player.props.state("do_roll").unwrap(), DirtyState::Dirty);

    player.roll(0.0);
    assert_eq!(player.props.read("do_roll").unwrap(), Some(Value::Bool(true)));
    assert_eq!(player.base_hurt(), Some(1.5));
}

/// Changing level re-rolls through the push, reusing the stored random draw.
#[test]
fn level_update_recomputes_roll_without_new_random() {
    init_tracing();
    let rolls = Arc::new(AtomicUsize::new(0));
    let schema = battle_schema(rolls.clone());

    let mut player = Player::new(&schema, 2, 1);
    player.props.host_mut().attacker_level = 1;
    player.roll(0.0);
    assert_eq!(player.base_hurt(), Some(1.5));
    let before = rolls.load(Ordering::SeqCst);

    player.props.write("level", 3).unwrap();
    assert_eq!(rolls.load(Ordering::SeqCst), before + 1);
    assert_eq!(player.props.state("do_roll").unwrap(), DirtyState::Clean);
    assert_eq!(player.base_hurt(), Some(1.5));

    // an attacker of equal level never crits
    player.props.host_mut().attacker_level = 3;
    player.props.write("lv", 3).unwrap();
    assert_eq!(player.props.read("do_roll").unwrap(), Some(Value::Bool(false)));
    assert_eq!(player.base_hurt(), Some(1.0));
}

/// Equipping an item rewrites the equipment factor and pushes into damage.
#[test]
fn equipment_feeds_base_hurt() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 2, 2);
    player.props.host_mut().attacker_level = 2;
    player.roll(0.5);
    assert_eq!(player.base_hurt(), Some(2.0));

    player.equip(Equip { strength: 2 });
    assert_eq!(player.props.read("equip_strength").unwrap(), Some(Value::Int(3)));
    assert_eq!(player.base_hurt(), Some(6.0));
}

/// Each alias of a changed property hears about it exactly once.
#[test]
fn push_notifies_every_alias_once() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 2, 1);
    player.props.host_mut().attacker_level = 1;
    player.roll(0.0);

    let host = player.props.host();
    assert_eq!(host.changes_of("base_hurt"), vec![Value::Float(1.5)]);
    assert_eq!(host.changes_of("hurt"), vec![Value::Float(1.5)]);
    assert_eq!(host.changes_of("do_roll"), vec![Value::Bool(true)]);
    // leaf changes fan out to every alias as well
    assert_eq!(host.changes_of("level"), vec![Value::Int(2)]);
    assert_eq!(host.changes_of("lv"), vec![Value::Int(2)]);
}

/// Aliases read the same value as the canonical name.
#[test]
fn alias_reads_match_canonical_reads() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 4, 2);
    player.props.host_mut().attacker_level = 1;
    player.roll(0.9);

    let canonical = player.props.read("base_hurt").unwrap();
    assert_eq!(player.props.read("hurt").unwrap(), canonical);
    assert_eq!(player.props.read("lv").unwrap(), player.props.read("level").unwrap());
}

/// Only owner-fed leaves announce a pending update; the random draw does not.
#[test]
fn random_leaf_skips_pending_update_hook() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 2, 1);
    player.roll(0.1);
    player.roll(0.2);
    player.props.write("level", 5).unwrap();

    assert_eq!(
        player.props.host().pending,
        vec!["level", "strength", "equip_strength", "level"]
    );
}

/// Initial evaluation announces eager nodes and leaves lazy ones untouched.
#[test]
fn init_evaluations_announce_eager_nodes() {
    init_tracing();
    let mut builder = SchemaBuilder::<BattleHost>::new("monster");
    builder.declare_leaf("level", &[]).unwrap();
    builder
        .declare_derived(
            "max_hp",
            &["level"],
            |_, args| Value::Int(args[0].as_int().unwrap_or(0) * 10),
            DerivedOptions::default().eager_init().alias("max_hp").alias("hp_cap"),
        )
        .unwrap();
    builder
        .declare_derived(
            "title",
            &["level"],
            |_, _| Value::from("grunt"),
            DerivedOptions::default(),
        )
        .unwrap();
    let schema = Arc::new(builder.finalize().unwrap());

    let mut monster = schema.instantiate(BattleHost::default());
    monster.write("level", 7).unwrap();
    monster.host_mut().changes.clear();

    monster.run_init_evaluations();
    assert_eq!(
        monster.host().changes,
        vec![
            ("max_hp".to_string(), None, Value::Int(70)),
            ("hp_cap".to_string(), None, Value::Int(70)),
        ]
    );
    assert_eq!(monster.state("title").unwrap(), DirtyState::ConditionallyDirty);
}

/// Invalidating everything and reading again gives the same values.
#[test]
fn invalidate_all_then_reupdate_reproduces_values() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 3, 2);
    player.props.host_mut().attacker_level = 1;
    player.roll(0.25);
    let expected = player.base_hurt();

    player.props.invalidate_all();
    assert_eq!(player.props.state("level").unwrap(), DirtyState::Clean);
    assert_eq!(player.props.state("base_hurt").unwrap(), DirtyState::ConditionallyDirty);
    assert_eq!(player.base_hurt(), expected);
}

/// Leaf values survive a JSON round trip into a fresh instance.
#[test]
fn snapshot_survives_json() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let mut player = Player::new(&schema, 2, 3);
    player.props.host_mut().attacker_level = 1;
    player.roll(0.0);

    let json = serde_json::to_string(&player.props.snapshot_leaves()).unwrap();
    let snapshot: LeafSnapshot = serde_json::from_str(&json).unwrap();

    let mut loaded = schema.instantiate(BattleHost {
        attacker_level: 1,
        ..Default::default()
    });
    loaded.restore_leaves(&snapshot).unwrap();
    assert_eq!(loaded.read("base_hurt").unwrap(), Some(Value::Float(4.5)));
    assert_eq!(loaded.read(RANDOM_LEAF).unwrap(), Some(Value::Float(0.0)));
}

/// Unknown names and writes to derived properties are errors.
#[test]
fn unknown_names_are_reported() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));
    let mut player = Player::new(&schema, 2, 1);

    assert_eq!(
        player.props.read("mana"),
        Err(PropertyError::UnknownProperty("mana".into()))
    );
    assert_eq!(
        player.props.write("do_roll", true),
        Err(PropertyError::NotWritable("do_roll".into()))
    );
}

/// One schema drives independent instances on several threads.
#[test]
fn schema_is_shared_across_threads() {
    init_tracing();
    let schema = battle_schema(Arc::new(AtomicUsize::new(0)));

    let handles: Vec<_> = (2..6)
        .map(|level| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let mut player = Player::new(&schema, level, 2);
                player.props.host_mut().attacker_level = 1;
                player.roll(0.0);
                player.base_hurt()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(3.0));
    }
}
