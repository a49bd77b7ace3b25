use std::collections::BTreeSet;

use spellbook_domain::{
    Actor, ActorSpell, ClassRules, ErrorKind, HostEventId, Participant, SpellId, SwapKind,
    SwapPolicy, SwapState, SwapStatus, WindowMode,
};

use crate::api::{HookOutcome, HostEvent};
use crate::test_fixtures::{class, spell_id, user_id, World};

fn spells(ids: &[&str]) -> BTreeSet<SpellId> {
    ids.iter().map(|id| spell_id(id)).collect()
}

fn long_rest(actor: &Actor, event_id: &str) -> HostEvent {
    HostEvent::RestCompleted {
        event_id: HostEventId::new(event_id).unwrap(),
        actor_id: actor.id.clone(),
        long_rest: true,
    }
}

/// A level 1 cleric who swaps cantrips on long rests, knowing c1, c2 and c3.
async fn cantrip_swapper() -> (World, Actor) {
    let world = World::new().await;
    world.add_pack("phb.lists", 0).await;
    for id in ["c1", "c2", "c3", "c4", "c5"] {
        world.add_spell(id, 0, false).await;
    }
    world
        .add_list(world.standard_list(
            "S1",
            "Cleric",
            "cleric",
            "phb.lists",
            &["c1", "c2", "c3", "c4", "c5"],
        ))
        .await;

    let mut actor = world.caster("Actor.c", "cleric", 1).await;
    for id in ["c1", "c2", "c3"] {
        actor.spells.push(ActorSpell::new(spell_id(id), class("cleric"), 0));
    }
    actor.flags.class_rules.insert(
        class("cleric"),
        ClassRules {
            cantrip_swapping: Some(SwapPolicy::LongRest),
            ..ClassRules::default()
        },
    );
    world.save_actor(&actor).await;
    (world, actor)
}

#[tokio::test]
async fn cantrip_long_rest_swap_completes() {
    let (world, actor) = cantrip_swapper().await;
    let app = world.app();
    let player = Participant::player(user_id("player-1"));

    let HookOutcome::Rest { outcome } = app
        .hooks
        .dispatch(long_rest(&actor, "rest-1"))
        .await
        .unwrap()
    else {
        panic!("expected a rest outcome");
    };
    let cantrips = outcome
        .opened
        .iter()
        .find(|w| w.kind == SwapKind::Cantrip)
        .expect("cantrip window");
    assert_eq!(cantrips.mode, WindowMode::Swap);
    let stored = world.actor(&actor.id).await;
    assert_eq!(
        stored.swap_tracking(&class("cleric")).unwrap().cantrip.state,
        SwapState::Open {
            snapshot: spells(&["c1", "c2", "c3"])
        }
    );

    let committed = app
        .use_cases
        .preparation
        .commit(&player, &actor.id, &class("cleric"), spells(&["c1", "c2", "c4"]))
        .await
        .unwrap();
    assert_eq!(committed.diff.added, spells(&["c4"]));
    assert_eq!(committed.diff.removed, spells(&["c3"]));
    assert_eq!(committed.swap[&SwapKind::Cantrip], SwapStatus::Completed);

    let HookOutcome::Rest { outcome } = app
        .hooks
        .dispatch(long_rest(&actor, "rest-2"))
        .await
        .unwrap()
    else {
        panic!("expected a rest outcome");
    };
    let reopened = outcome
        .opened
        .iter()
        .find(|w| w.kind == SwapKind::Cantrip)
        .expect("cantrip window");
    assert_eq!(reopened.replaced, Some(SwapStatus::Completed));
    let stored = world.actor(&actor.id).await;
    assert_eq!(
        stored.swap_tracking(&class("cleric")).unwrap().cantrip.state,
        SwapState::Open {
            snapshot: spells(&["c1", "c2", "c4"])
        }
    );
}

#[tokio::test]
async fn cantrip_swap_rejects_multiple_edits() {
    let (world, actor) = cantrip_swapper().await;
    let app = world.app();
    app.hooks.dispatch(long_rest(&actor, "rest-1")).await.unwrap();
    let before = world.actor(&actor.id).await;

    let err = app
        .use_cases
        .preparation
        .commit(
            &Participant::player(user_id("player-1")),
            &actor.id,
            &class("cleric"),
            spells(&["c1", "c4", "c5"]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(world.actor(&actor.id).await, before);
}
