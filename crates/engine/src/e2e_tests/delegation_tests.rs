use std::sync::Arc;

use spellbook_domain::{Actor, ActorId, ErrorKind, Participant};
use tokio_util::sync::CancellationToken;

use crate::api::serve_delegated_queries;
use crate::infrastructure::delegation::DelegationBus;
use crate::test_fixtures::{user_id, World};

async fn gm_party(world: &World) -> ActorId {
    let group =
        Actor::group(ActorId::new("Actor.party").unwrap(), "Party").with_owner(user_id("gm"));
    world.save_actor(&group).await;
    group.id
}

#[tokio::test]
async fn focus_without_a_gm_online_is_unavailable() {
    let world = World::new().await;
    let group = gm_party(&world).await;
    let app = world.app_with_delegation(Arc::new(DelegationBus::new()));

    let err = app
        .use_cases
        .focus
        .set_user_focus(
            &Participant::player(user_id("player-1")),
            &group,
            &user_id("player-1"),
            Some("healing".into()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(world.actor(&group).await.flags.user_focus.is_empty());
}

#[tokio::test]
async fn focus_retry_succeeds_once_a_gm_connects() {
    let world = World::new().await;
    let group = gm_party(&world).await;
    let bus = Arc::new(DelegationBus::new());
    let app = world.app_with_delegation(bus.clone());
    let player = Participant::player(user_id("player-1"));

    let first = app
        .use_cases
        .focus
        .set_user_focus(&player, &group, &user_id("player-1"), Some("healing".into()))
        .await;
    assert!(first.is_err());

    let cancel = CancellationToken::new();
    let responder = tokio::spawn(serve_delegated_queries(
        bus.register(user_id("gm")),
        app.queries.clone(),
        cancel.clone(),
    ));
    app.use_cases
        .focus
        .set_user_focus(&player, &group, &user_id("player-1"), Some("healing".into()))
        .await
        .unwrap();
    cancel.cancel();
    responder.await.unwrap();

    let stored = world.actor(&group).await;
    assert_eq!(stored.flags.user_focus[&user_id("player-1")], "healing");
}
