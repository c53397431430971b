//! Cluster-view scenarios: membership change rebalance, join/leave events,
//! and observer routing.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_config, start_silo, wait_for_view};
use strand_rt::membership::{MembershipEvent, MembershipStore};
use strand_rt::prelude::*;

#[tokio::test]
async fn adding_a_silo_moves_a_bounded_share_of_keys() {
    let store = MembershipStore::new();
    let (silo_a, _) = start_silo("silo-a", &store, fast_config()).await;
    let (silo_b, _) = start_silo("silo-b", &store, fast_config()).await;
    wait_for_view(&silo_a, 2).await;

    let membership = silo_a.membership();
    let keys = 1000usize;
    let before: Vec<_> = (0..keys)
        .map(|i| {
            membership
                .get_actor_silo("Counter", &format!("actor-{i}"))
                .unwrap()
        })
        .collect();

    let (silo_c, _) = start_silo("silo-c", &store, fast_config()).await;
    wait_for_view(&silo_a, 3).await;

    let moved = (0..keys)
        .filter(|i| {
            let after = membership
                .get_actor_silo("Counter", &format!("actor-{i}"))
                .unwrap();
            after != before[*i]
        })
        .count();

    // Hard bound is half the keys; the ideal for 2 -> 3 silos is ~333.
    assert!(moved <= keys / 2, "moved {moved} of {keys} keys");
    assert!(moved > 0, "adding a silo should move some keys");

    silo_a.stop().await.unwrap();
    silo_b.stop().await.unwrap();
    silo_c.stop().await.unwrap();
}

#[tokio::test]
async fn join_and_leave_events_reach_subscribers() {
    let store = MembershipStore::new();
    let (silo_a, _) = start_silo("silo-a", &store, fast_config()).await;

    let mut events = silo_a.membership().subscribe();
    let (silo_b, _) = start_silo("silo-b", &store, fast_config()).await;

    let joined = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    match joined {
        MembershipEvent::SiloJoined(info) => {
            assert_eq!(info.silo_id, SiloId::new("silo-b"));
            // The ring already routes to the joined silo when the event
            // arrives.
            let membership = silo_a.membership();
            let owned_by_b = (0..1000).any(|i| {
                membership.get_actor_silo("Counter", &format!("probe-{i}"))
                    == Some(SiloId::new("silo-b"))
            });
            assert!(owned_by_b);
        }
        other => panic!("expected join, got {other:?}"),
    }

    silo_b.stop().await.unwrap();
    let left = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    match left {
        MembershipEvent::SiloLeft(id) => assert_eq!(id, SiloId::new("silo-b")),
        other => panic!("expected leave, got {other:?}"),
    }

    silo_a.stop().await.unwrap();
}

#[tokio::test]
async fn observer_clients_route_without_joining() {
    let store = MembershipStore::new();
    let (silo_a, _) = start_silo("silo-a", &store, fast_config()).await;

    // An external caller: observer membership + its own (client) transport.
    let observer = Arc::new(InMemoryMembership::observer(
        Arc::clone(&store),
        fast_config().membership,
    ));
    let client_transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(
        SiloId::new("client-1"),
        "127.0.0.1:0".parse().unwrap(),
        TransportConfig::default(),
    ));
    client_transport.start().await.unwrap();
    let router = Router::new(
        observer.clone(),
        client_transport,
        None,
        Duration::from_secs(2),
    );

    // Give the observer's listener a beat to sync the view.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(observer.current_silo_id(), None);

    let reply = router
        .call("Counter", "c1", "Increment", Vec::new())
        .await
        .unwrap();
    assert_eq!(common::read_u64(&reply), 1);
    // The activation lives on the silo, never on the client.
    assert_eq!(silo_a.activation_count(), 1);

    silo_a.stop().await.unwrap();
}

#[tokio::test]
async fn departed_silo_leaves_the_view_and_keys_move() {
    let store = MembershipStore::new();
    let (silo_a, _) = start_silo("silo-a", &store, fast_config()).await;
    let (silo_b, _) = start_silo("silo-b", &store, fast_config()).await;
    wait_for_view(&silo_a, 2).await;

    silo_b.stop().await.unwrap();

    // B is gone from the view; every key routes to A.
    wait_for_view(&silo_a, 1).await;
    let membership = silo_a.membership();
    for i in 0..100 {
        assert_eq!(
            membership.get_actor_silo("Counter", &format!("actor-{i}")),
            Some(SiloId::new("silo-a"))
        );
    }

    silo_a.stop().await.unwrap();
}
