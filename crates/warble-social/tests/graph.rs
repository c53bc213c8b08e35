//! Follow graph behaviour

mod common;

use assert_matches::assert_matches;
use common::{setup, user};
use warble_social::SocialError;
use warble_testkit::fixtures::test_user;

#[tokio::test]
async fn test_follow_then_unfollow_removes_edge_from_both_sides() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;
    let graph = social.graph();

    social.follow(&effects, a, b).await.unwrap();
    assert!(graph.is_following(&effects, a, b).await.unwrap());
    assert!(!graph.is_following(&effects, b, a).await.unwrap());
    assert_eq!(graph.list_following(&effects, a).await.unwrap()[0].id, b);
    assert_eq!(graph.list_followers(&effects, b).await.unwrap()[0].id, a);
    assert_eq!(graph.follower_count(&effects, b).await.unwrap(), 1);
    assert_eq!(graph.following_count(&effects, a).await.unwrap(), 1);

    social.unfollow(&effects, a, b).await.unwrap();
    assert!(!graph.is_following(&effects, a, b).await.unwrap());
    assert!(graph.list_following(&effects, a).await.unwrap().is_empty());
    assert!(graph.list_followers(&effects, b).await.unwrap().is_empty());
    assert_eq!(graph.follower_count(&effects, b).await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_follow_is_rejected_without_duplicate_edge() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;

    social.follow(&effects, a, b).await.unwrap();
    assert_matches!(
        social.follow(&effects, a, b).await,
        Err(SocialError::AlreadyExists { .. })
    );
    assert_eq!(social.graph().follower_count(&effects, b).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unfollow_without_edge_is_not_found() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;

    assert_matches!(
        social.unfollow(&effects, a, b).await,
        Err(SocialError::NotFound { .. })
    );
}

#[tokio::test]
async fn test_self_follow_is_invalid() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    assert_matches!(
        social.follow(&effects, a, a).await,
        Err(SocialError::Invalid { .. })
    );
}

#[tokio::test]
async fn test_follower_list_skips_edges_to_missing_profiles() {
    let (social, effects) = setup();
    let star = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let ghost = test_user(99);

    social.follow(&effects, fan, star).await.unwrap();
    social.follow(&effects, ghost, star).await.unwrap();

    let followers = social.graph().list_followers(&effects, star).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, fan);
    assert_eq!(social.graph().follower_count(&effects, star).await.unwrap(), 2);
}

#[tokio::test]
async fn test_following_subscription_reports_follow_changes() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;

    let mut watch = social.graph().watch_following(&effects, a).await.unwrap();
    assert!(watch.next().await.unwrap().is_empty());

    social.follow(&effects, a, b).await.unwrap();
    assert_eq!(watch.next().await.unwrap().len(), 1);

    drop(watch);
    assert_eq!(effects.store().active_subscriptions(), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried_then_surfaced() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;

    effects.faults().fail_commits(2);
    social.follow(&effects, a, b).await.unwrap();

    effects.faults().fail_commits(100);
    let err = social.unfollow(&effects, a, b).await.unwrap_err();
    assert!(err.is_retryable());
    effects.faults().clear();
    assert!(social.graph().is_following(&effects, a, b).await.unwrap());
}

#[tokio::test]
async fn test_graph_subscriptions_retry_transient_failures() {
    let (social, effects) = setup();
    let a = user(&social, &effects, 1).await;
    let b = user(&social, &effects, 2).await;
    social.follow(&effects, a, b).await.unwrap();

    effects.faults().fail_subscribes(1);
    let mut following = social.graph().watch_following(&effects, a).await.unwrap();
    assert_eq!(following.next().await.unwrap().len(), 1);

    effects.faults().fail_subscribes(2);
    let mut followers = social.graph().watch_followers(&effects, b).await.unwrap();
    assert_eq!(followers.next().await.unwrap().len(), 1);
    assert_eq!(effects.faults().injected(), 3);

    effects.faults().set_outage(true);
    let err = social.graph().watch_following(&effects, a).await.unwrap_err();
    assert_matches!(err, SocialError::StoreUnavailable { .. });
    effects.faults().clear();
}
