//! Likes, retweets and the reverse index

mod common;

use assert_matches::assert_matches;
use common::{membership_batch, setup, user, RacingStore};
use warble_core::document::WriteBatch;
use warble_core::effects::DocumentStoreEffects;
use warble_social::{
    ContentPath, EngagementKind, EngagementView, ReverseIndexEntry, SocialError,
};
use warble_testkit::fixtures::test_post_id;

#[tokio::test]
async fn test_toggling_twice_restores_the_original_state() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "like me", None).await.unwrap();
    let target = post.path();

    let on = social.like(&effects, fan, &target).await.unwrap();
    assert!(on.active);
    assert_eq!(on.count, 1);

    let reverse = effects
        .get(&EngagementKind::Like.reverse_document(fan, &target))
        .await
        .unwrap()
        .unwrap()
        .decode::<ReverseIndexEntry>()
        .unwrap();
    assert_eq!(reverse.target, target);

    let off = social.like(&effects, fan, &target).await.unwrap();
    assert!(!off.active);
    assert_eq!(off.count, 0);
    assert!(effects
        .store()
        .paths_in(&EngagementKind::Like.reverse_index(fan))
        .is_empty());
    assert!(effects
        .store()
        .paths_in(&EngagementKind::Like.members(&target))
        .is_empty());
}

#[tokio::test]
async fn test_likes_and_retweets_are_independent_sets() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let a = user(&social, &effects, 2).await;
    let b = user(&social, &effects, 3).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();
    let target = post.path();

    social.like(&effects, a, &target).await.unwrap();
    social.like(&effects, b, &target).await.unwrap();
    social.retweet(&effects, a, &target).await.unwrap();
    social.reply(&effects, b, &target, "hi").await.unwrap();

    let seen_by_a = social.summary(&effects, a, &target).await.unwrap();
    assert_eq!(seen_by_a.likes, 2);
    assert_eq!(seen_by_a.retweets, 1);
    assert_eq!(seen_by_a.replies, 1);
    assert!(seen_by_a.liked && seen_by_a.retweeted);

    let seen_by_b = social.summary(&effects, b, &target).await.unwrap();
    assert!(seen_by_b.liked && !seen_by_b.retweeted);

    let members = social
        .engagement()
        .members(&effects, EngagementKind::Like, &target)
        .await
        .unwrap();
    assert_eq!(members, vec![a, b]);
}

#[tokio::test]
async fn test_summary_counts_direct_replies_through_transient_failures() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();
    let target = post.path();
    let first = social.reply(&effects, fan, &target, "one").await.unwrap();
    social.reply(&effects, fan, &target, "two").await.unwrap();
    social.reply(&effects, author, &first.path(), "nested").await.unwrap();
    social.like(&effects, fan, &target).await.unwrap();

    effects.faults().fail_reads(2);
    let summary = social.summary(&effects, fan, &target).await.unwrap();
    assert_eq!(effects.faults().injected(), 2);
    assert_eq!(summary.replies, 2);
    assert_eq!(summary.likes, 1);
    assert!(summary.liked && !summary.retweeted);
}

#[tokio::test]
async fn test_replies_can_be_liked() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let post = social.post(&effects, author, "root", None).await.unwrap();
    let reply = social
        .reply(&effects, author, &post.path(), "child")
        .await
        .unwrap();

    let outcome = social.like(&effects, author, &reply.path()).await.unwrap();
    assert!(outcome.active);
    assert_eq!(social.summary(&effects, author, &post.path()).await.unwrap().likes, 0);

    let entry = effects
        .get(&EngagementKind::Like.reverse_document(author, &reply.path()))
        .await
        .unwrap()
        .unwrap()
        .decode::<ReverseIndexEntry>()
        .unwrap();
    assert_eq!(entry.target, reply.path());
}

#[tokio::test]
async fn test_toggling_missing_content_is_not_found() {
    let (social, effects) = setup();
    let fan = user(&social, &effects, 1).await;
    let missing = ContentPath::post(test_post_id(3));

    assert_matches!(
        social.like(&effects, fan, &missing).await,
        Err(SocialError::NotFound { .. })
    );
    assert!(effects
        .store()
        .paths_in(&EngagementKind::Like.reverse_index(fan))
        .is_empty());
}

#[tokio::test]
async fn test_failed_toggle_writes_neither_side() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();
    let target = post.path();

    effects.faults().fail_commits(100);
    assert_matches!(
        social.retweet(&effects, fan, &target).await,
        Err(SocialError::StoreUnavailable { .. })
    );
    effects.faults().clear();

    assert!(effects
        .store()
        .paths_in(&EngagementKind::Retweet.members(&target))
        .is_empty());
    assert!(effects
        .store()
        .paths_in(&EngagementKind::Retweet.reverse_index(fan))
        .is_empty());
}

#[tokio::test]
async fn test_optimistic_view_reverts_when_the_store_refuses() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();

    let mut view = EngagementView::new(EngagementKind::Like, post.path(), fan);
    effects.faults().set_outage(true);
    assert!(view.toggle(social.engagement(), &effects).await.is_err());
    effects.faults().set_outage(false);
    assert!(!view.is_member());
    assert_eq!(view.count(), 0);
    assert!(!view.has_pending());

    let outcome = view.toggle(social.engagement(), &effects).await.unwrap();
    assert!(outcome.active);
    assert!(view.is_member());
    assert_eq!(view.count(), 1);
}

#[tokio::test]
async fn test_optimistic_view_follows_store_snapshots() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let other = user(&social, &effects, 3).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();
    let target = post.path();

    let mut watch = social
        .engagement()
        .watch(&effects, EngagementKind::Like, &target)
        .await
        .unwrap();
    let mut view = EngagementView::new(EngagementKind::Like, target.clone(), fan);
    view.apply_snapshot(&watch.next().await.unwrap()).unwrap();

    view.toggle(social.engagement(), &effects).await.unwrap();
    social.like(&effects, other, &target).await.unwrap();
    view.apply_snapshot(&watch.next().await.unwrap()).unwrap();

    assert!(!view.has_pending());
    assert_eq!(view.count(), 2);
}

#[tokio::test]
async fn test_profile_lists_skip_dangling_reverse_entries() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let kept = social.post(&effects, author, "kept", None).await.unwrap();
    let lost = social.post(&effects, author, "lost", None).await.unwrap();
    let later = social.post(&effects, author, "later", None).await.unwrap();

    social.like(&effects, fan, &kept.path()).await.unwrap();
    social.like(&effects, fan, &lost.path()).await.unwrap();
    social.like(&effects, fan, &later.path()).await.unwrap();
    social.retweet(&effects, fan, &kept.path()).await.unwrap();

    // Remove the post record alone, leaving the reverse entry behind
    effects
        .store()
        .commit(WriteBatch::new().delete(lost.path().document()))
        .await
        .unwrap();

    let liked = social.profiles().liked_posts(&effects, fan).await.unwrap();
    assert_eq!(liked, vec![later, kept.clone()]);
    let retweeted = social.profiles().retweeted_posts(&effects, fan).await.unwrap();
    assert_eq!(retweeted, vec![kept]);
}

#[tokio::test]
async fn test_engagement_watch_retries_transient_failures() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "hello", None).await.unwrap();
    social.like(&effects, fan, &post.path()).await.unwrap();

    effects.faults().fail_subscribes(1);
    let mut watch = social
        .engagement()
        .watch(&effects, EngagementKind::Like, &post.path())
        .await
        .unwrap();
    assert_eq!(effects.faults().injected(), 1);
    assert_eq!(watch.next().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_toggle_that_loses_a_race_reports_the_stored_state() {
    let (social, effects) = setup();
    let author = user(&social, &effects, 1).await;
    let fan = user(&social, &effects, 2).await;
    let post = social.post(&effects, author, "contested", None).await.unwrap();
    let target = post.path();
    let racing = RacingStore::new(effects.clone());
    let engagement = social.engagement();

    // Another session likes first; our create collides
    racing
        .before_next_commit(membership_batch(EngagementKind::Like, &target, fan))
        .await;
    let outcome = engagement
        .toggle(&racing, EngagementKind::Like, fan, &target)
        .await
        .unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 1);

    // Another session unlikes first; our delete finds nothing
    racing
        .before_next_commit(
            WriteBatch::new()
                .delete(EngagementKind::Like.member_document(&target, fan))
                .delete(EngagementKind::Like.reverse_document(fan, &target)),
        )
        .await;
    let outcome = engagement
        .toggle(&racing, EngagementKind::Like, fan, &target)
        .await
        .unwrap();
    assert!(!outcome.active);
    assert_eq!(outcome.count, 0);
    assert!(effects
        .store()
        .paths_in(&EngagementKind::Like.reverse_index(fan))
        .is_empty());
}
