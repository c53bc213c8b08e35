//! Property tests for toggles, follows, handles and empty content

mod common;

use common::config;
use proptest::prelude::*;
use warble_social::{normalize_pseudo, EngagementKind, SocialError, SocialService};
use warble_testkit::fixtures::test_email;
use warble_testkit::strategies::{
    arb_any_user_id, arb_blank, arb_content, arb_raw_pseudo, arb_user_id,
};
use warble_testkit::TestEffects;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_normalized_pseudo_has_single_at(raw in arb_raw_pseudo()) {
        let pseudo = normalize_pseudo(&raw).unwrap();
        prop_assert!(pseudo.starts_with('@'));
        prop_assert!(!pseudo[1..].starts_with('@'));
        prop_assert_eq!(normalize_pseudo(&pseudo).unwrap(), pseudo.clone());
    }

    #[test]
    fn prop_even_toggles_leave_no_trace(
        actors in prop::collection::vec(arb_user_id(), 1..6),
        text in arb_content(),
    ) {
        tokio_test::block_on(async {
            let social = SocialService::new(config());
            let effects = TestEffects::new();
            let author = actors[0];
            social.sign_in(&effects, author, &test_email(0), None).await.unwrap();
            let post = social.post(&effects, author, &text, None).await.unwrap();
            let target = post.path();

            for actor in actors.iter().chain(actors.iter()) {
                social.like(&effects, *actor, &target).await.unwrap();
            }

            let summary = social.summary(&effects, author, &target).await.unwrap();
            assert_eq!(summary.likes, 0);
            for actor in &actors {
                assert!(effects
                    .store()
                    .paths_in(&EngagementKind::Like.reverse_index(*actor))
                    .is_empty());
            }
        });
    }

    #[test]
    fn prop_toggle_count_matches_distinct_actors(
        actors in prop::collection::vec(arb_user_id(), 1..8),
    ) {
        tokio_test::block_on(async {
            let social = SocialService::new(config());
            let effects = TestEffects::new();
            let post = social.post(&effects, actors[0], "post", None).await.unwrap();
            let target = post.path();

            let mut expected = std::collections::BTreeSet::new();
            for actor in &actors {
                let outcome = social.retweet(&effects, *actor, &target).await.unwrap();
                if !expected.remove(actor) {
                    expected.insert(*actor);
                }
                assert_eq!(outcome.active, expected.contains(actor));
                assert_eq!(outcome.count, expected.len());
            }
        });
    }

    #[test]
    fn prop_follow_then_unfollow_restores_graph(
        follower in arb_user_id(),
        followees in prop::collection::btree_set(arb_user_id(), 0..6),
    ) {
        tokio_test::block_on(async {
            let social = SocialService::new(config());
            let effects = TestEffects::new();
            let graph = social.graph();
            let followees: Vec<_> = followees.into_iter().filter(|f| *f != follower).collect();

            for followee in &followees {
                social.follow(&effects, follower, *followee).await.unwrap();
            }
            assert_eq!(
                graph.following_count(&effects, follower).await.unwrap(),
                followees.len()
            );

            for followee in &followees {
                social.unfollow(&effects, follower, *followee).await.unwrap();
                assert!(!graph.is_following(&effects, follower, *followee).await.unwrap());
            }
            assert_eq!(graph.following_count(&effects, follower).await.unwrap(), 0);
        });
    }

    #[test]
    fn prop_blank_text_writes_nothing(author in arb_any_user_id(), blank in arb_blank()) {
        tokio_test::block_on(async {
            let social = SocialService::new(config());
            let effects = TestEffects::new();
            let post = social.post(&effects, author, "root", None).await.unwrap();
            let before = effects.store().document_count();

            assert!(matches!(
                social.post(&effects, author, &blank, None).await,
                Err(SocialError::EmptyPost)
            ));
            assert!(matches!(
                social.reply(&effects, author, &post.path(), &blank).await,
                Err(SocialError::EmptyReply)
            ));
            assert!(matches!(
                social.follow(&effects, author, author).await,
                Err(SocialError::Invalid { .. })
            ));
            assert_eq!(effects.store().document_count(), before);
        });
    }
}
