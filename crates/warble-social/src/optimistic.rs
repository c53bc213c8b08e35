//! Optimistic engagement view
//!
//! View-side state for one like or retweet button. A toggle is shown
//! immediately, reverted if the store rejects it, and reconciled with the
//! store's own change notifications.
//!
//! The view keeps the confirmed membership *set* and an optional overlay for
//! the viewer's own entry rather than a counter, so a snapshot that already
//! contains the optimistic change cannot be counted twice.

use crate::engagement::{members_of, EngagementAggregator, EngagementKind, ToggleOutcome};
use crate::error::Result;
use crate::layout::ContentPath;
use std::collections::BTreeSet;
use warble_core::effects::{DocumentStoreEffects, QuerySnapshot};
use warble_core::identifiers::UserId;

/// Token for a toggle applied locally but not yet settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "settle the toggle with the store's answer"]
pub struct PendingToggle {
    previous: Option<bool>,
}

/// Local state of one membership set as seen by one viewer
#[derive(Debug, Clone)]
pub struct EngagementView {
    kind: EngagementKind,
    target: ContentPath,
    viewer: UserId,
    confirmed: BTreeSet<UserId>,
    overlay: Option<bool>,
}

impl EngagementView {
    /// Empty view
    pub fn new(kind: EngagementKind, target: ContentPath, viewer: UserId) -> Self {
        Self {
            kind,
            target,
            viewer,
            confirmed: BTreeSet::new(),
            overlay: None,
        }
    }

    /// View seeded with known members
    pub fn with_members<I>(
        kind: EngagementKind,
        target: ContentPath,
        viewer: UserId,
        members: I,
    ) -> Self
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut view = Self::new(kind, target, viewer);
        view.confirmed = members.into_iter().collect();
        view
    }

    /// Set this view tracks
    pub fn kind(&self) -> EngagementKind {
        self.kind
    }

    /// Content this view tracks
    pub fn target(&self) -> &ContentPath {
        &self.target
    }

    /// Whether the viewer is shown as a member
    pub fn is_member(&self) -> bool {
        self.overlay
            .unwrap_or_else(|| self.confirmed.contains(&self.viewer))
    }

    /// Count shown to the viewer
    pub fn count(&self) -> usize {
        let confirmed_member = self.confirmed.contains(&self.viewer);
        match self.overlay {
            Some(true) if !confirmed_member => self.confirmed.len() + 1,
            Some(false) if confirmed_member => self.confirmed.len() - 1,
            _ => self.confirmed.len(),
        }
    }

    /// True while a local change is not yet reflected by the store
    pub fn has_pending(&self) -> bool {
        self.overlay.is_some()
    }

    /// Replace the confirmed set with a store snapshot.
    ///
    /// The overlay is dropped once the snapshot agrees with it.
    pub fn apply_snapshot(&mut self, snapshot: &QuerySnapshot) -> Result<()> {
        self.confirmed = members_of(&snapshot.documents)?.into_iter().collect();
        if self.overlay == Some(self.confirmed.contains(&self.viewer)) {
            self.overlay = None;
        }
        Ok(())
    }

    /// Flip the viewer's membership locally.
    pub fn begin_toggle(&mut self) -> PendingToggle {
        let token = PendingToggle {
            previous: self.overlay,
        };
        self.overlay = Some(!self.is_member());
        token
    }

    /// Settle a toggle: keep the store's answer, or revert on failure.
    pub fn settle(&mut self, token: PendingToggle, outcome: &Result<ToggleOutcome>) {
        match outcome {
            Ok(outcome) => {
                let confirmed_member = self.confirmed.contains(&self.viewer);
                self.overlay = (outcome.active != confirmed_member).then_some(outcome.active);
            }
            Err(err) => {
                tracing::debug!(
                    content = %self.target,
                    kind = %self.kind,
                    error = %err,
                    "reverting optimistic toggle"
                );
                self.overlay = token.previous;
            }
        }
    }

    /// Toggle optimistically against the store.
    pub async fn toggle<E>(
        &mut self,
        aggregator: &EngagementAggregator,
        effects: &E,
    ) -> Result<ToggleOutcome>
    where
        E: DocumentStoreEffects + ?Sized,
    {
        let token = self.begin_toggle();
        let outcome = aggregator
            .toggle(effects, self.kind, self.viewer, &self.target)
            .await;
        self.settle(token, &outcome);
        outcome
    }
}
