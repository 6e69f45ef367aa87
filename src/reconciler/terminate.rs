//! Termination path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{Entity, LIFE_STATUS, TERMINATED};
use crate::error::ReconcileResult;
use crate::policy::Compatibility;
use crate::value::TimedValue;

use super::Reconciler;

/// Staged display title; checked by the policy but never persisted.
const NEW_TITLE: &str = "new_title";

/// What [`Reconciler::terminate`] did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminateOutcome {
    /// The entity was marked terminated and persisted.
    Terminated(Entity),

    /// The entity already was terminated. Nothing written.
    AlreadyTerminated,

    /// The termination date is not after the entity's last known state, or a
    /// later status supersedes it. Nothing written.
    Stale,

    /// The policy rejected the staged termination. Nothing written.
    Rejected,
}

impl TerminateOutcome {
    /// True if a write happened.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl Reconciler {
    /// Marks `existing` as terminated as of `date`.
    ///
    /// Terminating an already terminated entity, or one whose source date or
    /// latest dated `lifeStatus` is not strictly before `date`, is a no-op
    /// rather than an error. Undated entities can always be terminated.
    ///
    /// # Errors
    ///
    /// `Storage` if persisting the terminated entity fails.
    pub fn terminate(
        &self,
        existing: &Entity,
        source: &str,
        date: DateTime<Utc>,
    ) -> ReconcileResult<TerminateOutcome> {
        if existing.is_terminated() {
            debug!(id = %existing.id, "entity already terminated");
            return Ok(TerminateOutcome::AlreadyTerminated);
        }
        if last_known_state(existing).is_some_and(|d| d >= date) {
            debug!(id = %existing.id, %date, "termination not newer than last known state");
            return Ok(TerminateOutcome::Stale);
        }

        let display_title = format!(
            "{} - Terminated on {}",
            existing.title(),
            date.format("%Y-%m-%d")
        );
        let mut staged = existing.clone();
        staged.set_attribute(LIFE_STATUS, TimedValue::text(TERMINATED, source, Some(date)));
        staged.set_attribute(NEW_TITLE, TimedValue::text(display_title, source, Some(date)));

        let Compatibility::Compatible(mut accepted) = self.policy.check(existing, &staged) else {
            debug!(id = %existing.id, policy = self.policy.name(), "termination rejected by policy");
            return Ok(TerminateOutcome::Rejected);
        };
        accepted.remove_attribute(NEW_TITLE);
        if !accepted.is_terminated() {
            debug!(id = %accepted.id, %date, "termination superseded by a later status");
            return Ok(TerminateOutcome::Stale);
        }

        info!(id = %accepted.id, title = accepted.title(), %date, "terminating entity");
        self.entities.update(accepted.clone())?;
        Ok(TerminateOutcome::Terminated(accepted))
    }
}

/// Most recent date the entity's own state is known at: its source date or
/// its latest dated `lifeStatus`.
fn last_known_state(entity: &Entity) -> Option<DateTime<Utc>> {
    let status = entity
        .attribute(LIFE_STATUS)
        .and_then(|a| a.values().iter().filter_map(|v| v.date).max());
    entity.source_date.max(status)
}
