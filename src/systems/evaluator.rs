//! Decision-epoch rules shared by choice tasks.
//!
//! The rules look at the epochs of the *previous* step: the agent's action
//! answers the observation it was shown, not the one that comes next.
//!
//! | previous step in decision? | action           | result                       |
//! |----------------------------|------------------|------------------------------|
//! | no                         | fixate           | running, 0                   |
//! | no                         | anything else    | aborted, `rewards.abort`     |
//! | yes                        | fixate           | running, 0                   |
//! | yes                        | a response       | correct / incorrect          |
//!
//! A decision epoch that elapses without a response is a miss; see
//! [`miss`].

use crate::systems::sdk::{Resolution, Rewards, TrialState, Verdict};
use crate::systems::timeline::ActiveEpochs;

/// Action layout of a discrete choice task.
#[derive(Clone, Copy, Debug)]
pub struct ChoiceRules {
    /// The no-op action that keeps fixation.
    pub fixate: usize,
    /// Epoch in which a response is accepted.
    pub decision_epoch: &'static str,
}

impl ChoiceRules {
    pub fn evaluate(
        &self,
        previous: ActiveEpochs<'_>,
        action: usize,
        answer: usize,
        rewards: &Rewards,
    ) -> Verdict {
        let in_decision = previous.contains(self.decision_epoch);
        match (in_decision, action == self.fixate) {
            (_, true) => Verdict::running(),
            (false, false) => Verdict { reward: rewards.abort, state: TrialState::Aborted },
            (true, false) if action == answer => Verdict {
                reward: rewards.correct,
                state: TrialState::Resolved(Resolution::Correct),
            },
            (true, false) => Verdict {
                reward: rewards.fail,
                state: TrialState::Resolved(Resolution::Incorrect),
            },
        }
    }
}

/// A decision epoch ran out with no response.
pub fn miss(rewards: &Rewards) -> Verdict {
    Verdict { reward: rewards.miss, state: TrialState::Resolved(Resolution::Miss) }
}

/// A trial without a choice ran its course.
pub fn no_decision() -> Verdict {
    Verdict { reward: 0.0, state: TrialState::Resolved(Resolution::NoDecision) }
}
