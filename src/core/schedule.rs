use std::ops::{Index, IndexMut};

use crate::core::action::Action;

/// Anything the simulator can read a slot directive from.
///
/// [`None`] means «keep doing the previous action».
pub trait ScheduleSlot {
    fn explicit(&self) -> Option<Action>;
}

impl ScheduleSlot for Action {
    fn explicit(&self) -> Option<Action> {
        Some(*self)
    }
}

impl ScheduleSlot for Option<Action> {
    fn explicit(&self) -> Option<Action> {
        *self
    }
}

/// Sparse action sequence used during the search, one entry per slot.
///
/// Every slot owns its action by value: editing a slot never affects another one.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule(Vec<Option<Action>>);

impl Schedule {
    /// Schedule that inherits the initial action everywhere.
    pub fn inherit_all(n_slots: usize) -> Self {
        Self(vec![None; n_slots])
    }

    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<Action>] {
        &self.0
    }

    /// Number of slots with an explicit action.
    pub fn n_explicit(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_some()).count()
    }

    /// Replace the inherited slots by copies of the last explicit action.
    pub fn resolve(&self, initial_action: Action) -> Vec<Action> {
        self.0
            .iter()
            .scan(initial_action, |current, slot| {
                if let Some(action) = slot {
                    *current = *action;
                }
                Some(*current)
            })
            .collect()
    }
}

impl From<Vec<Option<Action>>> for Schedule {
    fn from(slots: Vec<Option<Action>>) -> Self {
        Self(slots)
    }
}

impl From<&[Action]> for Schedule {
    fn from(actions: &[Action]) -> Self {
        Self(actions.iter().copied().map(Some).collect())
    }
}

impl Index<usize> for Schedule {
    type Output = Option<Action>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Schedule {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}
