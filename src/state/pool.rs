use std::collections::VecDeque;

use rand::{Rng, seq::SliceRandom};

use crate::{error::SessionError, state::game::Entity};

/// Entities of one game, split between the ones still to be found (the head
/// being the current one) and the ones already guessed.
#[derive(Debug, Clone, Default)]
pub struct EntityPool {
    remaining: VecDeque<Entity>,
    guessed: Vec<Entity>,
}

impl EntityPool {
    /// Empty pool, waiting for [`EntityPool::initialize`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the pool to a uniformly shuffled copy of `entities`.
    pub fn initialize<R>(&mut self, entities: &[Entity], rng: &mut R) -> Result<(), SessionError>
    where
        R: Rng + ?Sized,
    {
        if entities.is_empty() {
            return Err(SessionError::Config(
                "cannot start a game without entities".into(),
            ));
        }

        let mut order = entities.to_vec();
        order.shuffle(rng);
        self.remaining = order.into();
        self.guessed.clear();
        Ok(())
    }

    /// Drop every entity, used when a game is discarded.
    pub fn clear(&mut self) {
        self.remaining.clear();
        self.guessed.clear();
    }

    /// Entity players currently have to name.
    pub fn current(&self) -> Option<&Entity> {
        self.remaining.front()
    }

    /// Move the current entity to the guessed partition.
    pub fn mark_current_guessed(&mut self) -> Result<(), SessionError> {
        let entity = self
            .remaining
            .pop_front()
            .ok_or(SessionError::InvariantViolation(
                "marking an entity guessed on an exhausted pool",
            ))?;
        self.guessed.push(entity);
        Ok(())
    }

    /// Rotate the current entity to the back of the queue.
    ///
    /// Skipping the only remaining entity is a no-op.
    pub fn skip_current(&mut self) {
        if self.remaining.len() > 1 {
            self.remaining.rotate_left(1);
        }
    }

    /// Whether every entity has been guessed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Number of entities still to be found.
    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    /// Entities found so far, in the order they were guessed.
    pub fn guessed(&self) -> &[Entity] {
        &self.guessed
    }

    /// Size of the game, whatever the progress.
    pub fn total(&self) -> usize {
        self.remaining.len() + self.guessed.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn entities(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|index| Entity::new(format!("E{index}"), format!("Entity {index}")))
            .collect()
    }

    #[test]
    fn initialize_rejects_empty_dataset() {
        let mut pool = EntityPool::new();
        let mut rng = StdRng::seed_from_u64(7);
        let err = pool.initialize(&[], &mut rng).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(pool.is_exhausted());
    }

    #[test]
    fn initialize_keeps_every_entity() {
        let mut pool = EntityPool::new();
        let mut rng = StdRng::seed_from_u64(7);
        let dataset = entities(10);
        pool.initialize(&dataset, &mut rng).unwrap();

        assert_eq!(pool.total(), 10);
        assert_eq!(pool.remaining_len(), 10);
        let mut ids: Vec<_> = pool.remaining.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        let mut expected: Vec<_> = dataset.iter().map(|e| e.id.clone()).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn marking_guessed_preserves_total() {
        let mut pool = EntityPool::new();
        let mut rng = StdRng::seed_from_u64(1);
        pool.initialize(&entities(3), &mut rng).unwrap();

        let first = pool.current().cloned().unwrap();
        pool.mark_current_guessed().unwrap();
        assert_eq!(pool.guessed(), &[first]);
        assert_eq!(pool.remaining_len() + pool.guessed().len(), 3);

        pool.mark_current_guessed().unwrap();
        pool.mark_current_guessed().unwrap();
        assert!(pool.is_exhausted());
        assert_eq!(pool.total(), 3);
        assert!(pool.current().is_none());
    }

    #[test]
    fn marking_guessed_on_exhausted_pool_is_an_invariant_violation() {
        let mut pool = EntityPool::new();
        let err = pool.mark_current_guessed().unwrap_err();
        assert!(matches!(err, SessionError::InvariantViolation(_)));
    }

    #[test]
    fn skip_rotates_head_to_tail() {
        let mut pool = EntityPool::new();
        let mut rng = StdRng::seed_from_u64(3);
        pool.initialize(&entities(3), &mut rng).unwrap();

        let before: Vec<_> = pool.remaining.iter().cloned().collect();
        pool.skip_current();
        let after: Vec<_> = pool.remaining.iter().cloned().collect();
        assert_eq!(after, vec![before[1].clone(), before[2].clone(), before[0].clone()]);
        assert!(pool.guessed().is_empty());
    }

    #[test]
    fn skip_single_entity_is_noop() {
        let mut pool = EntityPool::new();
        let mut rng = StdRng::seed_from_u64(3);
        pool.initialize(&entities(1), &mut rng).unwrap();
        let current = pool.current().cloned();
        pool.skip_current();
        assert_eq!(pool.current().cloned(), current);
        assert_eq!(pool.remaining_len(), 1);
    }

    #[test]
    fn shuffle_is_uniform() {
        let dataset = entities(3);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let trials = 60_000;
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();

        for _ in 0..trials {
            let mut pool = EntityPool::new();
            pool.initialize(&dataset, &mut rng).unwrap();
            let order = pool.remaining.iter().map(|e| e.id.clone()).collect();
            *counts.entry(order).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        let expected = trials / 6;
        for (order, count) in counts {
            assert!(
                count.abs_diff(expected) < 600,
                "permutation {order:?} drawn {count} times, expected about {expected}"
            );
        }
    }
}
