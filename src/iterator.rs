use std::collections::BTreeMap;

use crate::{instant::Instant, resolver::OccurrenceResolver, Direction};

/// Lazily yields the occurrences of a schedule set, one minute-resolution
/// instant at a time, in either direction.
///
/// The sequence is strictly monotonic and ends once the supported year
/// window is exhausted.
#[derive(Debug)]
pub struct OccurrenceIterator<'a> {
    resolver: OccurrenceResolver<'a>,
    current_time: Option<Instant>,
    is_first: bool,
    inclusive: bool,
    direction: Direction,

    // Offset cache of the owning schedule set, only present when iterating
    // inclusively from its base time.
    known: Option<&'a mut BTreeMap<i64, Instant>>,
    index: usize,
}

impl<'a> OccurrenceIterator<'a> {
    /// Creates a new `OccurrenceIterator`.
    ///
    /// # Arguments
    ///
    /// * `resolver` - The resolver of the schedule set to iterate.
    /// * `start_time` - The instant to start iterating from.
    /// * `inclusive` - Whether `start_time` should be yielded if it matches.
    /// * `direction` - The direction to iterate in (Forward or Backward).
    pub fn new(
        resolver: OccurrenceResolver<'a>,
        start_time: Instant,
        inclusive: bool,
        direction: Direction,
    ) -> Self {
        OccurrenceIterator {
            resolver,
            current_time: Some(start_time),
            is_first: true,
            inclusive,
            direction,
            known: None,
            index: 0,
        }
    }

    // Iterates inclusively from a base time, reading and filling `known`.
    pub(crate) fn cached(
        resolver: OccurrenceResolver<'a>,
        base_time: Instant,
        direction: Direction,
        known: &'a mut BTreeMap<i64, Instant>,
    ) -> Self {
        let mut iterator = Self::new(resolver, base_time, true, direction);
        iterator.known = Some(known);
        iterator
    }
}

/// Cache key of the `index`-th occurrence from the base time: forward
/// offsets map to `0, 1, 2, ...`, backward offsets to `-1, -2, -3, ...`.
pub(crate) fn cache_key(direction: Direction, index: usize) -> i64 {
    let index = i64::try_from(index).unwrap_or(i64::MAX - 1);
    match direction {
        Direction::Forward => index,
        Direction::Backward => -index - 1,
    }
}

impl Iterator for OccurrenceIterator<'_> {
    type Item = Instant;

    fn next(&mut self) -> Option<Self::Item> {
        let mut from = self.current_time.take()?;

        // Only the first search may land on the start time itself.
        if self.is_first {
            self.is_first = false;
            if !self.inclusive {
                from = from.step(self.direction)?;
            }
        }

        let key = cache_key(self.direction, self.index);
        let cached = self.known.as_deref().and_then(|known| known.get(&key).copied());
        let found = match cached {
            Some(found) => found,
            None => {
                let found = self.resolver.find(from, self.direction)?;
                if let Some(known) = self.known.as_deref_mut() {
                    known.insert(key, found);
                }
                found
            }
        };

        self.index += 1;
        self.current_time = found.step(self.direction);
        Some(found)
    }
}
