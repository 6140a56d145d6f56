//! # Croncalc
//!
//! Croncalc parses cron schedule definitions and resolves, relative to a
//! reference instant, the next or previous minute at which they fire, the
//! n-th occurrence in either direction, or every occurrence up to a bound.
//!
//! ## Features
//! - Parses five-field (and optional sixth year field) cron definitions,
//!   month and weekday names, steps, ranges and `@` mnemonics.
//! - Several definitions, one per line, form a union. Lines that fail to
//!   parse are skipped with a diagnostic instead of failing the whole set.
//! - Resolves occurrences forward and backward, respecting month lengths,
//!   leap years and the standard day-of-month OR weekday rule.
//! - Caches resolved occurrences per schedule set for its base time.
//! - Compatible with the `chrono` library for conversion from and to
//!   date-time types.
//!
//! ## Example
//!
//! ```rust
//! use croncalc::{Instant, Occurrence, ScheduleSet};
//!
//! // Every quarter of an hour during office hours on weekdays
//! let mut set: ScheduleSet = "*/15 9-17 * * mon-fri".parse().unwrap();
//! let set_base = Instant::new(2024, 1, 1, 9, 5).unwrap();
//! set = set.with_base_time(set_base);
//!
//! let next = set.resolve(Occurrence::Next).into_single();
//! assert_eq!(next, Some(Instant::new(2024, 1, 1, 9, 15).unwrap()));
//!
//! let previous = set.resolve(Occurrence::Previous).into_single();
//! assert_eq!(previous, Some(Instant::new(2024, 1, 1, 9, 0).unwrap()));
//! ```
//!
//! ## Pattern
//!
//! ```javascript
//! // ┌──────────────── minute (0 - 59)
//! // │ ┌────────────── hour (0 - 23)
//! // │ │ ┌──────────── day of month (1 - 31)
//! // │ │ │ ┌────────── month (1 - 12, JAN-DEC)
//! // │ │ │ │ ┌──────── day of week (0 - 6, SUN-SAT)
//! // │ │ │ │ │ ┌────── (optional) year (1970 - 2099)
//! // │ │ │ │ │ │
//! // * * * * * *
//! ```
//!
//! | Field        | Required | Allowed values  | Allowed special characters | Remarks                                                    |
//! | ------------ | -------- | --------------- | -------------------------- | ---------------------------------------------------------- |
//! | Minutes      | Yes      | 0-59            | * , - / ?                  |                                                            |
//! | Hours        | Yes      | 0-23            | * , - / ?                  |                                                            |
//! | Day of Month | Yes      | 1-31            | * , - / ?                  |                                                            |
//! | Month        | Yes      | 1-12 or JAN-DEC | * , - / ?                  | Full month names are accepted too                          |
//! | Day of Week  | Yes      | 0-7 or SUN-SAT  | * , - / ?                  | 0 to 6 are Sunday to Saturday, 7 is Sunday, the same as 0  |
//! | Year         | Optional | 1970-2099       | * , - / ?                  |                                                            |
//!
//! When both day of month and day of week are restricted, a day matches if
//! either does. [`parser::ScheduleParser`] can be configured to require both.
//!
//! Mnemonics: `@yearly` (`@annually`), `@monthly`, `@weekly`, `@daily`
//! (`@midnight`) and `@hourly`.

pub mod component;
pub mod errors;
pub mod instant;
pub mod iterator;
pub mod parser;
pub mod pattern;
pub mod resolver;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use strum::EnumIs;

pub use errors::{CronError, Diagnostic, DiagnosticKind, FieldError};
pub use instant::Instant;
pub use iterator::OccurrenceIterator;
pub use pattern::Schedule;
pub use resolver::OccurrenceResolver;

use parser::ScheduleParser;

/// The first year occurrences are searched in.
pub const YEAR_LOWER_LIMIT: i32 = 1970;
/// The last year occurrences are searched in.
pub const YEAR_UPPER_LIMIT: i32 = 2099;

/// Direction of an occurrence search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum Direction {
    Forward,
    Backward,
}

/// Which occurrence(s) a query asks for.
///
/// Offsets count from the nearest occurrence, which is offset 0. A reference
/// instant that matches is its own nearest occurrence in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum Occurrence {
    Next,
    Previous,
    NthFromNext(usize),
    NthFromPrevious(usize),
    /// Every occurrence strictly between the reference and the bound, in
    /// the order they are reached. Walks backward if the bound lies before
    /// the reference.
    UntilInstant(Instant),
}

impl Occurrence {
    /// The direction this query walks in from `reference`.
    pub fn direction(&self, reference: Instant) -> Direction {
        match self {
            Occurrence::Next | Occurrence::NthFromNext(_) => Direction::Forward,
            Occurrence::Previous | Occurrence::NthFromPrevious(_) => Direction::Backward,
            Occurrence::UntilInstant(bound) if *bound >= reference => Direction::Forward,
            Occurrence::UntilInstant(_) => Direction::Backward,
        }
    }
}

/// The answer to an [`Occurrence`] query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    Single(Option<Instant>),
    Many(Vec<Instant>),
}

impl Resolution {
    /// The single instant, or the first of many.
    pub fn into_single(self) -> Option<Instant> {
        match self {
            Resolution::Single(instant) => instant,
            Resolution::Many(instants) => instants.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<Instant> {
        match self {
            Resolution::Single(instant) => instant.into_iter().collect(),
            Resolution::Many(instants) => instants,
        }
    }
}

/// A union of schedules parsed from one or several definition lines, with
/// a base time its occurrence queries are anchored at.
///
/// Queries against the base time are memoized: the n-th occurrence in each
/// direction is resolved once and then served from a cache owned by this
/// instance. Queries against any other reference bypass the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSet {
    source: String,
    schedules: Vec<Schedule>,
    diagnostics: Vec<Diagnostic>,
    base_time: Instant,
    known: BTreeMap<i64, Instant>,
}

impl ScheduleSet {
    pub(crate) fn from_parts(
        source: String,
        schedules: Vec<Schedule>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            source,
            schedules,
            diagnostics,
            base_time: Instant::now(),
            known: BTreeMap::new(),
        }
    }

    /// Parses definition text with the default parser. The base time is the
    /// current local wall-clock time.
    ///
    /// # Errors
    ///
    /// - `CronError::EmptyPattern` if the text holds no definition at all.
    /// - `CronError::NoValidDefinitions` if every definition was rejected.
    pub fn parse(text: &str) -> Result<Self, CronError> {
        ScheduleParser::new().parse(text)
    }

    /// Parses an explicit list of definitions with the default parser.
    ///
    /// ```
    /// use croncalc::ScheduleSet;
    ///
    /// let set = ScheduleSet::from_lines(["0 9 * * 1-5", "0 10 * * 0,6"]).unwrap();
    /// assert_eq!(set.schedules().len(), 2);
    /// ```
    pub fn from_lines<I, S>(lines: I) -> Result<Self, CronError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ScheduleParser::new().parse_lines(lines)
    }

    /// Replaces the base time, discarding every cached occurrence.
    pub fn with_base_time(mut self, base_time: Instant) -> Self {
        self.base_time = base_time;
        self.known.clear();
        self
    }

    pub fn base_time(&self) -> Instant {
        self.base_time
    }

    /// The accepted definitions, one per line.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Notices and skipped-line warnings produced while parsing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True if `instant` matches at least one of the schedules.
    pub fn matches(&self, instant: &Instant) -> bool {
        self.schedules.iter().any(|schedule| schedule.matches(instant))
    }

    /// Finds the nearest occurrence from `from` in `direction`.
    ///
    /// # Parameters
    ///
    /// - `from`: The instant to search from.
    /// - `inclusive`: Whether `from` itself may be returned if it matches.
    /// - `direction`: Whether to search forward or backward in time.
    ///
    /// # Returns
    ///
    /// `None` when no occurrence exists inside the supported year window.
    ///
    /// # Examples
    ///
    /// ```
    /// use croncalc::{Direction, Instant, ScheduleSet};
    ///
    /// let set = ScheduleSet::parse("0 0 29 2 *").unwrap();
    /// let from = Instant::new(2023, 2, 1, 0, 0).unwrap();
    ///
    /// let next = set.find_occurrence(from, false, Direction::Forward);
    /// assert_eq!(next, Some(Instant::new(2024, 2, 29, 0, 0).unwrap()));
    /// ```
    pub fn find_occurrence(
        &self,
        from: Instant,
        inclusive: bool,
        direction: Direction,
    ) -> Option<Instant> {
        let from = if inclusive { from } else { from.step(direction)? };
        OccurrenceResolver::new(&self.schedules).find(from, direction)
    }

    /// Answers `occurrence` relative to the base time, serving and filling
    /// the occurrence cache.
    pub fn resolve(&mut self, occurrence: Occurrence) -> Resolution {
        let direction = occurrence.direction(self.base_time);
        let walk = OccurrenceIterator::cached(
            OccurrenceResolver::new(&self.schedules),
            self.base_time,
            direction,
            &mut self.known,
        );
        answer(occurrence, self.base_time, walk)
    }

    /// Answers `occurrence` relative to `reference`, without touching the
    /// cache.
    pub fn resolve_from(&self, reference: Instant, occurrence: Occurrence) -> Resolution {
        let walk = self.iter_from(reference, occurrence.direction(reference));
        answer(occurrence, reference, walk)
    }

    /// The nearest occurrence at or after the base time.
    pub fn next_occurrence(&mut self) -> Option<Instant> {
        self.resolve(Occurrence::Next).into_single()
    }

    /// The nearest occurrence at or before the base time.
    pub fn previous_occurrence(&mut self) -> Option<Instant> {
        self.resolve(Occurrence::Previous).into_single()
    }

    /// Creates an `OccurrenceIterator` starting from the specified instant.
    ///
    /// The iterator yields `start_from` first if it matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use croncalc::{Direction, Instant, ScheduleSet};
    ///
    /// let set = ScheduleSet::parse("0 12 * * sat,sun").unwrap();
    /// let start = Instant::new(2024, 1, 1, 0, 0).unwrap();
    ///
    /// let weekend: Vec<String> = set
    ///     .iter_from(start, Direction::Forward)
    ///     .take(3)
    ///     .map(|time| time.to_string())
    ///     .collect();
    /// assert_eq!(
    ///     weekend,
    ///     ["2024-01-06 12:00", "2024-01-07 12:00", "2024-01-13 12:00"]
    /// );
    /// ```
    pub fn iter_from(&self, start_from: Instant, direction: Direction) -> OccurrenceIterator<'_> {
        OccurrenceIterator::new(
            OccurrenceResolver::new(&self.schedules),
            start_from,
            true,
            direction,
        )
    }

    /// Creates an `OccurrenceIterator` that starts strictly after (or, going
    /// backward, strictly before) the specified instant.
    pub fn iter_after(&self, start_after: Instant, direction: Direction) -> OccurrenceIterator<'_> {
        OccurrenceIterator::new(
            OccurrenceResolver::new(&self.schedules),
            start_after,
            false,
            direction,
        )
    }
}

// Answers a query from the occurrences walked inclusively from `reference`.
fn answer(occurrence: Occurrence, reference: Instant, mut walk: OccurrenceIterator<'_>) -> Resolution {
    match occurrence {
        Occurrence::Next | Occurrence::Previous => Resolution::Single(walk.next()),
        Occurrence::NthFromNext(offset) | Occurrence::NthFromPrevious(offset) => {
            Resolution::Single(walk.nth(offset))
        }
        Occurrence::UntilInstant(bound) => {
            let direction = occurrence.direction(reference);
            let before_bound = |instant: &Instant| match direction {
                Direction::Forward => *instant < bound,
                Direction::Backward => *instant > bound,
            };
            let instants = walk
                .take_while(before_bound)
                .filter(|instant| *instant != reference)
                .collect();
            Resolution::Many(instants)
        }
    }
}

impl FromStr for ScheduleSet {
    type Err = CronError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for ScheduleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, schedule) in self.schedules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{schedule}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ScheduleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ScheduleSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScheduleSetVisitor;

        impl serde::de::Visitor<'_> for ScheduleSetVisitor {
            type Value = ScheduleSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a cron schedule definition")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ScheduleSet::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ScheduleSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Instant {
        Instant::new(year, month, day, hour, minute).unwrap()
    }

    fn set(pattern: &str, base_time: Instant) -> ScheduleSet {
        ScheduleSet::parse(pattern).unwrap().with_base_time(base_time)
    }

    #[test]
    fn test_is_time_matching() -> Result<(), CronError> {
        // This pattern is meant to match 9 am on the first day of January.
        let set = ScheduleSet::parse("0 9 1 1 *")?;
        assert!(set.matches(&at(2023, 1, 1, 9, 0)));
        assert!(!set.matches(&at(2023, 1, 1, 10, 0)));
        Ok(())
    }

    #[test]
    fn test_next_and_previous() {
        let mut set = set("*/15 9-17 * * 1-5", at(2024, 1, 1, 9, 5));
        assert_eq!(set.next_occurrence(), Some(at(2024, 1, 1, 9, 15)));
        assert_eq!(set.previous_occurrence(), Some(at(2024, 1, 1, 9, 0)));
    }

    #[test]
    fn test_nth_occurrence() {
        let mut set = set("0 * * * *", at(2024, 1, 1, 10, 30));
        assert_eq!(
            set.resolve(Occurrence::NthFromNext(0)).into_single(),
            Some(at(2024, 1, 1, 11, 0))
        );
        assert_eq!(
            set.resolve(Occurrence::NthFromNext(3)).into_single(),
            Some(at(2024, 1, 1, 14, 0))
        );
        assert_eq!(
            set.resolve(Occurrence::NthFromPrevious(2)).into_single(),
            Some(at(2024, 1, 1, 8, 0))
        );
    }

    #[test]
    fn test_cache_is_filled_and_cleared() {
        let mut set = set("0 * * * *", at(2024, 1, 1, 10, 30));
        set.resolve(Occurrence::NthFromNext(2));
        set.resolve(Occurrence::Previous);
        assert_eq!(set.known.len(), 4);
        assert_eq!(set.known.get(&2), Some(&at(2024, 1, 1, 13, 0)));
        assert_eq!(set.known.get(&-1), Some(&at(2024, 1, 1, 10, 0)));

        let set = set.with_base_time(at(2024, 6, 1, 0, 0));
        assert!(set.known.is_empty());
    }

    #[test]
    fn test_cache_serves_repeated_queries() {
        let mut set = set("0 * * * *", at(2024, 1, 1, 10, 30));
        let first = set.resolve(Occurrence::NthFromNext(5));
        let second = set.resolve(Occurrence::NthFromNext(5));
        assert_eq!(first, second);
        assert_eq!(set.known.len(), 6);
    }

    #[test]
    fn test_resolve_from_bypasses_cache() {
        let set = set("0 * * * *", at(2024, 1, 1, 10, 30));
        let next = set
            .resolve_from(at(2030, 1, 1, 10, 30), Occurrence::Next)
            .into_single();
        assert_eq!(next, Some(at(2030, 1, 1, 11, 0)));
        assert!(set.known.is_empty());
    }

    #[test]
    fn test_until_instant_forward() {
        let mut set = set("0 * * * *", at(2024, 1, 1, 10, 0));
        let hours = set
            .resolve(Occurrence::UntilInstant(at(2024, 1, 1, 13, 0)))
            .into_many();
        // The matching reference and the bound are both excluded.
        assert_eq!(hours, vec![at(2024, 1, 1, 11, 0), at(2024, 1, 1, 12, 0)]);
    }

    #[test]
    fn test_until_instant_backward() {
        let mut set = set("0 * * * *", at(2024, 1, 1, 10, 30));
        let hours = set
            .resolve(Occurrence::UntilInstant(at(2024, 1, 1, 7, 30)))
            .into_many();
        assert_eq!(
            hours,
            vec![at(2024, 1, 1, 10, 0), at(2024, 1, 1, 9, 0), at(2024, 1, 1, 8, 0)]
        );
    }

    #[test]
    fn test_until_instant_without_occurrences() {
        let mut set = set("0 0 1 1 *", at(2024, 1, 2, 0, 0));
        assert_eq!(
            set.resolve(Occurrence::UntilInstant(at(2024, 6, 1, 0, 0))),
            Resolution::Many(Vec::new())
        );
        assert_eq!(
            set.resolve(Occurrence::UntilInstant(at(2024, 1, 2, 0, 0))),
            Resolution::Many(Vec::new())
        );
    }

    #[test]
    fn test_find_occurrence_edge_case_inclusive() {
        let set = ScheduleSet::parse("0 0 * * *").unwrap();
        let midnight = at(2023, 1, 1, 0, 0);
        assert_eq!(
            set.find_occurrence(midnight, true, Direction::Forward),
            Some(midnight)
        );
    }

    #[test]
    fn test_find_occurrence_edge_case_exclusive() {
        let set = ScheduleSet::parse("0 0 * * *").unwrap();
        let midnight = at(2023, 1, 1, 0, 0);
        assert_eq!(
            set.find_occurrence(midnight, false, Direction::Forward),
            Some(at(2023, 1, 2, 0, 0))
        );
        assert_eq!(
            set.find_occurrence(midnight, false, Direction::Backward),
            Some(at(2022, 12, 31, 0, 0))
        );
    }

    #[test]
    fn test_display_renders_canonical_lines() {
        let set = ScheduleSet::parse("@weekly\n 5/15  */6 * jan-mar sun-mon ").unwrap();
        assert_eq!(set.to_string(), "0 0 * * 0\n5-59/15 */6 * 1-3 0-1");
        assert!(set.source().starts_with("@weekly"));
    }

    #[test]
    fn test_resolution_conversions() {
        let instant = at(2024, 1, 1, 0, 0);
        assert_eq!(Resolution::Single(Some(instant)).into_many(), vec![instant]);
        assert_eq!(Resolution::Single(None).into_many(), Vec::<Instant>::new());
        assert_eq!(Resolution::Many(vec![instant]).into_single(), Some(instant));
    }
}
