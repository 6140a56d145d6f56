//! Occurrence search by carry propagation.
//!
//! The search keeps a cursor of calendar fields, starting at the reference
//! instant, and settles the fields from the most significant (year) to the
//! least significant (minute). Settling a field either leaves it alone,
//! moves it to the nearest permitted value (resetting every lower field to
//! its extreme), or carries into the next higher field when no permitted
//! value is left, after which settling restarts from the year.
//!
//! The cursor is allowed to hold out-of-range values (minute 60, day 0,
//! month 13, ...) right after a carry; the next settle of that field finds
//! no permitted value and carries again.

use crate::instant::{days_in_month, Instant};
use crate::pattern::Schedule;
use crate::{Direction, YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT};

/// Upper bound on day-by-day steps spent matching the weekday when day of
/// month and weekday are combined with AND.
pub const MAX_WEEKDAY_RECONCILIATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeComponent {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl TimeComponent {
    const SETTLE_ORDER: [TimeComponent; 5] = [
        TimeComponent::Year,
        TimeComponent::Month,
        TimeComponent::Day,
        TimeComponent::Hour,
        TimeComponent::Minute,
    ];

    fn higher(self) -> Option<TimeComponent> {
        match self {
            TimeComponent::Year => None,
            TimeComponent::Month => Some(TimeComponent::Year),
            TimeComponent::Day => Some(TimeComponent::Month),
            TimeComponent::Hour => Some(TimeComponent::Day),
            TimeComponent::Minute => Some(TimeComponent::Hour),
        }
    }
}

// Outcome of settling one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Stable,
    Moved,
    Carried,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    year: i32,
    month: i32,
    day: i32,
    hour: i32,
    minute: i32,
}

impl Cursor {
    fn new(instant: &Instant) -> Self {
        Self {
            year: instant.year(),
            month: instant.month() as i32,
            day: instant.day() as i32,
            hour: instant.hour() as i32,
            minute: instant.minute() as i32,
        }
    }

    fn get(&self, component: TimeComponent) -> i32 {
        match component {
            TimeComponent::Year => self.year,
            TimeComponent::Month => self.month,
            TimeComponent::Day => self.day,
            TimeComponent::Hour => self.hour,
            TimeComponent::Minute => self.minute,
        }
    }

    fn set(&mut self, component: TimeComponent, value: i32) {
        match component {
            TimeComponent::Year => self.year = value,
            TimeComponent::Month => self.month = value,
            TimeComponent::Day => self.day = value,
            TimeComponent::Hour => self.hour = value,
            TimeComponent::Minute => self.minute = value,
        }
    }

    // Resets every field below `component` to the first value that can be
    // reached in `direction`. Backward days start at 31 and are clamped to
    // the month length when the day is settled.
    fn reset_below(&mut self, component: TimeComponent, direction: Direction) {
        let forward = direction.is_forward();
        let resets = [
            (TimeComponent::Month, if forward { 1 } else { 12 }),
            (TimeComponent::Day, if forward { 1 } else { 31 }),
            (TimeComponent::Hour, if forward { 0 } else { 23 }),
            (TimeComponent::Minute, if forward { 0 } else { 59 }),
        ];
        for (lower, value) in resets {
            if lower as u8 > component as u8 {
                self.set(lower, value);
            }
        }
    }

    // Sets `component` and resets the fields below it.
    fn move_to(&mut self, component: TimeComponent, value: i32, direction: Direction) {
        self.set(component, value);
        self.reset_below(component, direction);
    }

    // Steps the field above `component` by one, without normalising it.
    fn carry(&mut self, component: TimeComponent, direction: Direction) -> Settle {
        let Some(higher) = component.higher() else {
            return Settle::Exhausted;
        };
        let step = if direction.is_forward() { 1 } else { -1 };
        self.set(higher, self.get(higher) + step);
        self.reset_below(higher, direction);
        Settle::Carried
    }

    fn to_instant(self) -> Option<Instant> {
        Instant::new(
            self.year,
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
        )
        .ok()
    }
}

/// Finds the nearest matching instant of a union of schedules.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceResolver<'a> {
    schedules: &'a [Schedule],
}

impl<'a> OccurrenceResolver<'a> {
    pub fn new(schedules: &'a [Schedule]) -> Self {
        Self { schedules }
    }

    /// Finds the nearest instant at or after (`Forward`) or at or before
    /// (`Backward`) `from` that matches any of the schedules.
    ///
    /// Every schedule is resolved independently from the same reference and
    /// the earliest (forward) or latest (backward) result wins. Returns
    /// `None` when no schedule has an occurrence inside the supported year
    /// window.
    pub fn find(&self, from: Instant, direction: Direction) -> Option<Instant> {
        let candidates = self
            .schedules
            .iter()
            .filter_map(|schedule| find_for_schedule(schedule, from, direction));

        match direction {
            Direction::Forward => candidates.min(),
            Direction::Backward => candidates.max(),
        }
    }
}

fn find_for_schedule(schedule: &Schedule, from: Instant, direction: Direction) -> Option<Instant> {
    let mut cursor = Cursor::new(&from);
    let mut reconciliations = 0;

    loop {
        settle_all(schedule, &mut cursor, direction)?;

        if schedule.needs_weekday_reconciliation() {
            let candidate = cursor.to_instant()?;
            if !schedule.weekday_match(candidate.weekday()) {
                reconciliations += 1;
                if reconciliations > MAX_WEEKDAY_RECONCILIATIONS {
                    log::debug!(
                        "Gave up reconciling the weekday of '{schedule}' after \
                         {MAX_WEEKDAY_RECONCILIATIONS} attempts"
                    );
                    return None;
                }
                // Step a whole day and search again.
                cursor.carry(TimeComponent::Hour, direction);
                continue;
            }
        }

        return cursor.to_instant();
    }
}

// Settles every field; `None` once the year window is exhausted.
fn settle_all(schedule: &Schedule, cursor: &mut Cursor, direction: Direction) -> Option<()> {
    'restart: loop {
        for component in TimeComponent::SETTLE_ORDER {
            match settle(schedule, cursor, component, direction) {
                Settle::Stable | Settle::Moved => {}
                Settle::Carried => continue 'restart,
                Settle::Exhausted => return None,
            }
        }
        return Some(());
    }
}

fn settle(
    schedule: &Schedule,
    cursor: &mut Cursor,
    component: TimeComponent,
    direction: Direction,
) -> Settle {
    let current = cursor.get(component);
    let target = match component {
        TimeComponent::Year => nearest_year(schedule, current, direction),
        TimeComponent::Month => nearest(schedule.months().values(), current, direction),
        TimeComponent::Day => nearest_day(schedule, cursor, direction),
        TimeComponent::Hour => nearest(schedule.hours().values(), current, direction),
        TimeComponent::Minute => nearest(schedule.minutes().values(), current, direction),
    };

    match target {
        Some(value) if value == current => Settle::Stable,
        Some(value) => {
            cursor.move_to(component, value, direction);
            Settle::Moved
        }
        None => cursor.carry(component, direction),
    }
}

fn nearest(values: &[u16], current: i32, direction: Direction) -> Option<i32> {
    match direction {
        Direction::Forward => values.iter().map(|&v| i32::from(v)).find(|&v| v >= current),
        Direction::Backward => values.iter().rev().map(|&v| i32::from(v)).find(|&v| v <= current),
    }
}

fn nearest_year(schedule: &Schedule, current: i32, direction: Direction) -> Option<i32> {
    let year = match (direction, schedule.years()) {
        (Direction::Forward, Some(years)) => years.next_at_or_after(current.max(YEAR_LOWER_LIMIT)),
        (Direction::Backward, Some(years)) => years.prev_at_or_before(current.min(YEAR_UPPER_LIMIT)),
        (Direction::Forward, None) => Some(current.max(YEAR_LOWER_LIMIT)),
        (Direction::Backward, None) => Some(current.min(YEAR_UPPER_LIMIT)),
    };
    year.filter(|year| (YEAR_LOWER_LIMIT..=YEAR_UPPER_LIMIT).contains(year))
}

// Scans the days of the cursor's month, skipping days that do not exist in
// that month and days the schedule rules out.
fn nearest_day(schedule: &Schedule, cursor: &Cursor, direction: Direction) -> Option<i32> {
    let Ok(month) = u32::try_from(cursor.month) else {
        return None;
    };
    let last = days_in_month(cursor.year, month) as i32;
    let qualifies = |day: &i32| schedule.day_candidate(cursor.year, month, *day as u32);

    match direction {
        Direction::Forward => (cursor.day.max(1)..=last).find(qualifies),
        Direction::Backward => (1..=cursor.day.min(last)).rev().find(qualifies),
    }
}
