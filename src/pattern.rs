use std::fmt;

use crate::component::{FieldSet, Unit};
use crate::errors::CronError;
use crate::instant::{days_in_month, weekday_of, Instant};
use crate::{YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT};

// One parsed definition line: five mandatory field sets and an optional year.
// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schedule {
    minutes: FieldSet,  // -
    hours: FieldSet,    // --
    days: FieldSet,     // --- Each field resolved to its sorted
    months: FieldSet,   // --- set of permitted values
    weekdays: FieldSet, // --
    years: Option<FieldSet>, // - absent means any year in the supported window

    // Combine day-of-month and weekday with AND instead of OR
    dom_and_dow: bool,
}

impl Schedule {
    /// Builds a schedule from already parsed field sets.
    ///
    /// The five mandatory sets must use the standard domain of their unit.
    /// The year set may use any domain; resolution never leaves the
    /// supported year window regardless.
    ///
    /// # Examples
    ///
    /// ```
    /// use croncalc::component::{FieldSet, Unit};
    /// use croncalc::pattern::Schedule;
    ///
    /// let mut notes = Vec::new();
    /// let mut field = |unit, text| FieldSet::for_unit(unit, text, &mut notes).unwrap();
    /// let schedule = Schedule::new(
    ///     field(Unit::Minute, "0"),
    ///     field(Unit::Hour, "12"),
    ///     field(Unit::Day, "*"),
    ///     field(Unit::Month, "*"),
    ///     field(Unit::Weekday, "mon-fri"),
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(schedule.to_string(), "0 12 * * 1-5");
    /// ```
    pub fn new(
        minutes: FieldSet,
        hours: FieldSet,
        days: FieldSet,
        months: FieldSet,
        weekdays: FieldSet,
        years: Option<FieldSet>,
    ) -> Result<Self, CronError> {
        for (unit, set) in [
            (Unit::Minute, &minutes),
            (Unit::Hour, &hours),
            (Unit::Day, &days),
            (Unit::Month, &months),
            (Unit::Weekday, &weekdays),
        ] {
            let domain = unit.domain();
            if set.min() != domain.min || set.max() != domain.max {
                return Err(CronError::InvalidPattern(format!(
                    "The {unit} field must use the domain {}-{}, not {}-{}.",
                    domain.min,
                    domain.max,
                    set.min(),
                    set.max()
                )));
            }
        }

        Ok(Self {
            minutes,
            hours,
            days,
            months,
            weekdays,
            years,
            dom_and_dow: false,
        })
    }

    pub(crate) fn with_dom_and_dow(mut self, dom_and_dow: bool) -> Self {
        self.dom_and_dow = dom_and_dow;
        self
    }

    pub fn minutes(&self) -> &FieldSet {
        &self.minutes
    }

    pub fn hours(&self) -> &FieldSet {
        &self.hours
    }

    pub fn days(&self) -> &FieldSet {
        &self.days
    }

    pub fn months(&self) -> &FieldSet {
        &self.months
    }

    pub fn weekdays(&self) -> &FieldSet {
        &self.weekdays
    }

    pub fn years(&self) -> Option<&FieldSet> {
        self.years.as_ref()
    }

    pub fn dom_and_dow(&self) -> bool {
        self.dom_and_dow
    }

    /// Evaluates whether `instant` is one of the minutes this schedule fires at.
    ///
    /// Minute, hour, month and year must be members of their sets; the day is
    /// checked with [`Schedule::day_match`].
    pub fn matches(&self, instant: &Instant) -> bool {
        self.minutes.contains(instant.minute() as i32)
            && self.hours.contains(instant.hour() as i32)
            && self.months.contains(instant.month() as i32)
            && self.year_match(instant.year())
            && self.day_match(instant.year(), instant.month(), instant.day())
    }

    pub fn year_match(&self, year: i32) -> bool {
        let in_window = (YEAR_LOWER_LIMIT..=YEAR_UPPER_LIMIT).contains(&year);
        in_window && self.years.as_ref().map_or(true, |years| years.contains(year))
    }

    /// Checks a calendar day against the day-of-month and weekday fields.
    ///
    /// When both fields are restricted, the day qualifies if either matches
    /// (or both, in AND mode). When only one is restricted only that one
    /// applies, and when neither is every day qualifies.
    pub fn day_match(&self, year: i32, month: u32, day: u32) -> bool {
        let Some(weekday) = weekday_of(year, month, day) else {
            return false;
        };
        let dom_matches = self.days.contains(day as i32);
        let dow_matches = self.weekdays.contains(weekday as i32);

        match (self.days.is_wildcard(), self.weekdays.is_wildcard()) {
            (true, true) => true,
            (false, true) => dom_matches,
            (true, false) => dow_matches,
            (false, false) if self.dom_and_dow => dom_matches && dow_matches,
            (false, false) => dom_matches || dow_matches,
        }
    }

    // Predicate used while searching for a day. In AND mode with both fields
    // restricted, only the day of month gates the search and the weekday is
    // reconciled afterwards.
    pub(crate) fn day_candidate(&self, year: i32, month: u32, day: u32) -> bool {
        if day < 1 || day > days_in_month(year, month) {
            return false;
        }
        if self.needs_weekday_reconciliation() {
            return self.days.contains(day as i32);
        }
        self.day_match(year, month, day)
    }

    pub(crate) fn needs_weekday_reconciliation(&self) -> bool {
        self.dom_and_dow && !self.days.is_wildcard() && !self.weekdays.is_wildcard()
    }

    pub(crate) fn weekday_match(&self, weekday: u32) -> bool {
        self.weekdays.contains(weekday as i32)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minutes, self.hours, self.days, self.months, self.weekdays
        )?;
        if let Some(years) = &self.years {
            write!(f, " {years}")?;
        }
        Ok(())
    }
}
