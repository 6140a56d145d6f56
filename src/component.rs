use std::fmt;

use strum::{Display, EnumIter};

use crate::errors::{DiagnosticKind, FieldError};
use crate::{YEAR_LOWER_LIMIT, YEAR_UPPER_LIMIT};

const MONTH_ALIASES: &[(&str, u16)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const WEEKDAY_ALIASES: &[(&str, u16)] = &[
    ("sun", 0),
    ("mon", 1),
    ("tue", 2),
    ("wed", 3),
    ("thu", 4),
    ("fri", 5),
    ("sat", 6),
    ("sunday", 0),
    ("monday", 1),
    ("tuesday", 2),
    ("wednesday", 3),
    ("thursday", 4),
    ("friday", 5),
    ("saturday", 6),
];

/// The calendar unit a field describes, in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Unit {
    Minute,
    Hour,
    Day,
    Month,
    Weekday,
    Year,
}

impl Unit {
    /// The standard domain of this unit. Weekdays run 0-6 with Sunday as 0,
    /// years are bounded by the supported window.
    pub fn domain(self) -> Domain {
        match self {
            Unit::Minute => Domain::new(self, 0, 59),
            Unit::Hour => Domain::new(self, 0, 23),
            Unit::Day => Domain::new(self, 1, 31),
            Unit::Month => Domain::new(self, 1, 12).with_aliases(MONTH_ALIASES),
            Unit::Weekday => Domain::new(self, 0, 6).with_aliases(WEEKDAY_ALIASES),
            Unit::Year => Domain::new(self, YEAR_LOWER_LIMIT as u16, YEAR_UPPER_LIMIT as u16),
        }
    }
}

/// The permitted values and names for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    pub unit: Unit,
    pub min: u16,
    pub max: u16,
    aliases: &'static [(&'static str, u16)],
}

impl Domain {
    pub fn new(unit: Unit, min: u16, max: u16) -> Self {
        Self {
            unit,
            min,
            max,
            aliases: &[],
        }
    }

    pub fn with_aliases(mut self, aliases: &'static [(&'static str, u16)]) -> Self {
        self.aliases = aliases;
        self
    }

    fn alias(&self, name: &str) -> Option<u16> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|&(_, value)| value)
    }
}

/// The base of a stepped element: either the whole domain (`*/K`) or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepBase {
    All,
    Range(u16, u16),
}

/// One comma-separated element of a field, as written (after alias
/// substitution and clamping), before expansion into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSpec {
    All,
    Single(u16),
    Range(u16, u16),
    Step { base: StepBase, increment: u16 },
}

impl FieldSpec {
    fn expand(&self, domain: &Domain, into: &mut Vec<u16>) {
        match *self {
            FieldSpec::All => into.extend(domain.min..=domain.max),
            FieldSpec::Single(value) => into.push(value),
            FieldSpec::Range(start, end) => into.extend(start..=end),
            FieldSpec::Step { base, increment } => {
                let (start, end) = match base {
                    StepBase::All => (domain.min, domain.max),
                    StepBase::Range(start, end) => (start, end),
                };
                into.extend((start..=end).step_by(increment as usize));
            }
        }
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::All => write!(f, "*"),
            FieldSpec::Single(value) => write!(f, "{value}"),
            FieldSpec::Range(start, end) => write!(f, "{start}-{end}"),
            FieldSpec::Step {
                base: StepBase::All,
                increment,
            } => write!(f, "*/{increment}"),
            FieldSpec::Step {
                base: StepBase::Range(start, end),
                increment,
            } => write!(f, "{start}-{end}/{increment}"),
        }
    }
}

/// The resolved, sorted and duplicate-free set of permitted values of one
/// field, together with the elements it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSet {
    domain_min: u16,
    domain_max: u16,
    elements: Vec<FieldSpec>,
    values: Vec<u16>,
}

impl FieldSet {
    /// Parses one field of a definition against `domain`.
    ///
    /// The grammar is a comma-separated list of `*`, `N`, `N-M`, `*/K`,
    /// `N-M/K` and `N/K`, where any number may be replaced by a name from
    /// the domain's alias table and `?` is a synonym for `*`. Advisory
    /// rewrites (Sunday written as 7, clamped range endpoints) are pushed
    /// to `notes`.
    ///
    /// Single values outside the domain are rejected, while range endpoints
    /// outside the domain are clamped to it.
    pub fn parse(
        field: &str,
        domain: Domain,
        notes: &mut Vec<DiagnosticKind>,
    ) -> Result<FieldSet, FieldError> {
        let mut text = substitute_aliases(&field.replace('?', "*"), &domain)?;

        if domain.unit == Unit::Weekday {
            let normalized = normalize_weekdays(&text);
            if normalized != text {
                notes.push(DiagnosticKind::NormalizedWeekday {
                    from: field.to_string(),
                    to: normalized.clone(),
                });
                text = normalized;
            }
        }

        let mut elements = Vec::new();
        for item in text.split(',') {
            elements.push(parse_item(item.trim(), &domain, notes)?);
        }

        let mut values = Vec::new();
        for element in &elements {
            element.expand(&domain, &mut values);
        }
        values.sort_unstable();
        values.dedup();

        Ok(FieldSet {
            domain_min: domain.min,
            domain_max: domain.max,
            elements,
            values,
        })
    }

    /// Parses a field using the standard domain of `unit`.
    pub fn for_unit(
        unit: Unit,
        field: &str,
        notes: &mut Vec<DiagnosticKind>,
    ) -> Result<FieldSet, FieldError> {
        Self::parse(field, unit.domain(), notes)
    }

    /// The unexpanded elements, in the order they were written.
    pub fn elements(&self) -> &[FieldSpec] {
        &self.elements
    }

    /// The permitted values, ascending.
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    pub fn min(&self) -> u16 {
        self.domain_min
    }

    pub fn max(&self) -> u16 {
        self.domain_max
    }

    /// True when the field was written as a bare `*` (or `?`), meaning it
    /// does not restrict its unit.
    pub fn is_wildcard(&self) -> bool {
        self.elements == [FieldSpec::All]
    }

    pub fn contains(&self, value: i32) -> bool {
        u16::try_from(value).is_ok_and(|value| self.values.binary_search(&value).is_ok())
    }

    /// The smallest permitted value that is `>= value`.
    pub fn next_at_or_after(&self, value: i32) -> Option<i32> {
        let index = self.values.partition_point(|&v| i32::from(v) < value);
        self.values.get(index).map(|&v| i32::from(v))
    }

    /// The largest permitted value that is `<= value`.
    pub fn prev_at_or_before(&self, value: i32) -> Option<i32> {
        let index = self.values.partition_point(|&v| i32::from(v) <= value);
        index
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
            .map(|&v| i32::from(v))
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

// Replaces every alphabetic run with the numeric value of its alias.
fn substitute_aliases(field: &str, domain: &Domain) -> Result<String, FieldError> {
    let mut replaced = String::with_capacity(field.len());
    let mut rest = field;

    while let Some(start) = rest.find(|c: char| c.is_ascii_alphabetic()) {
        replaced.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let word = &tail[..end];

        let mut value = domain
            .alias(word)
            .ok_or_else(|| FieldError::InvalidSymbol(word.to_string()))?;
        // Sunday closing a range is 7, so that SAT-SUN stays ascending.
        // A range opened on Sunday keeps it at 0.
        if value == 0
            && domain.unit == Unit::Weekday
            && range_starts_on_sunday(&replaced) == Some(false)
        {
            value = 7;
        }
        replaced.push_str(&value.to_string());
        rest = &tail[end..];
    }
    replaced.push_str(rest);

    Ok(replaced)
}

// For text ending in `-`, whether the range it opens starts on Sunday.
fn range_starts_on_sunday(replaced: &str) -> Option<bool> {
    let head = replaced.strip_suffix('-')?;
    let digits = head.len()
        - head
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .len();
    let start = &head[head.len() - digits..];
    Some(start.parse::<u32>() == Ok(0))
}

// Rewrites Sunday-as-7 into 0: `7` -> `0`, `N-7` -> `N-6,0`, `6-7` -> `6,0`.
// Stepped items are left alone; their endpoints are clamped instead.
fn normalize_weekdays(field: &str) -> String {
    let is_seven = |s: &str| s.parse::<u32>() == Ok(7);
    field
        .split(',')
        .map(|item| {
            if item.contains('/') {
                return item.to_string();
            }
            match item.split_once('-') {
                None if is_seven(item) => "0".to_string(),
                Some((start, end)) if is_seven(end) => {
                    if is_seven(start) {
                        "0".to_string()
                    } else if start.parse::<u32>() == Ok(6) {
                        "6,0".to_string()
                    } else {
                        format!("{start}-6,0")
                    }
                }
                _ => item.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_item(
    item: &str,
    domain: &Domain,
    notes: &mut Vec<DiagnosticKind>,
) -> Result<FieldSpec, FieldError> {
    if item.is_empty() {
        return Err(FieldError::Empty);
    }

    if let (Some(range_pos), Some(step_pos)) = (item.find('-'), item.find('/')) {
        if step_pos < range_pos {
            return Err(FieldError::InvalidOrder);
        }
    }

    if let Some((base, increment)) = item.split_once('/') {
        let increment = parse_increment(increment)?;
        let base = if base == "*" {
            StepBase::All
        } else if let Some((start, end)) = base.split_once('-') {
            let (start, end) = clamped_range(parse_number(start)?, parse_number(end)?, domain, notes)?;
            StepBase::Range(start, end)
        } else {
            let start = parse_number(base)?;
            let (start, end) = clamped_range(start, u32::from(domain.max), domain, notes)?;
            StepBase::Range(start, end)
        };
        return Ok(FieldSpec::Step { base, increment });
    }

    if item == "*" {
        return Ok(FieldSpec::All);
    }

    if let Some((start, end)) = item.split_once('-') {
        let (start, end) = clamped_range(parse_number(start)?, parse_number(end)?, domain, notes)?;
        return Ok(FieldSpec::Range(start, end));
    }

    let value = parse_number(item)?;
    if value < u32::from(domain.min) || value > u32::from(domain.max) {
        return Err(FieldError::OutOfBounds {
            value,
            min: domain.min,
            max: domain.max,
        });
    }
    Ok(FieldSpec::Single(value as u16))
}

fn parse_number(text: &str) -> Result<u32, FieldError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::InvalidSymbol(text.to_string()));
    }
    text.parse::<u32>()
        .map_err(|_| FieldError::InvalidSymbol(text.to_string()))
}

fn parse_increment(text: &str) -> Result<u16, FieldError> {
    match parse_number(text) {
        Ok(0) | Err(_) => Err(FieldError::InvalidIncrement(text.to_string())),
        Ok(step) => Ok(u16::try_from(step).unwrap_or(u16::MAX)),
    }
}

// Raises a low start to the domain minimum and lowers a high end to the
// domain maximum. A range that is still reversed afterwards is rejected.
fn clamped_range(
    start: u32,
    end: u32,
    domain: &Domain,
    notes: &mut Vec<DiagnosticKind>,
) -> Result<(u16, u16), FieldError> {
    let (min, max) = (u32::from(domain.min), u32::from(domain.max));
    let mut clamp = |value: u32, clamped_to: u32| {
        notes.push(DiagnosticKind::ClampedEndpoint {
            unit: domain.unit,
            value,
            clamped_to: clamped_to as u16,
        });
        clamped_to
    };

    let start = if start < min { clamp(start, min) } else { start };
    let end = if end > max { clamp(end, max) } else { end };

    let narrow = |value: u32| u16::try_from(value).unwrap_or(u16::MAX);
    if start > end {
        return Err(FieldError::InvalidRange {
            start: narrow(start),
            end: narrow(end),
        });
    }
    Ok((narrow(start), narrow(end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(unit: Unit, field: &str) -> Result<FieldSet, FieldError> {
        FieldSet::for_unit(unit, field, &mut Vec::new())
    }

    #[test]
    fn test_parse_asterisk() {
        let set = parse(Unit::Minute, "*").unwrap();
        assert_eq!(set.values(), (0..=59).collect::<Vec<u16>>().as_slice());
        assert!(set.is_wildcard());
    }

    #[test]
    fn test_question_mark_is_wildcard() {
        let set = parse(Unit::Day, "?").unwrap();
        assert!(set.is_wildcard());
        assert_eq!(set.values().len(), 31);
    }

    #[test]
    fn test_parse_range() {
        let set = parse(Unit::Minute, "10-15").unwrap();
        assert_eq!(set.values(), &[10, 11, 12, 13, 14, 15]);
        assert!(!set.is_wildcard());
    }

    #[test]
    fn test_parse_stepping() {
        let set = parse(Unit::Minute, "*/15").unwrap();
        assert_eq!(set.values(), &[0, 15, 30, 45]);
        assert_eq!(
            set.elements(),
            &[FieldSpec::Step {
                base: StepBase::All,
                increment: 15
            }]
        );
    }

    #[test]
    fn test_parse_stepped_range() {
        let set = parse(Unit::Hour, "9-17/4").unwrap();
        assert_eq!(set.values(), &[9, 13, 17]);
    }

    #[test]
    fn test_parse_step_from_start() {
        let set = parse(Unit::Minute, "7/29").unwrap();
        assert_eq!(set.values(), &[7, 36]);
    }

    #[test]
    fn test_parse_list_is_sorted_and_unique() {
        let set = parse(Unit::Minute, "30,5,10-12,5").unwrap();
        assert_eq!(set.values(), &[5, 10, 11, 12, 30]);
        assert_eq!(set.elements().len(), 4);
    }

    #[test]
    fn test_month_aliases() {
        let set = parse(Unit::Month, "JAN-Mar,december").unwrap();
        assert_eq!(set.values(), &[1, 2, 3, 12]);
    }

    #[test]
    fn test_weekday_aliases() {
        let set = parse(Unit::Weekday, "mon-FRI").unwrap();
        assert_eq!(set.values(), &[1, 2, 3, 4, 5]);

        let set = parse(Unit::Weekday, "Sunday,wednesday").unwrap();
        assert_eq!(set.values(), &[0, 3]);
    }

    #[test]
    fn test_unknown_alias_is_rejected() {
        assert_eq!(
            parse(Unit::Weekday, "funday"),
            Err(FieldError::InvalidSymbol("funday".to_string()))
        );
        // Names only exist for months and weekdays.
        assert!(parse(Unit::Hour, "jan").is_err());
    }

    #[test]
    fn test_weekday_seven_is_sunday() {
        let mut notes = Vec::new();
        let set = FieldSet::for_unit(Unit::Weekday, "7", &mut notes).unwrap();
        assert_eq!(set.values(), &[0]);
        assert_eq!(
            notes,
            vec![DiagnosticKind::NormalizedWeekday {
                from: "7".to_string(),
                to: "0".to_string()
            }]
        );
    }

    #[test]
    fn test_weekday_range_ending_on_seven() {
        assert_eq!(normalize_weekdays("6-7"), "6,0");
        assert_eq!(normalize_weekdays("1-7"), "1-6,0");
        assert_eq!(normalize_weekdays("1-5,7"), "1-5,0");
        assert_eq!(normalize_weekdays("*/7"), "*/7");

        let set = parse(Unit::Weekday, "sat-sun").unwrap();
        assert_eq!(set.values(), &[0, 6]);
        let set = parse(Unit::Weekday, "mon-sun").unwrap();
        assert_eq!(set.values(), &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_weekday_range_from_sunday_to_sunday() {
        for field in ["sun-sun", "sunday-sun", "0-sun", "SUN-0"] {
            let set = parse(Unit::Weekday, field).unwrap();
            assert_eq!(set.values(), &[0], "{field}");
        }
        let set = parse(Unit::Weekday, "sun-tue").unwrap();
        assert_eq!(set.values(), &[0, 1, 2]);
        assert_eq!(range_starts_on_sunday("1-"), Some(false));
        assert_eq!(range_starts_on_sunday("0-"), Some(true));
        assert_eq!(range_starts_on_sunday("2,"), None);
    }

    #[test]
    fn test_no_note_without_rewrite() {
        let mut notes = Vec::new();
        FieldSet::for_unit(Unit::Weekday, "1-5", &mut notes).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn test_single_value_out_of_bounds() {
        assert_eq!(
            parse(Unit::Minute, "60"),
            Err(FieldError::OutOfBounds {
                value: 60,
                min: 0,
                max: 59
            })
        );
        assert!(parse(Unit::Day, "0").is_err());
        assert!(parse(Unit::Month, "13").is_err());
    }

    #[test]
    fn test_step_range_endpoints_are_clamped() {
        let mut notes = Vec::new();
        let set = FieldSet::for_unit(Unit::Day, "0-40/10", &mut notes).unwrap();
        assert_eq!(set.values(), &[1, 11, 21, 31]);
        assert_eq!(set.to_string(), "1-31/10");
        assert_eq!(
            notes,
            vec![
                DiagnosticKind::ClampedEndpoint {
                    unit: Unit::Day,
                    value: 0,
                    clamped_to: 1
                },
                DiagnosticKind::ClampedEndpoint {
                    unit: Unit::Day,
                    value: 40,
                    clamped_to: 31
                },
            ]
        );
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert_eq!(
            parse(Unit::Hour, "10-5"),
            Err(FieldError::InvalidRange { start: 10, end: 5 })
        );
        assert!(parse(Unit::Minute, "70-80/5").is_err());
    }

    #[test]
    fn test_invalid_increment() {
        assert!(matches!(
            parse(Unit::Minute, "*/0"),
            Err(FieldError::InvalidIncrement(_))
        ));
        assert!(matches!(
            parse(Unit::Minute, "*/x"),
            Err(FieldError::InvalidIncrement(_))
        ));
        assert!(matches!(
            parse(Unit::Minute, "*/"),
            Err(FieldError::InvalidIncrement(_))
        ));
    }

    #[test]
    fn test_step_before_range_is_invalid_order() {
        assert_eq!(parse(Unit::Minute, "*/5-10"), Err(FieldError::InvalidOrder));
        assert_eq!(parse(Unit::Minute, "0/-5"), Err(FieldError::InvalidOrder));
    }

    #[test]
    fn test_parse_invalid_syntax() {
        assert!(parse(Unit::Minute, "10-").is_err());
        assert!(parse(Unit::Minute, "-10").is_err());
        assert_eq!(parse(Unit::Minute, "1,,2"), Err(FieldError::Empty));
        assert!(parse(Unit::Minute, "5L").is_err());
        assert!(parse(Unit::Minute, "+5").is_err());
    }

    #[test]
    fn test_leading_zeros() {
        let set = parse(Unit::Hour, "01,09").unwrap();
        assert_eq!(set.values(), &[1, 9]);
    }

    #[test]
    fn test_custom_domain() {
        let domain = Domain::new(Unit::Year, 2100, 2199);
        let set = FieldSet::parse("2150", domain, &mut Vec::new()).unwrap();
        assert_eq!(set.values(), &[2150]);
        assert!(parse(Unit::Year, "2150").is_err());
    }

    #[test]
    fn test_neighbour_lookup() {
        let set = parse(Unit::Minute, "10,20,30").unwrap();
        assert_eq!(set.next_at_or_after(10), Some(10));
        assert_eq!(set.next_at_or_after(11), Some(20));
        assert_eq!(set.next_at_or_after(31), None);
        assert_eq!(set.next_at_or_after(-4), Some(10));
        assert_eq!(set.prev_at_or_before(30), Some(30));
        assert_eq!(set.prev_at_or_before(29), Some(20));
        assert_eq!(set.prev_at_or_before(9), None);
        assert_eq!(set.prev_at_or_before(75), Some(30));
        assert!(set.contains(20));
        assert!(!set.contains(-20));
    }

    #[test]
    fn test_canonical_rendering_reparses_identically() {
        for (unit, field) in [
            (Unit::Minute, "*/15,7"),
            (Unit::Hour, "9-17/2,23"),
            (Unit::Day, "1,15,31"),
            (Unit::Month, "jan-jun/2"),
            (Unit::Weekday, "mon-sun"),
            (Unit::Year, "2020-2030/5"),
        ] {
            let set = parse(unit, field).unwrap();
            let reparsed = parse(unit, &set.to_string()).unwrap();
            assert_eq!(set.values(), reparsed.values(), "{unit} field {field}");
        }
    }
}
