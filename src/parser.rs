//! Parser for schedule definitions.
//!
//! Croncalc uses [`ScheduleParser`] to parse definition text. Invoking
//!
//! ```rust
//! # use std::str::FromStr as _;
//! #
//! # use croncalc::ScheduleSet;
//! #
//! ScheduleSet::from_str("0 9 * * mon-fri");
//! ```
//!
//! is equivalent to
//!
//! ```rust
//! # use croncalc::parser::ScheduleParser;
//! #
//! ScheduleParser::new().parse("0 9 * * mon-fri");
//! ```
//!
//! You can customise the parser by creating a parser builder using
//! [`ScheduleParser::builder`]. So, for example, to insist on an explicit
//! year field and combine day-of-month and weekday with AND:
//!
//! ```rust
//! use croncalc::parser::{ScheduleParser, Year};
//!
//! let parser = ScheduleParser::builder()
//!     .year(Year::Required)
//!     .dom_and_dow(true)
//!     .build();
//!
//! assert!(parser.parse("0 12 13 * fri 2026").is_ok());
//! assert!(parser.parse("0 12 13 * fri").is_err());
//! ```
//!
//! Text may hold several definitions, one per line. Lines that fail to parse
//! are skipped and reported through [`ScheduleSet::diagnostics`]; parsing
//! only fails when no line is usable.

use derive_builder::Builder;
use strum::{EnumIs, IntoEnumIterator};

use crate::{
    component::{FieldSet, Unit},
    errors::{CronError, Diagnostic, DiagnosticKind},
    pattern::Schedule,
    ScheduleSet,
};

/// How the optional sixth (year) field is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, EnumIs)]
pub enum Year {
    /// Definitions have five or six fields.
    #[default]
    Optional,
    /// Definitions must have six fields.
    Required,
    /// Definitions must have five fields.
    Disallowed,
}

/// Parser for schedule definitions.
///
/// In order to build a custom parser use [`ScheduleParser::builder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Builder)]
#[builder(default, build_fn(skip), pattern = "owned")]
pub struct ScheduleParser {
    /// Configure how years should be handled.
    year: Year,
    /// Require both day of month (DOM) and day of week (DOW) to match when
    /// both are restricted, instead of either.
    dom_and_dow: bool,
}

impl ScheduleParser {
    /// Create a new parser.
    ///
    /// You should probably be using [`ScheduleSet`]'s implementation of
    /// [`FromStr`][std::str::FromStr] instead of invoking this.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a builder for custom parsing.
    ///
    /// Equivalent to [`ScheduleParserBuilder::default`].
    pub fn builder() -> ScheduleParserBuilder {
        ScheduleParserBuilder::default()
    }

    /// Parses definition text, one definition per line.
    ///
    /// Lines may be separated by `\n`, `\r\n` or `\r`. Blank lines are
    /// ignored. The set's source keeps only the accepted definitions.
    pub fn parse(&self, text: &str) -> Result<ScheduleSet, CronError> {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.parse_lines(normalized.split('\n'))
    }

    /// Parses an explicit list of definitions.
    pub fn parse_lines<I, S>(&self, lines: I) -> Result<ScheduleSet, CronError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schedules = Vec::new();
        let mut diagnostics = Vec::new();
        let mut rejected = Vec::new();
        let mut accepted_lines = Vec::new();

        for (index, line) in lines.into_iter().enumerate() {
            let definition = line.as_ref().trim();
            if definition.is_empty() {
                continue;
            }

            match self.parse_definition(definition) {
                Ok((schedule, notes)) => {
                    for kind in notes {
                        let diagnostic = Diagnostic::new(index, kind);
                        diagnostic.emit();
                        diagnostics.push(diagnostic);
                    }
                    schedules.push(schedule);
                    accepted_lines.push(definition.to_string());
                }
                Err(error) => {
                    let diagnostic = Diagnostic::new(
                        index,
                        DiagnosticKind::SkippedDefinition {
                            definition: definition.to_string(),
                            error,
                        },
                    );
                    diagnostic.emit();
                    diagnostics.push(diagnostic.clone());
                    rejected.push(diagnostic);
                }
            }
        }

        if schedules.is_empty() {
            if rejected.is_empty() {
                return Err(CronError::EmptyPattern);
            }
            return Err(CronError::NoValidDefinitions { rejected });
        }

        Ok(ScheduleSet::from_parts(
            accepted_lines.join("\n"),
            schedules,
            diagnostics,
        ))
    }

    /// Parses a single definition line into a schedule, returning the
    /// advisory notes produced along the way.
    pub fn parse_definition(
        &self,
        definition: &str,
    ) -> Result<(Schedule, Vec<DiagnosticKind>), CronError> {
        let mut pattern = definition.trim().to_string();

        if pattern.is_empty() {
            return Err(CronError::EmptyPattern);
        }

        // Handle @nicknames
        if pattern.starts_with('@') {
            let expanded = Self::handle_nicknames(&pattern, self.year.is_required())?;
            log::debug!("Expanded '{pattern}' to '{expanded}'");
            pattern = expanded;
        }

        let parts: Vec<&str> = pattern.split_whitespace().collect();
        let num_parts = parts.len();

        // Validate pattern length based on configuration
        match self.year {
            Year::Optional if !(5..=6).contains(&num_parts) => {
                return Err(CronError::InvalidPattern(format!(
                    "Pattern must have 5 or 6 fields, found {num_parts}."
                )));
            }
            Year::Required if num_parts != 6 => {
                return Err(CronError::InvalidPattern(format!(
                    "Pattern must have 6 fields when years are required, found {num_parts}."
                )));
            }
            Year::Disallowed if num_parts != 5 => {
                return Err(CronError::InvalidPattern(format!(
                    "Pattern must have 5 fields when years are disallowed, found {num_parts}."
                )));
            }
            _ => {}
        }

        // Parse the individual components
        let mut notes = Vec::new();
        let mut sets = Vec::with_capacity(num_parts);
        for (unit, field) in Unit::iter().zip(&parts) {
            let set = FieldSet::for_unit(unit, field, &mut notes).map_err(|reason| {
                CronError::InvalidFieldSpec {
                    unit,
                    field: field.to_string(),
                    reason,
                }
            })?;
            sets.push(set);
        }

        let years = if sets.len() == 6 { sets.pop() } else { None };
        let Ok([minutes, hours, days, months, weekdays]) = <[FieldSet; 5]>::try_from(sets) else {
            return Err(CronError::InvalidPattern(
                "Pattern must have 5 or 6 fields.".to_string(),
            ));
        };

        let schedule = Schedule::new(minutes, hours, days, months, weekdays, years)?
            .with_dom_and_dow(self.dom_and_dow);
        Ok((schedule, notes))
    }

    // Converts named shortcuts into their equivalent standard definition.
    fn handle_nicknames(pattern: &str, with_year: bool) -> Result<String, CronError> {
        let pattern = pattern.trim();
        let eq_ignore_case = |a: &str, b: &str| a.eq_ignore_ascii_case(b);

        let base_pattern = match pattern {
            p if eq_ignore_case(p, "@yearly") || eq_ignore_case(p, "@annually") => "0 0 1 1 *",
            p if eq_ignore_case(p, "@monthly") => "0 0 1 * *",
            p if eq_ignore_case(p, "@weekly") => "0 0 * * 0",
            p if eq_ignore_case(p, "@daily") || eq_ignore_case(p, "@midnight") => "0 0 * * *",
            p if eq_ignore_case(p, "@hourly") => "0 * * * *",
            _ => {
                return Err(CronError::InvalidPattern(format!(
                    "Unknown mnemonic '{pattern}'."
                )))
            }
        };

        let mut final_pattern = base_pattern.to_string();
        if with_year {
            final_pattern.push_str(" *");
        }
        Ok(final_pattern)
    }
}

impl ScheduleParserBuilder {
    pub fn build(self) -> ScheduleParser {
        let ScheduleParserBuilder { year, dom_and_dow } = self;
        ScheduleParser {
            year: year.unwrap_or_default(),
            dom_and_dow: dom_and_dow.unwrap_or_default(),
        }
    }
}
