use crate::component::Unit;

/// Represents errors that can occur while parsing cron schedule definitions.
///
/// A definition that cannot be resolved to any instant is *not* an error;
/// resolution returns `None` in that case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    /// The definition text was empty or contained only whitespace.
    #[error("Schedule definition cannot be an empty string.")]
    EmptyPattern,

    /// The definition as a whole is malformed, e.g. it has the wrong number
    /// of fields or uses an unknown mnemonic.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// One field of a definition could not be parsed. This aborts the
    /// definition line it belongs to.
    #[error("Invalid {unit} field '{field}': {reason}")]
    InvalidFieldSpec {
        unit: Unit,
        field: String,
        reason: FieldError,
    },

    /// Every line of a multi-line definition was rejected.
    #[error("No valid definition(s) provided, {} line(s) rejected.", .rejected.len())]
    NoValidDefinitions { rejected: Vec<Diagnostic> },

    /// A date could not be represented, e.g. February 30th.
    #[error("Encountered an invalid date.")]
    InvalidDate,

    /// A time of day could not be represented, e.g. 24:00.
    #[error("Encountered an invalid time.")]
    InvalidTime,
}

/// The reason a single field specification was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("empty list item")]
    Empty,

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("value {value} is out of bounds ({min}-{max})")]
    OutOfBounds { value: u32, min: u16, max: u16 },

    #[error("invalid range {start}-{end}")]
    InvalidRange { start: u16, end: u16 },

    #[error("invalid increment '{0}'")]
    InvalidIncrement(String),

    #[error("invalid order, the increment must follow the range")]
    InvalidOrder,
}

/// An advisory message produced while parsing. Diagnostics never abort
/// construction of a schedule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Zero-based index of the definition line the diagnostic refers to.
    pub line: usize,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The definition on this line was rejected and skipped.
    SkippedDefinition { definition: String, error: CronError },
    /// A weekday field used 7 for Sunday and was rewritten.
    NormalizedWeekday { from: String, to: String },
    /// An out-of-domain range endpoint was clamped to the domain.
    ClampedEndpoint {
        unit: Unit,
        value: u32,
        clamped_to: u16,
    },
}

impl Diagnostic {
    pub fn new(line: usize, kind: DiagnosticKind) -> Self {
        Self { line, kind }
    }

    /// Skipped definitions are warnings; rewrites of accepted input are notices.
    pub fn is_warning(&self) -> bool {
        matches!(self.kind, DiagnosticKind::SkippedDefinition { .. })
    }

    // Forwards the diagnostic to the `log` facade.
    pub(crate) fn emit(&self) {
        if self.is_warning() {
            log::warn!("{self}");
        } else {
            log::info!("{self}");
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.kind {
            DiagnosticKind::SkippedDefinition { definition, error } => write!(
                f,
                "Skipping incorrect definition '{definition}' on line {}: {error}",
                self.line
            ),
            DiagnosticKind::NormalizedWeekday { from, to } => write!(
                f,
                "Use of 7 for Sunday in weekday field '{from}' on line {}, read as '{to}'",
                self.line
            ),
            DiagnosticKind::ClampedEndpoint {
                unit,
                value,
                clamped_to,
            } => write!(
                f,
                "Range endpoint {value} of the {unit} field on line {} clamped to {clamped_to}",
                self.line
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_spec_error_message() {
        let error = CronError::InvalidFieldSpec {
            unit: Unit::Minute,
            field: "60".to_string(),
            reason: FieldError::OutOfBounds {
                value: 60,
                min: 0,
                max: 59,
            },
        };
        assert_eq!(
            error.to_string(),
            "Invalid minute field '60': value 60 is out of bounds (0-59)"
        );
    }

    #[test]
    fn test_diagnostic_severity() {
        let skipped = Diagnostic::new(
            2,
            DiagnosticKind::SkippedDefinition {
                definition: "* * *".to_string(),
                error: CronError::InvalidPattern("too few fields".to_string()),
            },
        );
        let normalized = Diagnostic::new(
            0,
            DiagnosticKind::NormalizedWeekday {
                from: "7".to_string(),
                to: "0".to_string(),
            },
        );

        assert!(skipped.is_warning());
        assert!(!normalized.is_warning());
        assert!(skipped.to_string().contains("line 2"));
    }
}
