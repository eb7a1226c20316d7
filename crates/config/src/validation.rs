//! Validation system for configuration values
//!
//! Each config section implements the `ConfigSection` trait which includes validation.

pub use crate::error::ValidationError;

/// Trait for configuration sections that can validate themselves
pub trait ConfigSection: Default {
    /// Validates the configuration section
    ///
    /// Returns every validation error found. `Ok` means valid.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges another config section into this one
    ///
    /// Values from `other` take precedence.
    fn merge(&mut self, other: Self);

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within an inclusive range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a value does not exceed a limit
    pub fn at_most<T>(value: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value > max {
            Err(ValidationError::with_value(
                field,
                format!("must not exceed {}", max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_valid() {
        assert!(Validator::in_range(48_000, 1_000, 768_000, "test").is_ok());
        assert!(Validator::in_range(1_000, 1_000, 768_000, "test").is_ok());
        assert!(Validator::in_range(768_000, 1_000, 768_000, "test").is_ok());
    }

    #[test]
    fn test_in_range_invalid() {
        assert!(Validator::in_range(999, 1_000, 768_000, "test").is_err());
        assert!(Validator::in_range(768_001, 1_000, 768_000, "test").is_err());
    }

    #[test]
    fn test_at_most() {
        assert!(Validator::at_most(0usize, 1024, "test").is_ok());
        assert!(Validator::at_most(1024usize, 1024, "test").is_ok());

        let err = Validator::at_most(1025usize, 1024, "resample.frame_size")
            .expect_err("over the limit");
        assert_eq!(err.value.as_deref(), Some("1025"));
    }

    #[test]
    fn test_collect_errors_all_ok() {
        let results = vec![Ok(()), Ok(()), Ok(())];
        assert!(Validator::collect_errors(results).is_ok());
    }

    #[test]
    fn test_collect_errors_some_err() {
        let results = vec![
            Ok(()),
            Err(ValidationError::new("field1", "error1")),
            Ok(()),
            Err(ValidationError::new("field2", "error2")),
        ];
        let errors = Validator::collect_errors(results).expect_err("two errors");
        assert_eq!(errors.len(), 2);
    }
}
