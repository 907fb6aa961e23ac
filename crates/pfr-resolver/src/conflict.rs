//! Resolution validation errors.

use std::fmt;

/// Every module the resolver could not satisfy.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

/// A module with no acceptable candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// `owner/name`, or the raw title when it could not be parsed.
    pub module: String,
    /// The requirements placed on the module, joined.
    pub requirement: Option<String>,
    /// Who asked for the module: `Puppetfile` or `owner-name-version`.
    pub requesters: Vec<String>,
    pub reason: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.errors {
            writeln!(f, "Resolution Validation Error: {e}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not find module '{}'", self.module)?;
        if let Some(ref req) = self.requirement {
            write!(f, " matching '{req}'")?;
        }
        if !self.requesters.is_empty() {
            write!(f, " required by {}", self.requesters.join(", "))?;
        }
        write!(f, ": {}", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = ValidationReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn error_text() {
        let mut report = ValidationReport::new();
        report.add(ValidationError {
            module: "puppetlabs/stdlib".to_string(),
            requirement: Some("= 6.0.0".to_string()),
            requesters: vec!["Puppetfile".to_string(), "puppetlabs-apache-5.4.0".to_string()],
            reason: "no releases found".to_string(),
        });
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.to_string(),
            "Resolution Validation Error: Could not find module 'puppetlabs/stdlib' matching '= 6.0.0' \
             required by Puppetfile, puppetlabs-apache-5.4.0: no releases found\n"
        );
    }

    #[test]
    fn error_without_requirement() {
        let error = ValidationError {
            module: "stdlib".to_string(),
            requirement: None,
            requesters: vec!["Puppetfile".to_string()],
            reason: "offline".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Could not find module 'stdlib' required by Puppetfile: offline"
        );
    }
}
