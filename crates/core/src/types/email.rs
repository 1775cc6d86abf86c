//! Email address as typed into the sign-in and registration forms.

use core::fmt;

/// Why a form value is not an email address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @")]
    AtCount,
    #[error("email needs text before and after the @")]
    MissingPart,
}

/// A trimmed address with one `@` between a non-empty local part and domain.
///
/// The identity service does the real validation; this only catches input
/// that cannot be an address before a request is spent on it.
///
/// ```
/// use cineteca_core::Email;
///
/// let email = Email::parse(" ana@cineteca.co ").unwrap();
/// assert_eq!(email.local_part(), "ana");
/// assert!(Email::parse("ana@@cineteca.co").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Longest address accepted (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse form input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an `EmailError` naming the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::AtCount);
        };
        if local.is_empty() || domain.is_empty() {
            return Err(EmailError::MissingPart);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the `@`, used as a fallback display name.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
