//! Diagnostics produced while translating pod metadata.
//!
//! Nothing in a translation pass is fatal: every problem becomes one
//! [`Error`], and all of them are accumulated in order into [`Errors`].

use std::fmt;

use thiserror::Error;

use crate::imgref::ImageReferenceError;
use crate::keys::KeyKind;

/// Where a key was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    /// `metadata.annotations`
    Annotation,
    /// `metadata.labels`
    Label,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Annotation => "annotation",
            Source::Label => "label",
        })
    }
}

/// A single problem with one annotation or label.
#[derive(Debug, Error)]
pub enum Error {
    /// The value does not parse as its declared type.
    #[error("{origin} is not a valid {kind} value: {key}")]
    InvalidValue {
        /// Annotation or label
        origin: Source,
        /// Expected type
        kind: KeyKind,
        /// The offending key
        key: String,
    },
    /// The value does not compile as a regular expression.
    #[error("annotation is not a valid regexp value: {key}: {err}")]
    InvalidRegex {
        /// The offending key
        key: String,
        /// Compiler diagnostic
        #[source]
        err: regex::Error,
    },
    /// The hostname style is not one of the accepted literals.
    #[error("annotation is not a valid hostname style: {key}")]
    InvalidHostnameStyle {
        /// The offending key
        key: String,
    },
    /// The scheduler policy is not one of the accepted literals.
    #[error("annotation is not a valid scheduler policy: {key}")]
    InvalidSchedPolicy {
        /// The offending key
        key: String,
    },
    /// A service key is not of the form `name.version.param`.
    #[error("annotation has an incorrect number of service configuration parameters: {key}")]
    ServiceParameterCount {
        /// The offending key
        key: String,
    },
    /// A service key's version segment is not `v<integer>`.
    #[error("annotation has an incorrect service version number: {key}")]
    ServiceVersion {
        /// The offending key
        key: String,
    },
    /// A service `enabled` value is not a boolean.
    #[error("annotation has an incorrect service enabled boolean value: {key}")]
    ServiceEnabled {
        /// The offending key
        key: String,
    },
    /// A service `image` value is not an acceptable image reference.
    #[error("error parsing service image annotation: {key}: {err}")]
    ServiceImage {
        /// The offending key
        key: String,
        /// Why the reference was rejected
        #[source]
        err: ImageReferenceError,
    },
}

impl Error {
    /// The annotation or label key this error is about.
    pub fn key(&self) -> &str {
        match self {
            Error::InvalidValue { key, .. }
            | Error::InvalidRegex { key, .. }
            | Error::InvalidHostnameStyle { key }
            | Error::InvalidSchedPolicy { key }
            | Error::ServiceParameterCount { key }
            | Error::ServiceVersion { key }
            | Error::ServiceEnabled { key }
            | Error::ServiceImage { key, .. } => key,
        }
    }
}

/// Every [`Error`] from one translation pass, in the order encountered.
#[derive(Debug, Default)]
pub struct Errors(Vec<Error>);

impl Errors {
    /// Record another error.
    pub fn push(&mut self, err: Error) {
        tracing::debug!(key = err.key(), "{err}");
        self.0.push(err);
    }

    /// True if nothing went wrong.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of recorded errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the recorded errors.
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    /// `Ok(v)` when empty, otherwise `Err(self)`.
    pub fn into_result<T>(self, v: T) -> Result<T, Errors> {
        if self.is_empty() {
            Ok(v)
        } else {
            Err(self)
        }
    }
}

impl Extend<Error> for Errors {
    fn extend<I: IntoIterator<Item = Error>>(&mut self, iter: I) {
        for err in iter {
            self.push(err);
        }
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            writeln!(f, "1 error occurred:")?;
        } else {
            writeln!(f, "{} errors occurred:", self.0.len())?;
        }
        for err in &self.0 {
            writeln!(f, "\t* {err}")?;
        }
        writeln!(f)
    }
}

impl std::error::Error for Errors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_bool(key: &str) -> Error {
        Error::InvalidValue {
            origin: Source::Annotation,
            kind: KeyKind::Boolean,
            key: key.to_owned(),
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            invalid_bool("pod.netflix.com/kvm-enabled").to_string(),
            "annotation is not a valid boolean value: pod.netflix.com/kvm-enabled"
        );
        let e = Error::InvalidValue {
            origin: Source::Label,
            kind: KeyKind::Boolean,
            key: "some/label".into(),
        };
        assert_eq!(e.to_string(), "label is not a valid boolean value: some/label");
        let e = Error::ServiceImage {
            key: "service.netflix.com/foo.v1.image".into(),
            err: ImageReferenceError::NoTagOrDigest,
        };
        assert_eq!(
            e.to_string(),
            "error parsing service image annotation: service.netflix.com/foo.v1.image: image does not have a digest or tag"
        );
        assert_eq!(e.key(), "service.netflix.com/foo.v1.image");
    }

    #[test]
    fn test_aggregate() {
        let mut errs = Errors::default();
        assert!(errs.is_empty());
        assert!(Errors::default().into_result(42).is_ok());
        errs.push(invalid_bool("a"));
        assert_eq!(
            errs.to_string(),
            "1 error occurred:\n\t* annotation is not a valid boolean value: a\n\n"
        );
        errs.extend([Error::InvalidSchedPolicy { key: "b".into() }]);
        assert_eq!(errs.len(), 2);
        let keys: Vec<_> = errs.iter().map(|e| e.key()).collect();
        assert_eq!(keys, ["a", "b"]);
        let msg = errs.into_result(()).unwrap_err().to_string();
        assert!(msg.starts_with("2 errors occurred:\n"));
        assert!(msg.contains("\t* annotation is not a valid scheduler policy: b\n"));
    }
}
