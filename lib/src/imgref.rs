//! Syntax checks for container image references such as
//! `registry.example.com/ns/app:latest` or `ns/app@sha256:<hex>`.
//!
//! This is the docker distribution reference grammar; it is purely
//! lexical, no registry is contacted.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// The longest permitted repository name, domain included.
const NAME_TOTAL_LENGTH_MAX: usize = 255;

/// Groups: 1 = full name, 2 = domain, 3 = path, 4 = tag, 5 = digest.
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    let alnum = "[a-z0-9]+";
    let separator = "(?:[._]|__|[-]*)";
    let component = format!("{alnum}(?:{separator}{alnum})*");
    let domain_component = "(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let tag = r"[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}";
    let digest = "[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[[:xdigit:]]{32,}";
    Regex::new(&format!(
        "^((?:({domain})/)?({component}(?:/{component})*))(?::({tag}))?(?:@({digest}))?$"
    ))
    .unwrap()
});

/// Why an image reference was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageReferenceError {
    /// The reference was empty.
    #[error("repository name must have at least one component")]
    NameEmpty,
    /// The reference does not match the grammar.
    #[error("invalid reference format")]
    InvalidFormat,
    /// The reference would match if it were lowercase.
    #[error("invalid reference format: repository name must be lowercase")]
    NameContainsUppercase,
    /// The repository name is too long.
    #[error("repository name must not be more than 255 characters")]
    NameTooLong,
    /// The digest algorithm is not one we can verify.
    #[error("unsupported digest algorithm")]
    DigestUnsupported,
    /// The digest has the wrong number of hex characters for its algorithm.
    #[error("invalid checksum digest length")]
    DigestInvalidLength,
    /// The digest is not lowercase hex.
    #[error("invalid checksum digest format")]
    DigestInvalidFormat,
    /// A bare name; the image to run would be ambiguous.
    #[error("image does not have a digest or tag")]
    NoTagOrDigest,
}

/// What a syntactically valid reference pins.
#[derive(Debug, PartialEq, Eq)]
struct Pinned<'a> {
    tag: Option<&'a str>,
    digest: Option<&'a str>,
}

/// Validate the `algorithm:hex` digest portion of a reference.
fn validate_digest(digest: &str) -> Result<(), ImageReferenceError> {
    let (algorithm, encoded) = digest
        .split_once(':')
        .ok_or(ImageReferenceError::DigestInvalidFormat)?;
    let hex_len = match algorithm {
        "sha256" => 64,
        "sha384" => 96,
        "sha512" => 128,
        _ => return Err(ImageReferenceError::DigestUnsupported),
    };
    if encoded.len() != hex_len {
        return Err(ImageReferenceError::DigestInvalidLength);
    }
    if !encoded.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ImageReferenceError::DigestInvalidFormat);
    }
    Ok(())
}

/// Parse a reference. Tags and digests are both optional here.
fn parse_reference(s: &str) -> Result<Pinned<'_>, ImageReferenceError> {
    let Some(caps) = REFERENCE.captures(s) else {
        if s.is_empty() {
            return Err(ImageReferenceError::NameEmpty);
        }
        if REFERENCE.is_match(&s.to_lowercase()) {
            return Err(ImageReferenceError::NameContainsUppercase);
        }
        return Err(ImageReferenceError::InvalidFormat);
    };
    if caps.get(1).map_or(0, |m| m.len()) > NAME_TOTAL_LENGTH_MAX {
        return Err(ImageReferenceError::NameTooLong);
    }
    let digest = caps.get(5).map(|m| m.as_str());
    if let Some(digest) = digest {
        validate_digest(digest)?;
    }
    Ok(Pinned {
        tag: caps.get(4).map(|m| m.as_str()),
        digest,
    })
}

/// Validate an image to run: it must parse and pin either a tag or a digest.
pub fn validate_image(image: &str) -> Result<(), ImageReferenceError> {
    match parse_reference(image)? {
        Pinned {
            tag: None,
            digest: None,
        } => Err(ImageReferenceError::NoTagOrDigest),
        _ => Ok(()),
    }
}
