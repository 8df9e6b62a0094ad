//! Sidecar services declared through annotations of the form
//! `service.netflix.com/<name>.v<version>.<param>`.
//!
//! Several keys contribute to one service; they are correlated by the
//! `(name, version)` pair. Only the `enabled` and `image` parameters are
//! understood.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Errors};
use crate::imgref::validate_image;
use crate::keys::annotation::SERVICE_PREFIX;
use crate::values::{parse_bool, parse_unsigned};

/// A sidecar service to run next to the workload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Sidecar {
    /// Service name
    pub name: String,
    /// Service version, from the `v<N>` segment
    pub version: u32,
    /// Whether the service should run
    pub enabled: bool,
    /// The image to run, always tagged or digested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Parse the `v<N>` version segment.
fn parse_version(s: &str) -> Option<u32> {
    s.strip_prefix('v').and_then(parse_unsigned::<u32>)
}

/// Assemble sidecar records from every service key in `annotations`.
///
/// Problems are pushed onto `errors` and never stop the scan. The
/// result is ordered by name, then version.
pub(crate) fn parse_services(
    annotations: &BTreeMap<String, String>,
    errors: &mut Errors,
) -> Vec<Sidecar> {
    let mut sidecars: BTreeMap<(&str, u32), Sidecar> = BTreeMap::new();
    for (key, value) in annotations {
        let Some(rest) = key
            .strip_prefix(SERVICE_PREFIX)
            .and_then(|r| r.strip_prefix('/'))
        else {
            continue;
        };
        let parts: Vec<&str> = rest.split('.').collect();
        let &[name, version, param] = parts.as_slice() else {
            errors.push(Error::ServiceParameterCount { key: key.clone() });
            continue;
        };
        let Some(version) = parse_version(version) else {
            errors.push(Error::ServiceVersion { key: key.clone() });
            continue;
        };
        if !matches!(param, "enabled" | "image") {
            // Unknown parameters are neither stored nor reported.
            tracing::trace!("ignoring service parameter {param}: {key}");
            continue;
        }
        let sidecar = sidecars.entry((name, version)).or_insert_with(|| Sidecar {
            name: name.to_owned(),
            version,
            ..Default::default()
        });
        if param == "enabled" {
            match parse_bool(value) {
                Some(v) => sidecar.enabled = v,
                None => errors.push(Error::ServiceEnabled { key: key.clone() }),
            }
        } else {
            match validate_image(value) {
                Ok(()) => sidecar.image = Some(value.clone()),
                Err(err) => errors.push(Error::ServiceImage {
                    key: key.clone(),
                    err,
                }),
            }
        }
    }
    sidecars.into_values().collect()
}
