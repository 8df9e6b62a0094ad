//! Translation of pod metadata into a [`Config`].

use std::collections::BTreeMap;
use std::fmt::Display;
use chrono::TimeDelta;
use serde::Serialize;

use crate::duration::parse_duration;
use crate::error::{Error, Errors, Source};
use crate::k8sapitypes::{ObjectMeta, Pod};
use crate::keys::{annotation as a, apparmor_key, label, resource, KeyKind};
use crate::quantity::Quantity;
use crate::sidecar::{parse_services, Sidecar};
use crate::values::{parse_bool, parse_list, parse_signed, parse_unsigned, Pattern};

/// The configuration of a container, as expressed by pod metadata.
///
/// A field is set if and only if its key was present and valid; there
/// are no defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// AppArmor profile of the user container
    pub apparmor_profile: Option<String>,
    /// Cloud account the network interfaces live in
    pub account_id: Option<String>,
    /// Whether to assign an IPv6 address
    pub assign_ipv6_address: Option<bool>,
    /// Whether resource quantities are in bytes
    pub bytes_enabled: Option<bool>,
    /// Capacity group the task runs in
    pub capacity_group: Option<String>,
    /// Opaque container info blob
    pub container_info: Option<String>,
    /// Whether the container may burst past its CPU allocation
    pub cpu_bursting_enabled: Option<bool>,
    /// Outbound bandwidth limit
    pub egress_bandwidth: Option<Quantity>,
    /// Pool to draw an elastic IP from
    pub elastic_ip_pool: Option<String>,
    /// Elastic IPs to attach, as written
    pub elastic_ips: Option<String>,
    /// Whether a string entrypoint is split like a shell would
    pub entrypoint_shell_splitting: Option<bool>,
    /// Whether FUSE is available
    pub fuse_enabled: Option<bool>,
    /// `ec2` or empty
    pub hostname_style: Option<String>,
    /// IAM role ARN
    pub iam_role: Option<String>,
    /// Instance metadata token policy
    pub imds_require_token: Option<String>,
    /// Inbound bandwidth limit
    pub ingress_bandwidth: Option<Quantity>,
    /// When the job was accepted, in milliseconds since the epoch
    pub job_accepted_timestamp_ms: Option<u64>,
    /// Serialized job descriptor
    pub job_descriptor: Option<String>,
    /// Job identifier
    pub job_id: Option<String>,
    /// `BATCH` or `SERVICE`
    pub job_type: Option<String>,
    /// Whether jumbo frames are enabled
    pub jumbo_frames_enabled: Option<bool>,
    /// Whether `/dev/kvm` is available
    pub kvm_enabled: Option<bool>,
    /// Whether log files are kept after upload
    pub log_keep_local_file: Option<bool>,
    /// How often stdio logs are checked for rotation
    #[serde(serialize_with = "crate::duration::serialize_opt")]
    pub log_stdio_check_interval: Option<TimeDelta>,
    /// How often logs are checked for upload
    #[serde(serialize_with = "crate::duration::serialize_opt")]
    pub log_upload_check_interval: Option<TimeDelta>,
    /// How long a log file must be idle before upload
    #[serde(serialize_with = "crate::duration::serialize_opt")]
    pub log_upload_threshold_time: Option<TimeDelta>,
    /// Which log files to upload
    pub log_upload_regexp: Option<Pattern>,
    /// Bucket logs are uploaded to
    pub log_s3_bucket_name: Option<String>,
    /// Key prefix for uploaded logs
    pub log_s3_path_prefix: Option<String>,
    /// Role used to write logs
    pub log_s3_writer_iam_role: Option<String>,
    /// Whether network bandwidth may burst
    pub network_bursting_enabled: Option<bool>,
    /// Network mode name
    pub network_mode: Option<String>,
    /// OOM killer score adjustment
    pub oom_score_adj: Option<i32>,
    /// Schema version the pod was written with
    pub pod_schema_version: Option<u32>,
    /// CPU limit of the user container
    pub resource_cpu: Option<Quantity>,
    /// Ephemeral storage limit of the user container
    pub resource_disk: Option<Quantity>,
    /// GPU limit of the user container
    pub resource_gpu: Option<Quantity>,
    /// Memory limit of the user container
    pub resource_memory: Option<Quantity>,
    /// Network bandwidth limit of the user container
    pub resource_network: Option<Quantity>,
    /// `batch` or `idle`
    pub sched_policy: Option<String>,
    /// Whether the seccomp agent handles network syscalls
    pub seccomp_agent_net_enabled: Option<bool>,
    /// Whether the seccomp agent handles perf syscalls
    pub seccomp_agent_perf_enabled: Option<bool>,
    /// Security groups of the network interface
    pub security_group_ids: Option<Vec<String>>,
    /// Sidecar services, ordered by name, then version
    pub sidecars: Vec<Sidecar>,
    /// Static IP allocation to use
    pub static_ip_allocation_uuid: Option<String>,
    /// Subnets to place the network interface in
    pub subnet_ids: Option<Vec<String>>,
    /// Environment variables set by the system rather than the user
    pub system_env_var_names: Option<Vec<String>>,
    /// Task identifier
    pub task_id: Option<String>,
    /// Whether the user container has a TTY
    pub tty_enabled: Option<bool>,
    /// Workload detail name component
    pub workload_detail: Option<String>,
    /// Signed workload metadata
    pub workload_metadata: Option<String>,
    /// Signature over [`Config::workload_metadata`]
    pub workload_metadata_sig: Option<String>,
    /// Workload (application) name
    pub workload_name: Option<String>,
    /// Owner contact
    pub workload_owner_email: Option<String>,
    /// Workload sequence name component
    pub workload_sequence: Option<String>,
    /// Workload stack name component
    pub workload_stack: Option<String>,
}

/// The outcome of a translation: whatever could be extracted, plus
/// everything that went wrong.
#[derive(Debug)]
pub struct Translation {
    /// The extracted configuration; fields whose keys failed are unset.
    pub config: Config,
    /// Every problem found, in the order found.
    pub errors: Errors,
}

impl Translation {
    /// Discard the partial configuration if anything went wrong.
    pub fn into_result(self) -> Result<Config, Errors> {
        self.errors.into_result(self.config)
    }
}

/// Reads keys out of one metadata map, recording failures.
struct Parser<'a> {
    source: Source,
    map: &'a BTreeMap<String, String>,
    errors: &'a mut Errors,
}

impl<'a> Parser<'a> {
    fn string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.map.get(key).map(|v| parse_list(v))
    }

    fn typed<T, E: Display>(
        &mut self,
        key: &str,
        kind: KeyKind,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> Option<T> {
        let v = self.map.get(key)?;
        match parse(v) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::trace!("{key}={v:?}: {e}");
                self.errors.push(Error::InvalidValue {
                    origin: self.source,
                    kind,
                    key: key.to_owned(),
                });
                None
            }
        }
    }

    fn bool(&mut self, key: &str) -> Option<bool> {
        self.typed(key, KeyKind::Boolean, |v| {
            parse_bool(v).ok_or("invalid syntax")
        })
    }

    fn duration(&mut self, key: &str) -> Option<TimeDelta> {
        self.typed(key, KeyKind::Duration, parse_duration)
    }

    fn resource(&mut self, key: &str) -> Option<Quantity> {
        self.typed(key, KeyKind::Resource, Quantity::parse)
    }

    fn regexp(&mut self, key: &str) -> Option<Pattern> {
        let v = self.map.get(key)?;
        match Pattern::new(v) {
            Ok(p) => Some(p),
            Err(err) => {
                self.errors.push(Error::InvalidRegex {
                    key: key.to_owned(),
                    err,
                });
                None
            }
        }
    }
}

fn parse_schema_version(v: &str) -> Result<u32, &'static str> {
    parse_unsigned(v).ok_or("invalid syntax or out of range")
}

/// Translate annotations and labels.
///
/// `user_container` names the container that the AppArmor profile key is
/// scoped to; with `None` that key is not read.
pub fn translate(
    annotations: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
    user_container: Option<&str>,
) -> Translation {
    let mut errors = Errors::default();
    let mut c = Config::default();

    let mut p = Parser {
        source: Source::Annotation,
        map: annotations,
        errors: &mut errors,
    };

    c.apparmor_profile = user_container.and_then(|name| p.string(&apparmor_key(name)));
    c.workload_detail = p.string(a::WORKLOAD_DETAIL);
    c.workload_name = p.string(a::WORKLOAD_NAME);
    c.workload_owner_email = p.string(a::WORKLOAD_OWNER_EMAIL);
    c.workload_sequence = p.string(a::WORKLOAD_SEQUENCE);
    c.workload_stack = p.string(a::WORKLOAD_STACK);
    c.iam_role = p.string(a::IAM_ROLE);
    c.job_descriptor = p.string(a::JOB_DESCRIPTOR);
    c.job_id = p.string(a::JOB_ID);
    c.job_type = p.string(a::JOB_TYPE);
    c.log_s3_bucket_name = p.string(a::LOG_S3_BUCKET_NAME);
    c.log_s3_path_prefix = p.string(a::LOG_S3_PATH_PREFIX);
    c.log_s3_writer_iam_role = p.string(a::LOG_S3_WRITER_IAM_ROLE);
    c.account_id = p.string(a::NETWORK_ACCOUNT_ID);
    c.elastic_ip_pool = p.string(a::NETWORK_ELASTIC_IP_POOL);
    c.elastic_ips = p.string(a::NETWORK_ELASTIC_IPS);
    c.imds_require_token = p.string(a::NETWORK_IMDS_REQUIRE_TOKEN);
    c.network_mode = p.string(a::NETWORK_MODE);
    c.static_ip_allocation_uuid = p.string(a::NETWORK_STATIC_IP_ALLOCATION_UUID);
    c.container_info = p.string(a::POD_TITUS_CONTAINER_INFO);
    c.hostname_style = p.string(a::POD_HOSTNAME_STYLE);
    c.sched_policy = p.string(a::POD_SCHED_POLICY);
    c.workload_metadata = p.string(a::SECURITY_WORKLOAD_METADATA);
    c.workload_metadata_sig = p.string(a::SECURITY_WORKLOAD_METADATA_SIG);

    if let Some(style) = c.hostname_style.as_deref() {
        if !matches!(style, "ec2" | "") {
            p.errors.push(Error::InvalidHostnameStyle {
                key: a::POD_HOSTNAME_STYLE.to_owned(),
            });
        }
    }

    c.log_keep_local_file = p.bool(a::LOG_KEEP_LOCAL_FILE);
    c.assign_ipv6_address = p.bool(a::NETWORK_ASSIGN_IPV6_ADDRESS);
    c.network_bursting_enabled = p.bool(a::NETWORK_BURSTING_ENABLED);
    c.jumbo_frames_enabled = p.bool(a::NETWORK_JUMBO_FRAMES_ENABLED);
    c.cpu_bursting_enabled = p.bool(a::POD_CPU_BURSTING_ENABLED);
    c.fuse_enabled = p.bool(a::POD_FUSE_ENABLED);
    c.kvm_enabled = p.bool(a::POD_KVM_ENABLED);
    c.seccomp_agent_net_enabled = p.bool(a::POD_SECCOMP_AGENT_NET_ENABLED);
    c.seccomp_agent_perf_enabled = p.bool(a::POD_SECCOMP_AGENT_PERF_ENABLED);
    c.entrypoint_shell_splitting = p.bool(a::POD_TITUS_ENTRYPOINT_SHELL_SPLITTING);

    c.pod_schema_version = p.typed(a::POD_SCHEMA_VERSION, KeyKind::Uint32, parse_schema_version);
    c.job_accepted_timestamp_ms = p.typed(a::JOB_ACCEPTED_TIMESTAMP_MS, KeyKind::Uint64, |v| {
        parse_unsigned(v).ok_or("invalid syntax or out of range")
    });
    c.oom_score_adj = p.typed(a::POD_OOM_SCORE_ADJ, KeyKind::Int32, |v| {
        parse_signed(v).ok_or("invalid syntax or out of range")
    });

    c.egress_bandwidth = p.resource(a::EGRESS_BANDWIDTH);
    c.ingress_bandwidth = p.resource(a::INGRESS_BANDWIDTH);

    c.log_stdio_check_interval = p.duration(a::LOG_STDIO_CHECK_INTERVAL);
    c.log_upload_check_interval = p.duration(a::LOG_UPLOAD_CHECK_INTERVAL);
    c.log_upload_threshold_time = p.duration(a::LOG_UPLOAD_THRESHOLD_TIME);

    c.log_upload_regexp = p.regexp(a::LOG_UPLOAD_REGEXP);

    c.security_group_ids = p.list(a::NETWORK_SECURITY_GROUPS);
    c.subnet_ids = p.list(a::NETWORK_SUBNET_IDS);
    c.system_env_var_names = p.list(a::POD_TITUS_SYSTEM_ENV_VAR_NAMES);

    if let Some(policy) = c.sched_policy.as_deref() {
        if !matches!(policy, "batch" | "idle") {
            p.errors.push(Error::InvalidSchedPolicy {
                key: a::POD_SCHED_POLICY.to_owned(),
            });
        }
    }

    c.sidecars = parse_services(annotations, p.errors);

    let mut p = Parser {
        source: Source::Label,
        map: labels,
        errors: &mut errors,
    };
    c.bytes_enabled = p.bool(label::BYTE_UNITS_ENABLED);
    c.capacity_group = p.string(label::CAPACITY_GROUP);
    c.task_id = p.string(label::TASK_ID);

    Translation { config: c, errors }
}

/// Translate a pod, reading the AppArmor profile, TTY setting and resource
/// limits from its user container.
pub fn translate_pod(pod: &Pod) -> Translation {
    let empty = BTreeMap::new();
    let annotations = pod.metadata.annotations.as_ref().unwrap_or(&empty);
    let labels = pod.metadata.labels.as_ref().unwrap_or(&empty);
    let user_container = pod.user_container();
    let mut r = translate(annotations, labels, user_container.map(|c| c.name.as_str()));
    if let Some(container) = user_container {
        let c = &mut r.config;
        let limit = |name: &str| container.resources.limits.get(name).cloned();
        c.tty_enabled = Some(container.tty);
        c.resource_cpu = limit(resource::CPU);
        c.resource_memory = limit(resource::MEMORY);
        c.resource_disk = limit(resource::EPHEMERAL_STORAGE);
        c.resource_gpu = limit(resource::GPU);
        c.resource_network = limit(resource::NETWORK);
    }
    tracing::debug!(
        "translated pod {}: {} errors",
        pod.metadata.name.as_deref().unwrap_or("<unnamed>"),
        r.errors.len()
    );
    r
}

/// The schema version a pod was created with; `0` if unset.
pub fn pod_schema_version(meta: &ObjectMeta) -> Result<u32, Error> {
    let Some(v) = meta
        .annotations
        .as_ref()
        .and_then(|m| m.get(a::POD_SCHEMA_VERSION))
    else {
        return Ok(0);
    };
    parse_schema_version(v).map_err(|_| Error::InvalidValue {
        origin: Source::Annotation,
        kind: KeyKind::Uint32,
        key: a::POD_SCHEMA_VERSION.to_owned(),
    })
}
