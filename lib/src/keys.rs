//! The annotation and label vocabulary.
//!
//! Keys are exported even when translation does not read them (ENI
//! details, scheduler predictions and so on), so that producers and
//! consumers share one definition. [`REGISTRY`] lists the keys that
//! translation does read, together with the type each is parsed as.

use std::fmt;

use crate::error::Source;

use self::annotation as a;
use self::KeyKind as K;

/// Annotation keys.
pub mod annotation {
    /// Instance type of the node
    pub const INSTANCE_TYPE: &str = "node.titus.netflix.com/itype";
    /// Region of the node
    pub const REGION: &str = "node.titus.netflix.com/region";
    /// Stack of the node
    pub const STACK: &str = "node.titus.netflix.com/stack";
    /// Availability zone
    pub const AZ: &str = "failure-domain.beta.kubernetes.io/zone";

    /// Egress bandwidth limit, a resource quantity
    pub const EGRESS_BANDWIDTH: &str = "kubernetes.io/egress-bandwidth";
    /// Ingress bandwidth limit, a resource quantity
    pub const INGRESS_BANDWIDTH: &str = "kubernetes.io/ingress-bandwidth";

    /// Assigned IPv4 address
    pub const IPV4_ADDRESS: &str = "network.netflix.com/address-ipv4";
    /// Assigned IPv4 prefix length
    pub const IPV4_PREFIX_LENGTH: &str = "network.netflix.com/prefixlen-ipv4";
    /// Assigned IPv6 address
    pub const IPV6_ADDRESS: &str = "network.netflix.com/address-ipv6";
    /// Assigned IPv6 prefix length
    pub const IPV6_PREFIX_LENGTH: &str = "network.netflix.com/prefixlen-ipv6";

    /// Branch ENI identifier
    pub const BRANCH_ENI_ID: &str = "network.netflix.com/branch-eni-id";
    /// Branch ENI MAC address
    pub const BRANCH_ENI_MAC: &str = "network.netflix.com/branch-eni-mac";
    /// Branch ENI VPC
    pub const BRANCH_ENI_VPC_ID: &str = "network.netflix.com/branch-eni-vpc";
    /// Branch ENI subnet
    pub const BRANCH_ENI_SUBNET: &str = "network.netflix.com/branch-eni-subnet";

    /// Trunk ENI identifier
    pub const TRUNK_ENI_ID: &str = "network.netflix.com/trunk-eni-id";
    /// Trunk ENI MAC address
    pub const TRUNK_ENI_MAC: &str = "network.netflix.com/trunk-eni-mac";
    /// Trunk ENI VPC
    pub const TRUNK_ENI_VPC_ID: &str = "network.netflix.com/trunk-eni-vpc";

    /// VLAN identifier
    pub const VLAN_ID: &str = "network.netflix.com/vlan-id";
    /// Allocation index
    pub const ALLOCATION_IDX: &str = "network.netflix.com/allocation-idx";

    /// IAM role; matches kube2iam
    pub const IAM_ROLE: &str = "iam.amazonaws.com/role";
    /// Security groups, legacy spelling
    pub const SECURITY_GROUPS_LEGACY: &str = "network.titus.netflix.com/securityGroups";
    /// Prefix of the per-container AppArmor profile key; the container
    /// name follows after a `/`.
    pub const PREFIX_APPARMOR: &str = "container.apparmor.security.beta.kubernetes.io";

    /// Schema version the pod was created with
    pub const POD_SCHEMA_VERSION: &str = "pod.netflix.com/pod-schema-version";

    /// Workload detail
    pub const WORKLOAD_DETAIL: &str = "app.netflix.com/detail";
    /// Workload name
    pub const WORKLOAD_NAME: &str = "app.netflix.com/name";
    /// Workload owner
    pub const WORKLOAD_OWNER_EMAIL: &str = "app.netflix.com/owner-email";
    /// Workload sequence
    pub const WORKLOAD_SEQUENCE: &str = "app.netflix.com/sequence";
    /// Workload stack
    pub const WORKLOAD_STACK: &str = "app.netflix.com/stack";

    /// Job acceptance time, milliseconds since the epoch
    pub const JOB_ACCEPTED_TIMESTAMP_MS: &str = "v3.job.titus.netflix.com/accepted-timestamp-ms";
    /// Job identifier
    pub const JOB_ID: &str = "v3.job.titus.netflix.com/id";
    /// Job type, e.g. `BATCH` or `SERVICE`
    pub const JOB_TYPE: &str = "v3.job.titus.netflix.com/type";
    /// Serialized job descriptor
    pub const JOB_DESCRIPTOR: &str = "v3.job.titus.netflix.com/descriptor";
    /// Serialized container info
    pub const POD_TITUS_CONTAINER_INFO: &str = "pod.titus.netflix.com/container-info";
    /// Names of environment variables set by the platform
    pub const POD_TITUS_SYSTEM_ENV_VAR_NAMES: &str = "pod.titus.netflix.com/system-env-var-names";
    /// Whether the entrypoint is split on whitespace
    pub const POD_TITUS_ENTRYPOINT_SHELL_SPLITTING: &str =
        "pod.titus.netflix.com/entrypoint-shell-splitting-enabled";

    /// Subnets, legacy spelling
    pub const SUBNETS_LEGACY: &str = "network.titus.netflix.com/subnets";
    /// Account, legacy spelling
    pub const ACCOUNT_ID_LEGACY: &str = "network.titus.netflix.com/accountId";
    /// Network account
    pub const NETWORK_ACCOUNT_ID: &str = "network.netflix.com/account-id";
    /// Whether network bursting is enabled
    pub const NETWORK_BURSTING_ENABLED: &str = "network.netflix.com/network-bursting-enabled";
    /// Whether to assign an IPv6 address
    pub const NETWORK_ASSIGN_IPV6_ADDRESS: &str = "network.netflix.com/assign-ipv6-address";
    /// Elastic IP pool
    pub const NETWORK_ELASTIC_IP_POOL: &str = "network.netflix.com/elastic-ip-pool";
    /// Elastic IPs, kept as written
    pub const NETWORK_ELASTIC_IPS: &str = "network.netflix.com/elastic-ips";
    /// IMDS token requirement
    pub const NETWORK_IMDS_REQUIRE_TOKEN: &str = "network.netflix.com/imds-require-token";
    /// Whether jumbo frames are enabled
    pub const NETWORK_JUMBO_FRAMES_ENABLED: &str = "network.netflix.com/jumbo-frames-enabled";
    /// Network mode
    pub const NETWORK_MODE: &str = "network.netflix.com/network-mode";
    /// Security groups, comma separated
    pub const NETWORK_SECURITY_GROUPS: &str = "network.netflix.com/security-groups";
    /// Subnets, comma separated
    pub const NETWORK_SUBNET_IDS: &str = "network.netflix.com/subnet-ids";
    /// Static IP allocation
    pub const NETWORK_STATIC_IP_ALLOCATION_UUID: &str =
        "network.netflix.com/static-ip-allocation-uuid";

    /// EBS volume identifier
    pub const STORAGE_EBS_VOLUME_ID: &str = "ebs.volume.netflix.com/volume-id";
    /// EBS mount path
    pub const STORAGE_EBS_MOUNT_PATH: &str = "ebs.volume.netflix.com/mount-path";
    /// EBS mount permissions
    pub const STORAGE_EBS_MOUNT_PERM: &str = "ebs.volume.netflix.com/mount-perm";
    /// EBS filesystem type
    pub const STORAGE_EBS_FS_TYPE: &str = "ebs.volume.netflix.com/fs-type";

    /// Signed workload metadata
    pub const SECURITY_WORKLOAD_METADATA: &str = "security.netflix.com/app-metadata";
    /// Signature of the workload metadata
    pub const SECURITY_WORKLOAD_METADATA_SIG: &str = "security.netflix.com/app-metadata-sig";

    /// Assigned opportunistic CPUs
    pub const OPPORTUNISTIC_CPU: &str = "opportunistic.scheduler.titus.netflix.com/cpu";
    /// Opportunistic resource used during scheduling
    pub const OPPORTUNISTIC_RESOURCE_ID: &str = "opportunistic.scheduler.titus.netflix.com/id";

    /// Predicted runtime
    pub const PREDICTION_RUNTIME: &str = "predictions.scheduler.titus.netflix.com/runtime";
    /// Confidence (percentile) of the runtime prediction
    pub const PREDICTION_CONFIDENCE: &str = "predictions.scheduler.titus.netflix.com/confidence";
    /// Model used for the runtime prediction
    pub const PREDICTION_MODEL_ID: &str = "predictions.scheduler.titus.netflix.com/model-id";
    /// Version of the prediction model
    pub const PREDICTION_MODEL_VERSION: &str = "predictions.scheduler.titus.netflix.com/version";
    /// Cell allocation for prediction A/B tests
    pub const PREDICTION_AB_TEST_CELL: &str = "predictions.scheduler.titus.netflix.com/ab-test";
    /// Predictions available during job admission
    pub const PREDICTION_AVAILABLE: &str = "predictions.scheduler.titus.netflix.com/available";
    /// Metadata from the prediction selector
    pub const PREDICTION_SELECTOR_INFO: &str =
        "predictions.scheduler.titus.netflix.com/selector-info";

    /// Whether CPU bursting is enabled
    pub const POD_CPU_BURSTING_ENABLED: &str = "pod.netflix.com/cpu-bursting-enabled";
    /// Whether KVM is enabled
    pub const POD_KVM_ENABLED: &str = "pod.netflix.com/kvm-enabled";
    /// Whether FUSE is enabled
    pub const POD_FUSE_ENABLED: &str = "pod.netflix.com/fuse-enabled";
    /// Hostname style, `ec2` or empty
    pub const POD_HOSTNAME_STYLE: &str = "pod.netflix.com/hostname-style";
    /// OOM score adjustment
    pub const POD_OOM_SCORE_ADJ: &str = "pod.netflix.com/oom-score-adj";
    /// Scheduler policy, `batch` or `idle`
    pub const POD_SCHED_POLICY: &str = "pod.netflix.com/sched-policy";
    /// Whether the seccomp agent handles networking
    pub const POD_SECCOMP_AGENT_NET_ENABLED: &str = "pod.netflix.com/seccomp-agent-net-enabled";
    /// Whether the seccomp agent handles perf
    pub const POD_SECCOMP_AGENT_PERF_ENABLED: &str = "pod.netflix.com/seccomp-agent-perf-enabled";

    /// Keep log files locally after upload
    pub const LOG_KEEP_LOCAL_FILE: &str = "log.netflix.com/keep-local-file-after-upload";
    /// Log upload bucket
    pub const LOG_S3_BUCKET_NAME: &str = "log.netflix.com/s3-bucket-name";
    /// Log upload path prefix
    pub const LOG_S3_PATH_PREFIX: &str = "log.netflix.com/s3-path-prefix";
    /// Role used to write logs
    pub const LOG_S3_WRITER_IAM_ROLE: &str = "log.netflix.com/s3-writer-iam-role";
    /// Interval between stdio checks
    pub const LOG_STDIO_CHECK_INTERVAL: &str = "log.netflix.com/stdio-check-interval";
    /// Age after which a log file is uploaded
    pub const LOG_UPLOAD_THRESHOLD_TIME: &str = "log.netflix.com/upload-threshold-time";
    /// Interval between upload checks
    pub const LOG_UPLOAD_CHECK_INTERVAL: &str = "log.netflix.com/upload-check-interval";
    /// Pattern of log files to upload
    pub const LOG_UPLOAD_REGEXP: &str = "log.netflix.com/upload-regexp";

    /// Prefix of sidecar service keys, `service.netflix.com/<name>.v<N>.<param>`
    pub const SERVICE_PREFIX: &str = "service.netflix.com";
}

/// Label keys.
pub mod label {
    /// Whether resources are expressed in bytes
    pub const BYTE_UNITS_ENABLED: &str = "pod.titus.netflix.com/byteUnits";
    /// Capacity group
    pub const CAPACITY_GROUP: &str = "titus.netflix.com/capacity-group";
    /// Task identifier
    pub const TASK_ID: &str = "v3.job.titus.netflix.com/task-id";
}

/// Names in a container's `resources.limits`.
pub mod resource {
    /// CPU cores
    pub const CPU: &str = "cpu";
    /// Memory
    pub const MEMORY: &str = "memory";
    /// Local disk
    pub const EPHEMERAL_STORAGE: &str = "ephemeral-storage";
    /// GPUs
    pub const GPU: &str = "titus/gpu";
    /// Network bandwidth
    pub const NETWORK: &str = "titus/network";
}

/// The type a key's value is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Kept verbatim
    String,
    /// `true`, `false` and their spellings
    Boolean,
    /// Signed 32 bit integer
    Int32,
    /// Unsigned 32 bit integer
    Uint32,
    /// Unsigned 64 bit integer
    Uint64,
    /// Resource quantity such as `10M`
    Resource,
    /// Duration such as `2m`
    Duration,
    /// Regular expression
    Regexp,
    /// Comma separated list
    List,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyKind::String => "string",
            KeyKind::Boolean => "boolean",
            KeyKind::Int32 => "int32",
            KeyKind::Uint32 => "uint32",
            KeyKind::Uint64 => "uint64",
            KeyKind::Resource => "resource",
            KeyKind::Duration => "duration",
            KeyKind::Regexp => "regexp",
            KeyKind::List => "list",
        };
        f.write_str(s)
    }
}

/// One recognized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    /// The key; for [`KeySpec::container_scoped`] entries this is a prefix.
    pub key: &'static str,
    /// Whether it is read from annotations or labels
    pub source: Source,
    /// How the value is parsed
    pub kind: KeyKind,
    /// Name of the [`crate::Config`] field it populates
    pub field: &'static str,
    /// Whether the user container's name is appended to the key
    pub container_scoped: bool,
}

const fn ann(key: &'static str, kind: KeyKind, field: &'static str) -> KeySpec {
    KeySpec {
        key,
        source: Source::Annotation,
        kind,
        field,
        container_scoped: false,
    }
}

const fn lbl(key: &'static str, kind: KeyKind, field: &'static str) -> KeySpec {
    KeySpec {
        key,
        source: Source::Label,
        kind,
        field,
        container_scoped: false,
    }
}

/// Every scalar and list key that translation reads. Sidecar services
/// under [`annotation::SERVICE_PREFIX`] are not listed here.
pub static REGISTRY: &[KeySpec] = &[
    KeySpec {
        key: a::PREFIX_APPARMOR,
        source: Source::Annotation,
        kind: K::String,
        field: "apparmor_profile",
        container_scoped: true,
    },
    ann(a::WORKLOAD_DETAIL, K::String, "workload_detail"),
    ann(a::WORKLOAD_NAME, K::String, "workload_name"),
    ann(a::WORKLOAD_OWNER_EMAIL, K::String, "workload_owner_email"),
    ann(a::WORKLOAD_SEQUENCE, K::String, "workload_sequence"),
    ann(a::WORKLOAD_STACK, K::String, "workload_stack"),
    ann(a::IAM_ROLE, K::String, "iam_role"),
    ann(a::JOB_DESCRIPTOR, K::String, "job_descriptor"),
    ann(a::JOB_ID, K::String, "job_id"),
    ann(a::JOB_TYPE, K::String, "job_type"),
    ann(a::LOG_S3_BUCKET_NAME, K::String, "log_s3_bucket_name"),
    ann(a::LOG_S3_PATH_PREFIX, K::String, "log_s3_path_prefix"),
    ann(a::LOG_S3_WRITER_IAM_ROLE, K::String, "log_s3_writer_iam_role"),
    ann(a::NETWORK_ACCOUNT_ID, K::String, "account_id"),
    ann(a::NETWORK_ELASTIC_IP_POOL, K::String, "elastic_ip_pool"),
    ann(a::NETWORK_ELASTIC_IPS, K::String, "elastic_ips"),
    ann(a::NETWORK_IMDS_REQUIRE_TOKEN, K::String, "imds_require_token"),
    ann(a::NETWORK_MODE, K::String, "network_mode"),
    ann(
        a::NETWORK_STATIC_IP_ALLOCATION_UUID,
        K::String,
        "static_ip_allocation_uuid",
    ),
    ann(a::POD_TITUS_CONTAINER_INFO, K::String, "container_info"),
    ann(a::POD_HOSTNAME_STYLE, K::String, "hostname_style"),
    ann(a::POD_SCHED_POLICY, K::String, "sched_policy"),
    ann(a::SECURITY_WORKLOAD_METADATA, K::String, "workload_metadata"),
    ann(a::SECURITY_WORKLOAD_METADATA_SIG, K::String, "workload_metadata_sig"),
    ann(a::LOG_KEEP_LOCAL_FILE, K::Boolean, "log_keep_local_file"),
    ann(a::NETWORK_ASSIGN_IPV6_ADDRESS, K::Boolean, "assign_ipv6_address"),
    ann(a::NETWORK_BURSTING_ENABLED, K::Boolean, "network_bursting_enabled"),
    ann(a::NETWORK_JUMBO_FRAMES_ENABLED, K::Boolean, "jumbo_frames_enabled"),
    ann(a::POD_CPU_BURSTING_ENABLED, K::Boolean, "cpu_bursting_enabled"),
    ann(a::POD_FUSE_ENABLED, K::Boolean, "fuse_enabled"),
    ann(a::POD_KVM_ENABLED, K::Boolean, "kvm_enabled"),
    ann(a::POD_SECCOMP_AGENT_NET_ENABLED, K::Boolean, "seccomp_agent_net_enabled"),
    ann(a::POD_SECCOMP_AGENT_PERF_ENABLED, K::Boolean, "seccomp_agent_perf_enabled"),
    ann(
        a::POD_TITUS_ENTRYPOINT_SHELL_SPLITTING,
        K::Boolean,
        "entrypoint_shell_splitting",
    ),
    ann(a::POD_SCHEMA_VERSION, K::Uint32, "pod_schema_version"),
    ann(a::JOB_ACCEPTED_TIMESTAMP_MS, K::Uint64, "job_accepted_timestamp_ms"),
    ann(a::POD_OOM_SCORE_ADJ, K::Int32, "oom_score_adj"),
    ann(a::EGRESS_BANDWIDTH, K::Resource, "egress_bandwidth"),
    ann(a::INGRESS_BANDWIDTH, K::Resource, "ingress_bandwidth"),
    ann(a::LOG_STDIO_CHECK_INTERVAL, K::Duration, "log_stdio_check_interval"),
    ann(a::LOG_UPLOAD_CHECK_INTERVAL, K::Duration, "log_upload_check_interval"),
    ann(a::LOG_UPLOAD_THRESHOLD_TIME, K::Duration, "log_upload_threshold_time"),
    ann(a::LOG_UPLOAD_REGEXP, K::Regexp, "log_upload_regexp"),
    ann(a::NETWORK_SECURITY_GROUPS, K::List, "security_group_ids"),
    ann(a::NETWORK_SUBNET_IDS, K::List, "subnet_ids"),
    ann(a::POD_TITUS_SYSTEM_ENV_VAR_NAMES, K::List, "system_env_var_names"),
    lbl(label::BYTE_UNITS_ENABLED, K::Boolean, "bytes_enabled"),
    lbl(label::CAPACITY_GROUP, K::String, "capacity_group"),
    lbl(label::TASK_ID, K::String, "task_id"),
];

/// The AppArmor profile key for a given container.
pub fn apparmor_key(container: &str) -> String {
    format!("{}/{container}", annotation::PREFIX_APPARMOR)
}
