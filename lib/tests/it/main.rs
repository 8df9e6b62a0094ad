//! End-to-end translation of whole pods.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use indoc::indoc;
use podconfig_lib::k8sapitypes::Pod;
use podconfig_lib::keys::{annotation, label};
use podconfig_lib::quantity::Quantity;
use podconfig_lib::{translate_pod, Config, Pattern, Sidecar};

const SHA: &str = "5abd793cc69018e747cb8d4bc288f1df7b20747f91ec26da88f0fa4ba2ec46a1";

/// A pod with one container, `task-id-in-container`, and a TTY.
fn build_pod(annotations: &[(&str, &str)], labels: &[(&str, &str)]) -> Pod {
    let mut pod: Pod = serde_yaml::from_str(indoc! { r#"
        apiVersion: v1
        kind: Pod
        metadata:
          name: foo
          namespace: default
        spec:
          containers:
          - name: task-id-in-container
            image: my-registry.example.com/sample/helloworld:latest
            tty: true
            resources:
              limits:
                cpu: 1
                memory: 512Mi
                ephemeral-storage: 10Gi
                titus/gpu: 0
                titus/network: 128M
              requests:
                cpu: 1
                memory: 512Mi
                ephemeral-storage: 10Gi
                titus/gpu: 0
                titus/network: 128M
    "# })
    .unwrap();
    let to_map = |kvs: &[(&str, &str)]| -> BTreeMap<String, String> {
        kvs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };
    pod.metadata.annotations = Some(to_map(annotations));
    pod.metadata.labels = Some(to_map(labels));
    pod
}

fn error_messages(pod: &Pod) -> Vec<String> {
    translate_pod(pod)
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn quantity(s: &str) -> Option<Quantity> {
    Some(Quantity::parse(s).unwrap())
}

/// The container-derived settings of [`build_pod`].
fn container_config() -> Config {
    Config {
        resource_cpu: quantity("1"),
        resource_disk: quantity("10737418240"),
        resource_gpu: quantity("0"),
        resource_memory: quantity("536870912"),
        resource_network: quantity("128M"),
        tty_enabled: Some(true),
        ..Default::default()
    }
}

fn strings(v: &[&str]) -> Option<Vec<String>> {
    Some(v.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_parse_pod() {
    let apparmor = format!("{}/task-id-in-container", annotation::PREFIX_APPARMOR);
    let pod = build_pod(
        &[
            (apparmor.as_str(), "localhost/docker_titus"),
            (annotation::IAM_ROLE, "arn:aws:iam::0:role/DefaultContainerRole"),
            (annotation::JOB_ID, "myjobid"),
            (annotation::JOB_TYPE, "BATCH"),
            (annotation::JOB_DESCRIPTOR, "myjobdesc"),
            (annotation::POD_TITUS_CONTAINER_INFO, "cinfo"),
            (annotation::WORKLOAD_DETAIL, "mydetail"),
            (annotation::WORKLOAD_NAME, "myapp"),
            (annotation::WORKLOAD_OWNER_EMAIL, "test@example.com"),
            (annotation::WORKLOAD_SEQUENCE, "v000"),
            (annotation::WORKLOAD_STACK, "mystack"),
            (annotation::NETWORK_ACCOUNT_ID, "123456"),
            (annotation::NETWORK_ELASTIC_IP_POOL, "pool-1"),
            (annotation::NETWORK_ELASTIC_IPS, "eip-1,eip-2"),
            (annotation::NETWORK_IMDS_REQUIRE_TOKEN, "require-token"),
            (annotation::NETWORK_MODE, "example-network-mode"),
            (annotation::NETWORK_SECURITY_GROUPS, "sg-1 , sg-2 "),
            (annotation::NETWORK_STATIC_IP_ALLOCATION_UUID, "static-ip-alloc-id"),
            (annotation::NETWORK_SUBNET_IDS, "subnet-1 , subnet-2 "),
            (annotation::POD_TITUS_SYSTEM_ENV_VAR_NAMES, "SYSTEM1 , SYSTEM2 "),
            // Recognized but not translated
            (annotation::OPPORTUNISTIC_CPU, "4"),
            (annotation::OPPORTUNISTIC_RESOURCE_ID, "op-res-id"),
            (annotation::PREDICTION_RUNTIME, "44"),
            (annotation::PREDICTION_CONFIDENCE, "5"),
            (annotation::PREDICTION_MODEL_ID, "model-id"),
            (annotation::PREDICTION_MODEL_VERSION, "v2"),
            (annotation::PREDICTION_AB_TEST_CELL, "cell1"),
            (annotation::PREDICTION_AVAILABLE, "a,b"),
            (annotation::PREDICTION_SELECTOR_INFO, "prediction"),
            (annotation::SECURITY_WORKLOAD_METADATA, "app-metadata"),
            (annotation::SECURITY_WORKLOAD_METADATA_SIG, "app-metadata-sig"),
            (annotation::POD_HOSTNAME_STYLE, "ec2"),
            (annotation::POD_SCHED_POLICY, "batch"),
            (annotation::LOG_S3_BUCKET_NAME, "bucket-name"),
            (annotation::LOG_S3_PATH_PREFIX, "s3-prefix"),
            (annotation::LOG_S3_WRITER_IAM_ROLE, "arn:aws:iam::0:role/LogWriterRole"),
            (annotation::LOG_KEEP_LOCAL_FILE, "true"),
            (annotation::NETWORK_ASSIGN_IPV6_ADDRESS, "true"),
            (annotation::NETWORK_BURSTING_ENABLED, "true"),
            (annotation::NETWORK_JUMBO_FRAMES_ENABLED, "true"),
            (annotation::POD_CPU_BURSTING_ENABLED, "true"),
            (annotation::POD_FUSE_ENABLED, "true"),
            (annotation::POD_KVM_ENABLED, "true"),
            (annotation::POD_SECCOMP_AGENT_NET_ENABLED, "true"),
            (annotation::POD_SECCOMP_AGENT_PERF_ENABLED, "true"),
            (annotation::POD_TITUS_ENTRYPOINT_SHELL_SPLITTING, "true"),
            (annotation::POD_SCHEMA_VERSION, "2"),
            (annotation::JOB_ACCEPTED_TIMESTAMP_MS, "1602201163007"),
            (annotation::POD_OOM_SCORE_ADJ, "-800"),
            (annotation::EGRESS_BANDWIDTH, "10M"),
            (annotation::INGRESS_BANDWIDTH, "20M"),
            (annotation::LOG_STDIO_CHECK_INTERVAL, "2m"),
            (annotation::LOG_UPLOAD_CHECK_INTERVAL, "1m"),
            (annotation::LOG_UPLOAD_THRESHOLD_TIME, "3m"),
            ("service.netflix.com/servicemesh.v2.enabled", "true"),
            ("service.netflix.com/servicemesh.v2.image", "titusops/servicemesh:latest"),
        ],
        &[
            (label::BYTE_UNITS_ENABLED, "true"),
            (label::CAPACITY_GROUP, "DEFAULT"),
            (label::TASK_ID, "task-id-in-label"),
        ],
    );

    let config = translate_pod(&pod).into_result().unwrap();
    let expected = Config {
        apparmor_profile: Some("localhost/docker_titus".into()),
        account_id: Some("123456".into()),
        assign_ipv6_address: Some(true),
        bytes_enabled: Some(true),
        capacity_group: Some("DEFAULT".into()),
        container_info: Some("cinfo".into()),
        cpu_bursting_enabled: Some(true),
        egress_bandwidth: quantity("10000000"),
        elastic_ip_pool: Some("pool-1".into()),
        elastic_ips: Some("eip-1,eip-2".into()),
        entrypoint_shell_splitting: Some(true),
        fuse_enabled: Some(true),
        hostname_style: Some("ec2".into()),
        iam_role: Some("arn:aws:iam::0:role/DefaultContainerRole".into()),
        imds_require_token: Some("require-token".into()),
        ingress_bandwidth: quantity("20e6"),
        job_accepted_timestamp_ms: Some(1602201163007),
        job_descriptor: Some("myjobdesc".into()),
        job_id: Some("myjobid".into()),
        job_type: Some("BATCH".into()),
        jumbo_frames_enabled: Some(true),
        kvm_enabled: Some(true),
        log_keep_local_file: Some(true),
        log_stdio_check_interval: Some(TimeDelta::seconds(120)),
        log_upload_check_interval: Some(TimeDelta::seconds(60)),
        log_upload_threshold_time: Some(TimeDelta::seconds(180)),
        log_upload_regexp: None,
        log_s3_bucket_name: Some("bucket-name".into()),
        log_s3_path_prefix: Some("s3-prefix".into()),
        log_s3_writer_iam_role: Some("arn:aws:iam::0:role/LogWriterRole".into()),
        network_bursting_enabled: Some(true),
        network_mode: Some("example-network-mode".into()),
        oom_score_adj: Some(-800),
        pod_schema_version: Some(2),
        resource_cpu: quantity("1"),
        resource_disk: quantity("10737418240"),
        resource_gpu: quantity("0"),
        resource_memory: quantity("536870912"),
        resource_network: quantity("128M"),
        sched_policy: Some("batch".into()),
        seccomp_agent_net_enabled: Some(true),
        seccomp_agent_perf_enabled: Some(true),
        security_group_ids: strings(&["sg-1", "sg-2"]),
        sidecars: vec![Sidecar {
            name: "servicemesh".into(),
            version: 2,
            enabled: true,
            image: Some("titusops/servicemesh:latest".into()),
        }],
        static_ip_allocation_uuid: Some("static-ip-alloc-id".into()),
        subnet_ids: strings(&["subnet-1", "subnet-2"]),
        system_env_var_names: strings(&["SYSTEM1", "SYSTEM2"]),
        task_id: Some("task-id-in-label".into()),
        tty_enabled: Some(true),
        workload_detail: Some("mydetail".into()),
        workload_metadata: Some("app-metadata".into()),
        workload_metadata_sig: Some("app-metadata-sig".into()),
        workload_name: Some("myapp".into()),
        workload_owner_email: Some("test@example.com".into()),
        workload_sequence: Some("v000".into()),
        workload_stack: Some("mystack".into()),
    };
    similar_asserts::assert_eq!(expected, config);
}

#[test]
fn test_parse_pod_empty() {
    let pod = build_pod(&[], &[]);
    let config = translate_pod(&pod).into_result().unwrap();
    // Only the container-derived settings are present
    similar_asserts::assert_eq!(config, container_config());

    let pod: Pod = serde_yaml::from_str("metadata: {name: bare}").unwrap();
    let config = translate_pod(&pod).into_result().unwrap();
    similar_asserts::assert_eq!(config, Config::default());
}

#[test]
fn test_parse_pod_invalid() {
    let cases = [
        (
            annotation::POD_HOSTNAME_STYLE,
            "not-ec2",
            "annotation is not a valid hostname style: pod.netflix.com/hostname-style",
        ),
        (
            annotation::LOG_KEEP_LOCAL_FILE,
            "yes",
            "annotation is not a valid boolean value: log.netflix.com/keep-local-file-after-upload",
        ),
        (
            annotation::POD_SCHEMA_VERSION,
            "-2",
            "annotation is not a valid uint32 value: pod.netflix.com/pod-schema-version",
        ),
        (
            annotation::JOB_ACCEPTED_TIMESTAMP_MS,
            "-5",
            "annotation is not a valid uint64 value: v3.job.titus.netflix.com/accepted-timestamp-ms",
        ),
        (
            annotation::POD_OOM_SCORE_ADJ,
            "foo",
            "annotation is not a valid int32 value: pod.netflix.com/oom-score-adj",
        ),
        (
            annotation::EGRESS_BANDWIDTH,
            "10ZiB",
            "annotation is not a valid resource value: kubernetes.io/egress-bandwidth",
        ),
        (
            annotation::LOG_STDIO_CHECK_INTERVAL,
            "2yearz",
            "annotation is not a valid duration value: log.netflix.com/stdio-check-interval",
        ),
        (
            annotation::POD_SCHED_POLICY,
            "something",
            "annotation is not a valid scheduler policy: pod.netflix.com/sched-policy",
        ),
        (
            "service.netflix.com/only-one-field",
            "true",
            "annotation has an incorrect number of service configuration parameters: service.netflix.com/only-one-field",
        ),
        (
            "service.netflix.com/foo.vA.enabled",
            "true",
            "annotation has an incorrect service version number: service.netflix.com/foo.vA.enabled",
        ),
        (
            "service.netflix.com/foo.v1.enabled",
            "asdf",
            "annotation has an incorrect service enabled boolean value: service.netflix.com/foo.v1.enabled",
        ),
        (
            "service.netflix.com/foo.v1.image",
            "asdf",
            "error parsing service image annotation: service.netflix.com/foo.v1.image: image does not have a digest or tag",
        ),
    ];
    for (key, value, expected) in cases {
        let pod = build_pod(&[(key, value)], &[]);
        assert_eq!(error_messages(&pod), [expected]);
    }

    let pod = build_pod(&[], &[(label::BYTE_UNITS_ENABLED, "yep")]);
    assert_eq!(
        error_messages(&pod),
        ["label is not a valid boolean value: pod.titus.netflix.com/byteUnits"]
    );
}

#[test]
fn test_bad_bool_annotations() {
    for key in [
        annotation::LOG_KEEP_LOCAL_FILE,
        annotation::NETWORK_ASSIGN_IPV6_ADDRESS,
        annotation::NETWORK_BURSTING_ENABLED,
        annotation::NETWORK_JUMBO_FRAMES_ENABLED,
        annotation::POD_CPU_BURSTING_ENABLED,
        annotation::POD_FUSE_ENABLED,
        annotation::POD_KVM_ENABLED,
        annotation::POD_SECCOMP_AGENT_NET_ENABLED,
        annotation::POD_SECCOMP_AGENT_PERF_ENABLED,
        annotation::POD_TITUS_ENTRYPOINT_SHELL_SPLITTING,
    ] {
        let pod = build_pod(&[(key, "bad")], &[]);
        assert_eq!(
            error_messages(&pod),
            [format!("annotation is not a valid boolean value: {key}")]
        );
    }
}

#[test]
fn test_combined_error() {
    let pod = build_pod(
        &[
            (annotation::POD_KVM_ENABLED, "bad"),
            (annotation::POD_OOM_SCORE_ADJ, "100"),
            (annotation::POD_SCHED_POLICY, "something"),
        ],
        &[],
    );
    let t = translate_pod(&pod);
    assert_eq!(t.config.oom_score_adj, Some(100));
    let err = t.into_result().unwrap_err();
    assert_eq!(
        err.to_string(),
        "2 errors occurred:\n\
         \t* annotation is not a valid boolean value: pod.netflix.com/kvm-enabled\n\
         \t* annotation is not a valid scheduler policy: pod.netflix.com/sched-policy\n\n"
    );
}

#[test]
fn test_log_upload_regexp() {
    let pod = build_pod(&[(annotation::LOG_UPLOAD_REGEXP, ".*.foo")], &[]);
    let config = translate_pod(&pod).into_result().unwrap();
    let re = config.log_upload_regexp.unwrap();
    assert_eq!(re.as_str(), ".*.foo");
    assert!(re.is_match("logs/app.foo"));
    assert_eq!(re, Pattern::new(".*.foo").unwrap());
}

#[test]
fn test_service_annotations() {
    let digested = format!("titusops/svc@sha256:{SHA}");
    // Declaration order does not matter
    let kvs = [
        ("service.netflix.com/svc.v3.image", digested.as_str()),
        ("service.netflix.com/svc.v2.enabled", "false"),
        ("service.netflix.com/svc.v3.enabled", "true"),
        ("service.netflix.com/svc.v2.image", "titusops/svc:latest"),
    ];
    let pod = build_pod(&kvs, &[]);
    let config = translate_pod(&pod).into_result().unwrap();
    similar_asserts::assert_eq!(
        config.sidecars,
        vec![
            Sidecar {
                name: "svc".into(),
                version: 2,
                enabled: false,
                image: Some("titusops/svc:latest".into()),
            },
            Sidecar {
                name: "svc".into(),
                version: 3,
                enabled: true,
                image: Some(digested.clone()),
            },
        ]
    );
}

#[test]
fn test_user_container_selection() {
    let mut pod: Pod = serde_yaml::from_str(indoc! { r#"
        metadata:
          name: app
          annotations:
            container.apparmor.security.beta.kubernetes.io/app: profile-app
            container.apparmor.security.beta.kubernetes.io/sidecar: profile-sidecar
        spec:
          containers:
          - name: sidecar
          - name: app
            tty: true
    "# })
    .unwrap();
    let config = translate_pod(&pod).into_result().unwrap();
    assert_eq!(config.apparmor_profile.as_deref(), Some("profile-app"));
    assert_eq!(config.tty_enabled, Some(true));

    // No container named after the pod: the first one is used
    pod.metadata.name = Some("other".into());
    let config = translate_pod(&pod).into_result().unwrap();
    assert_eq!(config.apparmor_profile.as_deref(), Some("profile-sidecar"));
    assert_eq!(config.tty_enabled, Some(false));
}
