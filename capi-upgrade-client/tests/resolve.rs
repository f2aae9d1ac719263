//! Integration tests for kubeconfig resolution.

use base64::Engine;
use capi_upgrade_client::{
    ca::{CaError, CaHalf},
    config::{KubeConfigOptions, KubeconfigError},
    core::{Cluster, RawExtension},
    resolve,
    secrets::{BoxError, SecretNotFound, SecretStore},
    Config, CredentialSource, Error, ErrorKind, Secret,
};
use secrecy::ExposeSecret;
use serde_json::json;

const CA_CERT: &str = include_str!("../testdata/ca.crt.b64");
const CA_KEY: &str = include_str!("../testdata/ca.key.b64");
const EC_CA_CERT: &str = include_str!("../testdata/ec-ca.crt.b64");
const EC_CA_KEY: &str = include_str!("../testdata/ec-ca.key.b64");
const KUBECONFIG: &str = include_str!("../testdata/kubeconfig.yaml");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn b64(data: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn store_with(secret: Secret) -> SecretStore {
    SecretStore::default().with(secret)
}

fn cluster_with_provider_value(value: serde_json::Value) -> Cluster {
    let mut cluster = Cluster::new("clustername").within("default");
    cluster.spec.provider_spec.value = Some(RawExtension::from_json(&value).unwrap());
    cluster
}

fn assert_same_config(a: &Config, b: &Config) {
    assert_eq!(a.cluster_url, b.cluster_url);
    assert_eq!(a.root_cert, b.root_cert);
    assert_eq!(a.client_certificate, b.client_certificate);
    assert_eq!(
        a.client_key.as_ref().map(|k| k.expose_secret()),
        b.client_key.as_ref().map(|k| k.expose_secret())
    );
}

#[test]
fn ca_secret_resolves() {
    init_tracing();
    let secrets = store_with(Secret::new("name", [("cert", CA_CERT), ("key", CA_KEY)]));
    let config = resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:6443").unwrap();

    assert_eq!(config.cluster_url.to_string(), "https://example.com:6443/");
    let root = &config.root_cert.as_ref().unwrap()[0];
    let client = config.client_certificate.as_deref().unwrap();
    let client_der = pem::parse(client).unwrap().into_contents();
    assert_eq!(root, &client_der);
    assert!(config.identity_pem().is_some());
}

#[test]
fn ca_secret_accepts_ec_keys() {
    let secrets = store_with(Secret::new("name", [("cert", EC_CA_CERT), ("key", EC_CA_KEY)]));
    assert!(resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:6443").is_ok());
}

#[test]
fn ca_secret_missing_entries_fail() {
    let cases = [
        Secret::new("name", [("cert", CA_CERT)]),
        Secret::new("name", [("key", CA_KEY)]),
        Secret::new("name", Vec::<(&str, &str)>::new()),
    ];
    for secret in cases {
        let secrets = store_with(secret);
        let err = resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:6443").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField, "{err}");
    }
}

#[test]
fn ca_secret_fetch_errors_propagate() {
    let err = resolve::from_ca_secret(&SecretStore::default(), "name", "clustername", "https://example.com:6443")
        .unwrap_err();
    match err {
        Error::FetchSecret { ref name, ref source } => {
            assert_eq!(name, "name");
            assert!(source.downcast_ref::<SecretNotFound>().is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }

    let unavailable = |_: &str| -> Result<Secret, BoxError> { Err("connection refused".into()) };
    let err = resolve::from_ca_secret(&unavailable, "name", "clustername", "https://example.com:6443").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn ca_secret_undecodable_certificate_fails() {
    let not_a_cert = pem::encode(&pem::Pem::new("CERTIFICATE", b"garbage".to_vec()));
    let cases = [
        ("not base64 at all!".to_owned(), CaHalf::Certificate),
        (b64("no pem here"), CaHalf::Certificate),
        (b64(not_a_cert), CaHalf::Certificate),
    ];
    for (cert, half) in cases {
        let secrets = store_with(Secret::new("name", [("cert", cert.as_str()), ("key", CA_KEY)]));
        let err = resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:6443").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(matches!(err, Error::DecodeCa(ref ca) if ca.half() == half));
    }
}

#[test]
fn ca_secret_undecodable_key_names_the_key() {
    let secrets = store_with(Secret::new("name", [("cert", CA_CERT), ("key", "@@@")]));
    let err = resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:6443").unwrap_err();
    assert!(matches!(
        err,
        Error::DecodeCa(CaError::DecodeBase64 {
            half: CaHalf::Key,
            ..
        })
    ));
}

#[test]
fn cluster_field_resolves_embedded_document() {
    init_tracing();
    let cluster = cluster_with_provider_value(json!({"test": {"cert": CA_CERT, "key": CA_KEY}}));
    let config =
        resolve::from_ca_cluster_field(&cluster, "spec.providerSpec.value.test", "https://example.com:8888").unwrap();
    assert_eq!(config.cluster_url.to_string(), "https://example.com:8888/");
    assert!(config.client_key.is_some());
}

#[test]
fn cluster_field_matches_ca_secret() {
    let cluster = cluster_with_provider_value(json!({"test": {"cert": CA_CERT, "key": CA_KEY}}));
    let from_field =
        resolve::from_ca_cluster_field(&cluster, "spec.providerSpec.value.test", "https://example.com:8888").unwrap();

    let secrets = store_with(Secret::new("name", [("cert", CA_CERT), ("key", CA_KEY)]));
    let from_secret = resolve::from_ca_secret(&secrets, "name", "clustername", "https://example.com:8888").unwrap();
    assert_same_config(&from_field, &from_secret);
}

#[test]
fn cluster_field_missing_path_fails() {
    for path in ["some field", "spec.providerSpec.value.test", "", "spec..value", "metadata.name.first"] {
        let err = resolve::from_ca_cluster_field(&Cluster::default(), path, "https://example.com:8888").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldPath, "{path:?}: {err}");
    }
}

#[test]
fn cluster_field_malformed_document_fails_before_decoding() {
    let mut cluster = Cluster::new("clustername");
    cluster.spec.provider_spec.value = Some(RawExtension::new(b"{not json".to_vec()));
    let err =
        resolve::from_ca_cluster_field(&cluster, "spec.providerSpec.value.test", "https://example.com:8888").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldPath);
}

#[test]
fn cluster_field_without_ca_entries_fails() {
    let cluster = cluster_with_provider_value(json!({"test": {"cert": CA_CERT}}));
    let err =
        resolve::from_ca_cluster_field(&cluster, "spec.providerSpec.value.test", "https://example.com:8888").unwrap_err();
    assert!(matches!(err, Error::MissingFieldKey { key: "key", ref path } if path == "spec.providerSpec.value.test"));
}

#[test]
fn kubeconfig_secret_resolves() {
    init_tracing();
    let secrets = store_with(Secret::new("name", [("kubeconfig", KUBECONFIG)]));
    let config = resolve::from_kubeconfig_secret(&secrets, "name", "https://example.com:6443").unwrap();

    // the document's own endpoint wins over the given address
    assert_eq!(config.cluster_url.to_string(), "https://127.0.0.1:38499/");
    assert_eq!(config.root_cert.as_ref().map(Vec::len), Some(1));
    assert!(config.identity_pem().is_some());
}

#[test]
fn kubeconfig_secret_honours_options() {
    let secrets = store_with(Secret::new("name", [("kubeconfig", KUBECONFIG)]));
    let options = KubeConfigOptions {
        context: Some("missing".into()),
        ..Default::default()
    };
    let err = resolve::from_kubeconfig_secret_with_options(&secrets, "name", "", &options).unwrap_err();
    assert!(matches!(err, Error::Kubeconfig(KubeconfigError::LoadContext(ref name)) if name == "missing"));
}

#[test]
fn kubeconfig_secret_without_entry_fails() {
    let secrets = store_with(Secret::new("name", [("unknown key", "")]));
    let err = resolve::from_kubeconfig_secret(&secrets, "name", "https://example.com:6443").unwrap_err();
    assert!(matches!(err, Error::MissingSecretKey { key: "kubeconfig", .. }));

    let err = resolve::from_kubeconfig_secret(&SecretStore::default(), "name", "https://example.com:6443").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[test]
fn kubeconfig_secret_with_unusable_document_fails() {
    let documents: [&[u8]; 4] = [b"", b"clusters: [", b"\xff\xfe", b"clusters: 42"];
    for document in documents {
        let secrets = store_with(Secret::new("name", [("kubeconfig", document)]));
        let err = resolve::from_kubeconfig_secret(&secrets, "name", "https://example.com:6443").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Kubeconfig, "{err}");
    }
}

#[test]
fn rendered_kubeconfig_resolves_to_the_same_config() {
    let secrets = store_with(Secret::new("ca", [("cert", CA_CERT), ("key", CA_KEY)]));
    let config = resolve::from_ca_secret(&secrets, "ca", "clustername", "https://example.com:6443").unwrap();
    let document = config.to_kubeconfig("clustername").to_yaml().unwrap();

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), &document).unwrap();
    let reread = std::fs::read(file.path()).unwrap();

    let secrets = store_with(Secret::new("kubeconfig", [("kubeconfig", reread)]));
    let loaded = resolve::from_kubeconfig_secret(&secrets, "kubeconfig", "https://example.com:6443").unwrap();
    assert_same_config(&config, &loaded);
}

#[test]
fn resolvers_are_idempotent() {
    let secrets = SecretStore::default()
        .with(Secret::new("ca", [("cert", CA_CERT), ("key", CA_KEY)]))
        .with(Secret::new("broken", [("cert", "%%%"), ("key", CA_KEY)]))
        .with(Secret::new("kubeconfig", [("kubeconfig", KUBECONFIG)]));
    let cluster = cluster_with_provider_value(json!({"test": {"cert": CA_CERT, "key": CA_KEY}}));

    let sources = [
        CredentialSource::CaSecret {
            name: "ca".into(),
            cluster_name: "clustername".into(),
        },
        CredentialSource::CaSecret {
            name: "broken".into(),
            cluster_name: "clustername".into(),
        },
        CredentialSource::CaSecret {
            name: "missing".into(),
            cluster_name: "clustername".into(),
        },
        CredentialSource::CaClusterField {
            cluster: Box::new(cluster.clone()),
            path: "spec.providerSpec.value.test".into(),
        },
        CredentialSource::CaClusterField {
            cluster: Box::new(cluster),
            path: "spec.providerSpec.value.nope".into(),
        },
        CredentialSource::KubeconfigSecret {
            name: "kubeconfig".into(),
        },
        CredentialSource::KubeconfigSecret { name: "ca".into() },
    ];

    for source in &sources {
        let first = source.resolve(&secrets, "https://example.com:6443");
        let second = source.resolve(&secrets, "https://example.com:6443");
        match (first, second) {
            (Ok(a), Ok(b)) => assert_same_config(&a, &b),
            (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind(), "{source:?}"),
            (a, b) => panic!("{source:?} resolved differently: {a:?} vs {b:?}"),
        }
    }
}
