use super::{
    file_config::{AuthInfo, Cluster, Context, Kubeconfig},
    KubeconfigError,
};

/// KubeConfigOptions stores options used when loading a kubeconfig document.
#[derive(Default, Clone, Debug)]
pub struct KubeConfigOptions {
    /// The named context to load
    pub context: Option<String>,
    /// The cluster to load
    pub cluster: Option<String>,
    /// The user to load
    pub user: Option<String>,
}

/// ConfigLoader loads current context, cluster, and authentication information
/// from a kubeconfig document.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    /// The selected context
    pub current_context: Context,
    /// The cluster the context (or an override) points at
    pub cluster: Cluster,
    /// The user the context (or an override) points at
    pub user: AuthInfo,
}

impl ConfigLoader {
    /// Returns a config loader for the selection described by `options`.
    pub fn new_from_kubeconfig(
        config: Kubeconfig,
        options: &KubeConfigOptions,
    ) -> Result<Self, KubeconfigError> {
        Self::load(
            config,
            options.context.as_ref(),
            options.cluster.as_ref(),
            options.user.as_ref(),
        )
    }

    /// Select a context, then its cluster and user, each overridable by name.
    pub fn load(
        config: Kubeconfig,
        context: Option<&String>,
        cluster: Option<&String>,
        user: Option<&String>,
    ) -> Result<Self, KubeconfigError> {
        let context_name = if let Some(name) = context {
            name
        } else if let Some(name) = &config.current_context {
            name
        } else {
            return Err(KubeconfigError::CurrentContextNotSet);
        };

        let current_context = config
            .contexts
            .iter()
            .find(|named_context| &named_context.name == context_name)
            .and_then(|named_context| named_context.context.clone())
            .ok_or_else(|| KubeconfigError::LoadContext(context_name.clone()))?;

        let cluster_name = cluster.unwrap_or(&current_context.cluster);
        let cluster = config
            .clusters
            .iter()
            .find(|named_cluster| &named_cluster.name == cluster_name)
            .and_then(|named_cluster| named_cluster.cluster.clone())
            .ok_or_else(|| KubeconfigError::LoadClusterOfContext(cluster_name.clone()))?;

        let user_name = user.unwrap_or(&current_context.user);
        let user = config
            .auth_infos
            .iter()
            .find(|named_user| &named_user.name == user_name)
            .and_then(|named_user| named_user.auth_info.clone())
            .ok_or_else(|| KubeconfigError::FindUser(user_name.clone()))?;

        tracing::trace!(context = %context_name, cluster = %cluster_name, user = %user_name, "selected kubeconfig context");

        Ok(ConfigLoader {
            current_context,
            cluster,
            user,
        })
    }

    /// DER encoded certificates of the cluster's certificate authority, if configured.
    pub fn ca_bundle(&self) -> Result<Option<Vec<Vec<u8>>>, KubeconfigError> {
        if let Some(bundle) = self.cluster.load_certificate_authority()? {
            Ok(Some(
                super::certs(&bundle).map_err(KubeconfigError::ParseCertificates)?,
            ))
        } else {
            Ok(None)
        }
    }

    /// The proxy configured for the cluster.
    ///
    /// Unlike a local client, proxy environment variables are not consulted:
    /// the configuration describes a remote cluster, not this process.
    pub fn proxy_url(&self) -> Result<Option<http::Uri>, KubeconfigError> {
        self.cluster
            .proxy_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|proxy| proxy.parse::<http::Uri>().map_err(KubeconfigError::ParseProxyUrl))
            .transpose()
    }
}
