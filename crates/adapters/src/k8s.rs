// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes execution backend.
//!
//! Records are `ProwJob` objects created in a single namespace; the status
//! stream is a label-selected watch on that namespace. Temporary shared
//! resources are plain ConfigMaps in the same namespace.

use crate::backend::{BackendError, ExecutionBackend, JobStatus, StatusEvent, StatusStream};
use crate::prowjob::ProwJob;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams, WatchEvent, WatchParams};
use kube::Client;
use rehearse_core::RehearsalConfig;
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
    namespace: String,
    resource_label_key: String,
}

impl KubeBackend {
    /// Connect with the ambient kubeconfig or in-cluster credentials.
    pub async fn new(
        namespace: impl Into<String>,
        config: &RehearsalConfig,
    ) -> Result<Self, BackendError> {
        let client = Client::try_default()
            .await
            .map_err(|e| BackendError::Client(format!("failed to create kube client: {}", e)))?;
        Ok(Self::with_client(client, namespace, config))
    }

    pub fn with_client(
        client: Client,
        namespace: impl Into<String>,
        config: &RehearsalConfig,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            resource_label_key: config.resource_label_key.clone(),
        }
    }

    fn jobs(&self) -> Api<ProwJob> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn config_maps(&self) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

/// A temporary ConfigMap labelled as a rehearsal resource.
fn temporary_config_map(
    name: &str,
    namespace: &str,
    label_key: &str,
    data: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(label_key.to_string(), "true".to_string())])),
            ..Default::default()
        },
        data: Some(data.clone()),
        ..Default::default()
    }
}

fn status_event(event: WatchEvent<ProwJob>) -> Result<StatusEvent, BackendError> {
    match event {
        WatchEvent::Added(job) | WatchEvent::Modified(job) | WatchEvent::Deleted(job) => {
            Ok(StatusEvent::Updated(JobStatus::from(&job)))
        }
        WatchEvent::Bookmark(_) => Ok(StatusEvent::Bookmark),
        WatchEvent::Error(e) => Err(BackendError::Stream(format!("{} ({})", e.message, e.code))),
    }
}

#[async_trait]
impl ExecutionBackend for KubeBackend {
    async fn submit(&self, record: &ProwJob) -> Result<ProwJob, BackendError> {
        self.jobs()
            .create(&PostParams::default(), record)
            .await
            .map_err(|e| BackendError::SubmitFailed(e.to_string()))
    }

    async fn watch(&self, label_selector: &str) -> Result<StatusStream, BackendError> {
        let params = WatchParams::default().labels(label_selector);
        let stream = self
            .jobs()
            .watch(&params, "0")
            .await
            .map_err(|e| BackendError::WatchFailed(e.to_string()))?;
        tracing::debug!(namespace = %self.namespace, %label_selector, "opened prowjob watch");
        Ok(stream
            .map_err(|e| BackendError::Stream(e.to_string()))
            .and_then(|event| futures_util::future::ready(status_event(event)))
            .boxed())
    }

    async fn apply_config_map(
        &self,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), BackendError> {
        let api = self.config_maps();
        let cm = temporary_config_map(name, &self.namespace, &self.resource_label_key, data);
        let err = |e: kube::Error| BackendError::ConfigMap {
            name: name.to_string(),
            message: e.to_string(),
        };

        match api.create(&PostParams::default(), &cm).await {
            Ok(_) => {
                tracing::info!(config_map = %name, "created temporary config map");
                Ok(())
            }
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                let existing = api.get(name).await.map_err(err)?;
                let mut replacement = cm;
                replacement.metadata.resource_version = existing.metadata.resource_version;
                api.replace(name, &PostParams::default(), &replacement).await.map_err(err)?;
                tracing::info!(config_map = %name, "replaced temporary config map");
                Ok(())
            }
            Err(e) => Err(err(e)),
        }
    }

    async fn delete_config_map(&self, name: &str) -> Result<(), BackendError> {
        self.config_maps().delete(name, &DeleteParams::default()).await.map_err(|e| {
            BackendError::ConfigMap { name: name.to_string(), message: e.to_string() }
        })?;
        tracing::info!(config_map = %name, "deleted temporary config map");
        Ok(())
    }
}

#[cfg(test)]
#[path = "k8s_tests.rs"]
mod tests;
