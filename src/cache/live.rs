//! Live cluster access.
//!
//! Fetches deployments, pods and metrics-server pod metrics into a
//! [`Snapshot`] the sanitizers can work on.
//!
//! # Prerequisites
//!
//! - Valid kubeconfig (uses default context or specified context)
//! - RBAC permissions to list deployments and pods
//! - metrics-server, only when utilization analysis is wanted

use super::Snapshot;
use crate::error::{HygieneError, Result};
use crate::metrics::PodMetrics;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    Client, Config,
    api::{Api, ListParams},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PodMetricsList {
    items: Vec<PodMetrics>,
}

fn kube_error(what: &str, e: impl std::fmt::Display) -> HygieneError {
    HygieneError::Kube(format!("{}: {}", what, e))
}

/// Connect using the default kubeconfig, or a specific context of it.
pub async fn connect(context: Option<&str>) -> Result<Client> {
    // Install rustls crypto provider (required for TLS connections to K8s API)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match context {
        None => Config::infer()
            .await
            .map_err(|e| kube_error("Failed to infer Kubernetes config", e))?,
        Some(ctx) => {
            let kubeconfig = kube::config::Kubeconfig::read()
                .map_err(|e| kube_error("Failed to read kubeconfig", e))?;
            Config::from_custom_kubeconfig(
                kubeconfig,
                &kube::config::KubeConfigOptions {
                    context: Some(ctx.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| kube_error("Failed to load kubeconfig context", e))?
        }
    };

    Client::try_from(config).map_err(|e| kube_error("Failed to create Kubernetes client", e))
}

/// Fetch a snapshot of the cluster, or of one namespace.
pub async fn fetch(client: &Client, namespace: Option<&str>) -> Result<Snapshot> {
    let deployments: Api<Deployment> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let pods: Api<Pod> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let deployments = deployments
        .list(&ListParams::default())
        .await
        .map_err(|e| kube_error("Failed to list deployments", e))?
        .items;
    let pods = pods
        .list(&ListParams::default())
        .await
        .map_err(|e| kube_error("Failed to list pods", e))?
        .items;

    let pod_metrics = match fetch_pod_metrics(client, namespace).await {
        Ok(items) => items,
        Err(e) => {
            log::warn!("Pod metrics unavailable, utilization checks will see no usage: {}", e);
            Vec::new()
        }
    };

    log::info!(
        "Fetched {} deployment(s), {} pod(s), {} pod metric(s)",
        deployments.len(),
        pods.len(),
        pod_metrics.len()
    );

    Ok(Snapshot {
        deployments,
        pods,
        pod_metrics,
    })
}

/// Read pod metrics from the metrics-server.
///
/// The metrics API is an aggregated API without typed bindings, so it goes
/// through a raw request.
pub async fn fetch_pod_metrics(client: &Client, namespace: Option<&str>) -> Result<Vec<PodMetrics>> {
    let path = match namespace {
        Some(ns) => format!("/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods", ns),
        None => "/apis/metrics.k8s.io/v1beta1/pods".to_string(),
    };

    let request = http::Request::builder()
        .method("GET")
        .uri(&path)
        .body(Vec::new())
        .map_err(|e| kube_error("Failed to build metrics request", e))?;

    let response = client
        .request::<PodMetricsList>(request)
        .await
        .map_err(|e| kube_error("Metrics API error", e))?;

    Ok(response.items)
}
