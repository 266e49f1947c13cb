//! HostFirmwareSettings controller
//!
//! Wires the [`HostFirmwareSettingsReconciler`] into a kube-runtime
//! controller watching settings resources cluster-wide or in one namespace.

use super::reconciler::{HostFirmwareSettingsReconciler, ReconcileOutcome, ReconcilerConfig};
use super::store::KubeFirmwareStore;
use crate::crd::HostFirmwareSettings;
use crate::domain::ports::ObjectKey;
use crate::error::{Error, ErrorAction, Result};
use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue delay for errors that ask for backoff
const ERROR_REQUEUE_DELAY: Duration = Duration::from_secs(15);

/// Shared state handed to every reconcile call
pub struct ControllerContext {
    pub reconciler: HostFirmwareSettingsReconciler,
}

/// Run the controller until a shutdown signal arrives
pub async fn run(client: Client, namespace: Option<&str>, config: ReconcilerConfig) -> Result<()> {
    let api: Api<HostFirmwareSettings> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    // Fail early when the CRD is not installed
    if let Err(e) = api.list(&Default::default()).await {
        error!("HostFirmwareSettings CRD is not queryable: {:?}", e);
        return Err(Error::Configuration(
            "HostFirmwareSettings CRD not installed".to_string(),
        ));
    }

    let store = Arc::new(KubeFirmwareStore::new(client));
    let context = Arc::new(ControllerContext {
        reconciler: HostFirmwareSettingsReconciler::new(store, config),
    });

    info!(
        namespace = namespace.unwrap_or("*"),
        "Starting HostFirmwareSettings controller"
    );

    Controller::new(api, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => info!("Reconciled: {}", obj),
                Err(e) => error!("Reconcile error: {:?}", e),
            }
        })
        .await;

    info!("HostFirmwareSettings controller stopped");
    Ok(())
}

async fn reconcile(hfs: Arc<HostFirmwareSettings>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let key = ObjectKey::of(hfs.as_ref());

    match ctx.reconciler.reconcile(&key).await? {
        ReconcileOutcome::InvalidSpec(e) => {
            warn!(settings = %key, error = %e, "Waiting for the desired settings to change");
        }
        ReconcileOutcome::SchemaMissing(reference) => {
            warn!(settings = %key, schema = %reference.name, "Waiting for the firmware schema");
        }
        outcome => {
            info!(settings = %key, ?outcome, "Host firmware settings reconciled");
        }
    }

    Ok(Action::await_change())
}

fn error_policy(hfs: Arc<HostFirmwareSettings>, error: &Error, _ctx: Arc<ControllerContext>) -> Action {
    error!("Reconciliation error for {}: {:?}", hfs.name_any(), error);
    requeue_action(error)
}

fn requeue_action(error: &Error) -> Action {
    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(ERROR_REQUEUE_DELAY),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}
