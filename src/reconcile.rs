use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::runtime::controller::{Context, ReconcilerAction};
use thiserror::Error;
use tracing::Instrument;

use crate::store::{CalculatorStore, SecretStore, StoreError};
use crate::types::{Calculator, CalculatorStatus, ObjectKey, Operator};

const MANAGED_BY_ANNOTATION: &str = "managed-by";
const MANAGED_BY: &str = "calc-operator";
const RESULT_KEY: &str = "result";

pub struct Data {
    pub calculators: Arc<dyn CalculatorStore>,
    pub secrets: Arc<dyn SecretStore>,
    /// Delay before a failed pass is retried.
    pub error_requeue: StdDuration,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
    #[error("Failed to get calculator: {0}")]
    GetCalculatorFailed(#[source] StoreError),
    #[error("Failed to update calculator status: {0}")]
    UpdateStatusFailed(#[source] StoreError),
    #[error("Failed to create secret: {0}")]
    CreateSecretFailed(#[source] StoreError),
    #[error("Failed to get existing secret: {0}")]
    GetSecretFailed(#[source] StoreError),
    #[error("Failed to replace secret: {0}")]
    ReplaceSecretFailed(#[source] StoreError),
    #[error("Secret {0} exists but is not managed by calc-operator")]
    SecretNotManaged(ObjectKey),
}

pub async fn reconcile(
    calculator: Arc<Calculator>,
    ctx: Context<Data>,
) -> Result<ReconcilerAction, Error> {
    // Always re-read through the store; the watched copy may be stale.
    let key = ObjectKey::from_meta(&calculator.metadata).map_err(Error::MissingObjectKey)?;
    reconcile_key(&key, ctx.get_ref()).await
}

pub fn error_policy(error: &Error, ctx: Context<Data>) -> ReconcilerAction {
    tracing::error!(%error);
    ReconcilerAction {
        requeue_after: Some(ctx.get_ref().error_requeue),
    }
}

/// One convergence pass for the Calculator named by `key`.
pub async fn reconcile_key(key: &ObjectKey, data: &Data) -> Result<ReconcilerAction, Error> {
    let span = tracing::info_span!("reconcile", %key);
    async move {
        let mut calculator = match data.calculators.get(key).await {
            Ok(calculator) => calculator,
            Err(StoreError::NotFound) => {
                tracing::info!("calculator resource not found, ignoring since object must be deleted");
                return Ok(ReconcilerAction {
                    requeue_after: None,
                });
            }
            Err(error) => return Err(Error::GetCalculatorFailed(error)),
        };

        let spec = &calculator.spec;
        let result = compute(spec.xfield, spec.yfield, &spec.operator);
        tracing::info!(
            x = spec.xfield,
            y = spec.yfield,
            operator = %spec.operator,
            result,
            "computed result"
        );

        apply_status(&mut calculator, result);
        data.calculators
            .replace_status(&calculator)
            .await
            .map_err(Error::UpdateStatusFailed)?;

        write_secret(key, build_secret(&calculator), data.secrets.as_ref()).await?;

        Ok(ReconcilerAction {
            requeue_after: None,
        })
    }
    .instrument(span)
    .await
}

pub fn compute(x: i64, y: i64, operator: &str) -> i64 {
    Operator::from(operator).apply(x, y)
}

pub fn apply_status(calculator: &mut Calculator, result: i64) {
    calculator.status = Some(CalculatorStatus {
        processed: true,
        result,
    });
}

/// Builds the Secret exposing the Calculator's status result.
pub fn build_secret(calculator: &Calculator) -> Secret {
    let result = calculator
        .status
        .as_ref()
        .map(|status| status.result)
        .unwrap_or_default();
    Secret {
        metadata: ObjectMeta {
            name: calculator.metadata.name.clone(),
            namespace: calculator.metadata.namespace.clone(),
            annotations: Some(BTreeMap::from([(
                MANAGED_BY_ANNOTATION.to_string(),
                MANAGED_BY.to_string(),
            )])),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([(
            RESULT_KEY.to_string(),
            ByteString(result.to_string().into_bytes()),
        )])),
        ..Secret::default()
    }
}

/// Creates the secret, or brings an existing one with the same name in line
/// with `secret`. Only secrets carrying the `managed-by: calc-operator`
/// annotation are replaced, and a replace overwrites the whole object,
/// dropping labels, type and data keys absent from `secret`.
async fn write_secret(
    key: &ObjectKey,
    mut secret: Secret,
    secrets: &dyn SecretStore,
) -> Result<(), Error> {
    match secrets.create(&secret).await {
        Ok(()) => {
            tracing::info!("created result secret");
            return Ok(());
        }
        Err(StoreError::AlreadyExists) => {}
        Err(error) => return Err(Error::CreateSecretFailed(error)),
    }

    let existing = secrets.get(key).await.map_err(Error::GetSecretFailed)?;
    if !is_managed(&existing) {
        return Err(Error::SecretNotManaged(key.clone()));
    }
    if existing.metadata.annotations == secret.metadata.annotations && existing.data == secret.data
    {
        tracing::debug!("result secret up to date");
        return Ok(());
    }

    secret.metadata.resource_version = existing.metadata.resource_version;
    secrets
        .replace(&secret)
        .await
        .map_err(Error::ReplaceSecretFailed)?;
    tracing::info!("replaced stale result secret");
    Ok(())
}

fn is_managed(secret: &Secret) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(MANAGED_BY_ANNOTATION))
        .map_or(false, |value| value == MANAGED_BY)
}
