use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::Api;
use thiserror::Error;

use crate::types::{Calculator, ObjectKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found")]
    NotFound,
    #[error("Object already exists")]
    AlreadyExists,
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
    #[error("Kubernetes API request failed: {0}")]
    Api(#[source] kube::Error),
    #[error("Failed to serialize object: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        if let kube::Error::Api(response) = &error {
            if response.code == 404 {
                return StoreError::NotFound;
            }
            if response.reason == "AlreadyExists" {
                return StoreError::AlreadyExists;
            }
        }
        StoreError::Api(error)
    }
}

/// System of record for Calculator resources.
#[async_trait]
pub trait CalculatorStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Calculator, StoreError>;

    /// Persists `.status` through the status subresource.
    async fn replace_status(&self, calculator: &Calculator) -> Result<(), StoreError>;
}

/// System of record for result Secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Secret, StoreError>;

    async fn create(&self, secret: &Secret) -> Result<(), StoreError>;

    async fn replace(&self, secret: &Secret) -> Result<(), StoreError>;
}

/// Both stores backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: kube::Client,
}

impl KubeStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn calculators(&self, namespace: &str) -> Api<Calculator> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key_of(meta: &ObjectMeta) -> Result<ObjectKey, StoreError> {
    ObjectKey::from_meta(meta).map_err(StoreError::MissingObjectKey)
}

#[async_trait]
impl CalculatorStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Calculator, StoreError> {
        Ok(self.calculators(&key.namespace).get(&key.name).await?)
    }

    async fn replace_status(&self, calculator: &Calculator) -> Result<(), StoreError> {
        let key = key_of(&calculator.metadata)?;
        self.calculators(&key.namespace)
            .replace_status(
                &key.name,
                &Default::default(),
                serde_json::to_vec(calculator).map_err(StoreError::Serialize)?,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Secret, StoreError> {
        Ok(self.secrets(&key.namespace).get(&key.name).await?)
    }

    async fn create(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = key_of(&secret.metadata)?;
        self.secrets(&key.namespace)
            .create(&Default::default(), secret)
            .await?;
        Ok(())
    }

    async fn replace(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = key_of(&secret.metadata)?;
        self.secrets(&key.namespace)
            .replace(&key.name, &Default::default(), secret)
            .await?;
        Ok(())
    }
}
