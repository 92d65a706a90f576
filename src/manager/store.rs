use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    core::exchange::{PresentationExchangeRecord, Role},
    error::StoreError,
};

/// Storage interface for presentation exchange records.
#[async_trait]
pub trait ExchangeStore: Debug + Send + Sync {
    /// Find the record a party in `role` keeps for a thread over the given
    /// connection. Connectionless exchanges have no `connection_id`.
    async fn retrieve_by_thread(
        &self,
        thread_id: &str,
        role: Role,
        connection_id: Option<&str>,
    ) -> Result<PresentationExchangeRecord, StoreError>;

    /// Store a new record.
    async fn create(
        &self,
        record: PresentationExchangeRecord,
    ) -> Result<PresentationExchangeRecord, StoreError>;

    /// Overwrite an existing record.
    async fn save(&self, record: &PresentationExchangeRecord) -> Result<(), StoreError>;
}

/// A local in-memory store. Not for production use!
///
/// # Warning
/// This in-memory store should only be used for test purposes, it will not work for a distributed
/// deployment.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    store: Arc<Mutex<BTreeMap<Uuid, PresentationExchangeRecord>>>,
}

impl MemoryStore {
    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.store.try_lock().map_err(anyhow::Error::from)?.len())
    }

    /// Every record on a thread, whatever its role or connection.
    pub async fn on_thread(
        &self,
        thread_id: &str,
    ) -> Result<Vec<PresentationExchangeRecord>, StoreError> {
        let store = self.store.try_lock().map_err(anyhow::Error::from)?;
        Ok(store
            .values()
            .filter(|record| record.thread_id == thread_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExchangeStore for MemoryStore {
    async fn retrieve_by_thread(
        &self,
        thread_id: &str,
        role: Role,
        connection_id: Option<&str>,
    ) -> Result<PresentationExchangeRecord, StoreError> {
        let store = self.store.try_lock().map_err(anyhow::Error::from)?;
        store
            .values()
            .find(|record| {
                record.thread_id == thread_id
                    && record.role == role
                    && record.connection_id.as_deref() == connection_id
            })
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                thread_id: thread_id.to_owned(),
            })
    }

    async fn create(
        &self,
        record: PresentationExchangeRecord,
    ) -> Result<PresentationExchangeRecord, StoreError> {
        let mut store = self.store.try_lock().map_err(anyhow::Error::from)?;
        if store.contains_key(&record.presentation_exchange_id) {
            return Err(StoreError::Duplicate {
                presentation_exchange_id: record.presentation_exchange_id,
            });
        }
        store.insert(record.presentation_exchange_id, record.clone());
        Ok(record)
    }

    async fn save(&self, record: &PresentationExchangeRecord) -> Result<(), StoreError> {
        let mut store = self.store.try_lock().map_err(anyhow::Error::from)?;
        match store.get_mut(&record.presentation_exchange_id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                thread_id: record.thread_id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::State;

    #[tokio::test]
    async fn lifecycle() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.retrieve_by_thread("thread-1", Role::Prover, None).await,
            Err(StoreError::NotFound { .. })
        ));

        let record = PresentationExchangeRecord::prover("thread-1", Some("dummy".to_owned()));
        let mut record = store.create(record).await.unwrap();
        assert!(matches!(
            store.create(record.clone()).await,
            Err(StoreError::Duplicate { .. })
        ));

        record.state = State::RequestReceived;
        store.save(&record).await.unwrap();

        let found = store
            .retrieve_by_thread("thread-1", Role::Prover, Some("dummy"))
            .await
            .unwrap();
        assert_eq!(record, found);
        assert_eq!(1, store.len().await.unwrap());

        let stray = PresentationExchangeRecord::prover("thread-2", None);
        assert!(matches!(
            store.save(&stray).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_role_and_connection() {
        let store = MemoryStore::default();
        let mut verifier = PresentationExchangeRecord::prover("thread-1", Some("dummy".to_owned()));
        verifier.role = Role::Verifier;
        store.create(verifier).await.unwrap();

        assert!(matches!(
            store.retrieve_by_thread("thread-1", Role::Prover, Some("dummy")).await,
            Err(StoreError::NotFound { .. })
        ));

        let old = PresentationExchangeRecord::prover("thread-1", Some("old-conn".to_owned()));
        let old = store.create(old).await.unwrap();
        let new = PresentationExchangeRecord::prover("thread-1", Some("new-conn".to_owned()));
        let new = store.create(new).await.unwrap();
        let connectionless = PresentationExchangeRecord::prover("thread-1", None);
        let connectionless = store.create(connectionless).await.unwrap();

        for (connection_id, expected) in [
            (Some("old-conn"), &old),
            (Some("new-conn"), &new),
            (None, &connectionless),
        ] {
            let found = store
                .retrieve_by_thread("thread-1", Role::Prover, connection_id)
                .await
                .unwrap();
            assert_eq!(expected, &found);
        }
        assert!(matches!(
            store.retrieve_by_thread("thread-1", Role::Prover, Some("other")).await,
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(4, store.on_thread("thread-1").await.unwrap().len());
    }
}
