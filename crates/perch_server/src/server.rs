//! Main sync server.

use crate::auth::{AuthConfig, FeedSecret, PrincipalTokens};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::{pull, push};
use perch_protocol::{
    AnnotationPullRequest, PullResponse, PushRequest, PushResponse, RecordPullRequest,
};
use perch_store::{
    AnnotationStore, ClientRegistry, MemoryRecordStore, Record, RecordStore, VersionAuthority,
};
use std::sync::Arc;

/// The sync server.
///
/// Ties the record store, annotation store, client registry, and
/// version authority together behind the three protocol endpoints.
/// Handlers are stateless; all request-scoped progress travels in the
/// client-held cookie.
///
/// # Example
///
/// ```
/// use perch_server::{ServerConfig, SyncServer};
/// use perch_protocol::RecordPullRequest;
///
/// let server = SyncServer::in_memory(ServerConfig::default());
/// let response = server
///     .handle_pull_records(&RecordPullRequest::default())
///     .unwrap();
/// assert!(response.patch.is_empty());
/// ```
pub struct SyncServer<R: RecordStore = MemoryRecordStore> {
    config: ServerConfig,
    records: Arc<R>,
    annotations: Arc<AnnotationStore>,
    registry: Arc<ClientRegistry>,
    versions: Arc<VersionAuthority>,
    tokens: Option<PrincipalTokens>,
    feed: Option<FeedSecret>,
}

impl SyncServer<MemoryRecordStore> {
    /// Creates a server over fresh in-memory stores.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(MemoryRecordStore::new()))
    }

    /// Creates a server over restored in-memory stores.
    pub fn from_parts(
        config: ServerConfig,
        records: MemoryRecordStore,
        annotations: AnnotationStore,
        versions: VersionAuthority,
    ) -> Self {
        let tokens = Self::tokens_for(&config);
        let feed = Self::feed_for(&config);
        Self {
            config,
            records: Arc::new(records),
            annotations: Arc::new(annotations),
            registry: Arc::new(ClientRegistry::new()),
            versions: Arc::new(versions),
            tokens,
            feed,
        }
    }
}

impl<R: RecordStore> SyncServer<R> {
    /// Creates a server over an existing record store.
    pub fn new(config: ServerConfig, records: Arc<R>) -> Self {
        let tokens = Self::tokens_for(&config);
        let feed = Self::feed_for(&config);
        Self {
            config,
            records,
            annotations: Arc::new(AnnotationStore::new()),
            registry: Arc::new(ClientRegistry::new()),
            versions: Arc::new(VersionAuthority::new()),
            tokens,
            feed,
        }
    }

    fn tokens_for(config: &ServerConfig) -> Option<PrincipalTokens> {
        config
            .auth_secret
            .clone()
            .map(|secret| PrincipalTokens::new(AuthConfig::new(secret)))
    }

    fn feed_for(config: &ServerConfig) -> Option<FeedSecret> {
        config.ingest_secret.clone().map(FeedSecret::new)
    }

    /// Handles a record catalog pull.
    pub fn handle_pull_records(&self, request: &RecordPullRequest) -> ServerResult<PullResponse> {
        pull::pull_records(self.records.as_ref(), &self.config, request)
    }

    /// Handles an annotation pull.
    pub fn handle_pull_annotations(
        &self,
        request: &AnnotationPullRequest,
    ) -> ServerResult<PullResponse> {
        pull::pull_annotations(&self.registry, &self.annotations, request)
    }

    /// Handles a push from an already-authenticated principal.
    pub fn handle_push(&self, principal: &str, request: &PushRequest) -> ServerResult<PushResponse> {
        push::handle_push(
            &self.registry,
            &self.annotations,
            &self.versions,
            &self.config,
            principal,
            request,
        )
    }

    /// Validates a principal token and applies the push under it.
    pub fn handle_push_with_token(
        &self,
        token: &[u8],
        request: &PushRequest,
    ) -> ServerResult<PushResponse> {
        let principal = self.authenticate(token)?;
        self.handle_push(&principal, request)
    }

    /// Resolves a token to a principal id.
    pub fn authenticate(&self, token: &[u8]) -> ServerResult<String> {
        match &self.tokens {
            Some(tokens) => tokens.validate_token(token),
            None if self.config.require_auth => Err(ServerError::Internal(
                "auth required but no secret configured".into(),
            )),
            None => Err(ServerError::AuthenticationFailed(
                "authentication is not enabled".into(),
            )),
        }
    }

    /// Ingests a batch from the upstream feed, stamping each record
    /// with a fresh version. Returns the number of records written.
    ///
    /// The caller is trusted; the crawler-facing path is
    /// [`ingest_with_secret`](Self::ingest_with_secret).
    pub fn ingest(&self, batch: Vec<Record>) -> ServerResult<usize> {
        let count = batch.len();
        for mut record in batch {
            record.last_modified_version = self.versions.next();
            self.records.upsert(record)?;
        }
        tracing::debug!(count, "ingested feed batch");
        Ok(count)
    }

    /// Validates the feed secret and ingests the batch under it.
    pub fn ingest_with_secret(&self, secret: &[u8], batch: Vec<Record>) -> ServerResult<usize> {
        self.authorize_feed(secret)?;
        self.ingest(batch)
    }

    /// Tombstones a record on behalf of the feed.
    ///
    /// The caller is trusted; the crawler-facing path is
    /// [`retract_with_secret`](Self::retract_with_secret).
    pub fn retract(&self, id: &str) -> ServerResult<bool> {
        Ok(self.records.tombstone(id, self.versions.next())?)
    }

    /// Validates the feed secret and tombstones the record under it.
    pub fn retract_with_secret(&self, secret: &[u8], id: &str) -> ServerResult<bool> {
        self.authorize_feed(secret)?;
        self.retract(id)
    }

    /// Checks a presented secret against the configured feed secret.
    fn authorize_feed(&self, secret: &[u8]) -> ServerResult<()> {
        match &self.feed {
            Some(feed) => feed.validate(secret),
            None => Err(ServerError::NotAuthorized(
                "feed ingestion is not enabled".into(),
            )),
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The record store.
    pub fn records(&self) -> &Arc<R> {
        &self.records
    }

    /// The annotation store.
    pub fn annotations(&self) -> &Arc<AnnotationStore> {
        &self.annotations
    }

    /// The client registry.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// The version authority.
    pub fn versions(&self) -> &Arc<VersionAuthority> {
        &self.versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            owner_handle: "h".to_string(),
            created_at: 0,
            body: "b".to_string(),
            asset_mask: 1,
            deleted: false,
            last_modified_version: 0,
        }
    }

    #[test]
    fn ingest_stamps_versions() {
        let server = SyncServer::in_memory(ServerConfig::default());
        server.ingest(vec![record("a"), record("b")]).unwrap();

        assert_eq!(server.versions().current(), 2);
        assert_eq!(
            server.records().get("a").unwrap().unwrap().last_modified_version,
            1
        );
        assert_eq!(
            server.records().get("b").unwrap().unwrap().last_modified_version,
            2
        );
    }

    #[test]
    fn retract_tombstones_with_fresh_version() {
        let server = SyncServer::in_memory(ServerConfig::default());
        server.ingest(vec![record("a")]).unwrap();

        assert!(server.retract("a").unwrap());
        let row = server.records().get("a").unwrap().unwrap();
        assert!(row.deleted);
        assert_eq!(row.last_modified_version, 2);

        assert!(!server.retract("missing").unwrap());
    }

    #[test]
    fn token_roundtrip_through_server() {
        let server =
            SyncServer::in_memory(ServerConfig::default().with_auth(b"secret-key".to_vec()));

        let tokens = PrincipalTokens::new(AuthConfig::new(b"secret-key".to_vec()));
        let token = tokens.create_token("u1");

        assert_eq!(server.authenticate(&token).unwrap(), "u1");
        assert!(server.authenticate(b"garbage-token-garbage-token-garbage-token").is_err());
    }

    #[test]
    fn authenticate_without_auth_enabled_fails() {
        let server = SyncServer::in_memory(ServerConfig::default());
        let err = server.authenticate(b"anything").unwrap_err();
        assert!(matches!(err, ServerError::AuthenticationFailed(_)));
    }

    #[test]
    fn feed_secret_gates_ingest_and_retract() {
        let server = SyncServer::in_memory(
            ServerConfig::default().with_ingest_secret(b"crawler-secret".to_vec()),
        );

        let err = server
            .ingest_with_secret(b"wrong", vec![record("a")])
            .unwrap_err();
        assert!(matches!(err, ServerError::NotAuthorized(_)));
        assert!(server.records().get("a").unwrap().is_none());

        assert_eq!(
            server
                .ingest_with_secret(b"crawler-secret", vec![record("a")])
                .unwrap(),
            1
        );

        let err = server.retract_with_secret(b"wrong", "a").unwrap_err();
        assert!(matches!(err, ServerError::NotAuthorized(_)));
        assert!(!server.records().get("a").unwrap().unwrap().deleted);

        assert!(server.retract_with_secret(b"crawler-secret", "a").unwrap());
    }

    #[test]
    fn feed_secret_path_requires_configuration() {
        let server = SyncServer::in_memory(ServerConfig::default());
        let err = server
            .ingest_with_secret(b"anything", vec![record("a")])
            .unwrap_err();
        assert!(matches!(err, ServerError::NotAuthorized(_)));
    }
}
