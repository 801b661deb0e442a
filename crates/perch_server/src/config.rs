//! Server configuration.

/// Configuration for the sync server.
///
/// All secrets and tunables are injected here; the handlers never read
/// ambient global state.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Current cursor schema version. Bumping it forces every client
    /// through a full reset on its next pull.
    pub schema_version: u32,
    /// Records per pull when the client does not ask for a limit.
    pub default_page_size: usize,
    /// Hard cap on records per pull.
    pub max_page_size: usize,
    /// Maximum mutations accepted in one push batch.
    pub max_push_batch: usize,
    /// Whether pushes must carry a principal token.
    pub require_auth: bool,
    /// Secret for principal token validation (if auth enabled).
    pub auth_secret: Option<Vec<u8>>,
    /// Shared secret the ingestion feed must present (if set).
    pub ingest_secret: Option<Vec<u8>>,
}

impl ServerConfig {
    /// Creates a configuration with the given cursor schema version.
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            default_page_size: 500,
            max_page_size: 1000,
            max_push_batch: 100,
            require_auth: false,
            auth_secret: None,
            ingest_secret: None,
        }
    }

    /// Sets the default pull page size.
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the maximum pull page size.
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    /// Sets the maximum push batch size.
    pub fn with_max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Enables principal token authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.require_auth = true;
        self.auth_secret = Some(secret);
        self
    }

    /// Requires the ingestion feed to present this shared secret.
    pub fn with_ingest_secret(mut self, secret: Vec<u8>) -> Self {
        self.ingest_secret = Some(secret);
        self
    }

    /// Clamps a client-requested page size to the configured bounds.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(1)
    }
}
