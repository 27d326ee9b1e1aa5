use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while talking to the MongoDB lock backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The database never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of pings sent.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the lock record failed.
    #[error("failed to read game lock `{id}`")]
    ReadLock {
        /// Game instance identifier.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Marking the game as running failed.
    #[error("failed to acquire game lock `{id}`")]
    AcquireLock {
        /// Game instance identifier.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Clearing the running flag failed.
    #[error("failed to release game lock `{id}`")]
    ReleaseLock {
        /// Game instance identifier.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
