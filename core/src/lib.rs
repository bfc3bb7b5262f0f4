pub mod collaborator;
pub mod config;
pub mod error;
pub mod model;
pub mod outbox;
pub mod repository;
pub mod service;
pub mod session;
pub mod usecase;
pub mod week;

pub use collaborator::{
    AiVerifier, AuthenticatedUser, BucketStorage, GoogleIdentity, IdentityProvider, InlineStorage,
    OfflineVerifier, ProofStorage, ProofVerifier, StaticIdentity, Verdict,
};
pub use config::{load_dotenv, load_settings, Settings};
pub use error::{CollaboratorError, StoreError};
pub use model::{Category, Task, UserProfile, VerificationStatus, WeeklyStat, DEFAULT_GOAL_HOURS};
pub use outbox::{Mutation, WriteBehind};
pub use repository::{
    FileStore, MemoryStore, ProfileRepository, SupabaseStore, TaskRepository, WeeklyStatRepository,
};
pub use service::{LinearRatingPolicy, ProofOutcome, RatingPolicy, TaskFlow};
pub use session::Session;
pub use usecase::RefreshUseCase;
pub use week::{week_window, WeekId};
