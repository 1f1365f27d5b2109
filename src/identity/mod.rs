//! Authentication contexts, sign-in and credential recovery

pub mod directory;
pub mod normalize;
pub mod recovery;
pub mod session;
pub mod sign_in;

pub use directory::{ClientRecord, IdentityDirectory, MemoryDirectory, StaffProfile};
pub use recovery::{recover_credentials, RecoveryRequest, RecoveryResponse};
pub use session::{
    resolve_identity, Audience, AuthUser, Identity, Role, SessionEvent, SessionState, UserId,
};
pub use sign_in::{
    Authenticator, ClientLogin, ClientNameIndex, IdentityConfig, LoginIdentifier, SignIn,
    DEFAULT_SYNTHETIC_EMAIL_DOMAIN,
};
