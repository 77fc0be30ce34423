/// Authentication and sessions
///
/// - [`password`]: Argon2id hashing and strength rules
/// - [`jwt`]: access/refresh tokens whose subject is the login email
/// - [`middleware`]: bearer token extraction
/// - [`session`]: email to [`User`](crate::models::user::User) resolution and role checks
/// - [`account`]: sign-up, sign-in, password and login email changes
///
/// # Example
///
/// ```no_run
/// use postal_shared::auth::account::AccountService;
/// use postal_shared::auth::jwt::TokenPair;
/// use postal_shared::services::UserService;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let accounts = AccountService::new(UserService::new(pool));
/// let identity = accounts.sign_in("ana@example.com", "harbour42").await?;
///
/// let tokens = TokenPair::issue(identity.email(), "secret-key-at-least-32-bytes-long!!")?;
/// println!("{} -> {}", tokens.access_token, identity.landing());
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;

pub use session::{Identity, Role, SessionError, SessionResolver};
