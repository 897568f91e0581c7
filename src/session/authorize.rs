//! Sign-in flow for a named session.
//!
//! A stored login is reused when it still works; otherwise the user goes
//! through phone, login code and, when enabled, the two-factor password.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::setup::{Prompter, SetupError};
use crate::telegram::TelegramError;

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Telegram user id.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Username without the leading `@`.
    pub username: Option<String>,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "{} (@{username})", self.name),
            None => write!(f, "{} (id {})", self.name, self.id),
        }
    }
}

/// Outcome of submitting a login code.
#[derive(Debug)]
pub enum SignInStep<P> {
    /// Signed in.
    Done(Account),
    /// The account has two-factor authentication enabled.
    PasswordRequired { token: P, hint: Option<String> },
}

/// Login operations of the remote service.
#[async_trait]
pub trait LoginApi: Send + Sync {
    /// Token identifying a pending code request.
    type LoginToken: Send + Sync;

    /// Token identifying a pending password check.
    type PasswordToken: Send;

    /// Whether the stored session is already signed in.
    async fn is_authorized(&self) -> Result<bool, TelegramError>;

    /// Sends a login code to `phone`.
    async fn request_login_code(&self, phone: &str) -> Result<Self::LoginToken, TelegramError>;

    /// Submits the login code.
    async fn sign_in(
        &self,
        token: &Self::LoginToken,
        code: &str,
    ) -> Result<SignInStep<Self::PasswordToken>, TelegramError>;

    /// Submits the two-factor password.
    async fn check_password(
        &self,
        token: Self::PasswordToken,
        password: &str,
    ) -> Result<Account, TelegramError>;

    /// Returns the signed-in account.
    async fn get_me(&self) -> Result<Account, TelegramError>;
}

/// Errors that end the authorization attempt.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login code")]
    InvalidCode,

    #[error("Invalid two-factor password")]
    InvalidPassword,

    #[error("Authorization failed: {0}")]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Authorizes the session named `session_name`.
///
/// A stored session is accepted once a "who am I" round-trip succeeds.
/// Otherwise the user is asked for a phone number and login code, plus the
/// two-factor password when the account requires it. A wrong code or
/// password aborts the attempt; there is no retry loop. The session storage
/// keeps the new login for later runs.
pub async fn authorize<A: LoginApi>(
    api: &A,
    session_name: &str,
    prompter: &mut dyn Prompter,
) -> Result<Account, AuthError> {
    if let Some(account) = restore(api).await {
        info!("Authorized as: {}", account);
        return Ok(account);
    }

    prompter.say(&format!("\n=== Authorization for session: {session_name} ==="));

    let phone = prompter
        .input("Phone number (with country code, e.g. +7)", false)
        .await?;
    let token = api.request_login_code(phone.trim()).await?;
    info!("Login code sent to your Telegram app");

    let code = prompter.input("Login code from Telegram", false).await?;

    let account = match api.sign_in(&token, code.trim()).await {
        Ok(SignInStep::Done(account)) => account,
        Ok(SignInStep::PasswordRequired { token, hint }) => {
            info!("Two-factor authentication is enabled");
            if let Some(hint) = hint.filter(|h| !h.is_empty()) {
                prompter.say(&format!("Password hint: {hint}"));
            }

            let password = prompter.password("Two-factor password").await?;
            match api.check_password(token, password.trim()).await {
                Ok(account) => account,
                Err(TelegramError::InvalidPassword) => {
                    error!("Invalid two-factor password");
                    return Err(AuthError::InvalidPassword);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(TelegramError::InvalidCode) => {
            error!("Invalid login code");
            return Err(AuthError::InvalidCode);
        }
        Err(e) => return Err(e.into()),
    };

    info!("Successfully authorized as: {}", account);
    Ok(account)
}

/// Confirms a stored session with `get_me`.
async fn restore<A: LoginApi>(api: &A) -> Option<Account> {
    match api.is_authorized().await {
        Ok(true) => {}
        Ok(false) => {
            debug!("No stored login for this session");
            return None;
        }
        Err(e) => {
            warn!("Could not check stored session: {}", e);
            return None;
        }
    }

    match api.get_me().await {
        Ok(account) => Some(account),
        Err(e) => {
            warn!("Stored session is not usable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::setup::ScriptedPrompter;

    fn account() -> Account {
        Account {
            id: 42,
            name: "Alice".to_owned(),
            username: Some("alice".to_owned()),
        }
    }

    /// Scripted login backend.
    #[derive(Default)]
    struct FakeLogin {
        authorized: bool,
        code: &'static str,
        password: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLogin {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LoginApi for FakeLogin {
        type LoginToken = String;
        type PasswordToken = ();

        async fn is_authorized(&self) -> Result<bool, TelegramError> {
            Ok(self.authorized)
        }

        async fn request_login_code(&self, phone: &str) -> Result<String, TelegramError> {
            self.record(format!("code:{phone}"));
            Ok(phone.to_owned())
        }

        async fn sign_in(
            &self,
            _token: &String,
            code: &str,
        ) -> Result<SignInStep<()>, TelegramError> {
            self.record(format!("sign_in:{code}"));
            if code != self.code {
                return Err(TelegramError::InvalidCode);
            }
            Ok(match self.password {
                Some(_) => SignInStep::PasswordRequired {
                    token: (),
                    hint: Some("pet".to_owned()),
                },
                None => SignInStep::Done(account()),
            })
        }

        async fn check_password(&self, _token: (), password: &str) -> Result<Account, TelegramError> {
            self.record("password");
            if Some(password) == self.password {
                Ok(account())
            } else {
                Err(TelegramError::InvalidPassword)
            }
        }

        async fn get_me(&self) -> Result<Account, TelegramError> {
            self.record("get_me");
            Ok(account())
        }
    }

    #[tokio::test]
    async fn test_restored_session_skips_prompts() {
        let api = FakeLogin {
            authorized: true,
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&[]);

        let account = authorize(&api, "demo", &mut prompter).await.unwrap();
        assert_eq!(account.id, 42);
        assert_eq!(api.calls(), vec!["get_me"]);
    }

    #[tokio::test]
    async fn test_code_login() {
        let api = FakeLogin {
            code: "12345",
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&["+10000000000", "12345"]);

        let account = authorize(&api, "demo", &mut prompter).await.unwrap();
        assert_eq!(account.username.as_deref(), Some("alice"));
        assert_eq!(api.calls(), vec!["code:+10000000000", "sign_in:12345"]);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_invalid_code_aborts() {
        let api = FakeLogin {
            code: "12345",
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&["+10000000000", "00000", "12345"]);

        let result = authorize(&api, "demo", &mut prompter).await;
        assert!(matches!(result, Err(AuthError::InvalidCode)));
        assert_eq!(prompter.remaining(), 1);
    }

    #[tokio::test]
    async fn test_two_factor_login() {
        let api = FakeLogin {
            code: "12345",
            password: Some("hunter2"),
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&["+10000000000", "12345", "hunter2"]);

        let account = authorize(&api, "demo", &mut prompter).await.unwrap();
        assert_eq!(account.name, "Alice");
        assert!(prompter.said().iter().any(|l| l.contains("Password hint: pet")));
        assert_eq!(api.calls().last().map(String::as_str), Some("password"));
    }

    #[tokio::test]
    async fn test_two_factor_password_is_trimmed() {
        let api = FakeLogin {
            code: "12345",
            password: Some("hunter2"),
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&["+10000000000", "12345", "  hunter2\n"]);

        let account = authorize(&api, "demo", &mut prompter).await.unwrap();
        assert_eq!(account.id, 42);
    }

    #[tokio::test]
    async fn test_wrong_password_aborts() {
        let api = FakeLogin {
            code: "12345",
            password: Some("hunter2"),
            ..FakeLogin::default()
        };
        let mut prompter = ScriptedPrompter::new(&["+10000000000", "12345", "nope"]);

        let result = authorize(&api, "demo", &mut prompter).await;
        assert!(matches!(result, Err(AuthError::InvalidPassword)));
    }

    #[test]
    fn test_account_display() {
        assert_eq!(account().to_string(), "Alice (@alice)");
        let anonymous = Account {
            id: 7,
            name: "Bob".to_owned(),
            username: None,
        };
        assert_eq!(anonymous.to_string(), "Bob (id 7)");
    }
}
