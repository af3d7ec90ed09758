//! The signed-in user's balance, persisted as a small JSON file.
//!
//! The session only changes through [`SessionStore::credit_deposit`] and
//! [`SessionStore::spend`]; every change is written back immediately.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use smartbin_core::RewardRecord;

/// Coins granted to a newly registered user.
pub const WELCOME_BONUS_COINS: u64 = 100;

const QR_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("insufficient coins: need {needed}, have {available}")]
    InsufficientCoins { needed: u64, available: u64 },

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub coins: u64,
    #[serde(default)]
    pub eco_points: u64,
    #[serde(default)]
    pub recycled_weight_kg: f64,
    pub qr_code: String,
}

impl Session {
    /// A fresh account with the welcome bonus. An email address as
    /// `identity` yields the part before `@` as username.
    pub fn register(identity: &str) -> Result<Self, SessionError> {
        let identity = identity.trim();
        let (username, email) = match identity.split_once('@') {
            Some((name, _)) => (name.to_string(), Some(identity.to_string())),
            None => (identity.to_string(), None),
        };
        if username.is_empty() {
            return Err(SessionError::InvalidUsername(identity.to_string()));
        }
        Ok(Self {
            username,
            email,
            coins: WELCOME_BONUS_COINS,
            eco_points: 0,
            recycled_weight_kg: 0.0,
            qr_code: qr_code(&mut rand::thread_rng()),
        })
    }
}

/// `SB-` followed by nine uppercase base36 characters.
pub fn qr_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let body: String = (0..9)
        .map(|_| QR_ALPHABET[rng.gen_range(0..QR_ALPHABET.len())] as char)
        .collect();
    format!("SB-{}", body)
}

/// Owns the session lifecycle. Without a path the session lives in memory only.
#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    session: Option<Session>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the session saved at `path`, if any.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let session = match std::fs::read_to_string(&path) {
            Ok(text) => Some(
                serde_json::from_str(&text).map_err(|source| SessionError::Corrupt {
                    path: path.clone(),
                    source,
                })?,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            session,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Start a new session, replacing any existing one.
    pub fn login(&mut self, identity: &str) -> Result<&Session, SessionError> {
        let session = Session::register(identity)?;
        tracing::info!(username = %session.username, "session started");
        self.session = Some(session);
        self.save()?;
        self.current().ok_or(SessionError::NotLoggedIn)
    }

    /// Add a deposit's coins, eco-points and measured weight.
    pub fn credit_deposit(&mut self, reward: &RewardRecord) -> Result<&Session, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotLoggedIn)?;
        session.coins = session.coins.saturating_add(reward.coins_awarded);
        session.eco_points = session.eco_points.saturating_add(reward.eco_points);
        if let Some(grams) = reward
            .recorded_weight_grams()
            .filter(|g| g.is_finite() && *g > 0.0)
        {
            session.recycled_weight_kg += grams / 1000.0;
        }
        self.save()?;
        self.current().ok_or(SessionError::NotLoggedIn)
    }

    /// Take coins out of the balance, e.g. for a marketplace purchase.
    pub fn spend(&mut self, coins: u64) -> Result<&Session, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotLoggedIn)?;
        if session.coins < coins {
            return Err(SessionError::InsufficientCoins {
                needed: coins,
                available: session.coins,
            });
        }
        session.coins -= coins;
        self.save()?;
        self.current().ok_or(SessionError::NotLoggedIn)
    }

    /// Forget the session and delete its file.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.session = None;
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    fn save(&self) -> Result<(), SessionError> {
        let (Some(path), Some(session)) = (&self.path, &self.session) else {
            return Ok(());
        };
        let io_err = |source| SessionError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|source| SessionError::Corrupt {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use smartbin_core::MeasurementSource;

    fn reward(coins: u64, grams: Option<f64>) -> RewardRecord {
        RewardRecord {
            weight_grams: grams,
            quality_percent: 90,
            coins_awarded: coins,
            eco_points: smartbin_core::eco_points_for(coins),
            measurement: MeasurementSource::UserSupplied,
        }
    }

    #[test]
    fn register_grants_welcome_bonus_and_qr_code() {
        let s = Session::register("ada@example.org").unwrap();
        assert_eq!(s.username, "ada");
        assert_eq!(s.email.as_deref(), Some("ada@example.org"));
        assert_eq!(s.coins, WELCOME_BONUS_COINS);
        assert!(s.qr_code.starts_with("SB-"));
        assert_eq!(s.qr_code.len(), 12);
    }

    #[test]
    fn register_rejects_empty_username() {
        assert!(matches!(
            Session::register("@example.org"),
            Err(SessionError::InvalidUsername(_))
        ));
        assert!(Session::register("   ").is_err());
    }

    #[test]
    fn qr_code_is_uppercase_base36() {
        let code = qr_code(&mut StdRng::seed_from_u64(3));
        assert!(code[3..].bytes().all(|b| QR_ALPHABET.contains(&b)));
    }

    #[test]
    fn placeholder_weight_is_not_recycled_weight() {
        let mut store = SessionStore::in_memory();
        store.login("ada").unwrap();
        let placeholder = RewardRecord {
            measurement: MeasurementSource::Randomized,
            ..reward(64, Some(1000.0))
        };
        let s = store.credit_deposit(&placeholder).unwrap();
        assert_eq!(s.coins, 164);
        assert_eq!(s.recycled_weight_kg, 0.0);
    }

    #[test]
    fn credit_requires_login() {
        let mut store = SessionStore::in_memory();
        assert!(matches!(
            store.credit_deposit(&reward(5, None)),
            Err(SessionError::NotLoggedIn)
        ));
    }

    #[test]
    fn credit_adds_coins_points_and_weight() {
        let mut store = SessionStore::in_memory();
        store.login("ada").unwrap();
        let s = store.credit_deposit(&reward(36, Some(500.0))).unwrap();
        assert_eq!(s.coins, 136);
        assert_eq!(s.eco_points, 43);
        assert!((s.recycled_weight_kg - 0.5).abs() < 1e-9);
    }

    #[test]
    fn spend_refuses_overdraft() {
        let mut store = SessionStore::in_memory();
        store.login("ada").unwrap();
        match store.spend(101) {
            Err(SessionError::InsufficientCoins { needed, available }) => {
                assert_eq!((needed, available), (101, 100));
            }
            other => panic!("expected InsufficientCoins, got {:?}", other),
        }
        assert_eq!(store.spend(40).unwrap().coins, 60);
    }

    #[test]
    fn session_survives_reopen_and_logout_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        assert!(store.current().is_none());
        store.login("ada").unwrap();
        store.credit_deposit(&reward(10, Some(250.0))).unwrap();

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.current().unwrap().coins, 110);

        store.logout().unwrap();
        assert!(!path.exists());
        assert!(SessionStore::open(&path).unwrap().current().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionStore::open(&path),
            Err(SessionError::Corrupt { .. })
        ));
    }
}
