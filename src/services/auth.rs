//! Authentication: password hashing, login and the in-memory session registry

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        identity::IdentityView, new_id, session::SessionClaims, HistoryKind, Identity,
        NewHistoryEntry, StaffAccount, StaffRole,
    },
    repository::Repository,
};

/// Characters used for generated passwords; no look-alikes
const PASSWORD_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v',
    'w', 'x', 'y', 'z', '2', '3', '4', '5', '6', '7', '8', '9',
];
const GENERATED_PASSWORD_LEN: usize = 8;

pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin";

/// Hex SHA-256 digest of a password
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    !hash.is_empty() && hash_password(password).eq_ignore_ascii_case(hash)
}

/// Random password handed out once for new accounts
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())])
        .collect()
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Live sessions by token. Process-scoped; cleared on restart.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionClaims>>,
    ttl: chrono::Duration,
}

impl SessionRegistry {
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: chrono::Duration::hours(ttl_hours.max(1) as i64),
        }
    }

    pub fn create(&self, identity: &Identity) -> SessionClaims {
        let claims = SessionClaims {
            token: generate_token(),
            sub: identity.id().to_string(),
            role: identity.role(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.insert(claims.token.clone(), claims.clone());
        claims
    }

    /// Claims for a live token; expired sessions are dropped on access
    pub fn get(&self, token: &str) -> Option<SessionClaims> {
        let now = Utc::now();
        let claims = self.sessions.get(token).map(|entry| entry.value().clone())?;
        if claims.is_expired(now) {
            self.sessions.remove(token);
            return None;
        }
        Some(claims)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// End every session of an identity, returning how many were dropped
    pub fn revoke_identity(&self, identity_id: &str) -> usize {
        self.revoke_identity_except(identity_id, None)
    }

    pub fn revoke_identity_except(&self, identity_id: &str, keep_token: Option<&str>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|token, claims| claims.sub != identity_id || Some(token.as_str()) == keep_token);
        let revoked = before.saturating_sub(self.sessions.len());
        if revoked > 0 {
            tracing::info!("Revoked {} session(s) of {}", revoked, identity_id);
        }
        revoked
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    sessions: SessionRegistry,
}

impl AuthService {
    pub fn new(repository: Repository, sessions: SessionRegistry) -> Self {
        Self {
            repository,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Create the `admin`/`admin` account when no administrator exists
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<bool> {
        let mut tx = self.repository.begin().await?;
        if tx.doc().has_admin() {
            return Ok(false);
        }
        if tx.doc().username_taken(BOOTSTRAP_ADMIN_USERNAME, None) {
            tracing::warn!(
                "No administrator exists and username {} is taken; skipping bootstrap",
                BOOTSTRAP_ADMIN_USERNAME
            );
            return Ok(false);
        }

        let admin = StaffAccount {
            id: new_id(),
            role: StaffRole::Admin,
            name: "Administrator".to_string(),
            username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
            password_hash: hash_password(BOOTSTRAP_ADMIN_PASSWORD),
            must_change_password: true,
            class_ids: Vec::new(),
            created_at: Some(Utc::now()),
        };
        let admin_id = admin.id.clone();
        tx.doc_mut().staff.push(admin);
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::TeacherCreated, "Bootstrap administrator created")
                .teacher(&admin_id),
        );
        tx.commit().await?;

        tracing::warn!(
            "Created bootstrap administrator '{}'; change its password",
            BOOTSTRAP_ADMIN_USERNAME
        );
        Ok(true)
    }

    /// Check credentials (students first, then staff) and open a session
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(SessionClaims, IdentityView)> {
        let doc = self.repository.snapshot().await?;
        let identity = doc
            .identity_by_username(username)
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(password, identity.password_hash()) {
            tracing::debug!("Password mismatch for {}", username.trim());
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let claims = self.sessions.create(&identity);
        tracing::info!("{} {} logged in", identity.role(), identity.id());
        Ok((claims, IdentityView::from(&identity)))
    }

    pub fn logout(&self, token: &str) {
        if self.sessions.remove(token) {
            tracing::debug!("Session closed");
        }
    }

    /// Resolve a bearer token
    pub fn authenticate(&self, token: &str) -> AppResult<SessionClaims> {
        self.sessions
            .get(token)
            .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))
    }

    pub async fn me(&self, claims: &SessionClaims) -> AppResult<IdentityView> {
        let doc = self.repository.snapshot().await?;
        let identity = doc
            .identity(&claims.sub)
            .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;
        Ok(IdentityView::from(&identity))
    }

    /// Replace the caller's password; other sessions of the account end
    pub async fn change_password(&self, claims: &SessionClaims, current: &str, new: &str) -> AppResult<()> {
        if new.trim().is_empty() {
            return Err(AppError::Validation("New password must not be empty".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        let identity = tx
            .doc()
            .identity(&claims.sub)
            .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;
        if !verify_password(current, identity.password_hash()) {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = hash_password(new);
        match identity {
            Identity::Student(_) => {
                let student = tx.doc_mut().student_mut(&claims.sub)?;
                student.password_hash = hash;
                student.must_change_password = false;
            }
            Identity::Teacher(_) | Identity::Admin(_) => {
                let account = tx.doc_mut().staff_member_mut(&claims.sub)?;
                account.password_hash = hash;
                account.must_change_password = false;
            }
        }
        tx.commit().await?;

        self.sessions
            .revoke_identity_except(&claims.sub, Some(claims.token.as_str()));
        tracing::info!("Password changed for {}", claims.sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{LibraryDocument, Role},
        test_support::{repository, staff, student},
    };

    fn service(doc: LibraryDocument) -> AuthService {
        let (repo, _) = repository(doc);
        AuthService::new(repo, SessionRegistry::new(12))
    }

    #[test]
    fn test_hash_is_deterministic_hex() {
        let hash = hash_password("geheim");
        assert_eq!(hash, hash_password("geheim"));
        assert_eq!(hash.len(), 64);
        assert!(verify_password("geheim", &hash));
        assert!(!verify_password("Geheim", &hash));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_generated_passwords() {
        let a = generate_password();
        assert_eq!(a.len(), GENERATED_PASSWORD_LEN);
        assert!(a.chars().all(|c| PASSWORD_ALPHABET.contains(&c)));
    }

    #[tokio::test]
    async fn test_login_students_then_staff_case_insensitive() {
        let s = student("Sanne", "sanne");
        let t = staff("Meester Jan", "jan", StaffRole::Teacher);
        let auth = service(LibraryDocument {
            students: vec![s.clone()],
            staff: vec![t.clone()],
            ..Default::default()
        });

        let (claims, view) = auth.login("SANNE ", "geheim").await.unwrap();
        assert_eq!(claims.sub, s.id);
        assert_eq!(view.role, Role::Student);

        let (claims, _) = auth.login("jan", "geheim").await.unwrap();
        assert_eq!(claims.role, Role::Teacher);
        assert_eq!(auth.authenticate(&claims.token).unwrap().sub, t.id);

        let err = auth.login("jan", "fout").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
        let err = auth.login("niemand", "geheim").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_logout_and_revocation() {
        let s = student("Sanne", "sanne");
        let auth = service(LibraryDocument {
            students: vec![s.clone()],
            ..Default::default()
        });

        let (first, _) = auth.login("sanne", "geheim").await.unwrap();
        let (second, _) = auth.login("sanne", "geheim").await.unwrap();
        auth.logout(&first.token);
        assert!(auth.authenticate(&first.token).is_err());
        assert!(auth.authenticate(&second.token).is_ok());

        assert_eq!(auth.sessions().revoke_identity(&s.id), 1);
        assert!(auth.authenticate(&second.token).is_err());
    }

    #[tokio::test]
    async fn test_change_password_keeps_current_session_only() {
        let mut s = student("Sanne", "sanne");
        s.must_change_password = true;
        let auth = service(LibraryDocument {
            students: vec![s],
            ..Default::default()
        });

        let (current, _) = auth.login("sanne", "geheim").await.unwrap();
        let (other, _) = auth.login("sanne", "geheim").await.unwrap();

        let err = auth.change_password(&current, "fout", "nieuw").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        auth.change_password(&current, "geheim", "nieuw").await.unwrap();
        assert!(auth.authenticate(&current.token).is_ok());
        assert!(auth.authenticate(&other.token).is_err());
        assert!(!auth.me(&current).await.unwrap().must_change_password);
        assert!(auth.login("sanne", "nieuw").await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_once() {
        let auth = service(LibraryDocument::default());
        assert!(auth.ensure_bootstrap_admin().await.unwrap());
        assert!(!auth.ensure_bootstrap_admin().await.unwrap());

        let (claims, view) = auth.login("admin", "admin").await.unwrap();
        assert!(claims.is_admin());
        assert!(view.must_change_password);
    }
}
