use crate::ports::{KeyValueStore, TimeProvider};
use crate::types::Session;

use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) const SESSION_KEY: &str = "deskbell.session";
pub(crate) const ISSUED_AT_KEY: &str = "deskbell.session.issued-at";

#[derive(Debug)]
pub enum SessionError {
    EmptyCredentials,
    EmptyProfile,
    Persist(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::EmptyCredentials => f.write_str("identifier and secret are required"),
            SessionError::EmptyProfile => f.write_str("profile name and email are required"),
            SessionError::Persist(err) => write!(f, "failed to persist session: {err}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterProfile {
    pub display_name: String,
    pub contact_email: String,
    pub organization: String,
}

#[derive(Clone)]
struct CachedSession {
    session: Session,
    issued_at: OffsetDateTime,
}

/// Two-state session holder: Anonymous or Authenticated, never anything in
/// between. The persisted copy lives under two keys in the injected store
/// (the serialized session plus its issued-at stamp) and is replaced
/// wholesale on every login or registration. A stored session older than
/// the TTL is purged on the read that detects it.
#[derive(Clone)]
pub struct SessionStore<S, T> {
    store: S,
    time: T,
    ttl: time::Duration,
    login_delay: std::time::Duration,
    inner: Arc<Mutex<Option<CachedSession>>>,
}

impl<S, T> SessionStore<S, T>
where
    S: KeyValueStore,
    T: TimeProvider,
{
    pub fn new(store: S, time: T, ttl: time::Duration, login_delay: std::time::Duration) -> Self {
        let cached = restore(&store, &time, ttl);
        Self {
            store,
            time,
            ttl,
            login_delay,
            inner: Arc::new(Mutex::new(cached)),
        }
    }

    /// Demo-grade sign-in: any non-empty identifier/secret pair succeeds
    /// after an artificial network delay. Credential validation is out of
    /// scope; overlapping calls race last-write-wins on the store.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, SessionError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.trim().is_empty() {
            return Err(SessionError::EmptyCredentials);
        }
        self.time.sleep(self.login_delay).await;
        self.install(derive_session(identifier))
    }

    pub async fn register(&self, profile: RegisterProfile) -> Result<Session, SessionError> {
        let display_name = profile.display_name.trim();
        let contact_email = profile.contact_email.trim();
        if display_name.is_empty() || contact_email.is_empty() {
            return Err(SessionError::EmptyProfile);
        }
        self.time.sleep(self.login_delay).await;
        let organization = match profile.organization.trim() {
            "" => "Independent".to_string(),
            organization => organization.to_string(),
        };
        self.install(Session {
            subject_id: contact_email.to_string(),
            display_name: display_name.to_string(),
            contact_email: contact_email.to_string(),
            organization,
            role: "admin".to_string(),
            plan_tier: "starter".to_string(),
            status: "active".to_string(),
        })
    }

    /// Clears the persisted session and returns to Anonymous. Cannot fail;
    /// store removal errors are logged and swallowed.
    pub fn logout(&self) {
        purge(&self.store);
        *self.inner.lock().expect("session store lock") = None;
    }

    /// Current session, with lazy TTL expiry: an entry that aged past the
    /// TTL since the last read is purged here and `None` is returned.
    pub fn current(&self) -> Option<Session> {
        let mut inner = self.inner.lock().expect("session store lock");
        let expired = match inner.as_ref() {
            Some(cached) => self.time.now() - cached.issued_at > self.ttl,
            None => return None,
        };
        if expired {
            purge(&self.store);
            *inner = None;
            return None;
        }
        inner.as_ref().map(|cached| cached.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    fn install(&self, session: Session) -> Result<Session, SessionError> {
        let issued_at = self.time.now();
        let blob =
            toml::to_string(&session).map_err(|err| SessionError::Persist(err.to_string()))?;
        let stamp = issued_at
            .format(&Rfc3339)
            .map_err(|err| SessionError::Persist(err.to_string()))?;
        self.store
            .set(SESSION_KEY, &blob)
            .map_err(|err| SessionError::Persist(err.to_string()))?;
        self.store
            .set(ISSUED_AT_KEY, &stamp)
            .map_err(|err| SessionError::Persist(err.to_string()))?;
        *self.inner.lock().expect("session store lock") = Some(CachedSession {
            session: session.clone(),
            issued_at,
        });
        Ok(session)
    }
}

fn derive_session(identifier: &str) -> Session {
    let (local, domain) = match identifier.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => (local, Some(domain)),
        _ => (identifier, None),
    };
    Session {
        subject_id: identifier.to_string(),
        display_name: local.to_string(),
        contact_email: identifier.to_string(),
        organization: domain.map_or_else(|| "Independent".to_string(), str::to_string),
        role: "admin".to_string(),
        plan_tier: "pro".to_string(),
        status: "active".to_string(),
    }
}

/// Reads the persisted session at startup. Anything short of a fully
/// parsable, unexpired pair of entries counts as "no session" and clears
/// whatever was stored.
fn restore<S, T>(store: &S, time: &T, ttl: time::Duration) -> Option<CachedSession>
where
    S: KeyValueStore,
    T: TimeProvider,
{
    let blob = match store.get(SESSION_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(err) => {
            eprintln!("failed to read stored session: {err}");
            return None;
        }
    };
    let stamp = match store.get(ISSUED_AT_KEY) {
        Ok(Some(stamp)) => stamp,
        Ok(None) => {
            purge(store);
            return None;
        }
        Err(err) => {
            eprintln!("failed to read stored session stamp: {err}");
            return None;
        }
    };

    let session: Session = match toml::from_str(&blob) {
        Ok(session) => session,
        Err(_) => {
            purge(store);
            return None;
        }
    };
    let issued_at = match OffsetDateTime::parse(&stamp, &Rfc3339) {
        Ok(issued_at) => issued_at,
        Err(_) => {
            purge(store);
            return None;
        }
    };

    if time.now() - issued_at > ttl {
        purge(store);
        return None;
    }

    Some(CachedSession { session, issued_at })
}

fn purge<S: KeyValueStore>(store: &S) {
    if let Err(err) = store.remove(SESSION_KEY) {
        eprintln!("failed to clear stored session: {err}");
    }
    if let Err(err) = store.remove(ISSUED_AT_KEY) {
        eprintln!("failed to clear stored session stamp: {err}");
    }
}
