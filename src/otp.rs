use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a pending verification code stays valid.
pub const OTP_TTL: Duration = Duration::from_secs(300);

struct OtpEntry {
    code: String,
    expires_at: Instant,
}

/// In-process store for pending email verification codes, keyed by email.
///
/// Injected as shared app data rather than reached through a global so the
/// expiry behavior can be tested in isolation. Expired entries are dropped
/// lazily on the next access.
pub struct OtpStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        OtpStore {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a code for the given email, replacing any pending one.
    pub fn put(&self, email: &str, code: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        entries.insert(
            email.to_lowercase(),
            OtpEntry {
                code: code.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Returns the pending code for the email, if one exists and has not expired.
    pub fn peek(&self, email: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        let key = email.to_lowercase();
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.code.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Drops the pending code for the email, if any.
    pub fn remove(&self, email: &str) {
        self.entries.lock().unwrap().remove(&email.to_lowercase());
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        OtpStore::new(OTP_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_returns_pending_code() {
        let store = OtpStore::new(Duration::from_secs(60));
        store.put("user@example.com", "483920");
        assert_eq!(store.peek("user@example.com"), Some("483920".to_string()));
    }

    #[test]
    fn lookup_is_case_insensitive_on_email() {
        let store = OtpStore::new(Duration::from_secs(60));
        store.put("User@Example.COM", "111111");
        assert_eq!(store.peek("user@example.com"), Some("111111".to_string()));
    }

    #[test]
    fn overwrites_pending_code_for_same_email() {
        let store = OtpStore::new(Duration::from_secs(60));
        store.put("user@example.com", "111111");
        store.put("user@example.com", "222222");
        assert_eq!(store.peek("user@example.com"), Some("222222".to_string()));
    }

    #[test]
    fn expired_code_is_gone() {
        let store = OtpStore::new(Duration::from_millis(10));
        store.put("user@example.com", "483920");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.peek("user@example.com"), None);
    }

    #[test]
    fn remove_invalidates_entry() {
        let store = OtpStore::new(Duration::from_secs(60));
        store.put("user@example.com", "483920");
        store.remove("user@example.com");
        assert_eq!(store.peek("user@example.com"), None);
    }

    #[test]
    fn unknown_email_has_no_code() {
        let store = OtpStore::new(Duration::from_secs(60));
        assert_eq!(store.peek("nobody@example.com"), None);
    }
}
