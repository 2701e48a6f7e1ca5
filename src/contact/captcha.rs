//! Arithmetic CAPTCHA challenges.
//!
//! A challenge is single-use: whichever side holds it drops it on the first
//! validation attempt, whether the answer was right or not.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifetime of a server-side challenge.
pub const CAPTCHA_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptchaChallenge {
    pub id: String,
    pub question: String,
    #[serde(skip)]
    pub answer: i32,
}

impl CaptchaChallenge {
    pub fn generate() -> Self {
        Self::generate_with(&mut fastrand::Rng::new())
    }

    pub fn generate_with(rng: &mut fastrand::Rng) -> Self {
        let (question, answer) = match rng.u8(0..3) {
            0 => {
                let (a, b) = (rng.i32(1..=10), rng.i32(1..=10));
                (format!("{} + {}", a, b), a + b)
            }
            1 => {
                let (a, b) = (rng.i32(1..=10), rng.i32(1..=10));
                let (a, b) = (a.max(b), a.min(b));
                (format!("{} - {}", a, b), a - b)
            }
            _ => {
                let (a, b) = (rng.i32(1..=5), rng.i32(1..=5));
                (format!("{} × {}", a, b), a * b)
            }
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question,
            answer,
        }
    }

    /// Compare a user-entered answer. Surrounding whitespace is ignored.
    pub fn check(&self, answer: &str) -> bool {
        answer
            .trim()
            .parse::<i32>()
            .map(|value| value == self.answer)
            .unwrap_or(false)
    }
}

struct PendingChallenge {
    answer: i32,
    issued_at: Instant,
}

/// Server-side challenges keyed by id.
///
/// Each issued challenge schedules its own deletion after the TTL. Cloning
/// shares the underlying map.
#[derive(Clone)]
pub struct CaptchaStore {
    ttl: Duration,
    pending: Arc<Mutex<HashMap<String, PendingChallenge>>>,
}

impl CaptchaStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Issue a challenge. Must be called from within a Tokio runtime.
    pub fn issue(&self) -> CaptchaChallenge {
        let challenge = CaptchaChallenge::generate();

        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(
                challenge.id.clone(),
                PendingChallenge {
                    answer: challenge.answer,
                    issued_at: Instant::now(),
                },
            );
        }

        let pending = Arc::clone(&self.pending);
        let id = challenge.id.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Ok(mut pending) = pending.lock() {
                if pending.remove(&id).is_some() {
                    debug!("Captcha {} expired", id);
                }
            }
        });

        challenge
    }

    /// Validate and consume a challenge. Unknown, expired or already-used ids
    /// fail.
    pub fn validate(&self, id: &str, answer: &str) -> bool {
        let entry = match self.pending.lock() {
            Ok(mut pending) => pending.remove(id),
            Err(_) => None,
        };

        let Some(entry) = entry else {
            debug!("Captcha {} unknown or already used", id);
            return false;
        };

        if entry.issued_at.elapsed() > self.ttl {
            return false;
        }

        answer
            .trim()
            .parse::<i32>()
            .map(|value| value == entry.answer)
            .unwrap_or(false)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

impl Default for CaptchaStore {
    fn default() -> Self {
        Self::new(CAPTCHA_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_answer_matches_question() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let challenge = CaptchaChallenge::generate_with(&mut rng);
            let parts: Vec<&str> = challenge.question.split(' ').collect();
            let a: i32 = parts[0].parse().unwrap();
            let b: i32 = parts[2].parse().unwrap();
            let expected = match parts[1] {
                "+" => a + b,
                "-" => a - b,
                "×" => a * b,
                other => panic!("unexpected operator {}", other),
            };
            assert_eq!(challenge.answer, expected);
            assert!(challenge.answer >= 0);
        }
    }

    #[test]
    fn test_check_ignores_whitespace_and_rejects_garbage() {
        let challenge = CaptchaChallenge {
            id: "c1".to_string(),
            question: "3 + 4".to_string(),
            answer: 7,
        };
        assert!(challenge.check(" 7 "));
        assert!(!challenge.check("8"));
        assert!(!challenge.check("seven"));
        assert!(!challenge.check(""));
    }

    #[test]
    fn test_answer_is_not_serialized() {
        let json = serde_json::to_value(CaptchaChallenge::generate()).unwrap();
        assert!(json.get("answer").is_none());
        assert!(json.get("question").is_some());
    }

    #[tokio::test]
    async fn test_store_validates_once() {
        let store = CaptchaStore::default();
        let challenge = store.issue();
        let answer = challenge.answer.to_string();

        assert!(store.validate(&challenge.id, &answer));
        assert!(!store.validate(&challenge.id, &answer));
    }

    #[tokio::test]
    async fn test_store_wrong_answer_still_consumes() {
        let store = CaptchaStore::default();
        let challenge = store.issue();
        let wrong = (challenge.answer + 1).to_string();

        assert!(!store.validate(&challenge.id, &wrong));
        assert!(!store.validate(&challenge.id, &challenge.answer.to_string()));
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn test_store_unknown_id() {
        let store = CaptchaStore::default();
        assert!(!store.validate("nope", "1"));
    }

    #[tokio::test]
    async fn test_store_expires_entries() {
        let store = CaptchaStore::new(Duration::from_millis(50));
        let challenge = store.issue();
        assert_eq!(store.pending(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.pending(), 0);
        assert!(!store.validate(&challenge.id, &challenge.answer.to_string()));
    }
}
