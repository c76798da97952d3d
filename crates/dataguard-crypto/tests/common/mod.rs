//! Shared test environment: seeded randomness and a clock the test controls.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use dataguard_crypto::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// 2024-01-01T00:00:00Z
pub const START: i64 = 1_704_067_200;

#[derive(Clone)]
pub struct TestEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestEnv {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            now: Arc::new(Mutex::new(DateTime::from_timestamp(START, 0).unwrap())),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    pub fn set_now(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }
}

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }

    fn utc_now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
