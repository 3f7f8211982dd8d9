//! Human-facing order numbers.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Issues `ORD<epoch-millis><3-digit sequence>` numbers, unique per generator.
///
/// Within one millisecond the sequence counts up; past 999 the generator borrows
/// the next millisecond, so numbers stay strictly increasing even under bursts
/// or a clock that steps backwards.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    state: Mutex<Clock>,
}

#[derive(Debug, Default)]
struct Clock {
    millis: i64,
    seq: u16,
}

impl OrderNumberGenerator {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Clock { millis: 0, seq: 0 }),
        }
    }

    pub fn next(&self, now: DateTime<Utc>) -> String {
        // The guarded state is two integers; a poisoned lock leaves them usable.
        let mut clock = self.state.lock().unwrap_or_else(|p| p.into_inner());

        let now_ms = now.timestamp_millis();
        if now_ms > clock.millis {
            clock.millis = now_ms;
            clock.seq = 0;
        } else {
            clock.seq += 1;
            if clock.seq > 999 {
                clock.millis += 1;
                clock.seq = 0;
            }
        }

        format!("ORD{}{:03}", clock.millis, clock.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn format_is_prefix_millis_sequence() {
        let generator = OrderNumberGenerator::new();
        let now = Utc::now();
        let n = generator.next(now);
        assert_eq!(n, format!("ORD{}000", now.timestamp_millis()));
    }

    #[test]
    fn same_instant_yields_distinct_numbers() {
        let generator = OrderNumberGenerator::new();
        let now = Utc::now();
        let numbers: HashSet<_> = (0..2500).map(|_| generator.next(now)).collect();
        assert_eq!(numbers.len(), 2500);
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let generator = Arc::new(OrderNumberGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let g = generator.clone();
                std::thread::spawn(move || (0..200).map(|_| g.next(Utc::now())).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for h in handles {
            for n in h.join().unwrap() {
                assert!(all.insert(n));
            }
        }
        assert_eq!(all.len(), 1600);
    }
}
