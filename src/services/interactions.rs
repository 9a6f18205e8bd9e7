use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::models::{InteractionRecord, InteractionStats, SenderSummary};

pub type SenderId = String;

/// Per-sender message history for the lifetime of the process. Never evicted.
#[derive(Clone, Default)]
pub struct InteractionLog {
    inner: Arc<Mutex<HashMap<SenderId, Vec<InteractionRecord>>>>,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SenderId, Vec<InteractionRecord>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, sender: &str, text: &str, intent: Option<&str>, at: DateTime<Utc>) {
        self.lock()
            .entry(sender.to_string())
            .or_default()
            .push(InteractionRecord {
                text: text.to_string(),
                intent: intent.map(str::to_string),
                received_at: at,
            });
    }

    pub fn history(&self, sender: &str) -> Vec<InteractionRecord> {
        self.lock().get(sender).cloned().unwrap_or_default()
    }

    /// Every record as (sender, record), senders sorted, records in arrival order.
    pub fn snapshot(&self) -> Vec<(SenderId, InteractionRecord)> {
        let log = self.lock();
        let mut senders: Vec<&SenderId> = log.keys().collect();
        senders.sort();
        senders
            .into_iter()
            .flat_map(|s| log[s].iter().map(move |r| (s.clone(), r.clone())))
            .collect()
    }

    pub fn stats(&self) -> InteractionStats {
        let log = self.lock();
        let mut intents: BTreeMap<String, usize> = BTreeMap::new();
        let mut senders: Vec<SenderSummary> = Vec::with_capacity(log.len());
        let mut total_messages = 0;

        for (sender, records) in log.iter() {
            total_messages += records.len();
            for record in records {
                let key = record.intent.clone().unwrap_or_else(|| "default".to_string());
                *intents.entry(key).or_insert(0) += 1;
            }
            let last = records.last();
            senders.push(SenderSummary {
                sender: sender.clone(),
                message_count: records.len(),
                last_message: last.map(|r| r.text.clone()),
                last_seen: last.map(|r| r.received_at),
            });
        }

        // Most recently active first.
        senders.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.sender.cmp(&b.sender)));

        InteractionStats {
            total_senders: senders.len(),
            total_messages,
            intents,
            senders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn keeps_records_in_arrival_order() {
        let log = InteractionLog::new();
        log.record("a", "hi", Some("greeting"), at(0));
        log.record("a", "price?", Some("price"), at(5));
        let history = log.history("a");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "hi");
        assert_eq!(history[1].intent.as_deref(), Some("price"));
        assert!(log.history("missing").is_empty());
    }

    #[test]
    fn stats_aggregate_senders_and_intents() {
        let log = InteractionLog::new();
        log.record("a", "hi", Some("greeting"), at(0));
        log.record("b", "hello", Some("greeting"), at(1));
        log.record("a", "what", None, at(10));

        let stats = log.stats();
        assert_eq!(stats.total_senders, 2);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.intents.get("greeting"), Some(&2));
        assert_eq!(stats.intents.get("default"), Some(&1));
        assert_eq!(stats.senders[0].sender, "a");
        assert_eq!(stats.senders[0].message_count, 2);
        assert_eq!(stats.senders[0].last_message.as_deref(), Some("what"));
        assert_eq!(stats.senders[1].sender, "b");
    }

    #[test]
    fn clones_share_the_same_log() {
        let log = InteractionLog::new();
        let other = log.clone();
        other.record("a", "hi", None, at(0));
        assert_eq!(log.snapshot().len(), 1);
    }
}
