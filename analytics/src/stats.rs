//! Dashboard aggregates, recomputed from scratch over a log snapshot.
//!
//! [`compute_stats`] is a pure function of its input: the same records always
//! produce the same [`StatsSnapshot`], including the order of every top-N list
//! (count descending, then key ascending).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use search_core::tokenizer::normalize;

use crate::events::EventRecord;

/// Dwell histogram bucket lower bounds in seconds; the last bucket is open-ended.
pub const DWELL_BUCKETS: &[u64] = &[0, 5, 15, 30, 60, 180];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counted {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DwellBucket {
    pub lower_secs: u64,
    /// Exclusive upper bound; `None` for the last bucket.
    pub upper_secs: Option<u64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_sessions: u64,
    pub total_requests: u64,
    pub total_clicks: u64,
    /// Mean over clicks with a completed dwell; 0 when there are none.
    pub avg_dwell_secs: f64,
    pub completed_dwells: u64,
    pub top_documents: Vec<Counted>,
    pub top_queries: Vec<Counted>,
    pub top_terms: Vec<Counted>,
    pub rank_histogram: BTreeMap<u32, u64>,
    pub dwell_histogram: Vec<DwellBucket>,
    /// 24 entries, UTC hour of day.
    pub clicks_per_hour: Vec<u64>,
    pub browsers: Vec<Counted>,
    pub devices: Vec<Counted>,
}

fn top_n(counts: HashMap<String, u64>, n: usize) -> Vec<Counted> {
    let mut v: Vec<Counted> = counts.into_iter().map(|(key, count)| Counted { key, count }).collect();
    v.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    v.truncate(n);
    v
}

fn canonical_query(q: &str) -> String {
    q.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn dwell_bucket(secs: f64) -> usize {
    DWELL_BUCKETS.iter().rposition(|lower| secs >= *lower as f64).unwrap_or(0)
}

pub fn compute_stats(records: &[EventRecord], n: usize) -> StatsSnapshot {
    let (mut sessions, mut requests, mut clicks) = (0u64, 0u64, 0u64);
    let mut doc_counts: HashMap<String, u64> = HashMap::new();
    let mut query_counts: HashMap<String, u64> = HashMap::new();
    let mut term_counts: HashMap<String, u64> = HashMap::new();
    let mut browser_counts: HashMap<String, u64> = HashMap::new();
    let mut device_counts: HashMap<String, u64> = HashMap::new();
    let mut rank_histogram: BTreeMap<u32, u64> = BTreeMap::new();
    let mut dwell_counts = vec![0u64; DWELL_BUCKETS.len()];
    let mut clicks_per_hour = vec![0u64; 24];
    let (mut dwell_sum, mut dwell_n) = (0.0f64, 0u64);

    for record in records {
        match record {
            EventRecord::Session(_) => sessions += 1,
            EventRecord::Request(r) => {
                requests += 1;
                *browser_counts.entry(r.browser.clone()).or_default() += 1;
                *device_counts.entry(r.device.to_string()).or_default() += 1;
                let q = canonical_query(&r.query_string);
                if q.is_empty() {
                    continue;
                }
                for term in normalize(&q) {
                    *term_counts.entry(term).or_default() += 1;
                }
                *query_counts.entry(q).or_default() += 1;
            }
            EventRecord::Click(c) => {
                clicks += 1;
                *doc_counts.entry(c.document_id.clone()).or_default() += 1;
                *rank_histogram.entry(c.rank).or_default() += 1;
                clicks_per_hour[c.timestamp.hour() as usize] += 1;
                if let Some(d) = c.dwell_secs {
                    dwell_sum += d;
                    dwell_n += 1;
                    dwell_counts[dwell_bucket(d)] += 1;
                }
            }
        }
    }

    let dwell_histogram = DWELL_BUCKETS
        .iter()
        .enumerate()
        .map(|(i, lower)| DwellBucket {
            lower_secs: *lower,
            upper_secs: DWELL_BUCKETS.get(i + 1).copied(),
            count: dwell_counts[i],
        })
        .collect();

    StatsSnapshot {
        total_sessions: sessions,
        total_requests: requests,
        total_clicks: clicks,
        avg_dwell_secs: if dwell_n > 0 { dwell_sum / dwell_n as f64 } else { 0.0 },
        completed_dwells: dwell_n,
        top_documents: top_n(doc_counts, n),
        top_queries: top_n(query_counts, n),
        top_terms: top_n(term_counts, n),
        rank_histogram,
        dwell_histogram,
        clicks_per_hour,
        browsers: top_n(browser_counts, usize::MAX),
        devices: top_n(device_counts, usize::MAX),
    }
}
