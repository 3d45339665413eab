//! Mergeable hit container shared by every worker and returned by the dispatcher.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::ops::{Add, AddAssign};

/// One aligned region of a target matched by a query. Coordinates are 1-based and inclusive.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Domain {
    pub query_from: usize,
    pub query_to: usize,
    pub target_from: usize,
    pub target_to: usize,
    /// Bit score of this region.
    pub score: f32,
    pub evalue: f64,
}

impl Domain {
    /// Total order used to break ties between otherwise equal hits.
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.evalue.total_cmp(&self.evalue))
            .then_with(|| other.target_from.cmp(&self.target_from))
            .then_with(|| other.target_to.cmp(&self.target_to))
            .then_with(|| other.query_from.cmp(&self.query_from))
            .then_with(|| other.query_to.cmp(&self.query_to))
    }
}

/// A scored match between one query and one target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hit {
    pub query: String,
    pub target: String,
    /// Bit score of the whole hit.
    pub score: f32,
    pub evalue: f64,
    pub domains: Vec<Domain>,
}

impl Hit {
    /// Precedence between two hits for the same `(query, target)` pair.
    ///
    /// Higher bit score wins, then lower E-value, then the domain lists are compared
    /// element-wise. `Greater` means `self` is the better hit. The order is total, which
    /// keeps [`HitCollection::combine`] commutative.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.evalue.total_cmp(&self.evalue))
            .then_with(|| {
                for (a, b) in self.domains.iter().zip(&other.domains) {
                    match a.total_cmp(b) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                self.domains.len().cmp(&other.domains.len())
            })
    }

    /// The best-scoring domain, if any.
    pub fn best_domain(&self) -> Option<&Domain> {
        self.domains.iter().max_by(|a, b| a.total_cmp(b))
    }
}

/// Bookkeeping summed across merges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Queries fully searched (failed or skipped queries are not counted).
    pub queries_searched: usize,
    /// Query-vs-target comparisons performed.
    pub targets_searched: usize,
}

type HitKey = (String, String);

/// Ordered set of [`Hit`]s keyed by `(query, target)`.
///
/// One instance per worker during a search; the dispatcher folds them together with
/// [`combine`](Self::combine), which is associative and commutative.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HitCollection {
    #[serde(serialize_with = "serialize_hits")]
    hits: BTreeMap<HitKey, Hit>,
    stats: SearchStats,
}

fn serialize_hits<S>(hits: &BTreeMap<HitKey, Hit>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.collect_seq(hits.values())
}

impl HitCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Record that one query was searched against `targets` sequences.
    pub fn record_query(&mut self, targets: usize) {
        self.stats.queries_searched += 1;
        self.stats.targets_searched += targets;
    }

    /// Insert a hit, keeping the better one when the `(query, target)` pair is already present.
    /// Returns true if the collection changed.
    pub fn insert(&mut self, hit: Hit) -> bool {
        match self.hits.entry((hit.query.clone(), hit.target.clone())) {
            MapEntry::Vacant(slot) => {
                slot.insert(hit);
                true
            }
            MapEntry::Occupied(mut slot) => {
                if hit.precedence(slot.get()) == Ordering::Greater {
                    slot.insert(hit);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn get(&self, query: &str, target: &str) -> Option<&Hit> {
        self.hits.get(&(query.to_string(), target.to_string()))
    }

    /// Hits in key order (query, then target).
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.values()
    }

    /// Hits ranked for reporting: lowest E-value first, then highest score, then key order.
    pub fn ranked(&self) -> Vec<&Hit> {
        let mut ranked: Vec<&Hit> = self.hits.values().collect();
        ranked.sort_by(|a, b| {
            a.evalue
                .total_cmp(&b.evalue)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.query.cmp(&b.query))
                .then_with(|| a.target.cmp(&b.target))
        });
        ranked
    }

    /// Hits at or below `evalue`.
    pub fn reported(&self, evalue: f64) -> impl Iterator<Item = &Hit> {
        self.hits.values().filter(move |h| h.evalue <= evalue)
    }

    /// Merge `other` into `self`: union of hits, better hit wins on shared keys, stats add up.
    pub fn combine(&mut self, other: HitCollection) {
        self.stats.queries_searched += other.stats.queries_searched;
        self.stats.targets_searched += other.stats.targets_searched;
        if self.hits.is_empty() {
            self.hits = other.hits;
            return;
        }
        for hit in other.hits.into_values() {
            self.insert(hit);
        }
    }

    /// Fold any number of collections into one. Empty input gives an empty collection.
    pub fn merge_all<I>(collections: I) -> HitCollection
    where
        I: IntoIterator<Item = HitCollection>,
    {
        collections
            .into_iter()
            .fold(HitCollection::new(), |mut acc, c| {
                acc.combine(c);
                acc
            })
    }
}

impl AddAssign for HitCollection {
    fn add_assign(&mut self, rhs: HitCollection) {
        self.combine(rhs);
    }
}

impl Add for HitCollection {
    type Output = HitCollection;

    fn add(mut self, rhs: HitCollection) -> HitCollection {
        self.combine(rhs);
        self
    }
}

impl Extend<Hit> for HitCollection {
    fn extend<T: IntoIterator<Item = Hit>>(&mut self, iter: T) {
        for hit in iter {
            self.insert(hit);
        }
    }
}

impl FromIterator<Hit> for HitCollection {
    fn from_iter<T: IntoIterator<Item = Hit>>(iter: T) -> Self {
        let mut hits = HitCollection::new();
        hits.extend(iter);
        hits
    }
}
