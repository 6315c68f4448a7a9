use serde::{Deserialize, Serialize};
use spine_types::{EvidenceChannel, EvidenceRole};

use crate::row::ClassifiedEvidence;

/// Per-claim evidence statistics.
///
/// Replicate evidence is split into success and failure by channel, never
/// by a field inside the row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAggregate {
    pub claim_id: String,
    pub support_count: usize,
    pub support_max_conf: f64,
    pub support_mean_conf: f64,
    pub refute_count: usize,
    pub refute_max_conf: f64,
    pub refute_mean_conf: f64,
    pub undercut_count: usize,
    pub undercut_max_conf: f64,
    pub replicate_success_count: usize,
    pub replicate_fail_count: usize,
}

impl EvidenceAggregate {
    pub fn total_count(&self) -> usize {
        self.support_count
            + self.refute_count
            + self.undercut_count
            + self.replicate_success_count
            + self.replicate_fail_count
    }
}

#[derive(Default)]
struct Bucket {
    count: usize,
    sum: f64,
    max: f64,
}

impl Bucket {
    fn push(&mut self, conf: f64) {
        self.count += 1;
        self.sum += conf;
        self.max = self.max.max(conf);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregate classified evidence for `claim_id`.
pub fn aggregate_evidence(claim_id: &str, evidence: &[ClassifiedEvidence]) -> EvidenceAggregate {
    let mut support = Bucket::default();
    let mut refute = Bucket::default();
    let mut undercut = Bucket::default();
    let mut replicate_success = 0;
    let mut replicate_fail = 0;

    for ev in evidence {
        let conf = ev.row.confidence;
        match (ev.role, ev.channel) {
            (EvidenceRole::Support, _) => support.push(conf),
            (EvidenceRole::Refute, _) => refute.push(conf),
            (EvidenceRole::Undercut, _) => undercut.push(conf),
            (EvidenceRole::Replicate, EvidenceChannel::Validation) => replicate_success += 1,
            (EvidenceRole::Replicate, EvidenceChannel::Negative) => replicate_fail += 1,
        }
    }

    EvidenceAggregate {
        claim_id: claim_id.to_string(),
        support_count: support.count,
        support_max_conf: support.max,
        support_mean_conf: support.mean(),
        refute_count: refute.count,
        refute_max_conf: refute.max,
        refute_mean_conf: refute.mean(),
        undercut_count: undercut.count,
        undercut_max_conf: undercut.max,
        replicate_success_count: replicate_success,
        replicate_fail_count: replicate_fail,
    }
}

/// Disagreement between support and refutation, in [0, 1].
///
/// 0 when the weighted evidence is unanimous, 1 when both sides weigh the
/// same. Each replication contributes `replicate_weight` to its side.
pub fn compute_conflict_score_weighted(agg: &EvidenceAggregate, replicate_weight: f64) -> f64 {
    let support = agg.support_count as f64 * agg.support_mean_conf
        + agg.replicate_success_count as f64 * replicate_weight;
    let refute = agg.refute_count as f64 * agg.refute_mean_conf
        + agg.replicate_fail_count as f64 * replicate_weight;
    let total = support + refute;
    if total <= 0.0 {
        return 0.0;
    }
    (2.0 * support.min(refute) / total).clamp(0.0, 1.0)
}

/// [`compute_conflict_score_weighted`] with the default replicate weight.
pub fn compute_conflict_score(agg: &EvidenceAggregate) -> f64 {
    compute_conflict_score_weighted(agg, crate::policy::REPLICATE_WEIGHT)
}

/// Normalized Shannon entropy over support/refute/undercut counts, in [0, 1].
///
/// 0 when all evidence has one role, 1 when the three roles are equally
/// represented.
pub fn compute_entropy_proxy(agg: &EvidenceAggregate) -> f64 {
    let counts = [agg.support_count, agg.refute_count, agg.undercut_count];
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let entropy: f64 = counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    (entropy / 3f64.log2()).clamp(0.0, 1.0)
}
