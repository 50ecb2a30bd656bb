//! Confusion-matrix counters and derived performance.

use super::registry::Source;
use serde::Serialize;
use tracing::{info, warn};

/// Benchmark counters, serialized with the report's key names.
///
/// `base cnt` and `comp cnt` are tallied as records are admitted, apart from
/// the outcome counters, so `TP-base + FN == base cnt` is a real check.
/// Ratios that cannot be computed (zero denominators) are NaN, which
/// `serde_json` writes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsBox {
    #[serde(rename = "TP-base")]
    pub tp_base: usize,
    #[serde(rename = "TP-comp")]
    pub tp_comp: usize,
    #[serde(rename = "FP")]
    pub fp: usize,
    #[serde(rename = "FN")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    #[serde(rename = "base cnt")]
    pub base_cnt: usize,
    #[serde(rename = "comp cnt")]
    pub comp_cnt: usize,
    #[serde(rename = "TP-comp_TP-gt")]
    pub tp_comp_tp_gt: usize,
    #[serde(rename = "TP-comp_FP-gt")]
    pub tp_comp_fp_gt: usize,
    #[serde(rename = "TP-base_TP-gt")]
    pub tp_base_tp_gt: usize,
    #[serde(rename = "TP-base_FP-gt")]
    pub tp_base_fp_gt: usize,
    pub gt_concordance: f64,
}

impl StatsBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another box's counters to this one. Derived ratios are not
    /// carried; call [`calc_performance`](Self::calc_performance) after.
    pub fn merge(&mut self, other: &StatsBox) {
        self.tp_base += other.tp_base;
        self.tp_comp += other.tp_comp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
        self.base_cnt += other.base_cnt;
        self.comp_cnt += other.comp_cnt;
        self.tp_comp_tp_gt += other.tp_comp_tp_gt;
        self.tp_comp_fp_gt += other.tp_comp_fp_gt;
        self.tp_base_tp_gt += other.tp_base_tp_gt;
        self.tp_base_fp_gt += other.tp_base_fp_gt;
    }

    /// Count a record admitted for matching.
    pub fn add_admitted(&mut self, source: Source) {
        match source {
            Source::Base => self.base_cnt += 1,
            Source::Comp => self.comp_cnt += 1,
        }
    }

    /// Count a matched base record.
    pub fn add_tp_base(&mut self, gt_concordant: bool) {
        self.tp_base += 1;
        if gt_concordant {
            self.tp_base_tp_gt += 1;
        } else {
            self.tp_base_fp_gt += 1;
        }
    }

    /// Count a matched comparison record.
    pub fn add_tp_comp(&mut self, gt_concordant: bool) {
        self.tp_comp += 1;
        if gt_concordant {
            self.tp_comp_tp_gt += 1;
        } else {
            self.tp_comp_fp_gt += 1;
        }
    }

    /// Log the recall so far without touching the box.
    pub fn peek(&self) {
        let denom = self.tp_base + self.fn_;
        if denom > 0 {
            info!(
                "Recall so far: {:.4} ({} TP-base / {} base)",
                self.tp_base as f64 / denom as f64,
                self.tp_base,
                denom
            );
        }
    }

    /// Fill in precision, recall, F1 and genotype concordance.
    pub fn calc_performance(&mut self) {
        let base_total = self.tp_base + self.fn_;
        let comp_total = self.tp_comp + self.fp;
        if base_total != self.base_cnt || comp_total != self.comp_cnt {
            warn!(
                "Outcome totals ({} base, {} comp) differ from admitted counts ({} base, {} comp)",
                base_total, comp_total, self.base_cnt, self.comp_cnt
            );
        }

        self.recall = if base_total == 0 {
            warn!("No TP or FN calls in base!");
            f64::NAN
        } else {
            self.tp_base as f64 / base_total as f64
        };

        self.precision = if comp_total == 0 {
            warn!("No TP or FP calls in comp!");
            f64::NAN
        } else {
            self.tp_comp as f64 / comp_total as f64
        };

        let denom = self.precision + self.recall;
        self.f1 = if denom.is_nan() || denom == 0.0 {
            warn!("Precision + recall is undefined or zero; F1 is undefined");
            f64::NAN
        } else {
            2.0 * (self.precision * self.recall) / denom
        };

        let gt_total = self.tp_comp_tp_gt + self.tp_comp_fp_gt;
        self.gt_concordance = if gt_total == 0 {
            warn!("No TP-comp calls; genotype concordance is undefined");
            f64::NAN
        } else {
            self.tp_comp_tp_gt as f64 / gt_total as f64
        };
    }
}

impl std::fmt::Display for StatsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TP-base: {}, TP-comp: {}, FP: {}, FN: {}, precision: {:.4}, recall: {:.4}, f1: {:.4}",
            self.tp_base, self.tp_comp, self.fp, self.fn_, self.precision, self.recall, self.f1
        )
    }
}
