use serde::Serialize;

/// Additive smoothing that keeps every ratio defined on empty counts.
const EPS: f64 = 0.00001;

/// Binary confusion-matrix counts, positive class = label 1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionStats {
    #[serde(rename = "TP")]
    pub tp: u64,
    #[serde(rename = "FP")]
    pub fp: u64,
    #[serde(rename = "TN")]
    pub tn: u64,
    #[serde(rename = "FN")]
    pub fn_: u64,
}

impl ConfusionStats {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn precision(&self) -> f64 {
        (self.tp as f64 + EPS) / ((self.tp + self.fp) as f64 + EPS)
    }

    pub fn recall(&self) -> f64 {
        (self.tp as f64 + EPS) / ((self.tp + self.fn_) as f64 + EPS)
    }

    pub fn accuracy(&self) -> f64 {
        ((self.tp + self.tn) as f64 + EPS) / (self.total() as f64 + EPS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub stats: ConfusionStats,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl From<&ConfusionStats> for MetricsSummary {
    fn from(stats: &ConfusionStats) -> Self {
        MetricsSummary {
            stats: *stats,
            accuracy: stats.accuracy(),
            precision: stats.precision(),
            recall: stats.recall(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn record_fills_each_cell() {
        let mut stats = ConfusionStats::default();
        stats.record(true, true);
        stats.record(true, true);
        stats.record(true, false);
        stats.record(false, false);
        stats.record(false, true);
        assert_eq!(
            stats,
            ConfusionStats {
                tp: 2,
                fp: 1,
                tn: 1,
                fn_: 1
            }
        );
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn smoothed_ratios() {
        let stats = ConfusionStats {
            tp: 6,
            fp: 2,
            tn: 10,
            fn_: 2,
        };
        assert!(close(stats.precision(), 0.75));
        assert!(close(stats.recall(), 0.75));
        assert!(close(stats.accuracy(), 0.8));
    }

    #[test]
    fn empty_stats_are_perfect() {
        let stats = ConfusionStats::default();
        assert!(close(stats.precision(), 1.0));
        assert!(close(stats.recall(), 1.0));
        assert!(close(stats.accuracy(), 1.0));
    }

    #[test]
    fn no_positive_predictions_gives_near_zero_recall() {
        let stats = ConfusionStats {
            tp: 0,
            fp: 0,
            tn: 3,
            fn_: 4,
        };
        assert!(close(stats.precision(), 1.0));
        assert!(stats.recall() < 1e-5);
    }

    #[test]
    fn summary_serializes_with_cell_names() {
        let stats = ConfusionStats {
            tp: 1,
            fp: 0,
            tn: 1,
            fn_: 0,
        };
        let json = serde_json::to_value(MetricsSummary::from(&stats)).unwrap();
        assert_eq!(json["stats"]["TP"], 1);
        assert_eq!(json["stats"]["FN"], 0);
        assert!(close(json["accuracy"].as_f64().unwrap(), 1.0));
    }
}
