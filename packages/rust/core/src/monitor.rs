//! Drift monitor: distribution of predicted labels, written to a report file.

use std::path::Path;

use tracing::{error, info, instrument, warn};

use leadscore_shared::{LeadScoreError, Result};
use leadscore_staging::{StagingStore, tables};

/// Share of predicted positives and negatives over the predictions table.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub pct_ones: f64,
    pub pct_zeros: f64,
    /// True when there were no predictions to measure.
    pub empty_input: bool,
}

impl DriftReport {
    fn empty() -> Self {
        DriftReport {
            pct_ones: 0.0,
            pct_zeros: 0.0,
            empty_input: true,
        }
    }

    /// The two-line report text.
    pub fn render(&self) -> String {
        format!(
            "Percentage of 1's: {}\nPercentage of 0's: {}\n",
            self.pct_ones, self.pct_zeros
        )
    }
}

/// Measure the predicted-label distribution and overwrite the report file.
///
/// Never fails: an unreadable or empty predictions table produces a 0/0
/// report with the `empty_input` flag set, and a report-file write failure is
/// logged without affecting the returned measurement.
#[instrument(skip_all, fields(report = %report_path.display()))]
pub async fn run_drift_monitor(
    store: &StagingStore,
    label_column: &str,
    report_path: &Path,
) -> DriftReport {
    let report = match measure(store, label_column).await {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "could not measure prediction distribution");
            DriftReport::empty()
        }
    };

    if report.empty_input {
        warn!("no predictions to monitor, reporting 0/0");
    }

    if let Err(e) = write_report(report_path, &report) {
        error!(error = %e, "failed to write drift report");
    } else {
        info!(
            pct_ones = report.pct_ones,
            pct_zeros = report.pct_zeros,
            "drift report written"
        );
    }
    report
}

/// Open the staging store at `staging_db` and run the monitor. A store that
/// cannot be opened is treated like an empty predictions table.
pub async fn run_standalone_monitor(
    staging_db: &Path,
    label_column: &str,
    report_path: &Path,
) -> DriftReport {
    match StagingStore::open(staging_db).await {
        Ok(store) => run_drift_monitor(&store, label_column, report_path).await,
        Err(e) => {
            warn!(error = %e, "could not open staging store");
            let report = DriftReport::empty();
            if let Err(e) = write_report(report_path, &report) {
                error!(error = %e, "failed to write drift report");
            }
            report
        }
    }
}

async fn measure(store: &StagingStore, label_column: &str) -> Result<DriftReport> {
    let predictions = store.read_table(tables::PREDICTIONS).await?;
    if predictions.n_rows() == 0 {
        return Ok(DriftReport::empty());
    }

    let labels = predictions.column(label_column)?;
    let total = labels.len() as f64;
    let ones = labels
        .iter()
        .filter(|c| c.as_f64().is_some_and(|v| v >= 0.5))
        .count() as f64;

    Ok(DriftReport {
        pct_ones: ones * 100.0 / total,
        pct_zeros: (total - ones) * 100.0 / total,
        empty_input: false,
    })
}

fn write_report(path: &Path, report: &DriftReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LeadScoreError::io(parent, e))?;
    }
    std::fs::write(path, report.render()).map_err(|e| LeadScoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_dir;
    use leadscore_shared::{Cell, Frame};

    async fn store_with_predictions(dir: &Path, labels: &[i64]) -> StagingStore {
        let store = StagingStore::open(&dir.join("staging.db")).await.unwrap();
        let mut frame = Frame::new(vec!["app_complete_flag".into()]);
        for &label in labels {
            frame.push_row(vec![Cell::Int(label)]).unwrap();
        }
        store
            .replace_table(tables::PREDICTIONS, &frame)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn distribution_percentages() {
        let dir = temp_dir("monitor");
        let store = store_with_predictions(&dir, &[1, 1, 1, 0]).await;
        let report_path = dir.join("report.txt");
        let report = run_drift_monitor(&store, "app_complete_flag", &report_path).await;

        assert_eq!(report.pct_ones, 75.0);
        assert_eq!(report.pct_zeros, 25.0);
        assert!(!report.empty_input);

        let text = std::fs::read_to_string(&report_path).unwrap();
        assert_eq!(text, "Percentage of 1's: 75\nPercentage of 0's: 25\n");
    }

    #[tokio::test]
    async fn empty_predictions_report_zero() {
        let dir = temp_dir("monitor");
        let store = store_with_predictions(&dir, &[]).await;
        let report = run_drift_monitor(&store, "app_complete_flag", &dir.join("report.txt")).await;
        assert_eq!(report.pct_ones, 0.0);
        assert_eq!(report.pct_zeros, 0.0);
        assert!(report.empty_input);
    }

    #[tokio::test]
    async fn missing_table_does_not_panic() {
        let dir = temp_dir("monitor");
        let store = StagingStore::open(&dir.join("staging.db")).await.unwrap();
        let report = run_drift_monitor(&store, "app_complete_flag", &dir.join("report.txt")).await;
        assert!(report.empty_input);
    }

    #[tokio::test]
    async fn report_overwritten_each_run() {
        let dir = temp_dir("monitor");
        let report_path = dir.join("report.txt");

        let store = store_with_predictions(&dir, &[1, 0]).await;
        run_drift_monitor(&store, "app_complete_flag", &report_path).await;
        let store = store_with_predictions(&dir, &[0, 0]).await;
        run_drift_monitor(&store, "app_complete_flag", &report_path).await;

        let text = std::fs::read_to_string(&report_path).unwrap();
        assert_eq!(text, "Percentage of 1's: 0\nPercentage of 0's: 100\n");
    }
}
