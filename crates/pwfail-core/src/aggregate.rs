use crate::environment::{compare_labels, sort_labels};
use crate::test_name::normalize_test_name;
use crate::types::FailureRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTestEntry {
    pub test_name: String,
    pub labels: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub job_id: String,
    pub job_name: String,
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub failed_jobs: usize,
    pub environments: Vec<String>,
    pub unique_failing_tests: usize,
    pub tests_failing_everywhere: Vec<AggregatedTestEntry>,
    pub tests_failing_multiple: Vec<AggregatedTestEntry>,
    pub tests_failing_single: Vec<AggregatedTestEntry>,
    pub job_errors: Vec<JobError>,
    pub tests_by_test: Vec<AggregatedTestEntry>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Distinct environment labels across the failed-job set, in display order.
pub fn observed_environments(records: &[FailureRecord]) -> Vec<String> {
    let distinct: BTreeSet<&str> = records.iter().map(|r| r.label.as_str()).collect();
    sort_labels(distinct)
}

/// Join failures across jobs on the canonical test name. The result is
/// ordered by how many environments a test failed in, most first.
pub fn aggregate(records: &[FailureRecord]) -> Vec<AggregatedTestEntry> {
    let mut by_test: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for record in records {
        for raw in &record.tests {
            let name = normalize_test_name(raw);
            if name.is_empty() {
                continue;
            }
            by_test.entry(name).or_default().insert(record.label.as_str());
        }
    }

    let mut entries: Vec<AggregatedTestEntry> = by_test
        .into_iter()
        .map(|(test_name, labels)| {
            let mut labels: Vec<String> = labels.into_iter().map(str::to_string).collect();
            labels.sort_by(|a, b| compare_labels(a, b));
            AggregatedTestEntry {
                count: labels.len(),
                test_name,
                labels,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.test_name.cmp(&b.test_name))
    });
    entries
}

pub fn summarize(records: &[FailureRecord]) -> BuildSummary {
    let environments = observed_environments(records);
    let tests_by_test = aggregate(records);
    let total = environments.len();

    let mut summary = BuildSummary {
        failed_jobs: records.len(),
        unique_failing_tests: tests_by_test.len(),
        ..BuildSummary::default()
    };

    for entry in &tests_by_test {
        if total > 0 && entry.count == total {
            summary.tests_failing_everywhere.push(entry.clone());
        } else if entry.count > 1 {
            summary.tests_failing_multiple.push(entry.clone());
        } else {
            summary.tests_failing_single.push(entry.clone());
        }
    }

    summary.job_errors = records
        .iter()
        .filter_map(|r| {
            r.error.as_ref().map(|error| JobError {
                job_id: r.job_id.clone(),
                job_name: r.job_name.clone(),
                label: r.label.clone(),
                error: error.clone(),
            })
        })
        .collect();

    summary.environments = environments;
    summary.tests_by_test = tests_by_test;
    summary
}
