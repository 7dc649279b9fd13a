use crate::store::ScanStore;
use crate::types::{JobScan, LogLevel, ScanKey, ScanResults, ServiceScan};
use crate::utils::{format_age, header_color};
use crossterm::style::Stylize;
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize)]
struct NamespaceReport<'a> {
    cluster: &'a str,
    namespace: &'a str,
    #[serde(flatten)]
    results: &'a ScanResults,
}

pub fn render_json(store: &dyn ScanStore) -> serde_json::Result<String> {
    let entries: Vec<_> = store
        .keys()
        .into_iter()
        .map(|key| {
            let results = store.get(&key.cluster, &key.namespace);
            (key, results)
        })
        .collect();
    let reports: Vec<NamespaceReport<'_>> = entries
        .iter()
        .map(|(key, results)| NamespaceReport {
            cluster: &key.cluster,
            namespace: &key.namespace,
            results: results.as_ref(),
        })
        .collect();
    serde_json::to_string_pretty(&reports)
}

pub fn render_text(store: &dyn ScanStore, color: bool) -> String {
    let mut out = String::new();
    for key in store.keys() {
        let results = store.get(&key.cluster, &key.namespace);
        let header = format!("[{}]", key);
        if color {
            let _ = writeln!(out, "{}", header.with(header_color(&key)).bold());
        } else {
            let _ = writeln!(out, "{}", header);
        }
        render_namespace(&mut out, &key, &results);
    }
    out
}

fn render_namespace(out: &mut String, key: &ScanKey, results: &ScanResults) {
    if results.is_empty() {
        let _ = writeln!(out, "  no running or finished pods in {}", key.namespace);
        return;
    }
    for scan in &results.services {
        let _ = writeln!(out, "  {}", service_line(scan));
    }
    for scan in &results.jobs {
        let _ = writeln!(out, "  {}", job_line(scan));
        for line in &scan.matched_lines {
            let _ = writeln!(out, "    | {}", line);
        }
    }
}

pub fn service_line(scan: &ServiceScan) -> String {
    let levels = LogLevel::ALL
        .iter()
        .map(|level| {
            let count = scan.level_counts.get(level).copied().unwrap_or(0);
            format!("{}={}", level, count)
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "service {} | up {} | restarts {} | lines {} | {} | unparsed={}",
        scan.service_name,
        format_age(scan.uptime),
        scan.restarts_count,
        scan.total_lines,
        levels,
        scan.non_classifiable_line_count
    )
}

pub fn job_line(scan: &JobScan) -> String {
    format!(
        "job {} | age {} | {} of {} line(s) match /{}/",
        scan.job_name,
        format_age(scan.age),
        scan.matched_lines.len(),
        scan.full_log.lines().count(),
        scan.grep_pattern
    )
}
