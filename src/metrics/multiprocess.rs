//! # Multiprocess Aggregation
//!
//! In multi-worker deployments each process holds its own in-memory registry.
//! Consistency is reached only at scrape time: workers persist text snapshots
//! of their registry into a shared directory and the scraping process merges
//! them, summing samples with identical series identity. This is an
//! eventually-consistent read-time merge; no cross-process locking is
//! involved.
//!
//! The coordination directory is taken from the `PROMETHEUS_MULTIPROC_DIR`
//! environment variable, matching the convention of the Prometheus client's
//! multiprocess mode.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

use crate::error::{MonitorError, MonitorResult};

/// Environment variable naming the shared snapshot directory.
pub const MULTIPROC_DIR_ENV: &str = "PROMETHEUS_MULTIPROC_DIR";

const SNAPSHOT_EXTENSION: &str = "prom";

/// Returns the configured coordination directory, if any. An empty value
/// counts as unset.
pub fn coordination_dir() -> Option<PathBuf> {
    match std::env::var(MULTIPROC_DIR_ENV) {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

/// Persists one process's registry into the coordination directory.
///
/// Snapshots are written atomically (temp file + rename) to
/// `<dir>/worker-<pid>.prom`, so a concurrent scrape never observes a
/// half-written file.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    registry: Arc<Registry>,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, registry: Arc<Registry>) -> Self {
        Self {
            dir: dir.into(),
            registry,
        }
    }

    /// Encodes the registry and replaces this worker's snapshot file.
    pub fn write_snapshot(&self) -> MonitorResult<()> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        if let Some(stripped) = body.strip_suffix("# EOF\n") {
            body.truncate(stripped.len());
        }

        let pid = std::process::id();
        let tmp_path = self.dir.join(format!(".worker-{pid}.tmp"));
        let final_path = self.dir.join(format!("worker-{pid}.{SNAPSHOT_EXTENSION}"));

        std::fs::write(&tmp_path, body.as_bytes()).map_err(|source| {
            MonitorError::Multiprocess {
                path: tmp_path.clone(),
                source,
            }
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|source| MonitorError::Multiprocess {
            path: final_path.clone(),
            source,
        })
    }

    /// Spawns a background task that refreshes the snapshot every `period`.
    /// Write failures are logged and retried on the next tick.
    pub fn spawn(self, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(error) = self.write_snapshot() {
                    tracing::error!(%error, "failed to write metrics snapshot");
                }
            }
        })
    }
}

#[derive(Default)]
struct FamilyMeta {
    help: Option<String>,
    kind: Option<String>,
    samples: Vec<String>,
}

/// Merges every snapshot file in `dir` into one exposition body.
///
/// Samples with identical series identity (metric name plus label set) are
/// summed, which is the correct combination for counters, histograms and the
/// live-sum gauges this crate emits. Exemplars are per-process annotations
/// and are dropped from merged output. Errors reading the directory or any
/// snapshot file propagate to the caller.
pub fn gather(dir: &Path) -> MonitorResult<String> {
    let entries = std::fs::read_dir(dir).map_err(|source| MonitorError::Multiprocess {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut family_order: Vec<String> = Vec::new();
    let mut families: HashMap<String, FamilyMeta> = HashMap::new();
    let mut values: HashMap<String, f64> = HashMap::new();

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MonitorError::Multiprocess {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(SNAPSHOT_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    for path in &paths {
        let contents =
            std::fs::read_to_string(path).map_err(|source| MonitorError::Multiprocess {
                path: path.clone(),
                source,
            })?;
        merge_snapshot(
            &contents,
            path,
            &mut family_order,
            &mut families,
            &mut values,
        )?;
    }

    let mut body = String::new();
    for name in &family_order {
        if let Some(meta) = families.get(name) {
            if let Some(help) = &meta.help {
                body.push_str(&format!("# HELP {name} {help}\n"));
            }
            if let Some(kind) = &meta.kind {
                body.push_str(&format!("# TYPE {name} {kind}\n"));
            }
            for series in &meta.samples {
                if let Some(value) = values.get(series) {
                    body.push_str(&format!("{series} {value:?}\n"));
                }
            }
        }
    }
    Ok(body)
}

fn merge_snapshot(
    contents: &str,
    path: &Path,
    family_order: &mut Vec<String>,
    families: &mut HashMap<String, FamilyMeta>,
    values: &mut HashMap<String, f64>,
) -> MonitorResult<()> {
    let mut current_family: Option<String> = None;

    for line in contents.lines() {
        let line = line.trim_end();
        if line.is_empty() || line == "# EOF" {
            continue;
        }

        if let Some(rest) = line.strip_prefix("# HELP ") {
            let (name, help) = split_comment(rest, path)?;
            let meta = family_entry(name, family_order, families);
            meta.help.get_or_insert_with(|| help.to_owned());
            current_family = Some(name.to_owned());
            continue;
        }
        if let Some(rest) = line.strip_prefix("# TYPE ") {
            let (name, kind) = split_comment(rest, path)?;
            let meta = family_entry(name, family_order, families);
            meta.kind.get_or_insert_with(|| kind.to_owned());
            current_family = Some(name.to_owned());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        // Sample line; drop any trailing exemplar before splitting off the
        // value.
        let sample = match line.find(" # ") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let (series, raw_value) =
            sample
                .rsplit_once(' ')
                .ok_or_else(|| MonitorError::MalformedSnapshot {
                    path: path.to_path_buf(),
                    message: format!("sample line without value: {line:?}"),
                })?;
        let value: f64 = raw_value
            .parse()
            .map_err(|_| MonitorError::MalformedSnapshot {
                path: path.to_path_buf(),
                message: format!("unparseable sample value: {raw_value:?}"),
            })?;

        let family_name = match &current_family {
            Some(name) if series_belongs_to(series, name) => name.clone(),
            _ => metric_name_of(series).to_owned(),
        };
        let meta = family_entry(&family_name, family_order, families);
        if !values.contains_key(series) {
            meta.samples.push(series.to_owned());
        }
        *values.entry(series.to_owned()).or_insert(0.0) += value;
    }
    Ok(())
}

fn family_entry<'a>(
    name: &str,
    family_order: &mut Vec<String>,
    families: &'a mut HashMap<String, FamilyMeta>,
) -> &'a mut FamilyMeta {
    if !families.contains_key(name) {
        family_order.push(name.to_owned());
    }
    families.entry(name.to_owned()).or_default()
}

fn split_comment<'a>(rest: &'a str, path: &Path) -> MonitorResult<(&'a str, &'a str)> {
    rest.split_once(' ')
        .ok_or_else(|| MonitorError::MalformedSnapshot {
            path: path.to_path_buf(),
            message: format!("malformed comment line: {rest:?}"),
        })
}

fn metric_name_of(series: &str) -> &str {
    match series.find('{') {
        Some(idx) => &series[..idx],
        None => series,
    }
}

fn series_belongs_to(series: &str, family: &str) -> bool {
    metric_name_of(series).starts_with(family)
}
