//! Live cardinality enrichment from the Prometheus TSDB status API
//!
//! Optional: the analyzer runs fully static without it. When a Prometheus
//! URL is configured, one fetch per run upgrades heuristic series counts
//! to measured values and raises confidence on dependent findings. Fetch
//! failures degrade to heuristics; they never abort a run.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Assumed series count for an unknown metric when TSDB status data is
/// not available.
pub const DEFAULT_HEURISTIC_SERIES: u64 = 1000;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cardinality information from `/api/v1/status/tsdb`.
#[derive(Debug, Clone, Default)]
pub struct CardinalityData {
    /// Metric name → active series count.
    pub series_by_metric: HashMap<String, u64>,
    /// Label name → distinct value count.
    pub values_by_label: HashMap<String, u64>,
    /// "label=value" → series count.
    pub series_by_label_pair: HashMap<String, u64>,
    /// Total active head series.
    pub head_series_count: u64,
}

impl CardinalityData {
    /// Series count for a metric, or `default` when unknown.
    pub fn estimated_series(&self, metric_name: &str, default: u64) -> u64 {
        self.series_by_metric
            .get(metric_name)
            .copied()
            .unwrap_or(default)
    }

    /// Distinct value count for a label, or `default` when unknown.
    pub fn label_cardinality(&self, label_name: &str, default: u64) -> u64 {
        self.values_by_label
            .get(label_name)
            .copied()
            .unwrap_or(default)
    }
}

/// Client for the TSDB status endpoint with a process-wide cached result.
///
/// Concurrent callers may all read a stale-but-valid cached value while a
/// fetch is in flight; there is no request de-duplication, only absence of
/// data races.
pub struct Client {
    base_url: String,
    agent: ureq::Agent,
    cache: Mutex<Option<(CardinalityData, Instant)>>,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            cache: Mutex::new(None),
        }
    }

    /// Retrieve cardinality data, serving from cache while fresh.
    pub fn fetch(&self) -> Result<CardinalityData> {
        {
            let cache = self.cache.lock().expect("cardinality cache poisoned");
            if let Some((data, at)) = cache.as_ref() {
                if at.elapsed() < CACHE_TTL {
                    return Ok(data.clone());
                }
            }
        }

        let data = self.fetch_from_api()?;

        let mut cache = self.cache.lock().expect("cardinality cache poisoned");
        *cache = Some((data.clone(), Instant::now()));
        Ok(data)
    }

    fn fetch_from_api(&self) -> Result<CardinalityData> {
        let url = format!("{}/api/v1/status/tsdb", self.base_url);
        let body: TsdbStatusResponse = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("fetching TSDB status from {url}"))?
            .body_mut()
            .read_json()
            .context("decoding TSDB status response")?;

        if body.status != "success" {
            return Err(anyhow!("TSDB status API returned status {:?}", body.status));
        }

        let mut data = CardinalityData {
            head_series_count: body.data.head_stats.num_series,
            ..Default::default()
        };
        for pair in body.data.series_count_by_metric_name {
            data.series_by_metric.insert(pair.name, pair.value);
        }
        for pair in body.data.label_value_count_by_label_name {
            data.values_by_label.insert(pair.name, pair.value);
        }
        for pair in body.data.series_count_by_label_value_pair {
            data.series_by_label_pair.insert(pair.name, pair.value);
        }
        Ok(data)
    }
}

#[derive(Debug, Deserialize)]
struct TsdbStatusResponse {
    status: String,
    data: TsdbStatusData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TsdbStatusData {
    #[serde(rename = "headStats")]
    head_stats: HeadStats,
    #[serde(rename = "seriesCountByMetricName")]
    series_count_by_metric_name: Vec<NameValuePair>,
    #[serde(rename = "labelValueCountByLabelName")]
    label_value_count_by_label_name: Vec<NameValuePair>,
    #[serde(rename = "seriesCountByLabelValuePair")]
    series_count_by_label_value_pair: Vec<NameValuePair>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HeadStats {
    #[serde(rename = "numSeries")]
    num_series: u64,
}

#[derive(Debug, Deserialize)]
struct NameValuePair {
    name: String,
    value: u64,
}
