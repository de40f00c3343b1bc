//! Streaming parser for exposure files.
//!
//! The source document is read as a token stream: the top-level object is
//! scanned key by key, and the `exposures` and `credit_risk_mitigation`
//! arrays are consumed one element at a time. Only a single element is ever
//! held as a JSON tree, so the size of the document never dictates the size
//! of an intermediate tree.
//!
//! ```text
//! { "bank_info": {...},                 -> BankInfo (optional)
//!   "exposures": [ {...}, {...}, ... ], -> ExposureRecording | SkippedExposure
//!   "credit_risk_mitigation": [ ... ],  -> RawMitigationData | SkippedExposure
//!   "anything_else": ... }              -> ignored
//! ```
//!
//! A malformed element is skipped with a reason, and so is an exposure whose
//! id was already seen, since mitigations are matched by exposure id. A
//! missing exposures array, broken JSON or a non-object document fails the
//! whole parse.

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use riskcalc_config::StreamingSettings;
use riskcalc_core::{
    CurrencyCode, ExposureId, ExposureRecording, MitigationType, RawMitigationData,
};
use riskcalc_portfolio::SkippedExposure;
use rust_decimal::Decimal;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::memory::{MemoryAlert, MemoryProbe, MemoryTracker};

const MISSING_EXPOSURES: &str = "File does not contain valid exposures array";
const CANCELLED: &str = "parse cancelled";

// =============================================================================
// PARSED FILE
// =============================================================================

/// Reporting bank metadata carried by the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankInfo {
    /// Bank display name.
    pub bank_name: Option<String>,
    /// Italian ABI code.
    pub abi_code: Option<String>,
    /// Legal entity identifier.
    pub lei_code: Option<String>,
}

/// Counters and memory readings of one parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStats {
    /// Elements read from both arrays.
    pub records_seen: usize,
    /// Exposures accepted.
    pub exposures_parsed: usize,
    /// Mitigations accepted.
    pub mitigations_parsed: usize,
    /// Elements skipped from both arrays.
    pub records_skipped: usize,
    /// Bytes pulled from the source.
    pub bytes_processed: u64,
    /// Wall time of the parse.
    pub duration: Duration,
    /// Process memory at start, when available.
    pub memory_start: Option<u64>,
    /// Highest sampled process memory.
    pub memory_peak: Option<u64>,
    /// Process memory at the end.
    pub memory_end: Option<u64>,
    /// Threshold breaches. Informational only.
    pub alerts: Vec<MemoryAlert>,
}

/// Everything extracted from one exposure file.
#[derive(Debug, Clone, Default)]
pub struct ParsedExposureFile {
    /// Bank metadata, when present and well-formed.
    pub bank_info: Option<BankInfo>,
    /// Accepted exposures in source order.
    pub exposures: Vec<ExposureRecording>,
    /// Accepted mitigations in source order.
    pub mitigations: Vec<RawMitigationData>,
    /// Exposure elements that were skipped.
    pub skipped: Vec<SkippedExposure>,
    /// Mitigation elements that were skipped.
    pub skipped_mitigations: Vec<SkippedExposure>,
    /// Parse statistics.
    pub stats: ParseStats,
}

impl ParsedExposureFile {
    /// Mitigations grouped by the exposure they protect.
    pub fn mitigations_by_exposure(&self) -> HashMap<ExposureId, Vec<RawMitigationData>> {
        let mut grouped: HashMap<ExposureId, Vec<RawMitigationData>> = HashMap::new();
        for m in &self.mitigations {
            grouped.entry(m.exposure_id().clone()).or_default().push(m.clone());
        }
        grouped
    }

    /// Distinct currencies of exposures and mitigations.
    pub fn currencies(&self) -> BTreeSet<&CurrencyCode> {
        self.exposures
            .iter()
            .map(ExposureRecording::original_currency)
            .chain(self.mitigations.iter().map(RawMitigationData::currency))
            .collect()
    }
}

/// Why a whole parse was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// The document is not a valid exposure file.
    #[error("{0}")]
    Structural(String),

    /// The cancellation token fired mid-parse.
    #[error("parse cancelled")]
    Cancelled,
}

// =============================================================================
// PARSER
// =============================================================================

/// Streams exposure files into domain records.
#[derive(Clone)]
pub struct StreamingParser {
    settings: StreamingSettings,
    probe: Arc<dyn MemoryProbe>,
}

impl StreamingParser {
    /// Creates a parser sampling memory through `probe`.
    pub fn new(settings: StreamingSettings, probe: Arc<dyn MemoryProbe>) -> Self {
        Self { settings, probe }
    }

    /// Parses an in-memory document.
    pub fn parse(
        &self,
        content: &[u8],
        cancel: &CancellationToken,
    ) -> Result<ParsedExposureFile, ParseFailure> {
        self.parse_reader(content, cancel)
    }

    /// Parses a document from any reader.
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        cancel: &CancellationToken,
    ) -> Result<ParsedExposureFile, ParseFailure> {
        let started = Instant::now();
        let bytes = Rc::new(Cell::new(0u64));
        let reader = CountingReader {
            inner: reader,
            count: Rc::clone(&bytes),
        };

        let mut state = ParseState {
            file: ParsedExposureFile::default(),
            tracker: MemoryTracker::start(self.probe.as_ref()),
            probe: self.probe.as_ref(),
            sample_interval: self.settings.sample_interval.max(1),
            bytes: Rc::clone(&bytes),
            cancel,
            seen_ids: HashSet::new(),
            saw_exposures: false,
            cancelled: false,
        };

        let mut de = serde_json::Deserializer::from_reader(reader);
        let outcome = de
            .deserialize_map(FileVisitor { state: &mut state })
            .and_then(|()| de.end());

        if state.cancelled {
            return Err(ParseFailure::Cancelled);
        }
        if let Err(e) = outcome {
            return Err(ParseFailure::Structural(format!("malformed exposure file: {e}")));
        }
        if !state.saw_exposures {
            return Err(ParseFailure::Structural(MISSING_EXPOSURES.to_string()));
        }

        state.tracker.sample(self.probe.as_ref());
        let ParseState { mut file, tracker, .. } = state;

        let alerts = tracker.alerts(
            self.probe.total_bytes(),
            self.settings.memory_warn_percent,
            self.settings.memory_warn_bytes,
        );
        for alert in &alerts {
            warn!(?alert, "Memory threshold exceeded while parsing");
        }

        let stats = &mut file.stats;
        stats.bytes_processed = bytes.get();
        stats.duration = started.elapsed();
        stats.memory_start = tracker.start_bytes();
        stats.memory_peak = tracker.peak_bytes();
        stats.memory_end = tracker.last_bytes();
        stats.alerts = alerts;

        info!(
            exposures = stats.exposures_parsed,
            mitigations = stats.mitigations_parsed,
            skipped = stats.records_skipped,
            bytes = stats.bytes_processed,
            duration_ms = stats.duration.as_millis() as u64,
            "Parsed exposure file"
        );
        Ok(file)
    }
}

impl fmt::Debug for StreamingParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingParser")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

struct CountingReader<R> {
    inner: R,
    count: Rc<Cell<u64>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.set(self.count.get() + n as u64);
        Ok(n)
    }
}

struct ParseState<'a> {
    file: ParsedExposureFile,
    tracker: MemoryTracker,
    probe: &'a dyn MemoryProbe,
    sample_interval: usize,
    bytes: Rc<Cell<u64>>,
    cancel: &'a CancellationToken,
    seen_ids: HashSet<ExposureId>,
    saw_exposures: bool,
    cancelled: bool,
}

impl ParseState<'_> {
    /// Per-element bookkeeping. Returns false once cancelled.
    fn tick(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            return false;
        }
        self.file.stats.records_seen += 1;
        if self.file.stats.records_seen % self.sample_interval == 0 {
            let used = self.tracker.sample(self.probe);
            debug!(
                records = self.file.stats.records_seen,
                bytes = self.bytes.get(),
                memory_bytes = used,
                "Parse progress"
            );
        }
        true
    }

    fn accept(&mut self, section: Section, index: usize, element: &Value) {
        match section {
            Section::Exposures => match exposure_from_value(element).and_then(|record| {
                if self.seen_ids.insert(record.exposure_id().clone()) {
                    Ok(record)
                } else {
                    Err(format!("duplicate exposure_id '{}'", record.exposure_id()))
                }
            }) {
                Ok(record) => {
                    self.file.stats.exposures_parsed += 1;
                    self.file.exposures.push(record);
                }
                Err(reason) => {
                    let skipped = skip(index, element, reason);
                    warn!(index, reason = %skipped.reason, "Skipping exposure record");
                    self.file.stats.records_skipped += 1;
                    self.file.skipped.push(skipped);
                }
            },
            Section::Mitigations => match mitigation_from_value(element) {
                Ok(mitigation) => {
                    self.file.stats.mitigations_parsed += 1;
                    self.file.mitigations.push(mitigation);
                }
                Err(reason) => {
                    let skipped = skip(index, element, reason);
                    warn!(index, reason = %skipped.reason, "Skipping malformed mitigation");
                    self.file.stats.records_skipped += 1;
                    self.file.skipped_mitigations.push(skipped);
                }
            },
        }
    }
}

// =============================================================================
// SERDE DRIVERS
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Section {
    Exposures,
    Mitigations,
}

struct FileVisitor<'s, 'a> {
    state: &'s mut ParseState<'a>,
}

impl<'de> Visitor<'de> for FileVisitor<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with an exposures array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "exposures" => {
                    self.state.saw_exposures = true;
                    map.next_value_seed(SectionSeed {
                        section: Section::Exposures,
                        state: &mut *self.state,
                    })?;
                }
                "credit_risk_mitigation" => map.next_value_seed(SectionSeed {
                    section: Section::Mitigations,
                    state: &mut *self.state,
                })?,
                "bank_info" => {
                    let value: Value = map.next_value()?;
                    match serde_json::from_value::<BankInfo>(value) {
                        Ok(info) => self.state.file.bank_info = Some(info),
                        Err(e) => warn!(error = %e, "Ignoring malformed bank_info"),
                    }
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

struct SectionSeed<'s, 'a> {
    section: Section,
    state: &'s mut ParseState<'a>,
}

impl<'de> DeserializeSeed<'de> for SectionSeed<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for SectionSeed<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Section::Exposures => f.write_str("an array of exposure records"),
            Section::Mitigations => f.write_str("an array of mitigation records"),
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let mut index = 0;
        while let Some(element) = seq.next_element::<Value>()? {
            if !self.state.tick() {
                return Err(de::Error::custom(CANCELLED));
            }
            self.state.accept(self.section, index, &element);
            index += 1;
        }
        Ok(())
    }
}

// =============================================================================
// RECORD MAPPING
// =============================================================================

fn skip(index: usize, element: &Value, reason: String) -> SkippedExposure {
    let id = element
        .as_object()
        .and_then(|o| text(o, &["exposure_id", "id"]))
        .map(ExposureId::new);
    SkippedExposure::new(Some(index), id, reason)
}

fn exposure_from_value(element: &Value) -> Result<ExposureRecording, String> {
    let obj = element
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", kind(element)))?;

    let id = required_text(obj, &["exposure_id", "id"])?;
    let client = required_text(obj, &["client_name"])?;
    let amount = required_decimal(obj, &["original_amount", "amount"])?;
    let currency = currency(obj, &["original_currency", "currency"], None)?;
    let country = text(obj, &["country", "country_code"]).unwrap_or_default();
    let product = text(obj, &["sector", "product_type"]).unwrap_or_default();

    ExposureRecording::new(id, client, amount, currency, country, product).map_err(|e| e.to_string())
}

fn mitigation_from_value(element: &Value) -> Result<RawMitigationData, String> {
    let obj = element
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", kind(element)))?;

    let id = required_text(obj, &["exposure_id"])?;
    let type_code = required_text(obj, &["mitigation_type", "type"])?;
    let mitigation_type = MitigationType::from_str(&type_code).map_err(|e| e.to_string())?;
    let value = required_decimal(obj, &["value", "amount"])?;
    let currency = currency(obj, &["currency"], Some(CurrencyCode::eur()))?;

    RawMitigationData::new(id, mitigation_type, value, currency).map_err(|e| e.to_string())
}

fn field<'v>(obj: &'v Map<String, Value>, names: &[&str]) -> Option<&'v Value> {
    names
        .iter()
        .find_map(|n| obj.get(*n))
        .filter(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match field(obj, names)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(obj: &Map<String, Value>, names: &[&str]) -> Result<String, String> {
    text(obj, names)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required field '{}'", names[0]))
}

fn required_decimal(obj: &Map<String, Value>, names: &[&str]) -> Result<Decimal, String> {
    let raw = match field(obj, names) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("'{}' must be a number, found {}", names[0], kind(other))),
        None => return Err(format!("missing required field '{}'", names[0])),
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| format!("'{}' is not a valid amount: {raw}", names[0]))
}

fn currency(
    obj: &Map<String, Value>,
    names: &[&str],
    default: Option<CurrencyCode>,
) -> Result<CurrencyCode, String> {
    match (text(obj, names).filter(|s| !s.is_empty()), default) {
        (Some(code), _) => CurrencyCode::new(code).map_err(|e| e.to_string()),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(format!("missing required field '{}'", names[0])),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct NoMemory;

    impl MemoryProbe for NoMemory {
        fn used_bytes(&self) -> Option<u64> {
            None
        }

        fn total_bytes(&self) -> Option<u64> {
            None
        }
    }

    fn parser() -> StreamingParser {
        StreamingParser::new(StreamingSettings::default(), Arc::new(NoMemory))
    }

    fn parse(json: &str) -> Result<ParsedExposureFile, ParseFailure> {
        parser().parse(json.as_bytes(), &CancellationToken::new())
    }

    const SAMPLE: &str = r#"{
        "bank_info": { "bank_name": "Banca Esempio", "abi_code": "12345", "lei_code": "LEI0001" },
        "report_date": "2024-06-30",
        "exposures": [
            { "exposure_id": "E1", "client_name": "Acme", "original_amount": "1000.50",
              "original_currency": "USD", "country": "IT", "sector": "CORPORATE" },
            { "exposure_id": "E2", "client_name": "Beta", "original_amount": 250,
              "original_currency": "EUR", "country": "DE", "sector": "RETAIL_MORTGAGE" },
            { "exposure_id": "E3", "client_name": "Gamma", "original_amount": "-5",
              "original_currency": "EUR" },
            "not an object",
            { "client_name": "No Id", "original_amount": "1", "original_currency": "EUR" }
        ],
        "credit_risk_mitigation": [
            { "exposure_id": "E1", "mitigation_type": "FINANCIAL_COLLATERAL", "value": "100", "currency": "USD" },
            { "exposure_id": "E1", "mitigation_type": "GUARANTEE", "value": "50" },
            { "exposure_id": "E2", "mitigation_type": "MAGIC", "value": "10" }
        ]
    }"#;

    #[test]
    fn test_parses_sections_and_skips_bad_records() {
        let file = parse(SAMPLE).unwrap();

        assert_eq!(file.exposures.len(), 2);
        assert_eq!(file.exposures[0].original_amount(), dec!(1000.50));
        assert_eq!(file.exposures[1].original_amount(), dec!(250));
        assert_eq!(file.exposures[1].product_type(), "RETAIL_MORTGAGE");

        assert_eq!(file.skipped.len(), 3);
        assert_eq!(file.skipped[0].record_index, Some(2));
        assert_eq!(file.skipped[0].exposure_id, Some(ExposureId::new("E3")));
        assert!(file.skipped[1].reason.contains("expected an object"));
        assert!(file.skipped[2].reason.contains("exposure_id"));

        assert_eq!(file.mitigations.len(), 2);
        assert!(file.mitigations[1].currency().is_eur());
        assert_eq!(file.skipped_mitigations.len(), 1);

        let info = file.bank_info.as_ref().unwrap();
        assert_eq!(info.abi_code.as_deref(), Some("12345"));

        assert_eq!(file.stats.records_seen, 8);
        assert_eq!(file.stats.records_skipped, 4);
        assert_eq!(file.stats.bytes_processed, SAMPLE.len() as u64);
    }

    #[test]
    fn test_mitigations_grouped_and_currencies_distinct() {
        let file = parse(SAMPLE).unwrap();
        let grouped = file.mitigations_by_exposure();
        assert_eq!(grouped[&ExposureId::new("E1")].len(), 2);
        assert!(!grouped.contains_key(&ExposureId::new("E2")));

        let codes: Vec<&str> = file.currencies().into_iter().map(CurrencyCode::as_str).collect();
        assert_eq!(codes, vec!["EUR", "USD"]);
    }

    #[test]
    fn test_missing_exposures_is_structural() {
        let err = parse(r#"{ "bank_info": {}, "loans": [] }"#).unwrap_err();
        assert_eq!(err, ParseFailure::Structural(MISSING_EXPOSURES.to_string()));
    }

    #[test]
    fn test_non_array_exposures_is_structural() {
        let err = parse(r#"{ "exposures": { "E1": {} } }"#).unwrap_err();
        assert!(matches!(err, ParseFailure::Structural(_)));
    }

    #[test]
    fn test_bare_array_and_broken_json_rejected() {
        assert!(matches!(parse("[]"), Err(ParseFailure::Structural(_))));
        assert!(matches!(
            parse(r#"{ "exposures": [ {"exposure_id": "#),
            Err(ParseFailure::Structural(_))
        ));
        assert!(matches!(
            parse(r#"{ "exposures": [] } trailing"#),
            Err(ParseFailure::Structural(_))
        ));
    }

    #[test]
    fn test_empty_exposures_array() {
        let file = parse(r#"{ "exposures": [] }"#).unwrap();
        assert!(file.exposures.is_empty());
        assert!(file.bank_info.is_none());
    }

    #[test]
    fn test_scientific_and_alias_fields() {
        let file = parse(
            r#"{ "exposures": [ { "id": "E9", "client_name": "Delta", "amount": "1.5E3",
                 "currency": "gbp", "country_code": "GB", "product_type": "SOVEREIGN" } ] }"#,
        )
        .unwrap();
        let e = &file.exposures[0];
        assert_eq!(e.exposure_id().as_str(), "E9");
        assert_eq!(e.original_amount(), dec!(1500));
        assert_eq!(e.original_currency().as_str(), "GBP");
        assert_eq!(e.country_code(), "GB");
    }

    #[test]
    fn test_numeric_amounts_keep_every_digit() {
        let file = parse(
            r#"{ "exposures": [ { "exposure_id": "BIG", "client_name": "Sovereign Fund",
                 "original_amount": 12345678901234567.89, "original_currency": "EUR" } ],
                 "credit_risk_mitigation": [ { "exposure_id": "BIG",
                 "mitigation_type": "GUARANTEE", "value": 9876543210987654.321 } ] }"#,
        )
        .unwrap();

        assert_eq!(file.exposures[0].original_amount(), dec!(12345678901234567.89));
        assert_eq!(file.mitigations[0].value(), dec!(9876543210987654.321));
    }

    #[test]
    fn test_repeated_exposure_id_is_skipped() {
        let file = parse(
            r#"{ "exposures": [
                { "exposure_id": "E1", "client_name": "Acme", "original_amount": "100",
                  "original_currency": "EUR" },
                { "exposure_id": "E1", "client_name": "Acme again", "original_amount": "200",
                  "original_currency": "EUR" } ],
               "credit_risk_mitigation": [
                { "exposure_id": "E1", "mitigation_type": "GUARANTEE", "value": "50" } ] }"#,
        )
        .unwrap();

        assert_eq!(file.exposures.len(), 1);
        assert_eq!(file.exposures[0].client_name(), "Acme");
        assert_eq!(file.skipped.len(), 1);
        assert_eq!(file.skipped[0].record_index, Some(1));
        assert_eq!(file.skipped[0].exposure_id, Some(ExposureId::new("E1")));
        assert!(file.skipped[0].reason.contains("duplicate exposure_id"));
        assert_eq!(file.mitigations_by_exposure()[&ExposureId::new("E1")].len(), 1);
    }

    #[test]
    fn test_cancelled_parse() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = parser().parse(SAMPLE.as_bytes(), &cancel).unwrap_err();
        assert_eq!(err, ParseFailure::Cancelled);
    }
}
