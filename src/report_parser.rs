//! Usage report reading and usage record extraction.
//!
//! Reports are AWS cost and usage reports in the "hourly usage without IDs" layout:
//! gzip-compressed CSV whose first row names the columns. Columns are located by
//! name, so their order does not matter.
//!
//! Only rows describing EC2 compute instance runtime are extracted; everything
//! else (storage, data transfer, credits, ...) is skipped without error. The
//! usage window of a row comes from the `identity/TimeInterval` column, which
//! holds `<start>/<end>` in `YYYY-MM-DDThh:mm:ssZ` form.

use crate::config::ReportConfig;
use crate::error::{FootprintError, Result};
use crate::models::UsageRecord;
use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Utc};
use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

pub const HEADER_BILLING_PERIOD_END_DATE: &str = "bill/BillingPeriodEndDate";
pub const HEADER_BILLING_PERIOD_START_DATE: &str = "bill/BillingPeriodStartDate";
pub const HEADER_BILL_PAYER_ACCOUNT_ID: &str = "bill/PayerAccountId";
pub const HEADER_IDENTITY_TIME_INTERVAL: &str = "identity/TimeInterval";
pub const HEADER_LINE_ITEM_LINE_ITEM_TYPE: &str = "lineItem/LineItemType";
pub const HEADER_LINE_ITEM_OPERATION: &str = "lineItem/Operation";
pub const HEADER_LINE_ITEM_PRODUCT_CODE: &str = "lineItem/ProductCode";
pub const HEADER_LINE_ITEM_USAGE_ACCOUNT_ID: &str = "lineItem/UsageAccountId";
pub const HEADER_LINE_ITEM_USAGE_END_DATE: &str = "lineItem/UsageEndDate";
pub const HEADER_LINE_ITEM_USAGE_START_DATE: &str = "lineItem/UsageStartDate";
pub const HEADER_PRODUCT_INSTANCE_TYPE: &str = "product/instanceType";
pub const HEADER_PRODUCT_PRODUCT_FAMILY: &str = "product/productFamily";
pub const HEADER_PRODUCT_REGION_CODE: &str = "product/regionCode";

/// Columns the extraction and the qualification filter read.
///
/// The billing period and standalone usage date columns are recognised but not
/// required; the time interval column is authoritative.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    HEADER_BILL_PAYER_ACCOUNT_ID,
    HEADER_IDENTITY_TIME_INTERVAL,
    HEADER_LINE_ITEM_LINE_ITEM_TYPE,
    HEADER_LINE_ITEM_OPERATION,
    HEADER_LINE_ITEM_PRODUCT_CODE,
    HEADER_LINE_ITEM_USAGE_ACCOUNT_ID,
    HEADER_PRODUCT_INSTANCE_TYPE,
    HEADER_PRODUCT_PRODUCT_FAMILY,
    HEADER_PRODUCT_REGION_CODE,
];

const USAGE_LINE_ITEM_TYPE: &str = "Usage";
const EC2_PRODUCT_CODE: &str = "AmazonEC2";
const COMPUTE_INSTANCE_FAMILY: &str = "Compute Instance";
const RUN_INSTANCES_OPERATION_PREFIX: &str = "RunInstances";

/// Consumer of extracted usage records.
pub trait RecordProcessor {
    type Output;

    fn process_record(&mut self, record: UsageRecord) -> Result<()>;

    /// Called for a qualifying row that was dropped because its contents are malformed.
    fn reject_row(&mut self, _line: u64, _reason: String) {}

    fn finalize(self) -> Result<Self::Output>;
}

/// How strictly row contents are checked during extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Fail the row on an unparsable interval timestamp instead of using the zero time.
    pub strict_timestamps: bool,
    /// Fail the row when its interval ends before it starts.
    pub reject_negative_durations: bool,
}

impl From<&ReportConfig> for ExtractOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            strict_timestamps: config.strict_timestamps,
            reject_negative_durations: config.reject_negative_durations,
        }
    }
}

/// Mapping from column name to position, built from the report's header row.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        // Later duplicates win.
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index))
            .collect();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .copied()
            .find(|name| !columns.contains_key(*name))
        {
            return Err(FootprintError::MissingColumn(missing));
        }

        Ok(Self { columns })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    fn field<'r>(&self, row: &'r StringRecord, name: &'static str, line: u64) -> Result<&'r str> {
        self.position(name)
            .and_then(|index| row.get(index))
            .ok_or_else(|| FootprintError::MalformedReportRow {
                row: line,
                reason: format!("no value for column {}", name),
            })
    }
}

/// Turns report rows into [`UsageRecord`]s.
#[derive(Debug, Clone)]
pub struct UsageRecordExtractor {
    index: HeaderIndex,
    options: ExtractOptions,
}

impl UsageRecordExtractor {
    pub fn new(index: HeaderIndex, options: ExtractOptions) -> Self {
        Self { index, options }
    }

    /// Whether a row is EC2 compute instance runtime.
    pub fn qualifies(&self, row: &StringRecord, line: u64) -> Result<bool> {
        let index = &self.index;

        Ok(
            index.field(row, HEADER_LINE_ITEM_LINE_ITEM_TYPE, line)? == USAGE_LINE_ITEM_TYPE
                && index.field(row, HEADER_LINE_ITEM_PRODUCT_CODE, line)? == EC2_PRODUCT_CODE
                && index.field(row, HEADER_PRODUCT_PRODUCT_FAMILY, line)? == COMPUTE_INSTANCE_FAMILY
                && index
                    .field(row, HEADER_LINE_ITEM_OPERATION, line)?
                    .starts_with(RUN_INSTANCES_OPERATION_PREFIX),
        )
    }

    pub fn extract(&self, row: &StringRecord, line: u64) -> Result<UsageRecord> {
        let index = &self.index;

        let interval = index.field(row, HEADER_IDENTITY_TIME_INTERVAL, line)?;
        let (usage_start, usage_end) = self.parse_interval(interval, line)?;
        let duration = usage_end - usage_start;

        if self.options.reject_negative_durations && duration < chrono::Duration::zero() {
            return Err(FootprintError::MalformedReportRow {
                row: line,
                reason: format!("time interval {} ends before it starts", interval),
            });
        }

        Ok(UsageRecord {
            payer_account_id: index.field(row, HEADER_BILL_PAYER_ACCOUNT_ID, line)?.to_string(),
            usage_account_id: index
                .field(row, HEADER_LINE_ITEM_USAGE_ACCOUNT_ID, line)?
                .to_string(),
            region: index.field(row, HEADER_PRODUCT_REGION_CODE, line)?.to_string(),
            instance_type: index.field(row, HEADER_PRODUCT_INSTANCE_TYPE, line)?.to_string(),
            usage_start,
            usage_end,
            duration,
        })
    }

    fn parse_interval(&self, interval: &str, line: u64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let mut parts = interval.split('/');
        let (start, end) = match (parts.next(), parts.next()) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(FootprintError::MalformedReportRow {
                    row: line,
                    reason: format!("time interval {:?} has no '/' separator", interval),
                })
            }
        };

        if self.options.strict_timestamps {
            let parse = |value: &str| {
                TimestampParser::parse(value).map_err(|e| FootprintError::MalformedReportRow {
                    row: line,
                    reason: format!("invalid timestamp {:?}: {}", value, e),
                })
            };
            return Ok((parse(start)?, parse(end)?));
        }

        Ok((
            TimestampParser::parse_or_zero(start),
            TimestampParser::parse_or_zero(end),
        ))
    }
}

/// An opened report file.
///
/// The file handle lives inside the reader and is closed when it is dropped.
pub struct ReportInput {
    path: PathBuf,
    compressed: bool,
    reader: Box<dyn Read>,
}

impl Read for ReportInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Open a report file, decompressing it unless its name ends in `.csv`.
pub fn open_report(path: &Path) -> Result<ReportInput> {
    let file = File::open(path).map_err(|source| FootprintError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let is_plain_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let (compressed, reader): (bool, Box<dyn Read>) = if is_plain_csv {
        debug!(path = %path.display(), "Reading uncompressed report");
        (false, Box::new(reader))
    } else {
        debug!(path = %path.display(), "Reading gzip-compressed report");
        (true, Box::new(MultiGzDecoder::new(reader)))
    };

    Ok(ReportInput {
        path: path.to_path_buf(),
        compressed,
        reader,
    })
}

/// Stream an opened report file through `processor`.
///
/// Read failures are reported against the file: as [`FootprintError::UndecompressibleInput`]
/// for gzip input and [`FootprintError::UnreadableInput`] for plain CSV.
pub fn read_report_file<P: RecordProcessor>(
    input: ReportInput,
    options: ExtractOptions,
    processor: P,
) -> Result<P::Output> {
    let path = input.path.clone();
    let compressed = input.compressed;

    read_report(input, options, processor).map_err(|err| match err {
        FootprintError::UndecompressibleInput(source) if !compressed => {
            FootprintError::UnreadableInput { path, source }
        }
        other => other,
    })
}

/// Stream a report through `processor`, feeding it every qualifying row.
///
/// An input without a header row produces whatever the processor yields for no
/// records. Structural CSV errors abort the read. A qualifying row whose contents
/// are malformed is logged, handed to [`RecordProcessor::reject_row`] and skipped.
/// I/O failures from `input` are reported as [`FootprintError::UndecompressibleInput`].
pub fn read_report<R, P>(input: R, options: ExtractOptions, mut processor: P) -> Result<P::Output>
where
    R: Read,
    P: RecordProcessor,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input);

    let headers = reader.headers().map_err(map_csv_error)?.clone();
    if headers.is_empty() {
        debug!("Report has no header row");
        return processor.finalize();
    }

    let extractor = UsageRecordExtractor::new(HeaderIndex::from_headers(&headers)?, options);

    let mut row = StringRecord::new();
    let mut skipped = 0usize;
    while reader.read_record(&mut row).map_err(map_csv_error)? {
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let extracted = match extractor.qualifies(&row, line) {
            Ok(false) => {
                skipped += 1;
                continue;
            }
            Ok(true) => extractor.extract(&row, line),
            Err(e) => Err(e),
        };

        let record = match extracted {
            Ok(record) => record,
            Err(FootprintError::MalformedReportRow { row: line, reason }) => {
                warn!(line, error = %reason, "Skipping malformed usage row");
                processor.reject_row(line, reason);
                continue;
            }
            Err(e) => return Err(e),
        };
        trace!(
            line,
            region = %record.region,
            instance_type = %record.instance_type,
            "Extracted usage record"
        );
        processor.process_record(record)?;
    }

    debug!(skipped_rows = skipped, "Finished reading report");
    processor.finalize()
}

fn map_csv_error(err: csv::Error) -> FootprintError {
    let line = err.position().map(|p| p.line()).unwrap_or_default();
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => FootprintError::UndecompressibleInput(source),
        _ => FootprintError::MalformedReportRow { row: line, reason },
    }
}
