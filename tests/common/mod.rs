#![allow(dead_code)]

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "identity/LineItemId,identity/TimeInterval,bill/PayerAccountId,bill/BillingPeriodStartDate,bill/BillingPeriodEndDate,lineItem/UsageAccountId,lineItem/LineItemType,lineItem/UsageStartDate,lineItem/UsageEndDate,lineItem/ProductCode,lineItem/Operation,product/instanceType,product/productFamily,product/regionCode";

/// One report row for the columns in [`HEADER`].
pub struct ReportRow<'a> {
    pub interval: &'a str,
    pub line_item_type: &'a str,
    pub product_code: &'a str,
    pub operation: &'a str,
    pub instance_type: &'a str,
    pub product_family: &'a str,
    pub region: &'a str,
}

impl<'a> ReportRow<'a> {
    pub fn ec2(region: &'a str, instance_type: &'a str, interval: &'a str) -> Self {
        Self {
            interval,
            line_item_type: "Usage",
            product_code: "AmazonEC2",
            operation: "RunInstances",
            instance_type,
            product_family: "Compute Instance",
            region,
        }
    }

    pub fn to_csv(&self, id: usize) -> String {
        let (start, end) = self.interval.split_once('/').unwrap_or((self.interval, ""));
        format!(
            "li-{},{},111111111111,2022-08-01T00:00:00Z,2022-09-01T00:00:00Z,222222222222,{},{},{},{},{},{},{},{}",
            id,
            self.interval,
            self.line_item_type,
            start,
            end,
            self.product_code,
            self.operation,
            self.instance_type,
            self.product_family,
            self.region
        )
    }
}

pub fn report_csv(rows: &[ReportRow]) -> String {
    let mut content = String::from(HEADER);
    content.push('\n');
    for (id, row) in rows.iter().enumerate() {
        content.push_str(&row.to_csv(id));
        content.push('\n');
    }
    content
}

pub fn write_gzipped(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(filename);
    let mut encoder = GzEncoder::new(fs::File::create(&path)?, Compression::default());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?;
    Ok(path)
}

pub fn write_report(dir: &Path, rows: &[ReportRow]) -> Result<PathBuf> {
    write_gzipped(dir, "report.csv.gz", &report_csv(rows))
}

/// A month-like mix of EC2 usage and unrelated line items.
pub fn sample_rows() -> Vec<ReportRow<'static>> {
    vec![
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T01:00:00Z/2022-08-01T02:00:00Z"),
        ReportRow::ec2("ap-southeast-2", "c4.large", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
        ReportRow::ec2("eu-central-1", "m5.2xlarge", "2022-08-01T05:00:00Z/2022-08-01T06:00:00Z"),
        ReportRow {
            operation: "RunInstances:0002",
            ..ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T02:00:00Z/2022-08-01T03:00:00Z")
        },
        ReportRow {
            line_item_type: "Tax",
            ..ReportRow::ec2("eu-west-1", "t2.micro", "2022-07-01T00:00:00Z/2022-07-01T01:00:00Z")
        },
        ReportRow {
            product_code: "AmazonS3",
            product_family: "Storage",
            operation: "PutObject",
            ..ReportRow::ec2("eu-west-1", "", "2022-07-01T00:00:00Z/2022-09-01T00:00:00Z")
        },
        ReportRow {
            product_family: "Storage",
            operation: "CreateVolume-Gp2",
            ..ReportRow::ec2("eu-west-1", "", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z")
        },
    ]
}
