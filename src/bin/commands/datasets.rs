use anyhow::Result;
use clap::Args;
use rirstats::database::{DatasetRecord, RirstatsDatabase, SummaryRecord};
use rirstats::lens::delegated::{RecordType, Registry};
use rirstats::lens::utils::OutputFormat;
use rirstats::RirstatsConfig;
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the Datasets command
#[derive(Args)]
pub struct DatasetsArgs {
    /// Only show datasets of this registry
    #[clap(short, long, value_enum)]
    pub registry: Option<Registry>,

    /// Show at most this many datasets, newest first
    #[clap(short, long)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct DatasetInfo {
    #[serde(flatten)]
    dataset: DatasetRecord,
    summaries: Vec<SummaryRecord>,
    stored_ipv4: u64,
    stored_ipv6: u64,
    stored_asn: u64,
}

#[derive(Tabled, Serialize)]
struct DatasetRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Registry")]
    registry: String,
    #[tabled(rename = "Serial")]
    serial: u64,
    #[tabled(rename = "Records")]
    record_count: u64,
    #[tabled(rename = "End Date")]
    end_date: String,
    #[tabled(rename = "UTC")]
    utc_offset: i32,
    #[tabled(rename = "IPv4 (declared/stored)")]
    ipv4: String,
    #[tabled(rename = "IPv6 (declared/stored)")]
    ipv6: String,
    #[tabled(rename = "ASN (declared/stored)")]
    asn: String,
}

fn declared(summaries: &[SummaryRecord], record_type: RecordType) -> String {
    summaries
        .iter()
        .find(|s| s.record_type == record_type.code())
        .map(|s| s.count.to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl From<&DatasetInfo> for DatasetRow {
    fn from(info: &DatasetInfo) -> Self {
        let d = &info.dataset;
        Self {
            id: d.id,
            registry: d.registry.clone(),
            serial: d.serial,
            record_count: d.record_count,
            end_date: d.end_date.clone(),
            utc_offset: d.utc_offset,
            ipv4: format!("{}/{}", declared(&info.summaries, RecordType::Ipv4), info.stored_ipv4),
            ipv6: format!("{}/{}", declared(&info.summaries, RecordType::Ipv6), info.stored_ipv6),
            asn: format!("{}/{}", declared(&info.summaries, RecordType::Asn), info.stored_asn),
        }
    }
}

pub fn run(config: &RirstatsConfig, args: DatasetsArgs, output_format: OutputFormat) -> Result<()> {
    let db = RirstatsDatabase::open_in_dir(&config.data_dir)?;

    let datasets = db
        .datasets()
        .list()?
        .into_iter()
        .filter(|d| args.registry.is_none_or(|r| d.registry == r.code()))
        .take(args.limit.unwrap_or(usize::MAX));

    let mut infos = Vec::new();
    for dataset in datasets {
        let records = db.records();
        infos.push(DatasetInfo {
            summaries: db.datasets().summaries_for(dataset.id)?,
            stored_ipv4: records.count_for_dataset(dataset.id, RecordType::Ipv4)?,
            stored_ipv6: records.count_for_dataset(dataset.id, RecordType::Ipv6)?,
            stored_asn: records.count_for_dataset(dataset.id, RecordType::Asn)?,
            dataset,
        });
    }

    if output_format.is_json() {
        println!("{}", output_format.to_json(&infos)?);
    } else if infos.is_empty() {
        println!("No datasets imported yet");
    } else {
        let rows: Vec<DatasetRow> = infos.iter().map(DatasetRow::from).collect();
        println!("{}", output_format.render_rows(&rows)?);
    }
    Ok(())
}
