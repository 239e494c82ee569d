use anyhow::Result;
use rirstats::database::RirstatsDatabase;
use rirstats::lens::utils::OutputFormat;
use rirstats::RirstatsConfig;

pub fn run(config: &RirstatsConfig, output_format: OutputFormat) -> Result<()> {
    let db = RirstatsDatabase::open_in_dir(&config.data_dir)?;
    let registries = db.registries().list()?;
    println!("{}", output_format.render_rows(&registries)?);
    Ok(())
}
