use anyhow::Result;
use cmapapi::{BoundingBox, Client};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure authentication via CMAP_API_KEY or a `~/.cmapapirc` file.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;

    let bbox = BoundingBox::new("2016-04-30", "2016-04-30")
        .lat(10.0, 70.0)
        .lon(-180.0, -80.0)
        .depth(0.0, 0.0);
    let sst = client.space_time("tblsst_AVHRR_OI_NRT", "sst", &bbox)?;

    println!("{} rows, columns: {:?}", sst.len(), sst.column_names());
    println!("unit: {}", client.get_unit("tblsst_AVHRR_OI_NRT", "sst")?);
    Ok(())
}
