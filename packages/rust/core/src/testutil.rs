//! Shared fixtures for the pipeline tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use leadscore_shared::{Mappings, Mode};

use crate::data::DataPipelineConfig;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("leadscore-{prefix}-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// created_date,city_mapped,first_platform_c,first_utm_medium_c,
// first_utm_source_c,total_leads_droppped,referred_lead,app_complete_flag,
// then the 12 interaction counters in declared order.
pub const FIXTURE_ROWS: &[&str] = &[
    "2024-01-01,Bengaluru,Level0,Level0,Level0,1,0,1,1,0,2,0,0,0,1,0,0,0,0,3",
    "2024-01-02,Mumbai,Level99,Level2,Level2,2,1,0,0,1,0,1,0,0,0,0,2,0,0,0",
    "2024-01-03,Pune,Level1,Level3,Level4,0,0,1,0,0,1,0,1,0,0,0,0,1,0,0",
    "2024-01-03,Pune,Level1,Level3,Level4,0,0,1,0,0,1,0,1,0,0,0,0,1,0,0",
    "2024-01-04,,Level3,,Level5,1,1,0,2,0,0,0,0,1,0,0,0,0,0,1",
];

pub fn write_fixture_csv(path: &Path, rows: &[&str]) {
    let mappings = Mappings::default();
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "{}", mappings.raw_schema.join(",")).unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
}

pub fn fixture_config(dir: &Path, mode: Mode) -> DataPipelineConfig {
    let csv_path = dir.join("leads.csv");
    write_fixture_csv(&csv_path, FIXTURE_ROWS);
    DataPipelineConfig {
        csv_path,
        interaction_mapping_file: None,
        staging_db: dir.join("staging.db"),
        mappings: Mappings::default(),
        mode,
    }
}
