//! Raw CSV loading and the staging-load step.

use std::path::Path;

use leadscore_shared::{Cell, Frame, LeadScoreError, Mappings, Result};

/// Read a raw lead-scoring CSV into a frame.
///
/// Cells are typed by content: empty fields become null, integer-looking
/// fields become integers, numeric fields become floats, everything else is
/// text.
pub fn read_raw_csv(path: &Path) -> Result<Frame> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| LeadScoreError::Csv(format!("{}: {e}", path.display())))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LeadScoreError::Csv(e.to_string()))?
        .iter()
        .map(String::from)
        .collect();

    let mut frame = Frame::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| LeadScoreError::Csv(e.to_string()))?;
        let row: Vec<Cell> = record.iter().map(parse_cell).collect();
        frame.push_row(row)?;
    }

    tracing::info!(
        path = %path.display(),
        rows = frame.n_rows(),
        columns = frame.n_cols(),
        "loaded raw csv"
    );
    Ok(frame)
}

fn parse_cell(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Null;
    }
    if let Ok(v) = field.parse::<i64>() {
        return Cell::Int(v);
    }
    if let Ok(v) = field.parse::<f64>() {
        return Cell::Float(v);
    }
    Cell::Text(field.to_string())
}

/// Staging-load step: fill the configured numeric indicator columns' nulls
/// with 0. The result is what gets persisted as `loaded_data`.
pub fn fill_indicator_nulls(mut frame: Frame, mappings: &Mappings) -> Result<Frame> {
    for col in &mappings.fill_zero_columns {
        if frame.has_column(col) {
            frame.fill_null(col, Cell::Int(0))?;
        } else {
            tracing::warn!(column = %col, "fill-zero column absent from raw data");
        }
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ls_load_{}.csv",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn typed_cells_from_csv() {
        let path = write_csv("a,b,c,d\n1,2.5,hello,\n");
        let frame = read_raw_csv(&path).unwrap();
        assert_eq!(frame.columns(), &["a", "b", "c", "d"]);
        assert_eq!(frame.get(0, "a"), Some(&Cell::Int(1)));
        assert_eq!(frame.get(0, "b"), Some(&Cell::Float(2.5)));
        assert_eq!(frame.get(0, "c"), Some(&Cell::Text("hello".into())));
        assert_eq!(frame.get(0, "d"), Some(&Cell::Null));
    }

    #[test]
    fn missing_file_is_a_csv_error() {
        let result = read_raw_csv(Path::new("/nonexistent/leadscoring.csv"));
        assert!(matches!(result, Err(LeadScoreError::Csv(_))));
    }

    #[test]
    fn indicator_nulls_fill_to_zero() {
        let mut frame = Frame::new(vec![
            "total_leads_droppped".into(),
            "referred_lead".into(),
            "city_mapped".into(),
        ]);
        frame
            .push_row(vec![Cell::Null, Cell::Int(1), Cell::Text("delhi".into())])
            .unwrap();
        frame
            .push_row(vec![Cell::Int(2), Cell::Null, Cell::Null])
            .unwrap();

        let filled = fill_indicator_nulls(frame, &Mappings::default()).unwrap();
        assert_eq!(filled.get(0, "total_leads_droppped"), Some(&Cell::Int(0)));
        assert_eq!(filled.get(1, "referred_lead"), Some(&Cell::Int(0)));
        // Untouched columns keep their nulls.
        assert_eq!(filled.get(1, "city_mapped"), Some(&Cell::Null));
    }
}
