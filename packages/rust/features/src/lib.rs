//! One-hot feature encoding onto the fixed model vocabulary.
//!
//! Used identically at training and inference time. The one invariant that
//! matters: the output column set and order always equal the declared
//! vocabulary, regardless of which category levels appear in a given batch.

use std::collections::HashMap;

use leadscore_shared::{Cell, Frame, LeadScoreError, Mappings, Mode, Result};

/// Encoder output: the feature table plus, in training mode, the isolated
/// target column.
#[derive(Debug)]
pub struct EncodedFeatures {
    pub features: Frame,
    pub target: Option<Frame>,
}

/// Encode a model-input frame onto the fixed one-hot vocabulary.
///
/// Each configured categorical column present in the input is expanded into
/// `<column>_<level>` dummies from its own observed levels. The output frame
/// is then assembled column by column from the vocabulary: a raw input column
/// wins if the name matches, else a generated dummy, else the column is all
/// zeros. This two-source reconciliation keeps inference-time feature width
/// identical to training-time width even when a level is absent from the
/// batch.
pub fn encode_features(
    input: &Frame,
    mappings: &Mappings,
    mode: Mode,
) -> Result<EncodedFeatures> {
    let n_rows = input.n_rows();

    // Dummy expansion from observed levels. The numeric tier column is
    // treated as categorical here: 1.0 becomes "city_tier_1.0".
    let mut dummies: HashMap<String, Vec<Cell>> = HashMap::new();
    for feature in &mappings.features_to_encode {
        let Ok(cells) = input.column(feature) else {
            tracing::warn!(feature = %feature, "feature to encode not found");
            continue;
        };
        for (row_idx, cell) in cells.iter().enumerate() {
            let Some(level) = dummy_level(cell) else {
                continue; // null level: all dummies for this row stay 0
            };
            let name = format!("{feature}_{level}");
            let column = dummies
                .entry(name)
                .or_insert_with(|| vec![Cell::Int(0); n_rows]);
            column[row_idx] = Cell::Int(1);
        }
    }

    // Reconcile onto the declared vocabulary, in declared order.
    let mut features = Frame::new(Vec::new());
    for _ in 0..n_rows {
        features.push_row(Vec::new())?;
    }
    for vocab_col in &mappings.one_hot_vocabulary {
        let cells: Vec<Cell> = if input.has_column(vocab_col) {
            input
                .column(vocab_col)?
                .into_iter()
                .map(|c| if c.is_null() { Cell::Int(0) } else { c.clone() })
                .collect()
        } else if let Some(dummy) = dummies.get(vocab_col) {
            dummy.clone()
        } else {
            vec![Cell::Int(0); n_rows]
        };
        features.add_column(vocab_col.clone(), cells)?;
    }

    let target = match mode {
        Mode::Training => {
            if !input.has_column(&mappings.label_column) {
                return Err(LeadScoreError::data(format!(
                    "label column '{}' absent from model input in training mode",
                    mappings.label_column
                )));
            }
            Some(input.select(std::slice::from_ref(&mappings.label_column))?)
        }
        Mode::Inference => None,
    };

    tracing::info!(
        rows = features.n_rows(),
        width = features.n_cols(),
        mode = ?mode,
        "encoded features"
    );
    Ok(EncodedFeatures { features, target })
}

/// Dummy-level label for a cell, `None` for null.
///
/// Floats keep a trailing `.0` for whole values so a tier of 1.0 yields the
/// vocabulary name `city_tier_1.0`.
fn dummy_level(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Int(v) => Some(v.to_string()),
        Cell::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(format!("{v:.1}")),
        Cell::Float(v) => Some(format!("{v}")),
        Cell::Text(s) => Some(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscore_shared::Mode;

    fn model_input(mode: Mode) -> Frame {
        let m = Mappings::default();
        let mut f = Frame::new(m.model_input_columns_for(mode));
        let mut row = vec![
            Cell::Float(1.0),               // city_tier
            Cell::Text("Level0".into()),    // first_platform_c
            Cell::Text("others".into()),    // first_utm_medium_c
            Cell::Text("Level2".into()),    // first_utm_source_c
            Cell::Int(2),                   // total_leads_droppped
            Cell::Int(1),                   // referred_lead
        ];
        if mode == Mode::Training {
            row.push(Cell::Int(1));
        }
        f.push_row(row).unwrap();
        f
    }

    #[test]
    fn output_is_exactly_the_vocabulary() {
        let m = Mappings::default();
        let out = encode_features(&model_input(Mode::Inference), &m, Mode::Inference).unwrap();
        assert_eq!(out.features.columns(), m.one_hot_vocabulary.as_slice());
        assert!(out.target.is_none());
    }

    #[test]
    fn observed_levels_set_their_dummy() {
        let m = Mappings::default();
        let out = encode_features(&model_input(Mode::Inference), &m, Mode::Inference).unwrap();
        assert_eq!(out.features.get(0, "city_tier_1.0"), Some(&Cell::Int(1)));
        assert_eq!(out.features.get(0, "city_tier_2.0"), Some(&Cell::Int(0)));
        assert_eq!(out.features.get(0, "first_platform_c_Level0"), Some(&Cell::Int(1)));
        assert_eq!(out.features.get(0, "first_utm_medium_c_others"), Some(&Cell::Int(1)));
    }

    #[test]
    fn absent_levels_are_zero_columns_not_missing() {
        let m = Mappings::default();
        // Batch where nobody is Level8 on any column.
        let out = encode_features(&model_input(Mode::Inference), &m, Mode::Inference).unwrap();
        assert_eq!(out.features.get(0, "first_platform_c_Level8"), Some(&Cell::Int(0)));
        assert_eq!(out.features.get(0, "first_utm_medium_c_Level13"), Some(&Cell::Int(0)));
    }

    #[test]
    fn raw_numeric_columns_copy_through() {
        let m = Mappings::default();
        let out = encode_features(&model_input(Mode::Inference), &m, Mode::Inference).unwrap();
        assert_eq!(out.features.get(0, "total_leads_droppped"), Some(&Cell::Int(2)));
        assert_eq!(out.features.get(0, "referred_lead"), Some(&Cell::Int(1)));
    }

    #[test]
    fn training_mode_isolates_target() {
        let m = Mappings::default();
        let out = encode_features(&model_input(Mode::Training), &m, Mode::Training).unwrap();
        let target = out.target.expect("training mode has a target");
        assert_eq!(target.columns(), &["app_complete_flag"]);
        assert_eq!(target.get(0, "app_complete_flag"), Some(&Cell::Int(1)));
        // The label never leaks into the feature table.
        assert!(!out.features.has_column("app_complete_flag"));
    }

    #[test]
    fn training_without_label_errors() {
        let m = Mappings::default();
        let input = model_input(Mode::Inference);
        assert!(encode_features(&input, &m, Mode::Training).is_err());
    }

    #[test]
    fn zero_row_batch_keeps_full_width() {
        let m = Mappings::default();
        let input = Frame::new(m.model_input_columns_for(Mode::Inference));
        let out = encode_features(&input, &m, Mode::Inference).unwrap();
        assert_eq!(out.features.columns(), m.one_hot_vocabulary.as_slice());
        assert_eq!(out.features.n_rows(), 0);
    }

    #[test]
    fn dummy_level_formats() {
        assert_eq!(dummy_level(&Cell::Float(1.0)).as_deref(), Some("1.0"));
        assert_eq!(dummy_level(&Cell::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(dummy_level(&Cell::Int(7)).as_deref(), Some("7"));
        assert_eq!(dummy_level(&Cell::Text("Level0".into())).as_deref(), Some("Level0"));
        assert_eq!(dummy_level(&Cell::Null), None);
    }
}
