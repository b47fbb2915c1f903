//! Interaction reshaping step: melt, map, aggregate, re-pivot, trim.

use std::collections::HashMap;

use leadscore_shared::{Cell, Frame, InteractionMap, LeadScoreError, Mappings, Mode, Result};

/// Output of the reshaper: the full reshaped table (all interaction
/// categories) and the trimmed model-input table. The trimmed table is the
/// canonical hand-off to the feature encoder.
#[derive(Debug)]
pub struct ReshapedInteractions {
    pub full: Frame,
    pub model_input: Frame,
}

/// Collapse per-interaction-type counters into summed per-category counters.
///
/// Every non-identity column is melted into (type, value) long form with
/// nulls treated as 0; types are joined against the interaction map (unmapped
/// types are dropped); values are summed per (identity tuple, category) and
/// pivoted back to one column per category. Rows sharing an identity tuple
/// merge into one. Finally the result is projected onto the declared
/// model-input column list for the given mode.
pub fn reshape_interactions(
    frame: &Frame,
    interaction_map: &InteractionMap,
    mappings: &Mappings,
    mode: Mode,
) -> Result<ReshapedInteractions> {
    let identity = mappings.identity_columns_for(mode);
    let identity_indices: Vec<usize> = identity
        .iter()
        .map(|c| {
            frame.column_index(c).ok_or_else(|| {
                LeadScoreError::data(format!("identity column '{c}' absent from input"))
            })
        })
        .collect::<Result<_>>()?;

    // Non-identity columns are the raw interaction-type counters.
    let interaction_cols: Vec<(usize, Option<String>)> = frame
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| !identity.contains(c))
        .map(|(i, c)| (i, interaction_map.category_of(c).map(String::from)))
        .collect();

    let categories = interaction_map.categories();
    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Group by identity tuple, summing mapped values per category.
    // First-seen group order is preserved.
    let mut groups: Vec<(Vec<Cell>, Vec<f64>)> = Vec::new();
    let mut group_of: HashMap<String, usize> = HashMap::new();

    for row_idx in 0..frame.n_rows() {
        let key = frame.row_key(row_idx, &identity_indices);
        let group_idx = *group_of.entry(key).or_insert_with(|| {
            let identity_cells = identity_indices
                .iter()
                .map(|&i| frame.rows()[row_idx][i].clone())
                .collect();
            groups.push((identity_cells, vec![0.0; categories.len()]));
            groups.len() - 1
        });

        for (col_idx, category) in &interaction_cols {
            // Null interaction counters count as 0.
            let value = frame.rows()[row_idx][*col_idx].as_f64().unwrap_or(0.0);
            if let Some(cat) = category {
                groups[group_idx].1[cat_index[cat.as_str()]] += value;
            }
            // Unmapped interaction types cannot be aggregated and are dropped.
        }
    }

    let mut columns = identity.clone();
    columns.extend(categories.iter().cloned());
    let mut full = Frame::new(columns);
    for (identity_cells, sums) in groups {
        let mut row = identity_cells;
        row.extend(sums.into_iter().map(Cell::Float));
        full.push_row(row)?;
    }

    let model_input = full.select(&mappings.model_input_columns_for(mode))?;

    tracing::info!(
        rows = full.n_rows(),
        categories = categories.len(),
        mode = ?mode,
        "reshaped interactions"
    );
    Ok(ReshapedInteractions { full, model_input })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(mode: Mode) -> Frame {
        let mappings = Mappings::default();
        let mut columns = mappings.identity_columns_for(mode);
        columns.extend([
            "payment_btn_click".to_string(),
            "emi_plans_clicked".to_string(),
            "syllabus_expand".to_string(),
            "mystery_widget".to_string(), // not in the interaction map
        ]);
        let mut f = Frame::new(columns);

        let mut base = vec![
            Cell::Text("2024-01-01".into()),
            Cell::Float(1.0),
            Cell::Text("Level0".into()),
            Cell::Text("others".into()),
            Cell::Text("Level2".into()),
            Cell::Int(0),
            Cell::Int(1),
        ];
        if mode == Mode::Training {
            base.push(Cell::Int(1));
        }

        let mut row1 = base.clone();
        row1.extend([Cell::Int(2), Cell::Null, Cell::Int(5), Cell::Int(100)]);
        f.push_row(row1).unwrap();

        // Same identity tuple: merges with row1.
        let mut row2 = base.clone();
        row2.extend([Cell::Int(3), Cell::Int(1), Cell::Null, Cell::Int(50)]);
        f.push_row(row2).unwrap();
        f
    }

    #[test]
    fn sums_per_category_match_raw_counters() {
        let m = Mappings::default();
        let out =
            reshape_interactions(&input(Mode::Training), &InteractionMap::builtin(), &m, Mode::Training)
                .unwrap();

        // Both rows share one identity tuple.
        assert_eq!(out.full.n_rows(), 1);
        // payment = payment_btn_click(2+3) + emi_plans_clicked(0+1)
        assert_eq!(out.full.get(0, "payment_interaction"), Some(&Cell::Float(6.0)));
        // syllabus = syllabus_expand(5+0)
        assert_eq!(out.full.get(0, "syllabus_interaction"), Some(&Cell::Float(5.0)));
        // Categories with no observed counters sum to zero, not null.
        assert_eq!(out.full.get(0, "career_interaction"), Some(&Cell::Float(0.0)));
    }

    #[test]
    fn unmapped_types_contribute_nothing() {
        let m = Mappings::default();
        let out =
            reshape_interactions(&input(Mode::Training), &InteractionMap::builtin(), &m, Mode::Training)
                .unwrap();
        // "mystery_widget" (150 total) appears in no category column.
        let total: f64 = InteractionMap::builtin()
            .categories()
            .iter()
            .map(|c| out.full.get(0, c).unwrap().as_f64().unwrap())
            .sum();
        assert_eq!(total, 11.0);
        assert!(!out.full.has_column("mystery_widget"));
    }

    #[test]
    fn trimmed_output_matches_declared_columns() {
        let m = Mappings::default();
        for mode in [Mode::Training, Mode::Inference] {
            let out =
                reshape_interactions(&input(mode), &InteractionMap::builtin(), &m, mode).unwrap();
            assert_eq!(
                out.model_input.columns(),
                m.model_input_columns_for(mode).as_slice()
            );
        }
    }

    #[test]
    fn inference_mode_has_no_label() {
        let m = Mappings::default();
        let out =
            reshape_interactions(&input(Mode::Inference), &InteractionMap::builtin(), &m, Mode::Inference)
                .unwrap();
        assert!(!out.model_input.has_column("app_complete_flag"));
        assert!(!out.full.has_column("app_complete_flag"));
    }

    #[test]
    fn missing_identity_column_errors() {
        let m = Mappings::default();
        let f = Frame::new(vec!["payment_btn_click".into()]);
        let result = reshape_interactions(&f, &InteractionMap::builtin(), &m, Mode::Inference);
        assert!(result.is_err());
    }
}
