//! Categorical collapsing step.

use leadscore_shared::{Cell, Frame, Mappings, OTHERS, Result};

/// Collapse insignificant categorical levels to the `"others"` sentinel.
///
/// Applied sequentially per configured column, then exact-duplicate rows are
/// removed across the full row image. A null level counts as outside every
/// allow-list and collapses to `"others"` too.
pub fn collapse_categoricals(mut frame: Frame, mappings: &Mappings) -> Result<Frame> {
    for allow in &mappings.allow_lists {
        if !frame.has_column(&allow.column) {
            tracing::warn!(column = %allow.column, "allow-listed column absent, skipping");
            continue;
        }
        let collapsed: Vec<Cell> = frame
            .column(&allow.column)?
            .iter()
            .map(|cell| match cell.as_str() {
                Some(s) if allow.levels.iter().any(|l| l == s) => (*cell).clone(),
                _ => Cell::Text(OTHERS.into()),
            })
            .collect();
        frame.set_column(&allow.column, collapsed)?;
    }

    let before = frame.n_rows();
    frame.dedup_rows();
    tracing::info!(
        rows = frame.n_rows(),
        deduplicated = before - frame.n_rows(),
        "collapsed categorical variables"
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> Frame {
        let mut f = Frame::new(vec![
            "first_platform_c".into(),
            "first_utm_medium_c".into(),
            "first_utm_source_c".into(),
        ]);
        f.push_row(vec![
            Cell::Text("Level0".into()),
            Cell::Text("Level99".into()),
            Cell::Text("Level2".into()),
        ])
        .unwrap();
        f.push_row(vec![
            Cell::Text("NotALevel".into()),
            Cell::Text("Level2".into()),
            Cell::Null,
        ])
        .unwrap();
        f
    }

    #[test]
    fn values_restricted_to_allow_list_or_others() {
        let m = Mappings::default();
        let out = collapse_categoricals(input(), &m).unwrap();

        for allow in &m.allow_lists {
            for cell in out.column(&allow.column).unwrap() {
                let s = cell.as_str().expect("collapsed cells are text");
                assert!(
                    s == OTHERS || allow.levels.iter().any(|l| l == s),
                    "unexpected level {s} in {}",
                    allow.column
                );
            }
        }
    }

    #[test]
    fn out_of_list_and_null_collapse() {
        let out = collapse_categoricals(input(), &Mappings::default()).unwrap();
        assert_eq!(out.get(0, "first_utm_medium_c"), Some(&Cell::Text(OTHERS.into())));
        assert_eq!(out.get(1, "first_platform_c"), Some(&Cell::Text(OTHERS.into())));
        assert_eq!(out.get(1, "first_utm_source_c"), Some(&Cell::Text(OTHERS.into())));
        // Significant levels survive untouched.
        assert_eq!(out.get(0, "first_platform_c"), Some(&Cell::Text("Level0".into())));
    }

    #[test]
    fn collapsing_deduplicates_rows() {
        let mut f = Frame::new(vec![
            "first_platform_c".into(),
            "first_utm_medium_c".into(),
            "first_utm_source_c".into(),
        ]);
        // Distinct raw rows that become identical after collapsing.
        for level in ["LevelA", "LevelB"] {
            f.push_row(vec![
                Cell::Text(level.into()),
                Cell::Text("Level2".into()),
                Cell::Text("Level4".into()),
            ])
            .unwrap();
        }
        let out = collapse_categoricals(f, &Mappings::default()).unwrap();
        assert_eq!(out.n_rows(), 1);
    }
}
