//! City-tier mapping step.

use leadscore_shared::{Cell, Frame, LeadScoreError, Mappings, Result};

/// Replace the free-text city column with a numeric tier column.
///
/// Unmapped (and null) cities get the default tier 3.0. The mapping is
/// destructive: the city column is dropped from the output.
pub fn map_city_tier(mut frame: Frame, mappings: &Mappings) -> Result<Frame> {
    let city_col = &mappings.city_column;
    if !frame.has_column(city_col) {
        return Err(LeadScoreError::data(format!(
            "city column '{city_col}' absent from input"
        )));
    }

    let tiers: Vec<Cell> = frame
        .column(city_col)?
        .iter()
        .map(|cell| Cell::Float(mappings.tier_for(cell.as_str())))
        .collect();

    frame.add_column(mappings.tier_column.clone(), tiers)?;
    frame.drop_column(city_col)?;

    tracing::info!(rows = frame.n_rows(), "mapped city tiers");
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> Frame {
        let mut f = Frame::new(vec!["city_mapped".into(), "referred_lead".into()]);
        f.push_row(vec![Cell::Text("bengaluru".into()), Cell::Int(1)])
            .unwrap();
        f.push_row(vec![Cell::Text("Mumbai".into()), Cell::Int(0)])
            .unwrap();
        f.push_row(vec![Cell::Null, Cell::Int(0)]).unwrap();
        f
    }

    #[test]
    fn tiers_in_domain_and_city_dropped() {
        let out = map_city_tier(input(), &Mappings::default()).unwrap();
        assert!(!out.has_column("city_mapped"));
        for cell in out.column("city_tier").unwrap() {
            let tier = cell.as_f64().unwrap();
            assert!([1.0, 2.0, 3.0].contains(&tier));
        }
    }

    #[test]
    fn unmapped_city_gets_default_tier() {
        let out = map_city_tier(input(), &Mappings::default()).unwrap();
        // "Mumbai" is not in the (lowercase-keyed) tier table.
        assert_eq!(out.get(1, "city_tier"), Some(&Cell::Float(3.0)));
        // Null city also defaults.
        assert_eq!(out.get(2, "city_tier"), Some(&Cell::Float(3.0)));
        // Mapped city keeps its tier.
        assert_eq!(out.get(0, "city_tier"), Some(&Cell::Float(1.0)));
    }

    #[test]
    fn missing_city_column_errors() {
        let f = Frame::new(vec!["referred_lead".into()]);
        assert!(map_city_tier(f, &Mappings::default()).is_err());
    }
}
