use tracing::info;

use crate::models::FirmRecord;

/// Split `"Name, Place"` firm values into a firm name and a location.
///
/// Everything after the first comma becomes the location; without a comma the
/// location is null. A firm value whose name part would be empty is kept
/// whole so the firm never ends up blank.
pub fn derive_locations(records: &mut [FirmRecord]) {
    let mut located = 0;

    for record in records.iter_mut() {
        let (firm, location) = split_firm(&record.firm);
        if location.is_some() {
            located += 1;
        }
        record.firm = firm;
        record.location = location;
    }

    info!("Derived locations for {}/{} records", located, records.len());
}

/// Split a firm field at its first comma
pub fn split_firm(value: &str) -> (String, Option<String>) {
    match value.split_once(',') {
        Some((name, place)) => {
            let name = name.trim();
            let place = place.trim();
            let location = (!place.is_empty()).then(|| place.to_string());
            if name.is_empty() {
                (value.trim().to_string(), location)
            } else {
                (name.to_string(), location)
            }
        }
        None => (value.trim().to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableBlock;
    use crate::stages::{NormalizeConfig, normalize};

    #[test]
    fn test_split_firm() {
        assert_eq!(
            split_firm("Acme Co, Springfield"),
            ("Acme Co".to_string(), Some("Springfield".to_string()))
        );
        assert_eq!(
            split_firm("TURNER CONSTRUCTION CO., New York, N.Y."),
            ("TURNER CONSTRUCTION CO.".to_string(), Some("New York, N.Y.".to_string()))
        );
        assert_eq!(split_firm("Beta LLC"), ("Beta LLC".to_string(), None));
        assert_eq!(split_firm("Gamma,"), ("Gamma".to_string(), None));
    }

    #[test]
    fn test_empty_name_keeps_firm() {
        let (firm, location) = split_firm(", Springfield");
        assert_eq!(firm, ", Springfield");
        assert_eq!(location.as_deref(), Some("Springfield"));
    }

    #[test]
    fn test_normalized_table_gets_locations() {
        let block = TableBlock::from_cells(vec![
            vec!["RANK", "FIRM", "REVENUE"],
            vec!["1", "1", "Acme Co, Springfield", "100.0", "10.0"],
            vec!["2", "2", "Beta LLC", "50.5", "-"],
        ]);
        let mut records = normalize(&[block], &NormalizeConfig::default())
            .unwrap()
            .records;

        derive_locations(&mut records);

        assert_eq!(records[0].firm, "Acme Co");
        assert_eq!(records[0].location.as_deref(), Some("Springfield"));
        assert_eq!(records[0].total_revenue, Some(100.0));
        assert_eq!(records[0].intl_revenue, Some(10.0));
        assert_eq!(records[1].firm, "Beta LLC");
        assert_eq!(records[1].location, None);
        assert_eq!(records[1].total_revenue, Some(50.5));
        assert_eq!(records[1].intl_revenue, None);
    }
}
