//! Region and school display names for log lines.
//!
//! Filled as a byproduct of the lookup builders and handed to whoever logs,
//! so a request for school `20227904` can be logged as
//! `SMAN 1 CIKANCUNG (20227904)` once that school has been seen.

use dashmap::DashMap;

use crate::models::{RegionMapping, SchoolDirectory};

#[derive(Debug, Default)]
pub struct NameIndex {
    regions: DashMap<String, String>,
    schools: DashMap<String, String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_regions(&self, mapping: &RegionMapping) {
        for region in mapping.iter() {
            self.regions.insert(region.id.clone(), region.name.clone());
        }
    }

    pub fn record_schools(&self, directory: &SchoolDirectory) {
        for (npsn, name) in directory {
            self.schools.insert(npsn.clone(), name.clone());
        }
    }

    pub fn record_school(&self, npsn: &str, name: &str) {
        self.schools.insert(npsn.to_string(), name.to_string());
    }

    /// `NAME (npsn)` when known, otherwise the bare id.
    pub fn school_label(&self, npsn: &str) -> String {
        match self.schools.get(npsn) {
            Some(name) => format!("{} ({npsn})", name.value()),
            None => npsn.to_string(),
        }
    }

    /// `Region <id>: NAME` when known, otherwise `Region <id>`.
    pub fn region_label(&self, id: &str) -> String {
        match self.regions.get(id) {
            Some(name) => format!("Region {id}: {}", name.value()),
            None => format!("Region {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fall_back_to_ids() {
        let names = NameIndex::new();
        assert_eq!(names.school_label("20227904"), "20227904");
        assert_eq!(names.region_label("8"), "Region 8");

        let mut schools = SchoolDirectory::new();
        schools.insert("20227904".into(), "SMAN 1 CIKANCUNG".into());
        names.record_schools(&schools);
        names.record_regions(&RegionMapping::from_cities(vec![(
            "8".to_string(),
            vec!["KAB. BANDUNG"],
        )]));

        assert_eq!(names.school_label("20227904"), "SMAN 1 CIKANCUNG (20227904)");
        assert_eq!(names.region_label("8"), "Region 8: KAB. BANDUNG");
    }
}
