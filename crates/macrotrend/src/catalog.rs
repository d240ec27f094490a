//! Default series catalog.
//!
//! FRED consumer and macro indicators plus BLS producer price indexes for
//! construction materials. Every series carries its change unit: series
//! that are already rates are differenced in points, everything else in
//! percent.

use macrotrend_metrics::{ChangeUnit, SeriesCatalog, SeriesSpec, SourceKind};

/// FRED series quoted as rates. Their changes are point differences.
pub const RATE_SERIES: &[&str] = &["UNRATE", "DGS10", "FEDFUNDS"];

const FRED: &[(&str, &str)] = &[
    ("TOTALSA", "Total Vehicle Sales"),
    ("RSAFS", "Retail Sales: Retail and Food Services"),
    ("RSXFS", "Retail Sales: Retail Trade"),
    ("RSMVPD", "Retail Sales: Motor Vehicle and Parts Dealers"),
    ("RSFSDP", "Retail Sales: Food Services and Drinking Places"),
    ("RSFHFS", "Retail Sales: Furniture and Home Furnishing Stores"),
    ("RSEAS", "Retail Sales: Electronics and Appliance Stores"),
    ("HOUST", "Housing Starts"),
    ("UNRATE", "Unemployment Rate"),
    ("CPIAUCSL", "Consumer Price Index for All Urban Consumers"),
    ("PPIACO", "Producer Price Index: All Commodities"),
    ("DGS10", "10-Year Treasury Constant Maturity Rate"),
    ("FEDFUNDS", "Federal Funds Effective Rate"),
    ("PAYEMS", "All Employees, Total Nonfarm"),
    ("INDPRO", "Industrial Production Index"),
    ("PCEPI", "Personal Consumption Expenditures Price Index"),
    ("UMCSENT", "University of Michigan: Consumer Sentiment"),
    ("FRGSHPUSM649NCIS", "Cass Freight Index: Shipments"),
    ("TTLCONS", "Total Construction Spending"),
];

const BLS: &[(&str, &str)] = &[
    ("WPU081", "Lumber"),
    ("WPU1017", "Steel Mill Products"),
    ("WPU101706", "Hot Rolled Bars, Plates and Structural Shapes"),
    ("WPU102501", "Copper and Brass Mill Shapes"),
    ("WPU102502", "Copper Wire and Cable"),
    ("WPU1073", "Fabricated Structural Metal Products"),
    ("WPU107405", "Plumbing Fixtures and Fittings"),
    ("WPU107408", "Metal Sanitary Ware"),
    ("WPU1076", "Fabricated Ferrous Wire Products"),
    ("WPU1079", "Other Miscellaneous Metal Products"),
    ("WPU112", "Construction Machinery and Equipment"),
    ("WPU133", "Concrete Ingredients and Related Products"),
    ("WPU1331", "Concrete Block and Brick"),
    ("WPU1332", "Concrete Pipe"),
    ("WPU1333", "Ready-Mixed Concrete"),
    ("WPU1334", "Precast Concrete Products"),
    ("WPU1335", "Prestressed Concrete Products"),
    ("WPU1342", "Gypsum Products"),
    ("WPU0721", "Plastic Construction Products"),
    ("WPU1311", "Flat Glass"),
    ("WPU13710102", "Asphalt Paving Mixtures and Blocks"),
    ("WPU1392", "Insulation Materials"),
    ("WPU062101", "Prepared Paint"),
    ("WPU057303", "No. 2 Diesel Fuel"),
    ("WPU1394", "Mineral Wool Products"),
    ("WPU136", "Asphalt Felts and Coatings"),
    ("WPU1361", "Asphalt Roofing and Siding"),
    ("WPU1322", "Cement"),
    ("WPU3012", "Truck Transportation of Freight"),
    ("WPU443", "Construction Equipment Rental and Leasing"),
    ("PCU23822X23822X", "Plumbing, Heating and Air-Conditioning Contractors"),
];

fn unit_for(id: &str) -> ChangeUnit {
    if RATE_SERIES.contains(&id) {
        ChangeUnit::Absolute
    } else {
        ChangeUnit::Relative
    }
}

/// Default FRED series.
pub fn fred_series() -> Vec<SeriesSpec> {
    FRED.iter()
        .map(|(id, name)| SeriesSpec::new(*id, *name, unit_for(id), SourceKind::Fred))
        .collect()
}

/// Default BLS producer price series. All are indexes.
pub fn bls_series() -> Vec<SeriesSpec> {
    BLS.iter()
        .map(|(id, name)| SeriesSpec::new(*id, *name, ChangeUnit::Relative, SourceKind::Bls))
        .collect()
}

/// FRED series followed by BLS series.
pub fn default_catalog() -> SeriesCatalog {
    let mut specs = fred_series();
    specs.extend(bls_series());
    SeriesCatalog::new(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("UNRATE", ChangeUnit::Absolute)]
    #[case("DGS10", ChangeUnit::Absolute)]
    #[case("FEDFUNDS", ChangeUnit::Absolute)]
    #[case("CPIAUCSL", ChangeUnit::Relative)]
    #[case("WPU081", ChangeUnit::Relative)]
    fn test_units(#[case] id: &str, #[case] unit: ChangeUnit) {
        assert_eq!(default_catalog().get(id).unwrap().unit, unit);
    }

    #[test]
    fn test_catalog_sizes() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), FRED.len() + BLS.len());
        assert_eq!(catalog.by_source(SourceKind::Fred).len(), FRED.len());
        assert_eq!(catalog.by_source(SourceKind::Bls).len(), BLS.len());
    }

    #[test]
    fn test_quarterly_series_excluded() {
        assert!(!default_catalog().contains("GDP"));
    }

    #[test]
    fn test_rate_series_are_fred() {
        let catalog = default_catalog();
        for id in RATE_SERIES {
            assert_eq!(catalog.get(id).unwrap().source, SourceKind::Fred);
        }
    }
}
