//! Output names derived from source raster names.

use serde::{Deserialize, Serialize};

/// Suffix of classified raster names.
pub const CLASSIFIED_SUFFIX: &str = "_iso";
/// Suffix that replaces the last `_`-token when naming a lake feature class.
pub const LAKES_SUFFIX: &str = "_lakes";

/// How a classified raster is named after its source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingScheme {
    /// `<stem>_iso`
    #[default]
    Source,
    /// `<location>_<year>_iso` for quadrangle-style names such as
    /// `CA_Berkeley_299717_1915_62500_geo`: the map code before the year and
    /// everything after the year are dropped.
    LocationYear,
}

impl NamingScheme {
    /// Name of the classified raster produced from `stem`.
    pub fn classified_name(&self, stem: &str) -> String {
        match self {
            NamingScheme::Source => format!("{stem}{CLASSIFIED_SUFFIX}"),
            NamingScheme::LocationYear => match location_year(stem) {
                Some((location, year)) => format!("{location}_{year}{CLASSIFIED_SUFFIX}"),
                None => format!("{stem}{CLASSIFIED_SUFFIX}"),
            },
        }
    }
}

#[inline]
fn is_year(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Split a quadrangle-style stem into `(location, year)`.
fn location_year(stem: &str) -> Option<(String, &str)> {
    let tokens: Vec<&str> = stem.split('_').collect();
    let year_idx = tokens.iter().position(|t| is_year(t))?;
    let before = &tokens[..year_idx];
    let location = match before.len() {
        0 => return None,
        1 => before,
        n => &before[..n - 1],
    };
    Some((location.join("_"), tokens[year_idx]))
}

/// Name of the lake feature class derived from a classified raster name:
/// the last `_`-suffix becomes `_lakes`.
pub fn lake_name(classified: &str) -> String {
    match classified.rsplit_once('_') {
        Some((head, _)) if !head.is_empty() => format!("{head}{LAKES_SUFFIX}"),
        _ => format!("{classified}{LAKES_SUFFIX}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_scheme_appends_suffix() {
        assert_eq!(NamingScheme::Source.classified_name("map_1904"), "map_1904_iso");
    }

    #[test]
    fn location_year_drops_map_code_and_tail() {
        let scheme = NamingScheme::LocationYear;
        assert_eq!(scheme.classified_name("CA_Berkeley_299717_1915_62500_geo"), "CA_Berkeley_1915_iso");
        assert_eq!(scheme.classified_name("map_1904"), "map_1904_iso");
        assert_eq!(scheme.classified_name("Tahoe_323456_1955"), "Tahoe_1955_iso");
    }

    #[test]
    fn location_year_falls_back_without_year() {
        let scheme = NamingScheme::LocationYear;
        assert_eq!(scheme.classified_name("quad_sheet"), "quad_sheet_iso");
        assert_eq!(scheme.classified_name("1904_map"), "1904_map_iso");
    }

    #[test]
    fn lake_name_replaces_last_suffix() {
        assert_eq!(lake_name("map_1904_iso"), "map_1904_lakes");
        assert_eq!(lake_name("single"), "single_lakes");
    }
}
