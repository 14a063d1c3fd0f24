//! Country and zone lookup.
//!
//! Addresses carry numeric country and zone ids. Display names, ISO codes and
//! per-country address templates are resolved through a [`CountryDirectory`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Address template used when a country does not define its own.
pub const DEFAULT_ADDRESS_FORMAT: &str =
    "!company\n!first_name !last_name\n!street1\n!street2\n!city, !zone_code !postal_code\n!country_name_if";

/// A country the store knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 numeric code.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// ISO 3166-1 alpha-2 code.
    pub iso_code_2: String,
    /// ISO 3166-1 alpha-3 code.
    pub iso_code_3: String,
    /// Address template; falls back to [`DEFAULT_ADDRESS_FORMAT`].
    #[serde(default)]
    pub address_format: Option<String>,
}

/// A state, province or region inside a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone id, unique across countries.
    pub id: u32,
    /// Owning country.
    pub country: u16,
    /// Short code, e.g. `CA`.
    pub code: String,
    /// Display name, e.g. `California`.
    pub name: String,
}

/// Resolves numeric country and zone codes.
pub trait CountryDirectory {
    /// Look up a country by numeric code.
    fn country(&self, id: u16) -> Option<&Country>;

    /// Look up a zone by id.
    fn zone(&self, id: u32) -> Option<&Zone>;

    /// Zones belonging to a country, in code order.
    fn zones_for(&self, country: u16) -> Vec<&Zone>;

    /// Whether `zone` is a valid choice for `country`.
    ///
    /// Countries without zones accept only the empty zone (0).
    fn is_valid_zone(&self, country: u16, zone: u32) -> bool {
        let zones = self.zones_for(country);
        if zones.is_empty() {
            return zone == 0;
        }
        zones.iter().any(|z| z.id == zone)
    }
}

/// In-memory country directory.
#[derive(Debug, Clone, Default)]
pub struct StaticCountryDirectory {
    countries: BTreeMap<u16, Country>,
    zones: BTreeMap<u32, Zone>,
}

impl StaticCountryDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory preloaded with the United States, Canada and Belgium.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut directory = Self::new();
        directory.add_country(Country {
            id: 840,
            name: "United States".to_string(),
            iso_code_2: "US".to_string(),
            iso_code_3: "USA".to_string(),
            address_format: None,
        });
        directory.add_country(Country {
            id: 124,
            name: "Canada".to_string(),
            iso_code_2: "CA".to_string(),
            iso_code_3: "CAN".to_string(),
            address_format: None,
        });
        directory.add_country(Country {
            id: 56,
            name: "Belgium".to_string(),
            iso_code_2: "BE".to_string(),
            iso_code_3: "BEL".to_string(),
            address_format: Some(
                "!company\n!first_name !last_name\n!street1\n!street2\n!postal_code !city\n!country_name_if"
                    .to_string(),
            ),
        });

        let zones: [(u32, u16, &str, &str); 10] = [
            (12, 840, "CA", "California"),
            (43, 840, "NY", "New York"),
            (57, 840, "TX", "Texas"),
            (62, 840, "WA", "Washington"),
            (66, 124, "BC", "British Columbia"),
            (74, 124, "ON", "Ontario"),
            (76, 124, "QC", "Quebec"),
            (560, 56, "VAN", "Antwerpen"),
            (561, 56, "BRU", "Brussels"),
            (562, 56, "WHT", "Hainaut"),
        ];
        for (id, country, code, name) in zones {
            directory.add_zone(Zone {
                id,
                country,
                code: code.to_string(),
                name: name.to_string(),
            });
        }
        directory
    }

    /// Add or replace a country.
    pub fn add_country(&mut self, country: Country) {
        self.countries.insert(country.id, country);
    }

    /// Add or replace a zone.
    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id, zone);
    }

    /// Remove a country and its zones.
    pub fn remove_country(&mut self, id: u16) -> Option<Country> {
        self.zones.retain(|_, zone| zone.country != id);
        self.countries.remove(&id)
    }

    /// All countries, in numeric order.
    pub fn countries(&self) -> impl Iterator<Item = &Country> {
        self.countries.values()
    }
}

impl CountryDirectory for StaticCountryDirectory {
    fn country(&self, id: u16) -> Option<&Country> {
        self.countries.get(&id)
    }

    fn zone(&self, id: u32) -> Option<&Zone> {
        self.zones.get(&id)
    }

    fn zones_for(&self, country: u16) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self
            .zones
            .values()
            .filter(|zone| zone.country == country)
            .collect();
        zones.sort_by(|a, b| a.code.cmp(&b.code));
        zones
    }
}
