//! Mailing address value object and text formatting.

use serde::{Deserialize, Serialize};

use super::country::{CountryDirectory, DEFAULT_ADDRESS_FORMAT};

/// A mailing and contact address attached to an order.
///
/// Addresses are replaced wholesale on edit; an order never mutates the
/// address it already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    /// Given name.
    pub first_name: String,
    /// Surname.
    pub last_name: String,
    /// Company or organization.
    pub company: String,
    /// First line of street address.
    pub street1: String,
    /// Second line of street address.
    pub street2: String,
    /// City name.
    pub city: String,
    /// State, province or region id (0 when none).
    pub zone: u32,
    /// ISO 3166-1 numeric country code.
    pub country: u16,
    /// Postal code.
    pub postal_code: String,
    /// Telephone number.
    pub phone: String,
    /// E-mail address.
    pub email: String,
}

impl Address {
    /// An empty address in the given country.
    #[must_use]
    pub fn new(country: u16) -> Self {
        Self {
            country,
            ..Self::default()
        }
    }

    /// Canonical form used for location comparison: all whitespace removed
    /// and upper-cased.
    #[must_use]
    pub fn canonical(value: &str) -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Whether two addresses describe the same physical location.
    ///
    /// Only street lines, city, zone, country and postal code take part.
    /// Names, company, phone and e-mail are ignored.
    #[must_use]
    pub fn is_same_physical_location(&self, other: &Self) -> bool {
        self.zone == other.zone
            && self.country == other.country
            && [
                (&self.street1, &other.street1),
                (&self.street2, &other.street2),
                (&self.city, &other.city),
                (&self.postal_code, &other.postal_code),
            ]
            .into_iter()
            .all(|(a, b)| Self::canonical(a) == Self::canonical(b))
    }

    /// Given name and surname joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Whether no text field has been filled in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.company,
            &self.street1,
            &self.street2,
            &self.city,
            &self.postal_code,
            &self.phone,
            &self.email,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
            && self.zone == 0
    }
}

/// Renders an [`Address`] as plain text lines using its country's template.
#[derive(Debug, Clone, Copy)]
pub struct AddressFormatter<'a, D: CountryDirectory + ?Sized> {
    directory: &'a D,
    store_country: u16,
    capitalize: bool,
}

impl<'a, D: CountryDirectory + ?Sized> AddressFormatter<'a, D> {
    /// Create a formatter for a store located in `store_country`.
    #[must_use]
    pub const fn new(directory: &'a D, store_country: u16) -> Self {
        Self {
            directory,
            store_country,
            capitalize: false,
        }
    }

    /// Upper-case the whole output.
    #[must_use]
    pub const fn capitalize(mut self, capitalize: bool) -> Self {
        self.capitalize = capitalize;
        self
    }

    /// Format the address, one line per template row, empty rows dropped.
    #[must_use]
    pub fn format(&self, address: &Address) -> String {
        let (zone_code, zone_name) = self
            .directory
            .zone(address.zone)
            .map_or(("N/A", "Unknown"), |zone| (zone.code.as_str(), zone.name.as_str()));
        let country = self.directory.country(address.country);
        let (country_name, code2, code3) = country.map_or(("Unknown", "N/A", "N/A"), |c| {
            (c.name.as_str(), c.iso_code_2.as_str(), c.iso_code_3.as_str())
        });
        let foreign = address.country != self.store_country;
        let (name_if, code2_if, code3_if) = if foreign {
            (country_name, code2, code3)
        } else {
            ("", "", "")
        };

        let variables: [(&str, &str); 15] = [
            ("!country_name_if", name_if),
            ("!country_code2_if", code2_if),
            ("!country_code3_if", code3_if),
            ("!country_name", country_name),
            ("!country_code2", code2),
            ("!country_code3", code3),
            ("!postal_code", address.postal_code.trim()),
            ("!first_name", address.first_name.trim()),
            ("!last_name", address.last_name.trim()),
            ("!zone_code", zone_code),
            ("!zone_name", zone_name),
            ("!company", address.company.trim()),
            ("!street1", address.street1.trim()),
            ("!street2", address.street2.trim()),
            ("!city", address.city.trim()),
        ];

        let template = country
            .and_then(|c| c.address_format.as_deref())
            .unwrap_or(DEFAULT_ADDRESS_FORMAT);
        let rendered = substitute(&template.replace("\r\n", "\n"), &variables);

        let lines: Vec<String> = rendered
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix(", N/A").map_or(line, str::trim).to_string()
            })
            .filter(|line| !line.is_empty())
            .collect();
        let text = lines.join("\n");

        if self.capitalize {
            text.to_uppercase()
        } else {
            text
        }
    }
}

/// Replace each `!token` in one pass, preferring the longest match.
/// Inserted values are copied as-is and never scanned for tokens.
fn substitute(template: &str, variables: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('!') {
        let (before, tail) = rest.split_at(at);
        out.push_str(before);
        let matched = variables
            .iter()
            .filter(|(token, _)| tail.starts_with(*token))
            .max_by_key(|(token, _)| token.len());
        let consumed = match matched {
            Some((token, value)) => {
                out.push_str(value);
                token.len()
            }
            None => {
                out.push('!');
                1
            }
        };
        rest = tail.get(consumed..).unwrap_or_default();
    }
    out.push_str(rest);
    out
}
