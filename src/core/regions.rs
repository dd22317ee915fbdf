//! Country name normalisation and the country → sales region table.

use std::collections::HashMap;

pub const UNKNOWN_COUNTRY: &str = "Unknown";
pub const OTHER_REGION: &str = "Other";

const NORTH_AMERICA: &str = "North America";
const LATIN_AMERICA: &str = "Latin America";
const EUROPE: &str = "Europe";
const MIDDLE_EAST_AFRICA: &str = "Middle East & Africa";
const ASIA_PACIFIC: &str = "Asia Pacific";

const COUNTRY_REGIONS: &[(&str, &str)] = &[
    ("United States", NORTH_AMERICA),
    ("Canada", NORTH_AMERICA),
    ("Mexico", LATIN_AMERICA),
    ("Brazil", LATIN_AMERICA),
    ("Argentina", LATIN_AMERICA),
    ("Chile", LATIN_AMERICA),
    ("Colombia", LATIN_AMERICA),
    ("Peru", LATIN_AMERICA),
    ("United Kingdom", EUROPE),
    ("Ireland", EUROPE),
    ("Germany", EUROPE),
    ("France", EUROPE),
    ("Spain", EUROPE),
    ("Portugal", EUROPE),
    ("Italy", EUROPE),
    ("Netherlands", EUROPE),
    ("Belgium", EUROPE),
    ("Switzerland", EUROPE),
    ("Austria", EUROPE),
    ("Sweden", EUROPE),
    ("Norway", EUROPE),
    ("Denmark", EUROPE),
    ("Finland", EUROPE),
    ("Poland", EUROPE),
    ("Czech Republic", EUROPE),
    ("Greece", EUROPE),
    ("Romania", EUROPE),
    ("Turkey", MIDDLE_EAST_AFRICA),
    ("United Arab Emirates", MIDDLE_EAST_AFRICA),
    ("Saudi Arabia", MIDDLE_EAST_AFRICA),
    ("Qatar", MIDDLE_EAST_AFRICA),
    ("Israel", MIDDLE_EAST_AFRICA),
    ("Egypt", MIDDLE_EAST_AFRICA),
    ("Morocco", MIDDLE_EAST_AFRICA),
    ("Nigeria", MIDDLE_EAST_AFRICA),
    ("Kenya", MIDDLE_EAST_AFRICA),
    ("South Africa", MIDDLE_EAST_AFRICA),
    ("India", ASIA_PACIFIC),
    ("Pakistan", ASIA_PACIFIC),
    ("China", ASIA_PACIFIC),
    ("Japan", ASIA_PACIFIC),
    ("South Korea", ASIA_PACIFIC),
    ("Singapore", ASIA_PACIFIC),
    ("Malaysia", ASIA_PACIFIC),
    ("Indonesia", ASIA_PACIFIC),
    ("Thailand", ASIA_PACIFIC),
    ("Vietnam", ASIA_PACIFIC),
    ("Philippines", ASIA_PACIFIC),
    ("Australia", ASIA_PACIFIC),
    ("New Zealand", ASIA_PACIFIC),
];

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "United States"),
    ("usa", "United States"),
    ("u.s.", "United States"),
    ("u.s.a.", "United States"),
    ("united states of america", "United States"),
    ("america", "United States"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("gb", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("scotland", "United Kingdom"),
    ("deutschland", "Germany"),
    ("de", "Germany"),
    ("españa", "Spain"),
    ("holland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("czechia", "Czech Republic"),
    ("türkiye", "Turkey"),
    ("turkiye", "Turkey"),
    ("uae", "United Arab Emirates"),
    ("ksa", "Saudi Arabia"),
    ("korea", "South Korea"),
    ("republic of korea", "South Korea"),
    ("prc", "China"),
    ("viet nam", "Vietnam"),
    ("brasil", "Brazil"),
    ("méxico", "Mexico"),
    ("aus", "Australia"),
    ("nz", "New Zealand"),
];

/// Lookup tables built once when the geo engine loads.
#[derive(Debug, Clone)]
pub struct CountryDirectory {
    aliases: HashMap<String, &'static str>,
    regions: HashMap<&'static str, &'static str>,
}

impl CountryDirectory {
    /// Builds the directory; fails if an alias points at a country with no region.
    pub fn load() -> Result<Self, String> {
        let regions: HashMap<&'static str, &'static str> = COUNTRY_REGIONS.iter().copied().collect();

        let mut aliases: HashMap<String, &'static str> = COUNTRY_REGIONS
            .iter()
            .map(|(country, _)| (country.to_lowercase(), *country))
            .collect();

        for (alias, country) in COUNTRY_ALIASES {
            if !regions.contains_key(country) {
                return Err(format!("alias '{}' points at unmapped country '{}'", alias, country));
            }
            aliases.insert(alias.to_lowercase(), *country);
        }

        Ok(Self { aliases, regions })
    }

    /// 國家名稱正規化：別名查表，未知名稱轉為首字大寫
    pub fn normalize(&self, raw: Option<&str>) -> String {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return UNKNOWN_COUNTRY.to_string();
        }

        let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        match self.aliases.get(&collapsed.to_lowercase()) {
            Some(country) => (*country).to_string(),
            None => title_case(&collapsed),
        }
    }

    pub fn region_of(&self, country: &str) -> &'static str {
        self.regions.get(country).copied().unwrap_or(OTHER_REGION)
    }

    pub fn known_countries(&self) -> usize {
        self.regions.len()
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
