//! Alias table mapping free-text place names onto canonical `(city, country)` keys.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::CanonicalLocation;
use crate::ConfigError;

/// The bundled `config/locations.yaml`, compiled in.
pub const BUILTIN_LOCATIONS: &str = include_str!("../../../config/locations.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Language codes typical of the country, e.g. `["en", "fr"]`.
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityEntry {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Only match when the mention names the country too ("London, Canada").
    #[serde(default)]
    pub qualified_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GazetteerFile {
    #[serde(default)]
    pub countries: Vec<CountryEntry>,
    #[serde(default)]
    pub cities: Vec<CityEntry>,
    /// Detected language code -> country most associated with it.
    #[serde(default)]
    pub language_regions: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct FuzzyCandidate {
    folded: String,
    location: CanonicalLocation,
    qualified_only: bool,
}

/// Immutable lookup indices built once from a [`GazetteerFile`].
///
/// Shared by reference between workers; nothing in here is mutated after
/// construction, so lookups are pure.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    locations: BTreeSet<CanonicalLocation>,
    exact: HashMap<String, Vec<CanonicalLocation>>,
    folded: HashMap<String, Vec<CanonicalLocation>>,
    folded_all: HashMap<String, Vec<CanonicalLocation>>,
    fuzzy: Vec<FuzzyCandidate>,
    country_aliases: HashMap<String, String>,
    country_languages: BTreeMap<String, Vec<String>>,
    language_regions: BTreeMap<String, String>,
}

/// Case-, diacritic- and punctuation-insensitive form of a place name.
///
/// NFKD-decomposes, drops combining marks, lowercases, turns every
/// non-alphanumeric run into a single space and trims. `"  São-Paulo!"`
/// folds to `"sao paulo"`.
#[must_use]
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Lowercased language code and its primary subtag (`"en-US"` -> `("en-us", "en")`).
fn language_forms(code: &str) -> (String, String) {
    let full = code.trim().to_ascii_lowercase().replace('_', "-");
    let primary = full.split('-').next().unwrap_or_default().to_string();
    (full, primary)
}

fn push_unique(
    map: &mut HashMap<String, Vec<CanonicalLocation>>,
    key: String,
    loc: &CanonicalLocation,
) {
    let entry = map.entry(key).or_default();
    if !entry.contains(loc) {
        entry.push(loc.clone());
        entry.sort();
    }
}

impl Gazetteer {
    /// Load and validate a gazetteer YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    /// The gazetteer bundled with the crate (`config/locations.yaml`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` only if the bundled file itself is broken.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_LOCATIONS, "<builtin locations.yaml>")
    }

    /// Parse and validate gazetteer YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileParse`] on malformed YAML and
    /// [`ConfigError::Validation`] on inconsistent entries.
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: GazetteerFile =
            serde_yaml::from_str(content).map_err(|e| ConfigError::FileParse {
                path: origin.to_string(),
                source: e,
            })?;
        Self::from_file(&file)
    }

    /// Build lookup indices from an already-parsed gazetteer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if names are blank, a city points
    /// at an undeclared country, a canonical key is declared twice, a country
    /// alias is claimed by two countries, or a language region is undeclared.
    pub fn from_file(file: &GazetteerFile) -> Result<Self, ConfigError> {
        let mut country_aliases: HashMap<String, String> = HashMap::new();
        let mut country_languages = BTreeMap::new();

        for country in &file.countries {
            let name = country.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation(
                    "country name must be non-empty".to_string(),
                ));
            }
            if country_languages.contains_key(name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate country: '{name}'"
                )));
            }

            for alias in std::iter::once(name).chain(country.aliases.iter().map(String::as_str)) {
                let folded = fold(alias);
                if folded.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "country '{name}' has an alias with no letters or digits: '{alias}'"
                    )));
                }
                if let Some(existing) = country_aliases.get(&folded) {
                    if existing != name {
                        return Err(ConfigError::Validation(format!(
                            "country alias '{alias}' claimed by both '{existing}' and '{name}'"
                        )));
                    }
                }
                country_aliases.insert(folded, name.to_string());
            }

            let mut languages: Vec<String> = country
                .languages
                .iter()
                .map(|l| language_forms(l).0)
                .filter(|l| !l.is_empty())
                .collect();
            languages.sort();
            languages.dedup();
            country_languages.insert(name.to_string(), languages);
        }

        let mut locations = BTreeSet::new();
        let mut exact = HashMap::new();
        let mut folded_index = HashMap::new();
        let mut folded_all = HashMap::new();
        let mut fuzzy = Vec::new();
        let mut seen_fuzzy: HashSet<(String, CanonicalLocation)> = HashSet::new();

        for city in &file.cities {
            let name = city.name.trim();
            let country = city.country.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation(
                    "city name must be non-empty".to_string(),
                ));
            }
            if !country_languages.contains_key(country) {
                return Err(ConfigError::Validation(format!(
                    "city '{name}' references undeclared country '{country}'"
                )));
            }

            let location = CanonicalLocation::new(name, country);
            if !locations.insert(location.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate location: '{location}'"
                )));
            }

            for alias in std::iter::once(name).chain(city.aliases.iter().map(String::as_str)) {
                let folded = fold(alias);
                if folded.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "city '{location}' has an alias with no letters or digits: '{alias}'"
                    )));
                }
                if !city.qualified_only {
                    push_unique(&mut exact, alias.trim().to_string(), &location);
                    push_unique(&mut folded_index, folded.clone(), &location);
                }
                push_unique(&mut folded_all, folded.clone(), &location);
                if seen_fuzzy.insert((folded.clone(), location.clone())) {
                    fuzzy.push(FuzzyCandidate {
                        folded,
                        location: location.clone(),
                        qualified_only: city.qualified_only,
                    });
                }
            }
        }
        fuzzy.sort_by(|a, b| {
            a.folded
                .cmp(&b.folded)
                .then_with(|| a.location.cmp(&b.location))
        });

        let mut language_regions = BTreeMap::new();
        for (language, country) in &file.language_regions {
            let country = country.trim();
            if !country_languages.contains_key(country) {
                return Err(ConfigError::Validation(format!(
                    "language region '{language}' references undeclared country '{country}'"
                )));
            }
            language_regions.insert(language_forms(language).0, country.to_string());
        }

        Ok(Self {
            locations,
            exact,
            folded: folded_index,
            folded_all,
            fuzzy,
            country_aliases,
            country_languages,
            language_regions,
        })
    }

    /// Locations whose alias equals `text` exactly (surrounding whitespace ignored).
    #[must_use]
    pub fn exact_matches(&self, text: &str) -> &[CanonicalLocation] {
        self.exact.get(text.trim()).map_or(&[], Vec::as_slice)
    }

    /// Unqualified locations whose folded alias equals `folded`.
    #[must_use]
    pub fn folded_matches(&self, folded: &str) -> &[CanonicalLocation] {
        self.folded.get(folded).map_or(&[], Vec::as_slice)
    }

    /// Locations in `country` (qualified-only entries included) whose folded
    /// alias equals `folded`.
    #[must_use]
    pub fn folded_matches_in_country(
        &self,
        folded: &str,
        country: &str,
    ) -> Vec<&CanonicalLocation> {
        self.folded_all
            .get(folded)
            .map(|locs| locs.iter().filter(|l| l.country == country).collect())
            .unwrap_or_default()
    }

    /// Fuzzy-match candidates as `(folded alias, location)`, sorted.
    ///
    /// Without a country only unqualified entries are offered; with one, every
    /// entry in that country is.
    pub fn fuzzy_candidates<'a>(
        &'a self,
        country: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a CanonicalLocation)> + 'a {
        self.fuzzy
            .iter()
            .filter(move |c| match country {
                Some(country) => c.location.country == country,
                None => !c.qualified_only,
            })
            .map(|c| (c.folded.as_str(), &c.location))
    }

    /// Canonical country name for a folded country alias.
    #[must_use]
    pub fn country_for_alias(&self, folded: &str) -> Option<&str> {
        self.country_aliases.get(folded).map(String::as_str)
    }

    /// Language codes typical of `country`.
    #[must_use]
    pub fn languages_for(&self, country: &str) -> &[String] {
        self.country_languages.get(country).map_or(&[], Vec::as_slice)
    }

    /// Whether `language` (full tag or primary subtag) is typical of `country`.
    #[must_use]
    pub fn is_typical_language(&self, country: &str, language: &str) -> bool {
        let (full, primary) = language_forms(language);
        if primary.is_empty() {
            return false;
        }
        self.languages_for(country)
            .iter()
            .any(|l| *l == full || *l == primary)
    }

    /// Country most associated with `language`, trying the full tag first.
    #[must_use]
    pub fn region_for_language(&self, language: &str) -> Option<&str> {
        let (full, primary) = language_forms(language);
        self.language_regions
            .get(&full)
            .or_else(|| self.language_regions.get(&primary))
            .map(String::as_str)
    }

    /// Every canonical location, sorted.
    pub fn locations(&self) -> impl Iterator<Item = &CanonicalLocation> {
        self.locations.iter()
    }

    /// Every declared country, sorted.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.country_languages.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
