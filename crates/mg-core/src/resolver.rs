//! Package-to-game resolution.
//!
//! Several mapping layers produce `package → game name` entries. They are merged
//! by [`merge_with_precedence`] in a fixed order, so a package present in more than
//! one layer always resolves to the highest layer's name:
//!
//! library > custom > community > learned > built-in catalog
//!
//! Merging never mutates the input layers.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::{built_in_catalog, catalog_entries};
use crate::types::LibraryGame;

/// A mapping layer, ordered from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingLayer {
    /// Static built-in catalog.
    BuiltIn,
    /// Locally learned fuzzy-match mappings.
    Learned,
    /// Community-verified mappings.
    Community,
    /// The user's manual custom mappings.
    Custom,
    /// Games in the user's own library.
    Library,
}

impl MappingLayer {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BuiltIn => "built_in",
            Self::Learned => "learned",
            Self::Community => "community",
            Self::Custom => "custom",
            Self::Library => "library",
        }
    }
}

impl std::fmt::Display for MappingLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved game name and the layer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub game_name: String,
    pub layer: MappingLayer,
}

/// The merged package map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMap {
    entries: HashMap<String, ResolvedName>,
}

impl PackageMap {
    pub fn get(&self, package_name: &str) -> Option<&str> {
        self.entries
            .get(package_name)
            .map(|resolved| resolved.game_name.as_str())
    }

    pub fn resolved(&self, package_name: &str) -> Option<&ResolvedName> {
        self.entries.get(package_name)
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.entries.contains_key(package_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Package names in sorted order.
    pub fn package_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Merges mapping layers so that higher layers overwrite lower ones.
///
/// The order of `layers` does not matter; precedence comes from [`MappingLayer`].
pub fn merge_with_precedence<'a, I>(layers: I) -> PackageMap
where
    I: IntoIterator<Item = (MappingLayer, &'a BTreeMap<String, String>)>,
{
    let mut ordered: Vec<_> = layers.into_iter().collect();
    ordered.sort_by_key(|(layer, _)| *layer);

    let mut entries = HashMap::new();
    for (layer, mappings) in ordered {
        for (pkg, name) in mappings {
            entries.insert(
                pkg.clone(),
                ResolvedName {
                    game_name: name.clone(),
                    layer,
                },
            );
        }
    }
    PackageMap { entries }
}

/// Extracts `package → name` entries from library games that carry a package name.
pub fn library_mappings(games: &[LibraryGame]) -> BTreeMap<String, String> {
    games
        .iter()
        .filter_map(|game| game.package().map(|pkg| (pkg.to_string(), game.name.clone())))
        .collect()
}

/// Snapshots of every non-static mapping layer.
#[derive(Debug, Clone, Default)]
pub struct MappingSources {
    pub library: Vec<LibraryGame>,
    pub custom: BTreeMap<String, String>,
    pub community: BTreeMap<String, String>,
    pub learned: BTreeMap<String, String>,
}

impl MappingSources {
    /// Sources holding only the user's library and custom mappings.
    pub fn from_user(custom: BTreeMap<String, String>, library: Vec<LibraryGame>) -> Self {
        Self {
            library,
            custom,
            ..Self::default()
        }
    }

    /// Builds the merged package map.
    pub fn resolve(&self) -> PackageMap {
        let library = library_mappings(&self.library);
        merge_with_precedence([
            (MappingLayer::BuiltIn, built_in_catalog()),
            (MappingLayer::Learned, &self.learned),
            (MappingLayer::Community, &self.community),
            (MappingLayer::Custom, &self.custom),
            (MappingLayer::Library, &library),
        ])
    }

    pub fn is_known_game(&self, package_name: &str) -> bool {
        self.resolve().contains(package_name)
    }

    pub fn game_name(&self, package_name: &str) -> Option<String> {
        self.resolve().get(package_name).map(str::to_string)
    }

    /// Inverse lookup by game name, case-insensitive.
    ///
    /// Scans library, then custom mappings, then the built-in catalog and
    /// returns the first hit. Names are not unique, so neither is the answer.
    pub fn find_package_by_game_name(&self, game_name: &str) -> Option<String> {
        let wanted = game_name.to_lowercase();

        if let Some(pkg) = self
            .library
            .iter()
            .find(|game| game.package().is_some() && game.name.to_lowercase() == wanted)
            .and_then(LibraryGame::package)
        {
            return Some(pkg.to_string());
        }

        if let Some((pkg, _)) = self
            .custom
            .iter()
            .find(|(_, name)| name.to_lowercase() == wanted)
        {
            return Some(pkg.clone());
        }

        catalog_entries()
            .find(|(_, name)| name.to_lowercase() == wanted)
            .map(|(pkg, _)| pkg.to_string())
    }
}

/// Merges the user's custom mappings and library over the built-in catalog.
pub fn resolve(
    user_mappings: &BTreeMap<String, String>,
    user_library_games: &[LibraryGame],
) -> PackageMap {
    MappingSources::from_user(user_mappings.clone(), user_library_games.to_vec()).resolve()
}

/// Package-name fragments that usually indicate a game.
static GAME_PACKAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\.game\.",
        r"(?i)\.games\.",
        r"(?i)^com\.game\.",
        r"(?i)^com\.games\.",
        r"(?i)^games\.",
        r"(?i)^game\.",
        r"(?i)\.puzzle\.",
        r"(?i)\.arcade\.",
        r"(?i)\.casino\.",
        r"(?i)\.rpg\.",
        r"(?i)\.racing\.",
        r"(?i)\.shooter\.",
        r"(?i)\.strategy\.",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Whether a package name looks like a game based on naming conventions.
pub fn looks_like_game(package_name: &str) -> bool {
    GAME_PACKAGE_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(package_name))
}

/// Formats a package name into a readable label.
///
/// Uses the last dot-separated segment, splits camel case and upper-cases the
/// first letter: `com.studio.superGame` becomes `Super Game`.
pub fn format_package_name(package_name: &str) -> String {
    let last = package_name
        .rsplit('.')
        .find(|part| !part.is_empty())
        .unwrap_or(package_name);

    let mut spaced = String::with_capacity(last.len() + 4);
    for ch in last.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }

    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, name: &str, pkg: Option<&str>) -> LibraryGame {
        LibraryGame {
            id: id.to_string(),
            name: name.to_string(),
            package_name: pkg.map(String::from),
        }
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn library_beats_catalog() {
        let library = vec![game("1", "My Game", Some("com.mojang.minecraftpe"))];
        let merged = resolve(&BTreeMap::new(), &library);
        assert_eq!(merged.get("com.mojang.minecraftpe"), Some("My Game"));
        assert_eq!(
            merged.resolved("com.mojang.minecraftpe").unwrap().layer,
            MappingLayer::Library
        );
    }

    #[test]
    fn full_precedence_order_holds() {
        let pkg = "com.example.contested";
        let sources = MappingSources {
            library: vec![],
            custom: map(&[(pkg, "Custom")]),
            community: map(&[(pkg, "Community"), ("com.example.other", "Community Other")]),
            learned: map(&[(pkg, "Learned"), ("com.example.other", "Learned Other")]),
        };
        let merged = sources.resolve();
        assert_eq!(merged.get(pkg), Some("Custom"));
        assert_eq!(merged.get("com.example.other"), Some("Community Other"));
    }

    #[test]
    fn merge_ignores_argument_order() {
        let low = map(&[("pkg", "low")]);
        let high = map(&[("pkg", "high")]);
        let merged = merge_with_precedence([
            (MappingLayer::Library, &high),
            (MappingLayer::BuiltIn, &low),
        ]);
        assert_eq!(merged.get("pkg"), Some("high"));
    }

    #[test]
    fn merge_leaves_inputs_untouched() {
        let custom = map(&[("com.roblox.client", "Blocks")]);
        let before = custom.clone();
        let _ = resolve(&custom, &[]);
        assert_eq!(custom, before);
    }

    #[test]
    fn blank_library_packages_are_skipped() {
        let library = vec![game("1", "Nameless", Some("  ")), game("2", "Unset", None)];
        assert!(library_mappings(&library).is_empty());
    }

    #[test]
    fn derived_lookups_use_merged_map() {
        let sources = MappingSources::from_user(map(&[("com.example.mine", "Mine")]), vec![]);
        assert!(sources.is_known_game("com.example.mine"));
        assert!(sources.is_known_game("com.roblox.client"));
        assert!(!sources.is_known_game("com.android.chrome"));
        assert_eq!(sources.game_name("com.example.mine").as_deref(), Some("Mine"));
    }

    #[test]
    fn inverse_lookup_scans_library_first() {
        let sources = MappingSources::from_user(
            map(&[("com.custom.minecraft", "Minecraft")]),
            vec![game("1", "minecraft", Some("com.library.minecraft"))],
        );
        assert_eq!(
            sources.find_package_by_game_name("MINECRAFT").as_deref(),
            Some("com.library.minecraft")
        );
    }

    #[test]
    fn inverse_lookup_falls_back_to_custom_then_catalog() {
        let sources =
            MappingSources::from_user(map(&[("com.custom.minecraft", "Minecraft")]), vec![]);
        assert_eq!(
            sources.find_package_by_game_name("minecraft").as_deref(),
            Some("com.custom.minecraft")
        );

        let empty = MappingSources::default();
        assert_eq!(
            empty.find_package_by_game_name("Roblox").as_deref(),
            Some("com.roblox.client")
        );
        assert_eq!(empty.find_package_by_game_name("Unknown Title"), None);
    }

    #[test]
    fn game_like_patterns() {
        assert!(looks_like_game("com.studio.games.tapper"));
        assert!(looks_like_game("game.fun.runner"));
        assert!(looks_like_game("com.acme.RPG.quest"));
        assert!(!looks_like_game("com.android.chrome"));
        assert!(!looks_like_game("com.gamestop.app"));
    }

    #[test]
    fn package_names_format_readably() {
        assert_eq!(format_package_name("com.company.gamename"), "Gamename");
        assert_eq!(format_package_name("com.studio.superGame"), "Super Game");
        assert_eq!(format_package_name("com.studio.SuperGame"), "Super Game");
        assert_eq!(format_package_name("standalone"), "Standalone");
    }
}
