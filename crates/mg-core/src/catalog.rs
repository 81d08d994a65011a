//! Built-in package catalog, the lowest-precedence mapping layer.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Well-known Android game packages.
const BUILT_IN_PACKAGES: &[(&str, &str)] = &[
    ("com.mojang.minecraftpe", "Minecraft"),
    ("com.roblox.client", "Roblox"),
    ("com.supercell.clashofclans", "Clash of Clans"),
    ("com.supercell.clashroyale", "Clash Royale"),
    ("com.supercell.brawlstars", "Brawl Stars"),
    ("com.supercell.hayday", "Hay Day"),
    ("com.king.candycrushsaga", "Candy Crush Saga"),
    ("com.king.candycrushsodasaga", "Candy Crush Soda Saga"),
    ("com.tencent.ig", "PUBG Mobile"),
    ("com.activision.callofduty.shooter", "Call of Duty: Mobile"),
    ("com.miHoYo.GenshinImpact", "Genshin Impact"),
    ("com.HoYoverse.hkrpgoversea", "Honkai: Star Rail"),
    ("com.dts.freefireth", "Free Fire"),
    ("com.innersloth.spacemafia", "Among Us"),
    ("com.kiloo.subwaysurf", "Subway Surfers"),
    ("com.imangi.templerun2", "Temple Run 2"),
    ("com.nianticlabs.pokemongo", "Pokémon GO"),
    ("jp.pokemon.pokemonunite", "Pokémon UNITE"),
    ("com.mobile.legends", "Mobile Legends: Bang Bang"),
    ("com.ea.gp.fifamobile", "EA SPORTS FC Mobile"),
    ("com.ea.game.pvzfree_row", "Plants vs. Zombies"),
    ("com.halfbrick.fruitninjafree", "Fruit Ninja"),
    ("com.rovio.baba", "Angry Birds 2"),
    ("com.playrix.homescapes", "Homescapes"),
    ("com.playrix.gardenscapes", "Gardenscapes"),
    ("com.miniclip.eightballpool", "8 Ball Pool"),
    ("com.epicgames.fortnite", "Fortnite"),
    ("com.riotgames.league.wildrift", "League of Legends: Wild Rift"),
    ("com.scopely.monopolygo", "Monopoly GO!"),
    ("com.moonactive.coinmaster", "Coin Master"),
    ("com.ludo.king", "Ludo King"),
    ("com.gameloft.android.ANMP.GloftA9HM", "Asphalt 9: Legends"),
    ("com.nintendo.zaka", "Mario Kart Tour"),
    ("com.nintendo.zara", "Super Mario Run"),
    ("com.robtopx.geometryjumplite", "Geometry Dash Lite"),
    ("com.kitkagames.fallbuddies", "Stumble Guys"),
    ("com.igg.android.lordsmobile", "Lords Mobile"),
    ("com.lilithgame.roc.gp", "Rise of Kingdoms"),
    ("com.plarium.raidlegends", "RAID: Shadow Legends"),
    ("com.bandainamcoent.dblegends_ww", "Dragon Ball Legends"),
    ("com.YoStarEN.Arknights", "Arknights"),
    ("com.dreamgames.royalmatch", "Royal Match"),
    ("com.outfit7.mytalkingtom2", "My Talking Tom 2"),
];

static CATALOG: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    BUILT_IN_PACKAGES
        .iter()
        .map(|(pkg, name)| ((*pkg).to_string(), (*name).to_string()))
        .collect()
});

/// Returns the built-in catalog as a package → game name map.
pub fn built_in_catalog() -> &'static BTreeMap<String, String> {
    &CATALOG
}

/// Catalog entries in declaration order, for inverse lookups.
pub(crate) fn catalog_entries() -> impl Iterator<Item = (&'static str, &'static str)> {
    BUILT_IN_PACKAGES.iter().copied()
}
