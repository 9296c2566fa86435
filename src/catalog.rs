use serde::Serialize;

use crate::{AssetError, Result};

/// A named visual effect from the Pixverse V5 catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Effect {
    /// Stable slug used for file names
    pub id: &'static str,
    /// Display name, also the value the API expects in the `effect` field
    pub name: &'static str,
}

impl Effect {
    pub const fn new(id: &'static str, name: &'static str) -> Self {
        Self { id, name }
    }
}

/// All Pixverse V5 effects, in generation order
pub const CATALOG: &[Effect] = &[
    Effect::new("kiss-me-ai", "Kiss Me AI"),
    Effect::new("muscle-surge", "Muscle Surge"),
    Effect::new("hulk", "Hulk"),
    Effect::new("venom", "Venom"),
    Effect::new("squid-game", "Squid Game"),
    Effect::new("robot", "Robot"),
    Effect::new("the-tiger-touch", "The Tiger Touch"),
    Effect::new("hug", "Hug"),
    Effect::new("holy-wings", "Holy Wings"),
    Effect::new("microwave", "Microwave"),
    Effect::new("zombie-mode", "Zombie Mode"),
    Effect::new("baby-face", "Baby Face"),
    Effect::new("black-myth-wukong", "Black Myth: Wukong"),
    Effect::new("long-hair-magic", "Long Hair Magic"),
    Effect::new("leggy-run", "Leggy Run"),
    Effect::new("fin-tastic-mermaid", "Fin-tastic Mermaid"),
    Effect::new("punch-face", "Punch Face"),
    Effect::new("creepy-devil-smile", "Creepy Devil Smile"),
    Effect::new("thunder-god", "Thunder God"),
    Effect::new("eye-zoom-challenge", "Eye Zoom Challenge"),
    Effect::new("whos-arrested", "Who's Arrested?"),
    Effect::new("baby-arrived", "Baby Arrived"),
    Effect::new("werewolf-rage", "Werewolf Rage"),
    Effect::new("bald-swipe", "Bald Swipe"),
    Effect::new("boom-drop", "BOOM DROP"),
    Effect::new("huge-cutie", "Huge Cutie"),
    Effect::new("liquid-metal", "Liquid Metal"),
    Effect::new("sharksnap", "Sharksnap!"),
    Effect::new("dust-me-away", "Dust Me Away"),
    Effect::new("warmth-of-jesus", "Warmth of Jesus"),
    Effect::new("anything", "Anything"),
];

/// Look up a catalog effect by its slug
pub fn find(id: &str) -> Option<Effect> {
    CATALOG.iter().copied().find(|effect| effect.id == id)
}

/// Select a subset of the catalog by slug.
///
/// The result keeps catalog order regardless of the order of `ids`, and duplicates
/// collapse. An empty `ids` slice selects the whole catalog.
pub fn select(ids: &[String]) -> Result<Vec<Effect>> {
    if ids.is_empty() {
        return Ok(CATALOG.to_vec());
    }

    let unknown: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| find(id).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(AssetError::Config(format!(
            "Unknown effect id(s): {}",
            unknown.join(", ")
        )));
    }

    Ok(CATALOG
        .iter()
        .copied()
        .filter(|effect| ids.iter().any(|id| id == effect.id))
        .collect())
}
