use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::creature::{BaseStats, Creature, DamageClass, MegaForm, Move};
use crate::types::{ElementType, UnknownType};

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
const MAX_MOVES: usize = 4;
const MEGA_SUFFIXES: [&str; 3] = ["-mega-x", "-mega", "-primal"];

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {what}: {reason}")]
    Invalid { what: String, reason: String },
    #[error("fetch task died: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::Invalid {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    /// Language codes tried in order for display names.
    pub languages: Vec<String>,
    pub cache: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            languages: vec!["en".to_string()],
            cache: true,
        }
    }
}

static CONFIG: OnceLock<ApiConfig> = OnceLock::new();

/// Installs the client settings. Only the first call has any effect.
pub fn configure(config: ApiConfig) {
    if CONFIG.set(config).is_err() {
        log::warn!("api already configured, keeping the first settings");
    }
}

fn config() -> &'static ApiConfig {
    CONFIG.get_or_init(ApiConfig::default)
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    types: Vec<TypeSlot>,
    stats: Vec<StatSlot>,
    #[serde(default)]
    moves: Vec<MoveSlot>,
    species: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct TypeSlot {
    slot: u8,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct StatSlot {
    base_stat: u16,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct MoveSlot {
    #[serde(rename = "move")]
    resource: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct SpeciesResponse {
    #[serde(default)]
    names: Vec<LocalizedName>,
    #[serde(default)]
    varieties: Vec<Variety>,
}

#[derive(Clone, Debug, Deserialize)]
struct LocalizedName {
    name: String,
    language: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct Variety {
    pokemon: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct MoveResponse {
    name: String,
    power: Option<u16>,
    accuracy: Option<u8>,
    pp: Option<u8>,
    #[serde(default)]
    priority: i8,
    #[serde(rename = "type")]
    kind: NamedResource,
    damage_class: NamedResource,
    #[serde(default)]
    names: Vec<LocalizedName>,
}

/// Fetches every id concurrently. The result keeps the order of `ids`.
pub async fn fetch_team(ids: Vec<u32>, move_seed: u64) -> Result<Vec<Creature>, ApiError> {
    let handles: Vec<_> = ids
        .into_iter()
        .enumerate()
        .map(|(slot, id)| {
            let rng = StdRng::seed_from_u64(move_seed.wrapping_add(slot as u64));
            tokio::spawn(fetch_creature(id, rng))
        })
        .collect();

    let mut team = Vec::with_capacity(handles.len());
    for handle in handles {
        team.push(handle.await??);
    }
    Ok(team)
}

pub async fn fetch_creature(id: u32, mut rng: StdRng) -> Result<Creature, ApiError> {
    let settings = config();
    let url = format!("{}/pokemon/{id}", settings.base_url);
    let mut pokemon: PokemonResponse = fetch_json_cached(&url).await?;
    let species: SpeciesResponse = fetch_json_cached(&pokemon.species.url).await?;

    let mut pool = std::mem::take(&mut pokemon.moves);
    pool.shuffle(&mut rng);
    let mut moves = Vec::with_capacity(MAX_MOVES);
    for slot in pool {
        if moves.len() >= MAX_MOVES {
            break;
        }
        match fetch_move(&slot.resource.url).await {
            Ok(Some(mv)) => moves.push(mv),
            Ok(None) => {}
            Err(err) => log::debug!("skipping move {}: {err}", slot.resource.name),
        }
    }

    build_creature(pokemon, &species, moves, &settings.languages)
}

/// `None` for moves without a damage value.
pub async fn fetch_move(url: &str) -> Result<Option<Move>, ApiError> {
    let response: MoveResponse = fetch_json_cached(url).await?;
    convert_move(response, &config().languages)
}

pub async fn fetch_mega_form(mega_id: u32) -> Result<MegaForm, ApiError> {
    let url = format!("{}/pokemon/{mega_id}", config().base_url);
    let pokemon: PokemonResponse = fetch_json_cached(&url).await?;
    Ok(MegaForm {
        id: pokemon.id,
        types: element_types(&pokemon.name, &pokemon.types)?,
        stats: base_stats(&pokemon.name, &pokemon.stats)?,
    })
}

fn build_creature(
    pokemon: PokemonResponse,
    species: &SpeciesResponse,
    moves: Vec<Move>,
    languages: &[String],
) -> Result<Creature, ApiError> {
    let types = element_types(&pokemon.name, &pokemon.types)?;
    let stats = base_stats(&pokemon.name, &pokemon.stats)?;
    let name = localized_name(&species.names, languages)
        .unwrap_or_else(|| title_case(&pokemon.name));
    let mega_id = mega_variety(&species.varieties);
    Ok(Creature::new(pokemon.id, name, types, stats, moves).with_mega(mega_id))
}

fn convert_move(response: MoveResponse, languages: &[String]) -> Result<Option<Move>, ApiError> {
    let Some(power) = response.power else {
        return Ok(None);
    };
    let element: ElementType = response
        .kind
        .name
        .parse()
        .map_err(|err: UnknownType| ApiError::invalid(&response.name, err.to_string()))?;
    let damage_class: DamageClass = response
        .damage_class
        .name
        .parse()
        .map_err(|reason: String| ApiError::invalid(&response.name, reason))?;
    let pp = response.pp.unwrap_or(0);
    let name = localized_name(&response.names, languages)
        .unwrap_or_else(|| title_case(&response.name));
    Ok(Some(Move {
        name,
        power,
        accuracy: response.accuracy.unwrap_or(100),
        element,
        pp,
        max_pp: pp,
        priority: response.priority,
        damage_class,
    }))
}

fn base_stats(what: &str, slots: &[StatSlot]) -> Result<BaseStats, ApiError> {
    let stat = |name: &str| -> Result<u16, ApiError> {
        slots
            .iter()
            .find(|slot| slot.stat.name == name)
            .map(|slot| slot.base_stat)
            .ok_or_else(|| ApiError::invalid(what, format!("missing stat `{name}`")))
    };
    Ok(BaseStats {
        hp: stat("hp")?,
        attack: stat("attack")?,
        defense: stat("defense")?,
        sp_attack: stat("special-attack")?,
        sp_defense: stat("special-defense")?,
        speed: stat("speed")?,
    })
}

fn element_types(what: &str, slots: &[TypeSlot]) -> Result<Vec<ElementType>, ApiError> {
    let mut slots: Vec<&TypeSlot> = slots.iter().collect();
    slots.sort_by_key(|slot| slot.slot);
    let types = slots
        .into_iter()
        .map(|slot| slot.kind.name.parse::<ElementType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ApiError::invalid(what, err.to_string()))?;
    if types.is_empty() {
        return Err(ApiError::invalid(what, "no types"));
    }
    Ok(types)
}

fn localized_name(names: &[LocalizedName], languages: &[String]) -> Option<String> {
    languages.iter().find_map(|language| {
        names
            .iter()
            .find(|entry| &entry.language.name == language)
            .map(|entry| entry.name.clone())
    })
}

fn mega_variety(varieties: &[Variety]) -> Option<u32> {
    varieties
        .iter()
        .find(|variety| {
            MEGA_SUFFIXES
                .iter()
                .any(|suffix| variety.pokemon.name.ends_with(suffix))
        })
        .and_then(|variety| id_from_url(&variety.pokemon.url))
}

fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn title_case(api_name: &str) -> String {
    api_name
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

async fn fetch_json_cached<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, ApiError> {
    let bytes = fetch_bytes_cached(url).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(source) => {
            let cache_path = cache_path("http", url);
            let _ = fs::remove_file(&cache_path).await;
            Err(ApiError::Decode {
                url: url.to_string(),
                source,
            })
        }
    }
}

async fn fetch_bytes_cached(url: &str) -> Result<Vec<u8>, ApiError> {
    let use_cache = config().cache;
    let cache_path = cache_path("http", url);
    if use_cache {
        if let Some(bytes) = read_cache(&cache_path).await {
            return Ok(bytes);
        }
    }

    let request_error = |source| ApiError::Request {
        url: url.to_string(),
        source,
    };
    let response = http_client()
        .get(url)
        .send()
        .await
        .map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_string(),
            status,
        });
    }
    let bytes = response.bytes().await.map_err(request_error)?.to_vec();
    if use_cache {
        write_cache(&cache_path, &bytes).await;
    }
    Ok(bytes)
}

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

fn cache_root() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("megabattle")
}

fn cache_path(kind: &str, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    cache_root().join(kind).join(digest)
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).await.ok()
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    if let Err(err) = fs::write(path, bytes).await {
        log::debug!("cache write to {} failed: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stats_json(values: [u16; 6]) -> serde_json::Value {
        let names = [
            "hp",
            "attack",
            "defense",
            "special-attack",
            "special-defense",
            "speed",
        ];
        json!(names
            .iter()
            .zip(values)
            .map(|(name, value)| json!({"base_stat": value, "stat": {"name": name}}))
            .collect::<Vec<_>>())
    }

    fn charizard() -> PokemonResponse {
        serde_json::from_value(json!({
            "id": 6,
            "name": "charizard",
            "types": [
                {"slot": 2, "type": {"name": "flying", "url": ""}},
                {"slot": 1, "type": {"name": "fire", "url": ""}}
            ],
            "stats": stats_json([78, 84, 78, 109, 85, 100]),
            "moves": [{"move": {"name": "ember", "url": "https://pokeapi.co/api/v2/move/52/"}}],
            "species": {"name": "charizard", "url": "https://pokeapi.co/api/v2/pokemon-species/6/"}
        }))
        .unwrap()
    }

    fn species() -> SpeciesResponse {
        serde_json::from_value(json!({
            "names": [
                {"name": "リザードン", "language": {"name": "ja"}},
                {"name": "噴火龍", "language": {"name": "zh-Hant"}},
                {"name": "Charizard", "language": {"name": "en"}}
            ],
            "varieties": [
                {"is_default": true, "pokemon": {"name": "charizard", "url": "https://pokeapi.co/api/v2/pokemon/6/"}},
                {"is_default": false, "pokemon": {"name": "charizard-mega-x", "url": "https://pokeapi.co/api/v2/pokemon/10034/"}},
                {"is_default": false, "pokemon": {"name": "charizard-mega-y", "url": "https://pokeapi.co/api/v2/pokemon/10035/"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_build_creature_from_responses() {
        let languages = vec!["zh-Hant".to_string(), "en".to_string()];
        let mon = build_creature(charizard(), &species(), Vec::new(), &languages).unwrap();

        assert_eq!(mon.id, 6);
        assert_eq!(mon.name, "噴火龍");
        assert_eq!(mon.types, vec![ElementType::Fire, ElementType::Flying]);
        assert_eq!(mon.stats.sp_attack, 109);
        assert_eq!(mon.max_hp, 266);
        assert_eq!(mon.mega_id, Some(10034));
        assert_eq!(mon.moves, vec![Move::tackle()]);
    }

    #[test]
    fn test_name_falls_back_to_api_name() {
        let mut species = species();
        species.names.clear();
        let mon = build_creature(charizard(), &species, Vec::new(), &["en".to_string()]).unwrap();
        assert_eq!(mon.name, "Charizard");
        assert_eq!(title_case("mr-mime"), "Mr Mime");
    }

    #[test]
    fn test_missing_stat_is_invalid() {
        let mut pokemon = charizard();
        pokemon.stats.retain(|slot| slot.stat.name != "speed");
        let err = build_creature(pokemon, &species(), Vec::new(), &[]).unwrap_err();
        assert!(matches!(err, ApiError::Invalid { .. }));
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn test_unknown_type_is_invalid() {
        let mut pokemon = charizard();
        pokemon.types[0].kind.name = "shadow".to_string();
        assert!(build_creature(pokemon, &species(), Vec::new(), &[]).is_err());
    }

    #[test]
    fn test_mega_variety_suffixes() {
        let variety = |name: &str, url: &str| Variety {
            pokemon: NamedResource {
                name: name.to_string(),
                url: url.to_string(),
            },
        };
        assert_eq!(
            mega_variety(&[variety("kyogre-primal", "https://pokeapi.co/api/v2/pokemon/10077/")]),
            Some(10077)
        );
        assert_eq!(
            mega_variety(&[variety("venusaur-mega", "https://pokeapi.co/api/v2/pokemon/10033")]),
            Some(10033)
        );
        assert_eq!(
            mega_variety(&[variety("pikachu-rock-star", "https://pokeapi.co/api/v2/pokemon/10080/")]),
            None
        );
    }

    #[test]
    fn test_convert_move() {
        let ember: MoveResponse = serde_json::from_value(json!({
            "name": "ember",
            "power": 40,
            "accuracy": 100,
            "pp": 25,
            "priority": 0,
            "type": {"name": "fire"},
            "damage_class": {"name": "special"},
            "names": [{"name": "Ember", "language": {"name": "en"}}]
        }))
        .unwrap();
        let mv = convert_move(ember, &["en".to_string()]).unwrap().unwrap();
        assert_eq!(mv.name, "Ember");
        assert_eq!(mv.element, ElementType::Fire);
        assert_eq!(mv.damage_class, DamageClass::Special);
        assert_eq!((mv.pp, mv.max_pp), (25, 25));

        let growl: MoveResponse = serde_json::from_value(json!({
            "name": "growl",
            "power": null,
            "accuracy": 100,
            "pp": 40,
            "type": {"name": "normal"},
            "damage_class": {"name": "status"}
        }))
        .unwrap();
        assert_eq!(convert_move(growl, &[]).unwrap(), None);
    }

    #[test]
    fn test_cache_path_is_stable() {
        let a = cache_path("http", "https://pokeapi.co/api/v2/pokemon/6");
        let b = cache_path("http", "https://pokeapi.co/api/v2/pokemon/6");
        let c = cache_path("http", "https://pokeapi.co/api/v2/pokemon/9");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(cache_root().join("http")));
    }
}
