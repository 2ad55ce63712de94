//! Verdicts derived from a resolved forecast sample.
//!
//! Item names and condition synonyms are the French vocabulary the dialogue
//! platform emits for its slots.

use std::fmt;

use crate::model::ForecastSample;

/// Index of the sample 24 hours out, assuming 3-hour spacing.
pub const NEXT_DAY_INDEX: usize = 8;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// OpenWeatherMap condition families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionGroup {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Fog,
    Clear,
    Clouds,
}

impl ConditionGroup {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            200..=299 => Some(Self::Thunderstorm),
            300..=399 => Some(Self::Drizzle),
            500..=599 => Some(Self::Rain),
            600..=699 => Some(Self::Snow),
            700..=799 => Some(Self::Fog),
            800 => Some(Self::Clear),
            801..=804 => Some(Self::Clouds),
            _ => None,
        }
    }

    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Thunderstorm => &["orage", "orages", "orageux", "tonnerre", "éclairs", "foudre", "mauvais temps"],
            Self::Drizzle => &["bruine", "crachin", "pluie fine", "pluie", "humide"],
            Self::Rain => &["pluie", "pluvieux", "averse", "averses", "pleuvoir", "humide", "mauvais temps"],
            Self::Snow => &["neige", "neiger", "neigeux", "flocons", "grésil"],
            Self::Fog => &["brouillard", "brume", "brumeux"],
            Self::Clear => &["soleil", "ensoleillé", "beau temps", "ciel dégagé", "dégagé"],
            Self::Clouds => &["nuages", "nuageux", "couvert", "gris"],
        }
    }
}

/// Whether `phrase` names a condition present in the sample.
pub fn confirms_condition(sample: &ForecastSample, phrase: &str) -> bool {
    let phrase = phrase.trim().to_lowercase();
    sample
        .condition_codes()
        .filter_map(ConditionGroup::from_code)
        .any(|group| group.synonyms().contains(&phrase.as_str()))
}

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureTrend {
    CoolingSignificant,
    CoolingSlight,
    Stable,
    WarmingSlight,
    WarmingSignificant,
}

impl TemperatureTrend {
    /// Classify `delta` = target minus baseline, in Kelvin (or Celsius).
    pub fn classify(delta: f64) -> Self {
        if delta < -5.0 {
            Self::CoolingSignificant
        } else if delta < 0.0 {
            Self::CoolingSlight
        } else if delta > 5.0 {
            Self::WarmingSignificant
        } else if delta > 0.0 {
            Self::WarmingSlight
        } else {
            Self::Stable
        }
    }

    pub fn between(baseline: &ForecastSample, target: &ForecastSample) -> Self {
        Self::classify(target.temperature - baseline.temperature)
    }
}

/// Sample compared against the first one: the resolved slot, or the next day
/// when the question is about now.
pub fn trend_target(samples: &[ForecastSample], slot: usize) -> Option<&ForecastSample> {
    if slot != 0 {
        samples.get(slot)
    } else {
        samples.get(NEXT_DAY_INDEX)
    }
}

pub fn temperature_trend(samples: &[ForecastSample], slot: usize) -> Option<TemperatureTrend> {
    let baseline = samples.first()?;
    let target = trend_target(samples, slot)?;
    Some(TemperatureTrend::between(baseline, target))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureQuestion {
    Cooler,
    Warmer,
    Hot,
    Cold,
}

impl TemperatureQuestion {
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        match phrase.trim().to_lowercase().as_str() {
            "refroidir" | "plus froid" | "plus frais" => Some(Self::Cooler),
            "réchauffer" | "plus chaud" => Some(Self::Warmer),
            "estivale" | "bouillant" | "lourd" | "étouffant" | "chaud" => Some(Self::Hot),
            "froid de canard" | "frisquet" | "frais" | "froid" | "glacial" => Some(Self::Cold),
            _ => None,
        }
    }
}

const HOT_ABOVE_C: f64 = 28.0;
const COLD_BELOW_C: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureVerdict {
    SlightlyCooler,
    MuchCooler,
    NotCooler,
    SlightlyWarmer,
    MuchWarmer,
    NotWarmer,
    Summery,
    Chilly,
    Comfortable,
}

/// Answer a temperature question about the resolved slot.
///
/// `None` when a trend is needed but the bundle is too short to compute it.
pub fn answer_temperature_question(
    question: TemperatureQuestion,
    samples: &[ForecastSample],
    slot: usize,
) -> Option<TemperatureVerdict> {
    let verdict = match question {
        TemperatureQuestion::Cooler => match temperature_trend(samples, slot)? {
            TemperatureTrend::CoolingSlight => TemperatureVerdict::SlightlyCooler,
            TemperatureTrend::CoolingSignificant => TemperatureVerdict::MuchCooler,
            _ => TemperatureVerdict::NotCooler,
        },
        TemperatureQuestion::Warmer => match temperature_trend(samples, slot)? {
            TemperatureTrend::WarmingSlight => TemperatureVerdict::SlightlyWarmer,
            TemperatureTrend::WarmingSignificant => TemperatureVerdict::MuchWarmer,
            _ => TemperatureVerdict::NotWarmer,
        },
        TemperatureQuestion::Hot => {
            if samples.get(slot)?.temperature_celsius() > HOT_ABOVE_C {
                TemperatureVerdict::Summery
            } else {
                TemperatureVerdict::Comfortable
            }
        }
        TemperatureQuestion::Cold => {
            if samples.get(slot)?.temperature_celsius() < COLD_BELOW_C {
                TemperatureVerdict::Chilly
            } else {
                TemperatureVerdict::Comfortable
            }
        }
    };
    Some(verdict)
}

impl fmt::Display for TemperatureVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SlightlyCooler => "So yes, it will be a little cooler",
            Self::MuchCooler => "So yes, it will be much cooler",
            Self::NotCooler => "So no, it is going to warm up",
            Self::SlightlyWarmer => "So yes, it will be a little warmer",
            Self::MuchWarmer => "So yes, it will be much warmer",
            Self::NotWarmer => "So no, it is going to cool down",
            Self::Summery => "Indeed, it looks like summer weather",
            Self::Chilly => "Indeed, it looks rather cold",
            Self::Comfortable => "It should be fine",
        })
    }
}

// ---------------------------------------------------------------------------
// Clothing
// ---------------------------------------------------------------------------

const SUN_GEAR: &[&str] = &[
    "éventail", "chapeau", "couvre-chef", "casquette", "turban", "chapeau chinois",
    "robe sans manche", "créme bronzante", "crème bronzante", "crème solaire", "short", "jupe",
    "nuds-pieds", "nu-pieds", "espadrilles", "tongues", "tongs", "lunettes de soleil", "ombrelle",
    "chapeau de paille", "vêtements légers",
];

/// Sun gear that is worth it on hot days even without sunshine.
const LIGHT_CLOTHING: &[&str] = &[
    "éventail", "robe sans manche", "short", "jupe", "nuds-pieds", "nu-pieds", "espadrilles",
    "tongues", "tongs", "vêtements légers",
];

const COLD_GEAR: &[&str] = &[
    "bonneterie", "écharpe", "bonnet", "cagoule", "bottes fourrées", "manteau", "pull",
    "doudoune", "gros pull", "bas de laine", "chaussettes de laine", "chaussettes en laine",
    "chaussettes chaudes", "pull chaud", "mouffles", "moufles",
];

const RAIN_GEAR: &[&str] = &["parapluie", "capuche", "imperméable", "imper", "k way"];

const UMBRELLA: &str = "parapluie";

const SUNNY_CODES: &[i32] = &[800, 801];

const RAIN_CODES: &[i32] = &[
    300, 301, 302, 310, 311, 312, 313, 314, 321, 500, 501, 502, 503, 504, 511, 520, 521, 522, 531,
    615, 616,
];

const STORM_CODES: &[i32] = &[200, 201, 202, 210, 211, 212, 221, 230, 231, 232];

const HOT_CLOTHING_ABOVE_C: f64 = 25.0;
const COLD_GEAR_BELOW_C: f64 = 8.0;
const CHILLY_BELOW_C: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    SunGear,
    ColdGear,
    RainGear,
}

impl ItemCategory {
    pub fn of(item: &str) -> Option<Self> {
        let item = item.trim().to_lowercase();
        let item = item.as_str();
        if SUN_GEAR.contains(&item) {
            Some(Self::SunGear)
        } else if COLD_GEAR.contains(&item) {
            Some(Self::ColdGear)
        } else if RAIN_GEAR.contains(&item) {
            Some(Self::RainGear)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClothingAdvice {
    SunExpected,
    HotEnough,
    NotStifling,
    NotEssential,
    ColdExpected,
    ChillyPossible,
    NoColdGearNeeded,
    RainLikely,
    StormTakeCover,
    StormAvoidUmbrella,
    NoBadWeather,
    UnknownItem,
}

/// Is `item` worth taking given the resolved sample?
pub fn clothing_advice(item: &str, sample: &ForecastSample) -> ClothingAdvice {
    let normalized = item.trim().to_lowercase();
    let code = sample.primary_condition().map(|c| c.code);
    let celsius = sample.temperature_celsius();

    match ItemCategory::of(&normalized) {
        Some(ItemCategory::SunGear) => {
            if code.is_some_and(|c| SUNNY_CODES.contains(&c)) {
                ClothingAdvice::SunExpected
            } else if LIGHT_CLOTHING.contains(&normalized.as_str()) {
                if celsius > HOT_CLOTHING_ABOVE_C {
                    ClothingAdvice::HotEnough
                } else {
                    ClothingAdvice::NotStifling
                }
            } else {
                ClothingAdvice::NotEssential
            }
        }
        Some(ItemCategory::ColdGear) => {
            if celsius < COLD_GEAR_BELOW_C {
                ClothingAdvice::ColdExpected
            } else if celsius < CHILLY_BELOW_C {
                ClothingAdvice::ChillyPossible
            } else {
                ClothingAdvice::NoColdGearNeeded
            }
        }
        Some(ItemCategory::RainGear) => match code {
            Some(c) if RAIN_CODES.contains(&c) => ClothingAdvice::RainLikely,
            Some(c) if STORM_CODES.contains(&c) => {
                if normalized == UMBRELLA {
                    ClothingAdvice::StormAvoidUmbrella
                } else {
                    ClothingAdvice::StormTakeCover
                }
            }
            _ => ClothingAdvice::NoBadWeather,
        },
        None => ClothingAdvice::UnknownItem,
    }
}

impl fmt::Display for ClothingAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SunExpected => "It may be useful, sunshine is expected",
            Self::HotEnough => "It is going to be hot, it may be useful",
            Self::NotStifling => "It will not be stifling either, up to you",
            Self::NotEssential => "It does not look essential",
            Self::ColdExpected => "Temperatures expected low, prepare accordingly",
            Self::ChillyPossible => "It will not be terribly cold, but you never know",
            Self::NoColdGearNeeded => "The full cold-weather kit does not seem necessary",
            Self::RainLikely => "Rain is likely, it may be worth taking along",
            Self::StormTakeCover => "Watch out, a storm is expected. Take something to cover up",
            Self::StormAvoidUmbrella => "An umbrella in a thunderstorm is not really advisable",
            Self::NoBadWeather => "Probably not, no bad weather expected",
            Self::UnknownItem => "I don't know what you are talking about",
        })
    }
}
