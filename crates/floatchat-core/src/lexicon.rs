//! Static term lists backing the admission filter.

pub const UNSAFE_TERMS: &[&str] = &[
    "violence", "kill", "sex", "porn", "nude", "weapon", "bomb", "hack", "drugs", "terror",
    "racist", "suicide", "murder", "abuse", "crime", "politics",
];

pub const ALLOWED_TOPICS: &[&str] = &[
    "biosphere",
    "hi",
    "ecosystem",
    "say my name",
    "ecology",
    "environment",
    "nature",
    "wildlife",
    "biodiversity",
    "conservation",
    "sustainability",
    "habitat",
    "species",
    "natural resources",
    "carbon footprint",
    "renewable energy",
    "greenhouse gases",
    "climate",
    "climate change",
    "global warming",
    "environmental protection",
    "deforestation",
    "reforestation",
    "ecosystem balance",
    "ecological footprint",
    "adaptation",
    "resilience",
    "pollution",
    "carbon cycle",
    "nitrogen cycle",
    "oxygen cycle",
    "biogeochemical",
    "biome",
    "ocean",
    "sea",
    "marine",
    "saltwater",
    "oceanography",
    "marine biology",
    "deep sea",
    "coral",
    "coral reef",
    "reefs",
    "marine ecosystem",
    "marine conservation",
    "marine pollution",
    "plastic pollution",
    "microplastics",
    "fish",
    "fisheries",
    "sea life",
    "marine mammals",
    "whale",
    "dolphin",
    "shark",
    "seal",
    "sea turtle",
    "crustacean",
    "plankton",
    "algae",
    "kelp",
    "seaweed",
    "mangrove",
    "estuary",
    "tides",
    "currents",
    "wave",
    "ocean current",
    "upwelling",
    "marine biodiversity",
    "marine habitat",
    "coral bleaching",
    "water",
    "freshwater",
    "hydrosphere",
    "aquatic",
    "wetlands",
    "river",
    "lake",
    "pond",
    "stream",
    "groundwater",
    "watershed",
    "hydrology",
    "water pollution",
    "water cycle",
    "precipitation",
    "evaporation",
    "runoff",
    "ice caps",
    "glaciers",
    "sea level rise",
    "recycling",
    "sustainable development",
    "renewable",
    "solar energy",
    "wind energy",
    "geothermal",
    "carbon emissions",
    "environmental impact",
    "ocean cleanup",
    "marine debris",
    "coastal erosion",
    "acidification",
    "environmental awareness",
    "ocean acidification",
    "ecotourism",
    "marine sanctuary",
    "climate action",
    "blue economy",
    "green energy",
    "temperature",
    "weather",
    "atmosphere",
    "earth system",
    "biosciences",
    "ecotoxicology",
    "environmental science",
    "geoscience",
    "carbon sink",
    "photosynthesis",
    "phytoplankton",
    "zooplankton",
    "nutrient cycle",
    "sediment",
    "coastal ecosystem",
    "marine reserve",
    "ocean floor",
    "hydrothermal vent",
    "marine geology",
    "seamount",
    "polar regions",
    "antarctica",
    "arctic",
    "marine adaptation",
    "migration",
    "climate data",
];

/// Owned, normalized copy of the blocklist and the topic allowlist.
///
/// The two lists are not required to be disjoint; the filter always
/// consults the blocklist first.
#[derive(Debug, Clone)]
pub struct Lexicon {
    unsafe_terms: Vec<String>,
    allowed_topics: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(UNSAFE_TERMS.iter().copied(), ALLOWED_TOPICS.iter().copied())
    }
}

impl Lexicon {
    /// Terms are trimmed and lowercased; blank entries are dropped so the
    /// empty string can never match every message.
    pub fn new<U, A>(unsafe_terms: U, allowed_topics: A) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        Self {
            unsafe_terms: normalize_terms(unsafe_terms),
            allowed_topics: normalize_terms(allowed_topics),
        }
    }

    pub fn unsafe_terms(&self) -> &[String] {
        &self.unsafe_terms
    }

    pub fn allowed_topics(&self) -> &[String] {
        &self.allowed_topics
    }
}

fn normalize_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    terms
        .into_iter()
        .map(|term| term.as_ref().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}
