//! Keyword-based club categorization, used when importing clubs

/// Label assigned when no keyword matches
pub const OTHER: &str = "Other";

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Academic",
        &[
            "coding", "programming", "computer", "science", "engineering", "math", "physics",
            "chemistry", "biology", "business", "economics", "research", "debate",
            "case competition", "consulting", "entrepreneurship", "startup", "analytics", "data",
            "statistics",
        ],
    ),
    (
        "Music",
        &[
            "music", "band", "orchestra", "jazz", "choir", "singing", "instrument", "performance",
            "musician", "acoustic", "electric", "vocal", "symphony", "rock", "pop", "classical",
        ],
    ),
    (
        "Sports",
        &[
            "sports", "soccer", "basketball", "football", "tennis", "baseball", "volleyball",
            "lacrosse", "crew", "rowing", "swimming", "rugby", "frisbee", "ultimate", "athletic",
            "fitness", "yoga", "martial arts", "track", "wrestling", "golf", "climbing",
        ],
    ),
    (
        "Arts",
        &[
            "art", "drawing", "painting", "sculpture", "design", "photography", "film", "theater",
            "drama", "dance", "visual", "creative", "animation", "graphic", "crafts", "pottery",
            "performance",
        ],
    ),
    (
        "Cultural",
        &[
            "cultural", "international", "language", "spanish", "chinese", "arabic", "french",
            "german", "korean", "japanese", "indian", "african", "heritage", "community",
            "ethnic", "diaspora", "asia", "latin", "caribbean",
        ],
    ),
    (
        "Social",
        &[
            "social", "community service", "volunteering", "volunteer", "charity",
            "social justice", "activism", "environment", "sustainability", "outreach",
            "mentoring", "support group", "network", "professional",
        ],
    ),
    (
        "Recreation",
        &[
            "outdoor", "adventure", "hiking", "camping", "climbing", "kayaking", "board games",
            "tabletop", "gaming", "rpg", "recreation", "hobby", "travel", "exploration", "nature",
        ],
    ),
    (
        "Greek Life",
        &[
            "fraternity", "sorority", "greek", "frat", "brotherhood", "sisterhood", "pledge",
            "greek life",
        ],
    ),
];

/// Pick the label whose keywords occur most often (as substrings) in the
/// club's name and description. Ties go to the earlier label.
pub fn categorize(name: &str, description: &str) -> &'static str {
    let text = format!("{name} {description}").to_lowercase();
    let mut best = (OTHER, 0usize);
    for (label, keywords) in CATEGORY_KEYWORDS {
        let score = keywords.iter().filter(|k| text.contains(*k)).count();
        if score > best.1 {
            best = (*label, score);
        }
    }
    best.0
}

/// Every label `categorize` can return
pub fn category_list() -> Vec<&'static str> {
    CATEGORY_KEYWORDS
        .iter()
        .map(|(label, _)| *label)
        .chain(std::iter::once(OTHER))
        .collect()
}
