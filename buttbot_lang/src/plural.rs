// Basic English plural folding.
//
// Two consumers: the eligibility filter folds a word to its singular form
// before checking it for the meme token ("butts" must count as containing
// "butt"), and the word mutator pluralizes the meme token when the word it
// replaces was plural ("cats" -> "butts").
//
// Coverage is deliberately small: an irregular table, a handful of
// uncountables, and the common suffix rules. Anything else is treated as
// singular.

/// Irregular (singular, plural) pairs.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
];

/// Words whose singular and plural forms are identical.
const UNCOUNTABLE: &[&str] = &[
    "sheep", "fish", "deer", "series", "species", "news", "moose",
];

/// Fold a word to its singular form, lowercased.
///
/// Words that are already singular (or not recognized as plural) come back
/// unchanged apart from lowercasing.
pub fn singular(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return lower;
    }
    if let Some((one, _)) = IRREGULAR.iter().find(|(_, many)| *many == lower) {
        return (*one).to_string();
    }
    if lower.chars().count() <= 3 {
        return lower;
    }

    if let Some(stem) = lower.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = lower.strip_suffix("ives") {
        return format!("{stem}ife");
    }
    if let Some(stem) = lower.strip_suffix("lves") {
        return format!("{stem}lf");
    }
    for sibilant in ["sses", "shes", "ches", "xes", "zzes"] {
        if lower.ends_with(sibilant) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.ends_with('s')
        && !["ss", "us", "is", "'s"].iter().any(|end| lower.ends_with(end))
    {
        return lower[..lower.len() - 1].to_string();
    }
    lower
}

/// Whether a word looks grammatically plural.
pub fn is_plural(word: &str) -> bool {
    singular(word) != word.to_lowercase()
}

/// Pluralize a word, mirroring its casing: `butt` -> `butts`,
/// `BUTT` -> `BUTTS`, `Party` -> `Parties`.
pub fn plural(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, many)) = IRREGULAR.iter().find(|(one, _)| *one == lower) {
        return match_case(word, many);
    }

    let (keep, suffix) = plural_parts(&lower);
    let stem: String = word.chars().take(keep).collect();
    if crate::is_all_uppercase(word) {
        format!("{stem}{}", suffix.to_uppercase())
    } else {
        format!("{stem}{suffix}")
    }
}

/// How many leading characters of the singular survive, and what to append.
fn plural_parts(lower: &str) -> (usize, &'static str) {
    let chars: Vec<char> = lower.chars().collect();
    let n = chars.len();
    let last = chars[n - 1];
    let before_last = if n >= 2 { Some(chars[n - 2]) } else { None };
    let is_consonant = |c: char| c.is_alphabetic() && !"aeiou".contains(c);

    if last == 'y' && before_last.is_some_and(is_consonant) {
        return (n - 1, "ies");
    }
    if lower.ends_with("fe") {
        return (n - 2, "ves");
    }
    if lower.ends_with("lf") {
        return (n - 1, "ves");
    }
    if matches!(last, 's' | 'x' | 'z') || lower.ends_with("ch") || lower.ends_with("sh") {
        return (n, "es");
    }
    (n, "s")
}

fn match_case(template: &str, word: &str) -> String {
    if crate::is_all_uppercase(template) {
        word.to_uppercase()
    } else if crate::starts_uppercase(template) {
        crate::capitalize(word)
    } else {
        word.to_string()
    }
}
