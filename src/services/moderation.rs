// Modération des avis produits. Le classificateur est injectable (trait),
// les routes ne dépendent que de is_offensive(): la liste de mots peut
// être remplacée par un vrai modèle sans toucher les call sites.

/// Capacité de classification de texte injectée dans les routes d'avis
pub trait TextClassifier: Send + Sync {
    fn is_offensive(&self, text: &str) -> bool;
}

/// Liste de mots interdits. Les entrées à plusieurs mots sont cherchées
/// telles quelles dans le texte.
const BAD_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "ass",
    "asshole",
    "bastard",
    "bitch",
    "bollocks",
    "bugger",
    "bullshit",
    "cock",
    "crap",
    "cunt",
    "dick",
    "dickhead",
    "dumb ass",
    "dumbass",
    "fuck",
    "fucked",
    "fucker",
    "fucking",
    "horseshit",
    "jackass",
    "motherfucker",
    "piss",
    "prick",
    "pussy",
    "shit",
    "shite",
    "slut",
    "son of a bitch",
    "twat",
    "wanker",
];

/// Classificateur par défaut: recherche chaque mot interdit avec des
/// frontières de mot, insensible à la casse
pub struct BadWordClassifier {
    words: Vec<String>,
}

impl BadWordClassifier {
    pub fn new() -> Self {
        Self {
            words: BAD_WORDS.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

impl Default for BadWordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifier for BadWordClassifier {
    fn is_offensive(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.words.iter().any(|word| contains_word(&lower, word))
    }
}

/// Cherche `word` dans `text` en exigeant des frontières de mot:
/// "ass" ne doit pas matcher dans "class"
fn contains_word(text: &str, word: &str) -> bool {
    for (idx, _) in text.match_indices(word) {
        let boundary_before = text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let end = idx + word.len();
        let boundary_after = text[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());

        if boundary_before && boundary_after {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_passes() {
        let classifier = BadWordClassifier::new();
        assert!(!classifier.is_offensive("Great product, arrived quickly"));
    }

    #[test]
    fn test_bad_word_is_flagged() {
        let classifier = BadWordClassifier::new();
        assert!(classifier.is_offensive("this is complete crap"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let classifier = BadWordClassifier::new();
        assert!(classifier.is_offensive("What a CRAP product"));
    }

    #[test]
    fn test_word_boundaries_are_respected() {
        let classifier = BadWordClassifier::new();
        // "class" contient "ass" mais n'est pas offensant
        assert!(!classifier.is_offensive("top of its class"));
        assert!(classifier.is_offensive("what an ass"));
    }

    #[test]
    fn test_multi_word_entries_match() {
        let classifier = BadWordClassifier::new();
        assert!(classifier.is_offensive("the seller is a son of a bitch"));
    }

    #[test]
    fn test_word_at_text_edges() {
        assert!(contains_word("crap", "crap"));
        assert!(contains_word("crap product", "crap"));
        assert!(contains_word("utter crap", "crap"));
        assert!(!contains_word("scrappy", "crap"));
    }
}
