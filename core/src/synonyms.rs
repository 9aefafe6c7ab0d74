//! Static synonym table used to widen query recall.
//!
//! Keys and values are stored in normalized form so lookups happen on the
//! same terms the index holds. A multi-word synonym ("running shoes")
//! contributes each of its terms.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

use crate::tokenizer::normalize;
use crate::Term;

const BUILTIN: &[(&str, &[&str])] = &[
    // price and style adjectives
    ("cheap", &["affordable", "inexpensive", "low cost", "budget", "low-price"]),
    ("affordable", &["cheap", "budget"]),
    ("expensive", &["premium", "high-end", "luxury", "pricey"]),
    ("premium", &["luxury", "high-end", "expensive"]),
    ("comfortable", &["comfy", "soft", "relaxed"]),
    ("elegant", &["stylish", "classy", "refined"]),
    ("sport", &["sportswear", "athletic", "fitness"]),
    ("casual", &["everyday", "relaxed", "streetwear"]),
    ("formal", &["dressy", "smart", "office", "elegant"]),
    // colours
    ("red", &["maroon", "crimson", "burgundy"]),
    ("blue", &["navy", "sky blue", "royal blue"]),
    ("green", &["olive", "mint", "emerald"]),
    ("black", &["dark", "charcoal"]),
    ("white", &["ivory", "cream"]),
    ("yellow", &["gold", "mustard"]),
    ("pink", &["rose", "blush"]),
    ("brown", &["tan", "beige", "camel"]),
    // footwear
    ("shoes", &["shoe", "sneakers", "footwear", "trainers", "running shoes"]),
    ("shoe", &["shoes", "sneaker", "footwear"]),
    ("sneakers", &["running shoes", "trainers", "sports shoes"]),
    ("boots", &["ankle boots", "combat boots", "boot"]),
    // bottoms
    ("pants", &["trousers", "bottoms", "slacks"]),
    ("trousers", &["pants", "bottomwear"]),
    ("jeans", &["denim", "denims", "skinny jeans", "slim jeans"]),
    // tops
    ("tshirt", &["t-shirt", "tee", "tees", "tshirts"]),
    ("t-shirt", &["tee", "tshirt", "shirt"]),
    ("shirt", &["top", "blouse"]),
    ("dress", &["gown", "one-piece", "maxi dress", "midi dress"]),
    ("jacket", &["coat", "outerwear", "blazer"]),
    ("bag", &["handbag", "purse", "tote"]),
    // audience
    ("women", &["woman", "ladies", "female"]),
    ("men", &["man", "male", "mens"]),
    ("kids", &["children", "child", "boy", "girl"]),
];

/// Immutable mapping from a normalized term to its normalized synonyms.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<Term, BTreeSet<Term>>,
}

impl SynonymTable {
    pub fn empty() -> Self { Self::default() }

    /// The curated fashion-catalog table.
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN.iter().map(|(word, syns)| (*word, syns.iter().copied())))
    }

    /// Build from raw (word, synonyms) pairs, normalizing both sides.
    ///
    /// Words whose normalized forms collide ("shoes", "shoe") merge their sets.
    /// A key that normalizes to more than one term is registered under each.
    pub fn from_pairs<'a, I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, S)>,
        S: IntoIterator<Item = &'a str>,
    {
        let mut entries: HashMap<Term, BTreeSet<Term>> = HashMap::new();
        for (word, syns) in pairs {
            let keys = normalize(word);
            if keys.is_empty() { continue; }
            let mut values: BTreeSet<Term> = BTreeSet::new();
            for syn in syns {
                values.extend(normalize(syn));
            }
            for key in keys {
                let slot = entries.entry(key.clone()).or_default();
                slot.extend(values.iter().filter(|v| **v != key).cloned());
            }
        }
        entries.retain(|_, v| !v.is_empty());
        Self { entries }
    }

    /// Load a JSON object of `{"word": ["synonym", ...]}` from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening synonym file {}", path.display()))?;
        let raw: HashMap<String, Vec<String>> = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parsing synonym file {}", path.display()))?;
        let table = Self::from_pairs(raw.iter().map(|(k, v)| (k.as_str(), v.iter().map(String::as_str))));
        tracing::info!(path = %path.display(), entries = table.len(), "loaded synonym table");
        Ok(table)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Expand a normalized term. The result always contains `term` itself.
    pub fn expand(&self, term: &str) -> BTreeSet<Term> {
        let mut out = BTreeSet::new();
        out.insert(term.to_string());
        if let Some(syns) = self.entries.get(term) {
            out.extend(syns.iter().cloned());
        }
        out
    }

    /// Union of the expansions of every term.
    pub fn expand_all<'a, I>(&self, terms: I) -> BTreeSet<Term>
    where
        I: IntoIterator<Item = &'a Term>,
    {
        let mut out = BTreeSet::new();
        for t in terms {
            out.extend(self.expand(t));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_returns_singleton() {
        let table = SynonymTable::builtin();
        let out = table.expand("zzzqx");
        assert_eq!(out.len(), 1);
        assert!(out.contains("zzzqx"));
    }

    #[test]
    fn hit_keeps_original_and_adds_synonyms() {
        let table = SynonymTable::builtin();
        let red = normalize("red").remove(0);
        let out = table.expand(&red);
        assert!(out.contains(&red));
        assert!(out.contains(&normalize("crimson")[0]));
    }

    #[test]
    fn colliding_keys_merge() {
        let table = SynonymTable::builtin();
        let shoe = normalize("shoes").remove(0);
        let out = table.expand(&shoe);
        assert!(out.contains(&normalize("footwear")[0]));
        assert!(out.contains(&normalize("trainers")[0]));
    }

    #[test]
    fn custom_pairs() {
        let table = SynonymTable::from_pairs(vec![("hoodie", vec!["sweatshirt"])]);
        let out = table.expand(&normalize("hoodie")[0]);
        assert!(out.contains(&normalize("sweatshirt")[0]));
        assert_eq!(table.len(), 1);
    }
}
