//! Classifier label strings.
//!
//! A label is an underscore separated taxonomy such as
//! `0_Plantae_Tracheophyta_Magnoliopsida_Rosales_Rosaceae_Rosa_canina`.
//! The seven taxonomic fields are always the trailing seven tokens, so labels
//! that carry an extra leading token still line up with their genus and
//! species. Labels too short for a full breakdown still get a scientific name.

use serde::Serialize;

/// Number of taxonomic ranks from kingdom down to species.
const TAXON_RANKS: usize = 7;

/// Shortest label with a full breakdown: one leading token plus the ranks.
pub const MIN_TAXON_TOKENS: usize = TAXON_RANKS + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<'a> {
    raw: &'a str,
    tokens: Vec<&'a str>,
}

/// Seven level biological classification extracted from a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxon {
    pub kingdom: String,
    pub phylum: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
}

impl<'a> Label<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Label {
            raw,
            tokens: raw.split('_').collect(),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// `"<genus> <species>"` from the last two tokens, or the raw label when
    /// it has no underscore at all.
    pub fn scientific_name(&self) -> String {
        match self.tokens.as_slice() {
            [.., genus, species] => format!("{} {}", genus, species),
            _ => self.raw.to_owned(),
        }
    }

    /// Full breakdown, `None` when the label has fewer than
    /// [`MIN_TAXON_TOKENS`] tokens.
    pub fn taxon(&self) -> Option<Taxon> {
        if self.tokens.len() < MIN_TAXON_TOKENS {
            return None;
        }

        let ranks = &self.tokens[self.tokens.len() - TAXON_RANKS..];
        Some(Taxon {
            kingdom: ranks[0].to_owned(),
            phylum: ranks[1].to_owned(),
            class: ranks[2].to_owned(),
            order: ranks[3].to_owned(),
            family: ranks[4].to_owned(),
            genus: ranks[5].to_owned(),
            species: ranks[6].to_owned(),
        })
    }
}

impl Taxon {
    pub fn scientific_name(&self) -> String {
        format!("{} {}", self.genus, self.species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSA: &str = "12_Plantae_Tracheophyta_Magnoliopsida_Rosales_Rosaceae_Rosa_canina";

    #[test]
    fn canonical_label_breaks_down_positionally() {
        let label = Label::parse(ROSA);
        let taxon = label.taxon().unwrap();

        assert_eq!(taxon.kingdom, "Plantae");
        assert_eq!(taxon.phylum, "Tracheophyta");
        assert_eq!(taxon.class, "Magnoliopsida");
        assert_eq!(taxon.order, "Rosales");
        assert_eq!(taxon.family, "Rosaceae");
        assert_eq!(taxon.genus, "Rosa");
        assert_eq!(taxon.species, "canina");
        assert_eq!(label.scientific_name(), "Rosa canina");
        assert_eq!(taxon.scientific_name(), label.scientific_name());
    }

    #[test]
    fn extra_leading_token_keeps_genus_and_species_aligned() {
        let label = Label::parse("x_12_Plantae_Tracheophyta_Liliopsida_Poales_Poaceae_Zea_mays");
        let taxon = label.taxon().unwrap();

        assert_eq!(taxon.kingdom, "Plantae");
        assert_eq!(taxon.scientific_name(), "Zea mays");
        assert_eq!(label.scientific_name(), "Zea mays");
    }

    #[test]
    fn short_labels_fall_back_without_panicking() {
        let label = Label::parse("Rosaceae_Rosa_canina");
        assert_eq!(label.taxon(), None);
        assert_eq!(label.scientific_name(), "Rosa canina");

        let bare = Label::parse("unknown");
        assert_eq!(bare.taxon(), None);
        assert_eq!(bare.scientific_name(), "unknown");

        assert_eq!(Label::parse("").scientific_name(), "");
    }

    #[test]
    fn every_well_formed_label_has_a_full_breakdown() {
        for extra in 0..4 {
            let mut tokens = vec!["p"; extra];
            tokens.extend(["0", "K", "P", "C", "O", "F", "G", "s"]);
            let raw = tokens.join("_");
            let label = Label::parse(&raw);

            let taxon = label.taxon().expect("breakdown");
            assert!(!taxon.genus.is_empty());
            assert!(!taxon.species.is_empty());
            assert_eq!(label.scientific_name(), "G s");
        }
    }
}
