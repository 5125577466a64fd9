//! Static product catalog and tier pricing.
//!
//! The catalog in the database takes precedence; these entries are the
//! fallback/seed source, and the pricing table used by order intake.

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

/// Which tier of the two-tier catalog lookup served the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Database,
    Static,
}

/// A quantity-tier offer: buy `qty` units for `price` total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub qty: u32,
    pub label: &'static str,
    pub price: Money,
}

/// A hardcoded catalog entry, including the denormalized copy fields snapshot
/// onto each order at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct StaticProduct {
    pub slug: &'static str,
    pub name: &'static str,
    pub short_desc: &'static str,
    pub full_desc: &'static str,
    pub benefits: &'static [&'static str],
    pub usage: &'static str,
    pub guarantee: &'static str,
    pub delivery_info: &'static str,
    pub images: &'static [&'static str],
    pub offers: &'static [Offer],
    /// Per-unit price for quantities not covered by an offer. `None` means the
    /// product only sells in the listed bundles.
    pub base_unit_price: Option<Money>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("no {qty}-unit offer for product '{slug}'")]
    NoTier { slug: String, qty: u32 },
}

/// A resolved price for (product, quantity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub total: Money,
    /// Single-unit price used for the order snapshot's display field.
    pub unit: Money,
}

pub const DEFAULT_SLUG: &str = "hismile";

const HISMILE: StaticProduct = StaticProduct {
    slug: "hismile",
    name: "Hismile™ – Le Sérum Qui Blanchit tes dents dès le premier jour",
    short_desc: "Sérum correcteur de teinte pour les dents. Effet immédiat, sans peroxyde.",
    full_desc: "Hismile est un sérum dentaire innovant qui corrige la teinte des dents dès la première utilisation.",
    benefits: &[
        "Résultat immédiat",
        "Sans peroxyde",
        "Sans douleur",
        "Recommandé par les dentistes",
    ],
    usage: "Appliquer sur les dents propres.",
    guarantee: "Il est recommandé par les dentistes du Cameroun et du monde entier.",
    delivery_info: "Livraison à domicile, paiement à la réception.",
    images: &[],
    offers: &[
        Offer {
            qty: 1,
            label: "1 sérum",
            price: Money::from_minor(9_900),
        },
        Offer {
            qty: 2,
            label: "2 sérums (offre duo)",
            price: Money::from_minor(14_000),
        },
    ],
    base_unit_price: Some(Money::from_minor(9_900)),
};

const GUMIES: StaticProduct = StaticProduct {
    slug: "gumies",
    name: "Gumies™ – Gommes vitaminées pour des dents plus blanches",
    short_desc: "Gommes à mâcher au charbon actif, format cure de 30 jours.",
    full_desc: "Gumies complète le sérum Hismile avec une cure de gommes au charbon actif \
                qui entretient la blancheur entre deux applications.",
    benefits: &["Goût menthe fraîche", "Cure de 30 jours", "Sans sucre"],
    usage: "Deux gommes par jour après le brossage.",
    guarantee: "Satisfait ou remboursé sous 14 jours.",
    delivery_info: "Livraison à domicile, paiement à la réception.",
    images: &[],
    offers: &[
        Offer {
            qty: 1,
            label: "1 flacon",
            price: Money::from_minor(7_500),
        },
        Offer {
            qty: 2,
            label: "2 flacons",
            price: Money::from_minor(13_500),
        },
        Offer {
            qty: 3,
            label: "3 flacons (cure complète)",
            price: Money::from_minor(18_000),
        },
    ],
    // Bundle-only product: quantities outside the offers are rejected.
    base_unit_price: None,
};

const CATALOG: [&StaticProduct; 2] = [&HISMILE, &GUMIES];

/// Look up a static catalog entry by slug.
#[must_use]
pub fn static_product(slug: &str) -> Option<&'static StaticProduct> {
    CATALOG.iter().copied().find(|p| p.slug == slug)
}

/// All static catalog entries, in display order.
#[must_use]
pub fn static_products() -> &'static [&'static StaticProduct] {
    &CATALOG
}

/// Resolve the product whose pricing applies to `slug`.
///
/// Unknown slugs fall back to the default product, mirroring the storefront's
/// single-product history.
#[must_use]
pub fn pricing_product(slug: &str) -> &'static StaticProduct {
    static_product(slug).unwrap_or(&HISMILE)
}

/// Price a (slug, quantity) pair against the static table.
///
/// An exact offer wins; otherwise the product's per-unit price is scaled. A
/// product without a per-unit price only sells at its listed offers.
///
/// # Errors
///
/// Returns [`PricingError::NoTier`] when the quantity is not an offer and the
/// product defines no per-unit price.
pub fn quote(slug: &str, quantity: u32) -> Result<Quote, PricingError> {
    let product = pricing_product(slug);

    let unit = product
        .offers
        .iter()
        .find(|o| o.qty == 1)
        .map(|o| o.price)
        .or(product.base_unit_price)
        .unwrap_or(Money::from_minor(0));

    if let Some(offer) = product.offers.iter().find(|o| o.qty == quantity) {
        return Ok(Quote {
            total: offer.price,
            unit,
        });
    }

    match product.base_unit_price {
        Some(base) => Ok(Quote {
            total: base.times(quantity),
            unit,
        }),
        None => Err(PricingError::NoTier {
            slug: product.slug.to_string(),
            qty: quantity,
        }),
    }
}

/// Derive a URL-safe slug from a product name: lowercase, every run of
/// non-alphanumeric characters collapsed to one hyphen, trimmed.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hismile_single_unit_price() {
        let q = quote("hismile", 1).expect("quote");
        assert_eq!(q.total, Money::from_minor(9_900));
        assert_eq!(q.total.display(), "9,900 FCFA");
    }

    #[test]
    fn hismile_duo_offer_price() {
        let q = quote("hismile", 2).expect("quote");
        assert_eq!(q.total, Money::from_minor(14_000));
        assert_eq!(q.total.display(), "14,000 FCFA");
    }

    #[test]
    fn hismile_scales_beyond_offers() {
        let q = quote("hismile", 5).expect("quote");
        assert_eq!(q.total, Money::from_minor(49_500));
    }

    #[test]
    fn unknown_slug_falls_back_to_default_pricing() {
        let q = quote("mystery-product", 2).expect("quote");
        assert_eq!(q.total, Money::from_minor(14_000));
    }

    #[test]
    fn bundle_only_product_rejects_off_tier_quantity() {
        let err = quote("gumies", 5).expect_err("no 5-unit tier");
        assert_eq!(
            err,
            PricingError::NoTier {
                slug: "gumies".to_string(),
                qty: 5
            }
        );
    }

    #[test]
    fn bundle_only_product_accepts_listed_tiers() {
        assert_eq!(
            quote("gumies", 3).expect("quote").total,
            Money::from_minor(18_000)
        );
    }

    #[test]
    fn slug_from_name_collapses_and_trims() {
        assert_eq!(slug_from_name("Hismile™ Sérum V2"), "hismile-s-rum-v2");
        assert_eq!(slug_from_name("  --Gumies!!  "), "gumies");
        assert_eq!(slug_from_name("Pack Duo (2x)"), "pack-duo-2x");
    }

    #[test]
    fn static_lookup_finds_known_slugs_only() {
        assert!(static_product("hismile").is_some());
        assert!(static_product("gumies").is_some());
        assert!(static_product("nope").is_none());
    }
}
