use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::text;

/// Fixed unit families used for cross-product price comparison. Prices are
/// only comparable within one family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitFamily {
    Mass,
    Volume,
    Count,
}

/// Classifies a free-text measurement unit into its family together with the
/// factor to the family's canonical denomination (grams, milliliters, single
/// units). Unknown tokens yield `None`: the product is not comparable, which
/// is a value-level signal and never an error.
pub fn classify_unit(token: &str) -> Option<(UnitFamily, f64)> {
    let folded = text::fold(token);
    let classified = match folded.as_str() {
        "mg" | "miligramo" | "miligramos" | "milligram" | "milligrams" => (UnitFamily::Mass, 0.001),
        "g" | "gr" | "gramo" | "gramos" | "gram" | "grams" => (UnitFamily::Mass, 1.0),
        "kg" | "kilo" | "kilos" | "kilogramo" | "kilogramos" | "kilogram" | "kilograms" => {
            // The 1:1000 gram/kilogram ratio anchors the mass family.
            (UnitFamily::Mass, 1000.0)
        }
        "ton" | "tonelada" | "toneladas" => (UnitFamily::Mass, 1_000_000.0),
        "ml" | "mililitro" | "mililitros" | "milliliter" | "milliliters" => (UnitFamily::Volume, 1.0),
        "cl" | "centilitro" | "centilitros" => (UnitFamily::Volume, 10.0),
        "l" | "lt" | "litro" | "litros" | "liter" | "liters" => (UnitFamily::Volume, 1000.0),
        "u" | "un" | "unidad" | "unidades" | "unit" | "units" => (UnitFamily::Count, 1.0),
        "par" | "pair" => (UnitFamily::Count, 2.0),
        "docena" | "docenas" | "dozen" => (UnitFamily::Count, 12.0),
        _ => return None,
    };
    Some(classified)
}

/// Price of exactly one `base_unit` worth of the product, or `None` when the
/// product is not comparable: unknown unit on either side, mismatched
/// families, or a degenerate conversion factor.
///
/// `conversion_factor` is the number of `measurement_unit` in one sale
/// package, so a 500 g bag priced 2.00 with `base_unit = "kg"` yields 4.00.
/// Floating-point division, no rounding; this function never panics.
pub fn price_per_base_unit(
    measurement_unit: &str,
    price: Decimal,
    conversion_factor: f64,
    base_unit: &str,
) -> Option<f64> {
    let (product_family, to_canonical) = classify_unit(measurement_unit)?;
    let (base_family, base_to_canonical) = classify_unit(base_unit)?;
    if product_family != base_family {
        return None;
    }
    if !conversion_factor.is_finite() || conversion_factor <= 0.0 {
        return None;
    }

    let price = price.to_f64()?;
    let result = price / (conversion_factor * to_canonical) * base_to_canonical;
    result.is_finite().then_some(result)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{classify_unit, price_per_base_unit, UnitFamily};

    #[test]
    fn classifies_known_tokens_with_accent_folding() {
        assert_eq!(classify_unit("KG"), Some((UnitFamily::Mass, 1000.0)));
        assert_eq!(classify_unit("Litros"), Some((UnitFamily::Volume, 1000.0)));
        assert_eq!(classify_unit("unidad"), Some((UnitFamily::Count, 1.0)));
    }

    #[test]
    fn unknown_unit_is_unclassifiable() {
        // Scenario E: "lb" is not in the fixed known-unit list.
        assert_eq!(classify_unit("lb"), None);
        assert_eq!(price_per_base_unit("lb", Decimal::new(100, 2), 1.0, "kg"), None);
    }

    #[test]
    fn five_hundred_gram_package_prices_per_kilogram() {
        // 500 g bag at 2.00 => 4.00 per kg.
        let per_kg = price_per_base_unit("gramos", Decimal::new(200, 2), 500.0, "kg")
            .expect("comparable units");
        assert!((per_kg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn same_unit_and_base_divides_by_package_size() {
        // 5 kg sack at 10.00 => 2.00 per kg.
        let per_kg = price_per_base_unit("kg", Decimal::new(1000, 2), 5.0, "kilogramos")
            .expect("comparable units");
        assert!((per_kg - 2.0).abs() < 1e-9);
    }

    #[test]
    fn volume_and_count_families_convert() {
        // 1.5 l bottle at 3.00 => 2.00 per liter.
        let per_liter = price_per_base_unit("ml", Decimal::new(300, 2), 1500.0, "litro")
            .expect("comparable units");
        assert!((per_liter - 2.0).abs() < 1e-9);

        // 24.00 per dozen => 2.00 per unit.
        let per_unit = price_per_base_unit("docena", Decimal::new(2400, 2), 1.0, "unidad")
            .expect("comparable units");
        assert!((per_unit - 2.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_families_are_not_comparable() {
        assert_eq!(price_per_base_unit("kg", Decimal::ONE, 1.0, "litro"), None);
    }

    #[test]
    fn degenerate_factors_yield_none_instead_of_panicking() {
        // P4: total except the None sentinel.
        assert_eq!(price_per_base_unit("kg", Decimal::ONE, 0.0, "kg"), None);
        assert_eq!(price_per_base_unit("kg", Decimal::ONE, -2.0, "kg"), None);
        assert_eq!(price_per_base_unit("kg", Decimal::ONE, f64::NAN, "kg"), None);
    }

    #[test]
    fn non_negative_price_yields_finite_non_negative_result() {
        for (price, factor) in [(Decimal::ZERO, 1.0), (Decimal::new(999_99, 2), 250.0)] {
            let value = price_per_base_unit("g", price, factor, "kg").expect("comparable");
            assert!(value.is_finite());
            assert!(value >= 0.0);
        }
    }
}
