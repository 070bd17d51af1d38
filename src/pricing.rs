use serde::Serialize;

/// Raw price facts for one variation. Absent prices are carried as zero,
/// matching the index payload.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PriceFacts {
    pub price: f64,
    pub special_price: f64,
    pub recommended_retail_price: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectedPrices {
    pub price: Option<f64>,
    pub old_price: Option<f64>,
}

/// Determines the sale price and the strike-through price for a variation.
///
/// The special price wins only when it is set and lower than the regular
/// price; the recommended retail price becomes the old price only when it is
/// genuinely higher than both the regular and the selected price. Selection
/// never filters — the caller decides what to do with an absent price.
pub fn select_prices(facts: &PriceFacts) -> SelectedPrices {
    let mut price = None;
    if facts.special_price > 0.0 && facts.special_price < facts.price {
        price = Some(facts.special_price);
    } else if facts.price > 0.0 {
        price = Some(facts.price);
    }

    let effective = price.unwrap_or(0.0);
    let mut old_price = None;
    if facts.recommended_retail_price > 0.0
        && facts.recommended_retail_price > effective
        && facts.recommended_retail_price > facts.price
    {
        old_price = Some(facts.recommended_retail_price);
    } else if facts.price > 0.0 && facts.price < effective {
        old_price = Some(facts.price);
    }

    SelectedPrices { price, old_price }
}

/// Two-decimal money formatting for feed fields.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(price: f64, special: f64, rrp: f64) -> PriceFacts {
        PriceFacts {
            price,
            special_price: special,
            recommended_retail_price: rrp,
        }
    }

    #[test]
    fn special_price_wins_when_lower_than_price() {
        let selected = select_prices(&facts(100.0, 80.0, 0.0));
        assert_eq!(selected.price, Some(80.0));
    }

    #[test]
    fn special_price_ignored_when_not_lower() {
        let selected = select_prices(&facts(100.0, 120.0, 0.0));
        assert_eq!(selected.price, Some(100.0));
    }

    #[test]
    fn zero_special_price_is_absent() {
        let selected = select_prices(&facts(100.0, 0.0, 0.0));
        assert_eq!(selected.price, Some(100.0));
    }

    #[test]
    fn absent_prices_yield_no_selection() {
        let selected = select_prices(&facts(0.0, 0.0, 0.0));
        assert_eq!(selected.price, None);
        assert_eq!(selected.old_price, None);
    }

    #[test]
    fn rrp_becomes_old_price_when_above_both() {
        let selected = select_prices(&facts(100.0, 80.0, 150.0));
        assert_eq!(selected.price, Some(80.0));
        assert_eq!(selected.old_price, Some(150.0));
    }

    #[test]
    fn rrp_below_price_never_strikes_through() {
        let selected = select_prices(&facts(100.0, 80.0, 90.0));
        assert_eq!(selected.price, Some(80.0));
        assert_eq!(selected.old_price, None);
    }

    #[test]
    fn rrp_equal_to_price_never_strikes_through() {
        let selected = select_prices(&facts(100.0, 0.0, 100.0));
        assert_eq!(selected.old_price, None);
    }

    #[test]
    fn rrp_alone_is_not_enough_for_a_sale_price() {
        let selected = select_prices(&facts(0.0, 0.0, 50.0));
        assert_eq!(selected.price, None);
        assert_eq!(selected.old_price, Some(50.0));
    }

    #[test]
    fn amount_formatting_uses_two_decimals() {
        assert_eq!(format_amount(4.9), "4.90");
        assert_eq!(format_amount(10.0), "10.00");
    }
}
