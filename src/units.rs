/// Converts a gram weight from the index document into the kilogram string
/// the feed expects, always with two decimals.
pub fn grams_to_kilograms(weight_g: f64) -> String {
    format!("{:.2}", weight_g / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grams_convert_to_two_decimal_kilograms() {
        assert_eq!(grams_to_kilograms(1500.0), "1.50");
        assert_eq!(grams_to_kilograms(0.0), "0.00");
        assert_eq!(grams_to_kilograms(333.0), "0.33");
    }
}
