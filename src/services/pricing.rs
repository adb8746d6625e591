// src/services/pricing.rs

use rust_decimal::Decimal;

use crate::{
    common::money::PricingConfig,
    models::{
        product::PriceBreakdown,
        rule::{AppliedRule, PriceMode},
    },
};

// ---------------------------------------------------------------------------
// Avaliador de preços (puro, sem I/O).
//
// Ordem: atributos da variante -> características do produto -> característica
// especial. A primeira regra FINAL_OVERRIDE fixa o preço e encerra tudo.
// Percentagens incidem sempre sobre o preço de partida, nunca sobre o acumulado.
// ---------------------------------------------------------------------------

/// Tudo o que o avaliador precisa, já carregado do store.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingInput {
    /// `local_base_price` da variante ou `base_price` do produto.
    pub base_price: Decimal,
    pub attributes: Vec<AppliedRule>,
    pub features: Vec<AppliedRule>,
    /// (preço, modo) da característica especial do produto, se existir.
    pub special_feature: Option<(Decimal, PriceMode)>,
    pub tax_percentage: Decimal,
    /// Recargo de equivalência do imposto.
    pub surcharge_percentage: Decimal,
}

enum Step {
    Continue,
    Stop,
}

fn apply(price: &mut Decimal, floor: Decimal, rule_price: Decimal, mode: PriceMode) -> Step {
    match mode {
        PriceMode::FinalOverride => {
            *price = rule_price;
            return Step::Stop;
        }
        PriceMode::Increase => *price += rule_price,
        PriceMode::Percentage => *price += floor * rule_price / Decimal::ONE_HUNDRED,
    }
    Step::Continue
}

/// Mais recente primeiro; empate resolvido pelo id da linha de valor.
fn in_evaluation_order(rules: &[AppliedRule]) -> Vec<&AppliedRule> {
    let mut ordered: Vec<&AppliedRule> = rules.iter().collect();
    ordered.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.value_id.cmp(&b.value_id))
    });
    ordered
}

/// Aplica uma lista de regras. Devolve `true` se encontrou um override.
fn apply_all(price: &mut Decimal, floor: Decimal, rules: &[AppliedRule]) -> bool {
    for rule in in_evaluation_order(rules) {
        if let Step::Stop = apply(price, floor, rule.price, rule.price_mode) {
            return true;
        }
    }
    false
}

pub fn evaluate(input: &PricingInput, config: &PricingConfig, with_surcharge: bool) -> PriceBreakdown {
    let floor = input.base_price;
    let mut price = floor;

    let overridden = apply_all(&mut price, floor, &input.attributes)
        || apply_all(&mut price, floor, &input.features);

    if !overridden {
        if let Some((rule_price, mode)) = input.special_feature {
            apply(&mut price, floor, rule_price, mode);
        }
    }

    let price_base = config.round(price);
    let tax_amount = config.percent_of(price_base, input.tax_percentage);
    let surcharge_amount = if with_surcharge {
        config.percent_of(price_base, input.surcharge_percentage)
    } else {
        Decimal::ZERO
    };

    PriceBreakdown {
        price_base,
        tax_amount,
        surcharge_amount,
        price_total: price_base + tax_amount + surcharge_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs)
    }

    fn rule(price: &str, mode: PriceMode, updated: i64) -> AppliedRule {
        AppliedRule {
            value_id: Uuid::new_v4(),
            rule_id: Uuid::new_v4(),
            price: d(price),
            price_mode: mode,
            updated_at: at(updated),
        }
    }

    fn input(base: &str, tax: &str) -> PricingInput {
        PricingInput {
            base_price: d(base),
            attributes: vec![],
            features: vec![],
            special_feature: None,
            tax_percentage: d(tax),
            surcharge_percentage: Decimal::ZERO,
        }
    }

    #[test]
    fn no_rules_returns_base_plus_tax() {
        let out = evaluate(&input("100.00", "21"), &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("100.00"));
        assert_eq!(out.tax_amount, d("21.00"));
        assert_eq!(out.price_total, d("121.00"));
    }

    #[test]
    fn increase_attribute_scenario() {
        let mut i = input("100.00", "21");
        i.attributes.push(rule("10", PriceMode::Increase, 1));
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("110.00"));
        assert_eq!(out.tax_amount, d("23.10"));
        assert_eq!(out.price_total, d("133.10"));
    }

    #[test]
    fn percentages_apply_to_the_starting_price() {
        let mut i = input("200.00", "0");
        i.attributes.push(rule("10", PriceMode::Percentage, 2));
        i.features.push(rule("5", PriceMode::Increase, 1));
        i.features.push(rule("10", PriceMode::Percentage, 3));
        // 200 + 20 + 5 + 20
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("245.00"));
    }

    #[test]
    fn attribute_override_short_circuits_everything_after_it() {
        let mut i = input("100.00", "10");
        i.attributes.push(rule("50", PriceMode::FinalOverride, 5));
        i.features.push(rule("999", PriceMode::FinalOverride, 9));
        i.features.push(rule("30", PriceMode::Increase, 9));
        i.special_feature = Some((d("40"), PriceMode::Increase));
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("50.00"));
        assert_eq!(out.price_total, d("55.00"));
    }

    #[test]
    fn override_only_skips_older_rules() {
        let mut i = input("100.00", "0");
        // A mais recente é aplicada antes do override; a mais antiga não.
        i.attributes.push(rule("7", PriceMode::Increase, 10));
        i.attributes.push(rule("80", PriceMode::FinalOverride, 5));
        i.attributes.push(rule("3", PriceMode::Increase, 1));
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("80.00"));
    }

    #[test]
    fn zero_override_forces_zero() {
        let mut i = input("100.00", "21");
        i.features.push(rule("0", PriceMode::FinalOverride, 1));
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, Decimal::ZERO);
        assert_eq!(out.price_total, Decimal::ZERO);
    }

    #[test]
    fn special_feature_applies_when_nothing_overrides() {
        let mut i = input("100.00", "0");
        i.features.push(rule("5", PriceMode::Increase, 1));
        i.special_feature = Some((d("12.50"), PriceMode::Increase));
        let out = evaluate(&i, &PricingConfig::default(), false);
        assert_eq!(out.price_base, d("117.50"));
    }

    #[test]
    fn surcharge_only_when_requested() {
        let mut i = input("100.00", "21");
        i.surcharge_percentage = d("5.2");
        let cfg = PricingConfig::default();
        assert_eq!(evaluate(&i, &cfg, false).price_total, d("121.00"));
        let with = evaluate(&i, &cfg, true);
        assert_eq!(with.surcharge_amount, d("5.20"));
        assert_eq!(with.price_total, d("126.20"));
    }

    #[test]
    fn ties_on_updated_at_are_broken_by_value_id() {
        let mut a = rule("60", PriceMode::FinalOverride, 1);
        let mut b = rule("70", PriceMode::FinalOverride, 1);
        a.value_id = Uuid::from_u128(1);
        b.value_id = Uuid::from_u128(2);

        let mut i = input("100.00", "0");
        i.attributes = vec![b.clone(), a.clone()];
        let first = evaluate(&i, &PricingConfig::default(), false);
        i.attributes = vec![a, b];
        let second = evaluate(&i, &PricingConfig::default(), false);

        assert_eq!(first.price_base, d("60.00"));
        assert_eq!(first, second);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut i = input("19.99", "21");
        i.attributes.push(rule("3.3", PriceMode::Percentage, 4));
        i.features.push(rule("1.01", PriceMode::Increase, 2));
        let cfg = PricingConfig::default();
        let first = evaluate(&i, &cfg, true);
        for _ in 0..10 {
            assert_eq!(evaluate(&i, &cfg, true), first);
        }
    }
}
