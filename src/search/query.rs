//! Query template expansion.

use std::collections::HashSet;

/// Expands query templates against configured geographies.
///
/// A template may reference `${country}`, `${state}` and `${city}`.
/// Templates with no placeholders pass through as literal queries.
/// Expansion is cartesian over the placeholders a template actually
/// uses, and the output preserves first-seen order with duplicates
/// removed.
pub struct QueryGenerator {
    templates: Vec<String>,
    countries: Vec<String>,
    states: Vec<String>,
    cities: Vec<String>,
}

impl QueryGenerator {
    pub fn new(
        templates: Vec<String>,
        countries: Vec<String>,
        states: Vec<String>,
        cities: Vec<String>,
    ) -> Self {
        QueryGenerator {
            templates,
            countries,
            states,
            cities,
        }
    }

    pub fn generate(&self) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queries = Vec::new();

        for template in &self.templates {
            for expanded in self.expand_template(template) {
                let expanded = expanded.trim().to_string();
                if expanded.is_empty() {
                    continue;
                }
                if seen.insert(expanded.clone()) {
                    queries.push(expanded);
                }
            }
        }
        queries
    }

    fn expand_template(&self, template: &str) -> Vec<String> {
        let mut expansions = vec![template.to_string()];

        for (placeholder, values) in [
            ("${country}", &self.countries),
            ("${state}", &self.states),
            ("${city}", &self.cities),
        ] {
            if !template.contains(placeholder) {
                continue;
            }
            if values.is_empty() {
                tracing::warn!(target: "search",
                    "Template '{}' uses {} but no values are configured. Skipping.",
                    template, placeholder);
                return Vec::new();
            }
            let mut next = Vec::with_capacity(expansions.len() * values.len());
            for partial in &expansions {
                for value in values {
                    next.push(partial.replace(placeholder, value));
                }
            }
            expansions = next;
        }
        expansions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(templates: &[&str], countries: &[&str], states: &[&str], cities: &[&str]) -> QueryGenerator {
        let v = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        QueryGenerator::new(v(templates), v(countries), v(states), v(cities))
    }

    #[test]
    fn literal_templates_pass_through() {
        let queries = gen(&["plumbers near me"], &[], &[], &[]).generate();
        assert_eq!(queries, vec!["plumbers near me"]);
    }

    #[test]
    fn expands_cartesian_over_used_placeholders() {
        let queries = gen(
            &["dentists in ${state}, ${country}"],
            &["USA"],
            &["Texas", "Ohio"],
            &["ignored"],
        )
        .generate();
        assert_eq!(queries, vec!["dentists in Texas, USA", "dentists in Ohio, USA"]);
    }

    #[test]
    fn placeholder_without_values_skips_template() {
        let queries = gen(&["cafes in ${city}", "cafes"], &[], &[], &[]).generate();
        assert_eq!(queries, vec!["cafes"]);
    }

    #[test]
    fn deduplicates_preserving_first_seen_order() {
        let queries = gen(
            &["shops in ${city}", "shops in Austin"],
            &[],
            &[],
            &["Austin", "Dallas"],
        )
        .generate();
        assert_eq!(queries, vec!["shops in Austin", "shops in Dallas"]);
    }
}
