//! Embedded flag/country dataset and per-question selection (C2, spec §4.9).
//!
//! Distractors prefer countries from the same region as the correct answer
//! when at least three such countries remain in the unused pool; otherwise
//! the remaining slots are filled from the full unused pool at random.

use std::collections::HashSet;

use rand::seq::{IndexedRandom, SliceRandom};

use crate::protocol::{CountryCode, CountryRecord, GameQuestion};

macro_rules! country {
    ($name:expr, $flag:expr, $code:expr, $region:expr) => {
        CountryRecord {
            name: $name.to_string(),
            flag: $flag.to_string(),
            code: $code.to_string(),
            region: $region.to_string(),
        }
    };
}

fn dataset() -> Vec<CountryRecord> {
    vec![
        country!("France", "🇫🇷", "FR", "Europe"),
        country!("Germany", "🇩🇪", "DE", "Europe"),
        country!("Italy", "🇮🇹", "IT", "Europe"),
        country!("Spain", "🇪🇸", "ES", "Europe"),
        country!("Portugal", "🇵🇹", "PT", "Europe"),
        country!("Netherlands", "🇳🇱", "NL", "Europe"),
        country!("Belgium", "🇧🇪", "BE", "Europe"),
        country!("Switzerland", "🇨🇭", "CH", "Europe"),
        country!("Austria", "🇦🇹", "AT", "Europe"),
        country!("Poland", "🇵🇱", "PL", "Europe"),
        country!("Sweden", "🇸🇪", "SE", "Europe"),
        country!("Norway", "🇳🇴", "NO", "Europe"),
        country!("Denmark", "🇩🇰", "DK", "Europe"),
        country!("Finland", "🇫🇮", "FI", "Europe"),
        country!("Greece", "🇬🇷", "GR", "Europe"),
        country!("Ireland", "🇮🇪", "IE", "Europe"),
        country!("United Kingdom", "🇬🇧", "GB", "Europe"),
        country!("Ukraine", "🇺🇦", "UA", "Europe"),
        country!("Japan", "🇯🇵", "JP", "Asia"),
        country!("China", "🇨🇳", "CN", "Asia"),
        country!("South Korea", "🇰🇷", "KR", "Asia"),
        country!("India", "🇮🇳", "IN", "Asia"),
        country!("Thailand", "🇹🇭", "TH", "Asia"),
        country!("Vietnam", "🇻🇳", "VN", "Asia"),
        country!("Indonesia", "🇮🇩", "ID", "Asia"),
        country!("Philippines", "🇵🇭", "PH", "Asia"),
        country!("Malaysia", "🇲🇾", "MY", "Asia"),
        country!("Singapore", "🇸🇬", "SG", "Asia"),
        country!("Mongolia", "🇲🇳", "MN", "Asia"),
        country!("Nepal", "🇳🇵", "NP", "Asia"),
        country!("Egypt", "🇪🇬", "EG", "Africa"),
        country!("Nigeria", "🇳🇬", "NG", "Africa"),
        country!("Kenya", "🇰🇪", "KE", "Africa"),
        country!("South Africa", "🇿🇦", "ZA", "Africa"),
        country!("Morocco", "🇲🇦", "MA", "Africa"),
        country!("Ghana", "🇬🇭", "GH", "Africa"),
        country!("Ethiopia", "🇪🇹", "ET", "Africa"),
        country!("Senegal", "🇸🇳", "SN", "Africa"),
        country!("United States", "🇺🇸", "US", "Americas"),
        country!("Canada", "🇨🇦", "CA", "Americas"),
        country!("Mexico", "🇲🇽", "MX", "Americas"),
        country!("Brazil", "🇧🇷", "BR", "Americas"),
        country!("Argentina", "🇦🇷", "AR", "Americas"),
        country!("Chile", "🇨🇱", "CL", "Americas"),
        country!("Colombia", "🇨🇴", "CO", "Americas"),
        country!("Peru", "🇵🇪", "PE", "Americas"),
        country!("Cuba", "🇨🇺", "CU", "Americas"),
        country!("Australia", "🇦🇺", "AU", "Oceania"),
        country!("New Zealand", "🇳🇿", "NZ", "Oceania"),
        country!("Fiji", "🇫🇯", "FJ", "Oceania"),
    ]
}

pub struct QuestionProvider {
    countries: Vec<CountryRecord>,
}

impl QuestionProvider {
    pub fn new() -> Self {
        Self {
            countries: dataset(),
        }
    }

    pub fn dataset_size(&self) -> usize {
        self.countries.len()
    }

    /// Picks the next question for `index`, excluding countries already in
    /// `used`. Returns `None` once the pool is exhausted (spec §4.9).
    pub fn next_question(
        &self,
        index: usize,
        used: &HashSet<CountryCode>,
        start_time: i64,
        end_time: i64,
    ) -> Option<GameQuestion> {
        let pool: Vec<&CountryRecord> = self
            .countries
            .iter()
            .filter(|c| !used.contains(&c.code))
            .collect();

        if pool.is_empty() {
            return None;
        }

        let mut rng = rand::rng();
        let correct = *pool.choose(&mut rng)?;

        let same_region: Vec<&CountryRecord> = pool
            .iter()
            .filter(|c| c.region == correct.region && c.code != correct.code)
            .copied()
            .collect();

        let mut options: Vec<CountryRecord> = vec![correct.clone()];

        if same_region.len() >= 3 {
            let mut region_pool = same_region;
            region_pool.shuffle(&mut rng);
            options.extend(region_pool.into_iter().take(3).cloned());
        } else {
            let mut rest: Vec<&CountryRecord> = pool
                .iter()
                .filter(|c| c.code != correct.code)
                .copied()
                .collect();
            rest.shuffle(&mut rng);
            options.extend(rest.into_iter().take(3).cloned());
        }

        options.shuffle(&mut rng);

        Some(GameQuestion {
            index,
            country: correct.clone(),
            options,
            correct_answer: correct.code.clone(),
            start_time,
            end_time,
        })
    }
}

impl Default for QuestionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_covers_highest_difficulty_tier() {
        let provider = QuestionProvider::new();
        assert!(provider.dataset_size() >= crate::protocol::Difficulty::Expert.total_questions());
    }

    #[test]
    fn each_question_has_four_distinct_options_including_correct() {
        let provider = QuestionProvider::new();
        let used = HashSet::new();
        let question = provider.next_question(0, &used, 0, 1000).unwrap();
        assert_eq!(question.options.len(), 4);
        assert!(question.options.iter().any(|c| c.code == question.correct_answer));
        let codes: HashSet<_> = question.options.iter().map(|c| &c.code).collect();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn exhausting_the_pool_returns_none() {
        let provider = QuestionProvider::new();
        let used: HashSet<CountryCode> = provider.countries.iter().map(|c| c.code.clone()).collect();
        assert!(provider.next_question(0, &used, 0, 1000).is_none());
    }

    #[test]
    fn repeated_draws_never_repeat_the_correct_answer() {
        let provider = QuestionProvider::new();
        let mut used = HashSet::new();
        for i in 0..20 {
            let question = provider.next_question(i, &used, 0, 1000).unwrap();
            assert!(!used.contains(&question.correct_answer));
            used.insert(question.correct_answer.clone());
        }
    }
}
