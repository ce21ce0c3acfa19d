//! Who speaks next.
//!
//! Addressed messages go to exactly one persona. Everything else goes to a
//! small shuffled ensemble. The shuffle source is seedable so scheduling is
//! replayable under test.

use quill_core::config::SchedulerConfig;
use quill_core::error::{QuillError, Result};
use quill_core::intent::addressed_pattern;
use quill_core::persona::AgentProfile;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Mutex;

/// Respondents chosen for one user message.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The message opened with this persona's name.
    Addressed(AgentProfile),
    /// A shuffled subset of the eligible personas.
    Ensemble(Vec<AgentProfile>),
}

impl Selection {
    pub fn agents(&self) -> Vec<AgentProfile> {
        match self {
            Selection::Addressed(agent) => vec![agent.clone()],
            Selection::Ensemble(agents) => agents.clone(),
        }
    }

    pub fn is_addressed(&self) -> bool {
        matches!(self, Selection::Addressed(_))
    }
}

pub struct TurnScheduler {
    rng: Mutex<StdRng>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic scheduling for replays and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Finds the persona a message is addressed to.
    ///
    /// Full display names are tried before first names so "Mira Castellanos, ..."
    /// never resolves to a different Mira.
    pub fn find_addressed<'a>(
        &self,
        message: &str,
        eligible: &'a [AgentProfile],
    ) -> Option<&'a AgentProfile> {
        let matches = |name: &str| {
            addressed_pattern(name)
                .map(|re| re.is_match(message))
                .unwrap_or(false)
        };

        eligible
            .iter()
            .find(|agent| matches(&agent.display_name))
            .or_else(|| eligible.iter().find(|agent| matches(agent.first_name())))
    }

    /// Shuffles `eligible` and keeps `min(max, max(min, n))` of them, never more than `n`.
    pub fn select_ensemble(
        &self,
        eligible: &[AgentProfile],
        config: &SchedulerConfig,
    ) -> Vec<AgentProfile> {
        let count = eligible.len();
        let size = config
            .ensemble_max
            .min(config.ensemble_min.max(count))
            .min(count);

        let mut pool = eligible.to_vec();
        {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            pool.shuffle(&mut *rng);
        }
        pool.truncate(size);
        pool
    }

    /// Picks the respondents for an incoming user message.
    pub fn select_respondents(
        &self,
        message: &str,
        eligible: &[AgentProfile],
        config: &SchedulerConfig,
    ) -> Selection {
        if let Some(agent) = self.find_addressed(message, eligible) {
            tracing::debug!("[TurnScheduler] Message addressed to {}", agent.id);
            return Selection::Addressed(agent.clone());
        }
        let ensemble = self.select_ensemble(eligible, config);
        tracing::debug!(
            "[TurnScheduler] Ensemble of {} from {} eligible",
            ensemble.len(),
            eligible.len()
        );
        Selection::Ensemble(ensemble)
    }

    /// Checks a discussion roster: at least two distinct agents.
    pub fn validate_discussion(agent_ids: &[String]) -> Result<()> {
        let distinct: HashSet<&str> = agent_ids.iter().map(String::as_str).collect();
        if distinct.len() != agent_ids.len() {
            return Err(QuillError::validation(
                "a discussion cannot list the same agent twice",
            ));
        }
        if distinct.len() < 2 {
            return Err(QuillError::validation(format!(
                "a discussion needs at least two agents, got {}",
                distinct.len()
            )));
        }
        Ok(())
    }
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::persona::get_default_presets;

    #[test]
    fn addressed_first_name_routes_to_one_agent() {
        let scheduler = TurnScheduler::with_seed(7);
        let agents = get_default_presets();

        let selection =
            scheduler.select_respondents("Aaron, fix this line", &agents, &SchedulerConfig::default());
        assert!(selection.is_addressed());
        assert_eq!(selection.agents().len(), 1);
        assert_eq!(selection.agents()[0].id, "aaron");
    }

    #[test]
    fn full_display_name_is_matched() {
        let scheduler = TurnScheduler::with_seed(7);
        let agents = get_default_presets();
        let found = scheduler.find_addressed("june okafor: is she likeable?", &agents);
        assert_eq!(found.map(|a| a.id.as_str()), Some("june"));
    }

    #[test]
    fn name_mid_sentence_is_not_an_address() {
        let scheduler = TurnScheduler::with_seed(7);
        let agents = get_default_presets();
        assert!(scheduler.find_addressed("I think Aaron, is right", &agents).is_none());
    }

    #[test]
    fn unaddressed_message_goes_to_two_or_three() {
        let agents = get_default_presets();
        let config = SchedulerConfig::default();
        for seed in 0..32 {
            let scheduler = TurnScheduler::with_seed(seed);
            let selection = scheduler.select_respondents("fix this line", &agents, &config);
            let picked = selection.agents();
            assert!(!selection.is_addressed());
            assert!((2..=3).contains(&picked.len()), "seed {} picked {}", seed, picked.len());
            let ids: HashSet<&str> = picked.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(ids.len(), picked.len());
        }
    }

    #[test]
    fn ensemble_never_exceeds_eligible_count() {
        let scheduler = TurnScheduler::with_seed(1);
        let config = SchedulerConfig::default();
        let one = &get_default_presets()[..1];

        assert_eq!(scheduler.select_ensemble(one, &config).len(), 1);
        assert!(scheduler.select_ensemble(&[], &config).is_empty());
    }

    #[test]
    fn same_seed_same_ensemble() {
        let agents = get_default_presets();
        let config = SchedulerConfig::default();
        let ids = |seed| {
            TurnScheduler::with_seed(seed)
                .select_ensemble(&agents, &config)
                .into_iter()
                .map(|a| a.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(42), ids(42));
    }

    #[test]
    fn discussion_needs_two_distinct_agents() {
        assert!(TurnScheduler::validate_discussion(&["a".into()]).unwrap_err().is_validation());
        assert!(TurnScheduler::validate_discussion(&["a".into(), "a".into()]).is_err());
        assert!(TurnScheduler::validate_discussion(&["a".into(), "b".into()]).is_ok());
    }
}
