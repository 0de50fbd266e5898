//! Parent selection restricted to the top of a ranking

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::config::{SelectionMethod, SelectionSettings};
use crate::error::EvolutionError;

use super::population::RankedGenome;

/// Draws parents from the best `pool` entries of a ranking sorted best first
#[derive(Debug, Clone)]
pub struct ParentSelector {
    pool: usize,
    kind: SelectorKind,
}

#[derive(Debug, Clone)]
enum SelectorKind {
    RankWeighted(WeightedIndex<usize>),
    Tournament { size: usize },
}

impl ParentSelector {
    pub fn new(settings: &SelectionSettings, pool: usize) -> Result<Self, EvolutionError> {
        if pool == 0 {
            return Err(EvolutionError::EmptyParentPool);
        }

        let kind = match settings.method {
            // Rank 0 weighs `pool`, the last pool entry weighs 1
            SelectionMethod::RankWeighted => SelectorKind::RankWeighted(
                WeightedIndex::new((1..=pool).rev()).map_err(|_| EvolutionError::EmptyParentPool)?,
            ),
            SelectionMethod::Tournament => SelectorKind::Tournament {
                size: settings.tournament_size.max(1),
            },
        };

        Ok(Self { pool, kind })
    }

    pub fn pool(&self) -> usize {
        self.pool
    }

    /// Index into `ranking` of the next parent; always below the pool size
    pub fn select_index<R: Rng + ?Sized>(&self, ranking_len: usize, rng: &mut R) -> usize {
        let pool = self.pool.min(ranking_len).max(1);

        match &self.kind {
            SelectorKind::RankWeighted(weights) => loop {
                // Weights cover the configured pool; redraw past a shorter ranking
                let index = weights.sample(rng);
                if index < pool {
                    break index;
                }
            },
            SelectorKind::Tournament { size } => (0..*size)
                .map(|_| rng.random_range(0..pool))
                .min()
                .unwrap_or(0),
        }
    }

    /// Next parent genome
    pub fn select<'a, G, R: Rng + ?Sized>(
        &self,
        ranking: &'a [RankedGenome<G>],
        rng: &mut R,
    ) -> Option<&'a G> {
        if ranking.is_empty() {
            return None;
        }
        let index = self.select_index(ranking.len(), rng);
        Some(&ranking[index].genome)
    }
}
