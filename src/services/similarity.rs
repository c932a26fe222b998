use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use crate::{
    error::{EngineError, EngineResult},
    models::{Rating, ResourceId, UserId},
};

/// The entity axis a similarity matrix is built over
///
/// Ratings are grouped by `Entity`; two entities are compared through the
/// `Counterpart`s they both rated.
pub trait Axis {
    type Entity: Clone + Eq + Hash + Ord + Display;
    type Counterpart: Eq + Ord;

    fn entity(rating: &Rating) -> &Self::Entity;
    fn counterpart(rating: &Rating) -> &Self::Counterpart;
}

/// Learner x learner similarity, compared over co-rated resources
#[derive(Debug, Clone, Copy)]
pub struct UserAxis;

/// Resource x resource similarity, compared over learners who rated both
#[derive(Debug, Clone, Copy)]
pub struct ItemAxis;

impl Axis for UserAxis {
    type Entity = UserId;
    type Counterpart = ResourceId;

    fn entity(rating: &Rating) -> &UserId {
        &rating.user_id
    }

    fn counterpart(rating: &Rating) -> &ResourceId {
        &rating.resource_id
    }
}

impl Axis for ItemAxis {
    type Entity = ResourceId;
    type Counterpart = UserId;

    fn entity(rating: &Rating) -> &ResourceId {
        &rating.resource_id
    }

    fn counterpart(rating: &Rating) -> &UserId {
        &rating.user_id
    }
}

/// Symmetric cosine similarity table
///
/// Every entity that appears in the ratings has a row, including a self
/// entry of exactly 1.0. Values always lie in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix<K: Eq + Hash> {
    rows: HashMap<K, HashMap<K, f64>>,
}

impl<K: Eq + Hash> Default for SimilarityMatrix<K> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> SimilarityMatrix<K> {
    /// Number of entities
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, entity: &K) -> bool {
        self.rows.contains_key(entity)
    }

    /// Similarity between two entities, `None` if either is unknown
    pub fn get(&self, a: &K, b: &K) -> Option<f64> {
        self.rows.get(a).and_then(|row| row.get(b)).copied()
    }

    /// All other entities with their similarity to `entity`
    pub fn neighbors<'a>(&'a self, entity: &'a K) -> impl Iterator<Item = (&'a K, f64)> + 'a {
        self.rows
            .get(entity)
            .into_iter()
            .flat_map(|row| row.iter())
            .filter(move |(other, _)| *other != entity)
            .map(|(other, &sim)| (other, sim))
    }

    pub fn entities(&self) -> impl Iterator<Item = &K> {
        self.rows.keys()
    }

    fn insert_pair(&mut self, a: &K, b: &K, similarity: f64) {
        self.rows
            .entry(a.clone())
            .or_default()
            .insert(b.clone(), similarity);
        self.rows
            .entry(b.clone())
            .or_default()
            .insert(a.clone(), similarity);
    }
}

/// Builds the similarity matrix for one axis
///
/// Entities are paired in ascending id order and every unordered pair is
/// computed exactly once, then mirrored. Cost is O(E^2 * K) in the number of
/// entities and their average overlap.
pub fn build_similarity_matrix<A: Axis>(
    ratings: &[Rating],
) -> EngineResult<SimilarityMatrix<A::Entity>> {
    validate_ratings(ratings)?;

    // Later duplicates of the same (entity, counterpart) overwrite earlier ones
    let mut vectors: BTreeMap<&A::Entity, BTreeMap<&A::Counterpart, f64>> = BTreeMap::new();
    for rating in ratings {
        vectors
            .entry(A::entity(rating))
            .or_default()
            .insert(A::counterpart(rating), rating.rating);
    }

    let entities: Vec<&A::Entity> = vectors.keys().copied().collect();
    let mut matrix: SimilarityMatrix<A::Entity> = SimilarityMatrix {
        rows: HashMap::with_capacity(entities.len()),
    };

    for (i, a) in entities.iter().enumerate() {
        matrix.insert_pair(*a, *a, 1.0);

        for b in entities.iter().skip(i + 1) {
            let similarity = cosine_similarity(&vectors[a], &vectors[b]);
            matrix.insert_pair(*a, *b, similarity);
        }
    }

    tracing::debug!(entities = matrix.len(), "Similarity matrix built");

    Ok(matrix)
}

/// Cosine similarity restricted to the counterparts both vectors rated
fn cosine_similarity<C: Ord>(a: &BTreeMap<&C, f64>, b: &BTreeMap<&C, f64>) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    let mut shared = 0usize;

    for (counterpart, &rating_a) in a {
        if let Some(&rating_b) = b.get(counterpart) {
            dot += rating_a * rating_b;
            norm_a += rating_a * rating_a;
            norm_b += rating_b * rating_b;
            shared += 1;
        }
    }

    if shared == 0 || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

fn validate_ratings(ratings: &[Rating]) -> EngineResult<()> {
    for rating in ratings {
        let reason = if rating.user_id.as_str().is_empty() {
            Some("empty user id")
        } else if rating.resource_id.as_str().is_empty() {
            Some("empty resource id")
        } else if !rating.rating.is_finite() {
            Some("rating is not finite")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(EngineError::MalformedRating {
                user_id: rating.user_id.to_string(),
                resource_id: rating.resource_id.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    Ok(())
}

/// User and item matrices built once from the same rating set
///
/// Lets one build serve many target users while the ratings stay unchanged.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    pub users: SimilarityMatrix<UserId>,
    pub items: SimilarityMatrix<ResourceId>,
}

impl SimilarityIndex {
    pub fn build(ratings: &[Rating]) -> EngineResult<Self> {
        Ok(Self {
            users: build_similarity_matrix::<UserAxis>(ratings)?,
            items: build_similarity_matrix::<ItemAxis>(ratings)?,
        })
    }
}
